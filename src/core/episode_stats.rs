//! Cross-worker episode accounting.
//!
//! One [`EpisodeAggregator`] is shared by every worker. It owns the
//! process-wide episode counter (atomic, incremented exactly once per
//! completed episode), the running reward estimate, and the best-score
//! record that drives checkpoint-on-improvement.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Running-reward estimator selection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RewardTracking {
    /// Exponential moving average: `new = decay * old + (1 - decay) * reward`.
    /// The first episode seeds the average directly.
    Ema {
        /// Weight on the previous estimate, typically 0.99.
        decay: f64,
    },
    /// Plain mean over the last `len` episode rewards.
    Window {
        /// Window length, typically 50.
        len: usize,
    },
}

impl Default for RewardTracking {
    fn default() -> Self {
        RewardTracking::Ema { decay: 0.99 }
    }
}

#[derive(Debug)]
struct RewardTracker {
    mode: RewardTracking,
    ema: f64,
    seeded: bool,
    window: VecDeque<f64>,
    best: f64,
}

impl RewardTracker {
    fn new(mode: RewardTracking) -> Self {
        Self {
            mode,
            ema: 0.0,
            seeded: false,
            window: VecDeque::new(),
            best: f64::NEG_INFINITY,
        }
    }

    fn update(&mut self, reward: f64) -> f64 {
        match self.mode {
            RewardTracking::Ema { decay } => {
                if self.seeded {
                    self.ema = decay * self.ema + (1.0 - decay) * reward;
                } else {
                    self.ema = reward;
                    self.seeded = true;
                }
                self.ema
            }
            RewardTracking::Window { len } => {
                self.window.push_back(reward);
                while self.window.len() > len.max(1) {
                    self.window.pop_front();
                }
                self.window.iter().sum::<f64>() / self.window.len() as f64
            }
        }
    }
}

/// Outcome of recording one completed episode.
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeOutcome {
    /// Process-wide episode index, starting at 1.
    pub episode: usize,
    /// Total reward of the episode.
    pub reward: f64,
    /// Running reward after folding this episode in.
    pub running_reward: f64,
    /// True iff the running reward strictly exceeded every previously
    /// recorded value; the caller checkpoints on this.
    pub improved: bool,
}

/// Shared episode counter, running reward, and best-score record.
#[derive(Debug)]
pub struct EpisodeAggregator {
    episodes: AtomicUsize,
    tracker: Mutex<RewardTracker>,
}

impl EpisodeAggregator {
    /// Create an aggregator with the given reward-tracking mode.
    pub fn new(tracking: RewardTracking) -> Self {
        Self {
            episodes: AtomicUsize::new(0),
            tracker: Mutex::new(RewardTracker::new(tracking)),
        }
    }

    /// Record one completed episode.
    ///
    /// The counter increment is atomic; the running-reward update and the
    /// best comparison happen under the tracker lock so two workers can
    /// never both conclude "new best" from the same stale value.
    pub fn record(&self, reward: f64) -> EpisodeOutcome {
        let episode = self.episodes.fetch_add(1, Ordering::SeqCst) + 1;

        let mut tracker = self.tracker.lock();
        let running_reward = tracker.update(reward);
        let improved = running_reward > tracker.best;
        if improved {
            tracker.best = running_reward;
        }

        EpisodeOutcome {
            episode,
            reward,
            running_reward,
            improved,
        }
    }

    /// Number of completed episodes so far.
    pub fn episodes(&self) -> usize {
        self.episodes.load(Ordering::SeqCst)
    }

    /// Current running reward (0.0 before the first episode).
    pub fn running_reward(&self) -> f64 {
        let tracker = self.tracker.lock();
        match tracker.mode {
            RewardTracking::Ema { .. } => tracker.ema,
            RewardTracking::Window { .. } => {
                if tracker.window.is_empty() {
                    0.0
                } else {
                    tracker.window.iter().sum::<f64>() / tracker.window.len() as f64
                }
            }
        }
    }

    /// Best running reward seen so far (−∞ before the first episode).
    pub fn best(&self) -> f64 {
        self.tracker.lock().best
    }
}

/// Shared handle to an [`EpisodeAggregator`].
pub type SharedEpisodeAggregator = Arc<EpisodeAggregator>;

/// Create a new shared episode aggregator.
pub fn episode_aggregator(tracking: RewardTracking) -> SharedEpisodeAggregator {
    Arc::new(EpisodeAggregator::new(tracking))
}
