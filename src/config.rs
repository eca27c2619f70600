//! Training configuration.
//!
//! Every recognized option is an explicit field with a default and a range
//! check at construction time; nothing is read from loose dictionaries.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::episode_stats::RewardTracking;
use crate::core::returns::AdvantageMode;
use crate::sync::{SharedAdam, SyncDiscipline};

/// Validated trainer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainerConfig {
    /// Number of parallel worker slots.
    pub workers: usize,
    /// Total episodes across all workers.
    pub total_episodes: usize,
    /// Environment steps between interim synchronizations.
    pub update_interval: usize,
    /// Reward discount factor.
    pub gamma: f32,
    /// Shared-optimizer learning rate.
    pub learning_rate: f32,
    /// Shared-optimizer (beta1, beta2).
    pub betas: (f32, f32),
    /// Concurrency discipline for global updates.
    pub discipline: SyncDiscipline,
    /// Advantage construction mode.
    pub advantage_mode: AdvantageMode,
    /// Running-reward estimator.
    pub reward_tracking: RewardTracking,
    /// Episodes one worker thread handles before being replaced by a fresh
    /// one. Zero disables recycling. Replacement never interrupts an
    /// in-progress episode.
    pub episodes_per_task: usize,
    /// How many times a crashed worker incarnation is replaced before its
    /// slot gives up on the remaining episodes.
    pub worker_restart_limit: usize,
    /// Base RNG seed; each worker derives its own stream from it.
    pub seed: u64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            total_episodes: 1000,
            update_interval: 5,
            gamma: 0.99,
            learning_rate: SharedAdam::DEFAULT_LEARNING_RATE,
            betas: SharedAdam::DEFAULT_BETAS,
            discipline: SyncDiscipline::Exclusive,
            advantage_mode: AdvantageMode::TemporalDifference,
            reward_tracking: RewardTracking::default(),
            episodes_per_task: 0,
            worker_restart_limit: 0,
            seed: 0,
        }
    }
}

impl TrainerConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of worker slots.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Set the total episode count.
    pub fn with_total_episodes(mut self, episodes: usize) -> Self {
        self.total_episodes = episodes;
        self
    }

    /// Set the synchronization cadence in environment steps.
    pub fn with_update_interval(mut self, interval: usize) -> Self {
        self.update_interval = interval;
        self
    }

    /// Set the discount factor.
    pub fn with_gamma(mut self, gamma: f32) -> Self {
        self.gamma = gamma;
        self
    }

    /// Set the learning rate.
    pub fn with_learning_rate(mut self, learning_rate: f32) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    /// Set the optimizer betas.
    pub fn with_betas(mut self, betas: (f32, f32)) -> Self {
        self.betas = betas;
        self
    }

    /// Set the synchronization discipline.
    pub fn with_discipline(mut self, discipline: SyncDiscipline) -> Self {
        self.discipline = discipline;
        self
    }

    /// Set the advantage mode.
    pub fn with_advantage_mode(mut self, mode: AdvantageMode) -> Self {
        self.advantage_mode = mode;
        self
    }

    /// Set the running-reward estimator.
    pub fn with_reward_tracking(mut self, tracking: RewardTracking) -> Self {
        self.reward_tracking = tracking;
        self
    }

    /// Set worker-thread recycling (0 disables).
    pub fn with_episodes_per_task(mut self, episodes: usize) -> Self {
        self.episodes_per_task = episodes;
        self
    }

    /// Set the per-slot restart budget for crashed workers.
    pub fn with_worker_restart_limit(mut self, limit: usize) -> Self {
        self.worker_restart_limit = limit;
        self
    }

    /// Set the base RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Check every field against its valid range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::InvalidValue {
                field: "workers",
                reason: "must be at least 1".into(),
            });
        }
        if self.total_episodes == 0 {
            return Err(ConfigError::InvalidValue {
                field: "total_episodes",
                reason: "must be at least 1".into(),
            });
        }
        if self.update_interval == 0 {
            return Err(ConfigError::InvalidValue {
                field: "update_interval",
                reason: "must be at least 1".into(),
            });
        }
        if !(self.gamma > 0.0 && self.gamma <= 1.0) {
            return Err(ConfigError::InvalidValue {
                field: "gamma",
                reason: format!("must be in (0, 1], got {}", self.gamma),
            });
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(ConfigError::InvalidValue {
                field: "learning_rate",
                reason: format!("must be positive and finite, got {}", self.learning_rate),
            });
        }
        for (name, beta) in [("betas.0", self.betas.0), ("betas.1", self.betas.1)] {
            if !(0.0..1.0).contains(&beta) {
                return Err(ConfigError::InvalidValue {
                    field: name,
                    reason: format!("must be in [0, 1), got {}", beta),
                });
            }
        }
        match self.reward_tracking {
            RewardTracking::Ema { decay } => {
                if !(decay > 0.0 && decay < 1.0) {
                    return Err(ConfigError::InvalidValue {
                        field: "reward_tracking.decay",
                        reason: format!("must be in (0, 1), got {}", decay),
                    });
                }
            }
            RewardTracking::Window { len } => {
                if len == 0 {
                    return Err(ConfigError::InvalidValue {
                        field: "reward_tracking.len",
                        reason: "window length must be at least 1".into(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// A configuration field failed its range check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A field held a value outside its valid range.
    InvalidValue {
        /// Name of the offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidValue { field, reason } => {
                write!(f, "invalid configuration: {}: {}", field, reason)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
