//! Result-channel messages.
//!
//! Workers are the producers; the coordinator is the sole consumer. Each
//! worker slot terminates its stream with one [`ResultMsg::Finished`]
//! sentinel, and the coordinator drains until it has received one sentinel
//! per slot.

use serde::{Deserialize, Serialize};

/// One completed episode, as reported over the result channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeRecord {
    /// Process-wide episode index (1-based).
    pub episode: usize,
    /// Worker slot that ran the episode.
    pub worker_id: usize,
    /// Total reward of the episode.
    pub reward: f64,
    /// Running reward after this episode.
    pub running_reward: f64,
    /// Whether this episode set a new best running reward (and therefore
    /// triggered a checkpoint).
    pub new_best: bool,
}

/// Why a worker slot stopped producing episodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FinishReason {
    /// The slot ran all of its assigned episodes.
    Completed,
    /// The slot gave up after exhausting its restart budget.
    Failed(String),
}

/// Message on the result channel.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultMsg {
    /// A completed episode.
    Episode(EpisodeRecord),
    /// Sentinel: this worker slot will send nothing further.
    Finished {
        /// The slot that finished.
        worker_id: usize,
        /// Why it finished.
        reason: FinishReason,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_identity() {
        let msg = ResultMsg::Finished {
            worker_id: 2,
            reason: FinishReason::Completed,
        };
        assert!(matches!(msg, ResultMsg::Finished { worker_id: 2, .. }));
    }

    #[test]
    fn test_records_compare_by_value() {
        let record = EpisodeRecord {
            episode: 12,
            worker_id: 1,
            reward: -3.5,
            running_reward: -4.0,
            new_best: true,
        };
        assert_eq!(ResultMsg::Episode(record.clone()), ResultMsg::Episode(record));
    }
}
