//! Core data types and shared counters.

pub mod episode_stats;
pub mod returns;
pub mod trajectory;

pub use episode_stats::{
    episode_aggregator, EpisodeAggregator, EpisodeOutcome, RewardTracking,
    SharedEpisodeAggregator,
};
pub use returns::{advantage_targets, discounted_returns, normalize, AdvantageMode, ReturnTargets};
pub use trajectory::{Sample, Trajectory};
