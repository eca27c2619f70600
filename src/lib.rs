//! # Asynchronous actor-critic training
//!
//! Multi-worker actor-critic reinforcement learning against one shared
//! global model. Workers drive their own environments, collect trajectories,
//! and periodically merge locally computed gradients into the shared
//! parameters, pulling the refreshed weights back for continued rollout.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  Worker 0            Worker 1            Worker N            │
//! │  ┌──────────┐        ┌──────────┐        ┌──────────┐        │
//! │  │ env      │        │ env      │        │ env      │        │
//! │  │ local    │        │ local    │        │ local    │        │
//! │  │ model    │        │ model    │        │ model    │        │
//! │  │ buffer   │        │ buffer   │        │ buffer   │        │
//! │  └────┬─────┘        └────┬─────┘        └────┬─────┘        │
//! │       │ push grads / pull weights             │              │
//! │       └──────────────────┼───────────────────┘              │
//! │                          ▼                                   │
//! │            ┌───────────────────────────┐                     │
//! │            │ GlobalModel               │                     │
//! │            │  ParameterStore (shared)  │                     │
//! │            │  SharedAdam    (shared)   │                     │
//! │            └───────────────────────────┘                     │
//! │                          │ episode records + sentinels       │
//! │                          ▼                                   │
//! │            ┌───────────────────────────┐                     │
//! │            │ Coordinator (drains until │                     │
//! │            │ one sentinel per worker)  │                     │
//! │            └───────────────────────────┘                     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Two synchronization disciplines are supported behind one configuration
//! switch: lock-free (no mutual exclusion between workers' update
//! sequences, the classic asynchronous-SGD approximation) and exclusive
//! (one process-wide critical section around push, optimizer step,
//! pull-back, and checkpoint-on-best).
//!
//! ## Usage
//!
//! ```rust,ignore
//! use async_actor_critic::{Coordinator, PolicyValueNet, TrainerConfig};
//! use burn::backend::{Autodiff, NdArray};
//!
//! type B = Autodiff<NdArray<f32>>;
//!
//! let device = Default::default();
//! let model = PolicyValueNet::<B>::new(state_size, action_count, 128, &device);
//! let config = TrainerConfig::new().with_workers(4).with_total_episodes(1000);
//! let mut coordinator = Coordinator::<B, _>::new(config, device)?;
//! let report = coordinator.train(model, |worker_id| MyEnvironment::new(worker_id));
//! ```

pub mod checkpoint;
pub mod config;
pub mod coordinator;
pub mod core;
pub mod environment;
pub mod messages;
pub mod metrics;
pub mod model;
pub mod sync;
pub mod worker;

pub use checkpoint::{CheckpointError, CheckpointStore, FileCheckpointStore};
pub use config::{ConfigError, TrainerConfig};
pub use coordinator::{Coordinator, TrainingReport};
pub use core::episode_stats::{
    episode_aggregator, EpisodeAggregator, EpisodeOutcome, RewardTracking,
    SharedEpisodeAggregator,
};
pub use core::returns::{advantage_targets, discounted_returns, AdvantageMode, ReturnTargets};
pub use core::trajectory::{Sample, Trajectory};
pub use environment::{Environment, EnvironmentError, Observation};
pub use messages::{EpisodeRecord, FinishReason, ResultMsg};
pub use metrics::{ConsoleLogger, CsvLogger, EpisodeLogger};
pub use model::{
    actor_critic_loss, compute_gradients, select_action, value_estimate, value_estimates,
    PolicyValue, PolicyValueNet, PolicyValueOutput,
};
pub use sync::{
    global_model, GlobalModel, ParameterStore, SharedAdam, SharedGlobalModel, SyncDiscipline,
    SyncError,
};
pub use worker::{Worker, WorkerConfig, WorkerError};
