//! Worker run loop.
//!
//! Each worker owns a private local model and an environment, and loops
//! through `RUNNING_EPISODE → SYNCHRONIZING → RUNNING_EPISODE …` until its
//! episode budget is spent. Synchronization pushes locally computed
//! gradients into the shared global model, applies one optimizer step, and
//! pulls the refreshed parameters back, after which the local model is
//! bit-identical to the global one.

use burn::tensor::backend::AutodiffBackend;
use crossbeam_channel::Sender;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::checkpoint::CheckpointStore;
use crate::config::TrainerConfig;
use crate::core::episode_stats::SharedEpisodeAggregator;
use crate::core::returns::AdvantageMode;
use crate::core::trajectory::{Sample, Trajectory};
use crate::environment::{Environment, EnvironmentError};
use crate::messages::{EpisodeRecord, ResultMsg};
use crate::model::{compute_gradients, select_action, value_estimate, PolicyValue};
use crate::sync::{SharedGlobalModel, SyncError};

/// Per-worker slice of the trainer configuration.
#[derive(Debug, Clone, Copy)]
pub struct WorkerConfig {
    /// Environment steps between interim synchronizations.
    pub update_interval: usize,
    /// Reward discount factor.
    pub gamma: f32,
    /// Advantage construction mode.
    pub advantage_mode: AdvantageMode,
}

impl From<&TrainerConfig> for WorkerConfig {
    fn from(config: &TrainerConfig) -> Self {
        Self {
            update_interval: config.update_interval,
            gamma: config.gamma,
            advantage_mode: config.advantage_mode,
        }
    }
}

/// Errors that end a worker's current activity.
#[derive(Debug)]
pub enum WorkerError {
    /// The environment failed outside the per-step taxonomy (e.g. reset).
    Environment(EnvironmentError),
    /// Gradient application or pull-back failed.
    Sync(SyncError),
}

impl fmt::Display for WorkerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerError::Environment(e) => write!(f, "environment error: {}", e),
            WorkerError::Sync(e) => write!(f, "synchronization error: {}", e),
        }
    }
}

impl std::error::Error for WorkerError {}

impl From<EnvironmentError> for WorkerError {
    fn from(e: EnvironmentError) -> Self {
        WorkerError::Environment(e)
    }
}

impl From<SyncError> for WorkerError {
    fn from(e: SyncError) -> Self {
        WorkerError::Sync(e)
    }
}

/// One worker: local model, environment, trajectory buffer, and the shared
/// handles it synchronizes through.
pub struct Worker<B: AutodiffBackend, M: PolicyValue<B>, E: Environment> {
    id: usize,
    config: WorkerConfig,
    env: E,
    model: M,
    device: B::Device,
    trajectory: Trajectory,
    global: SharedGlobalModel,
    aggregator: SharedEpisodeAggregator,
    results: Sender<ResultMsg>,
    checkpoint: Option<Arc<dyn CheckpointStore<B, M>>>,
    completed: Arc<AtomicUsize>,
    rng: fastrand::Rng,
}

impl<B: AutodiffBackend, M: PolicyValue<B>, E: Environment> Worker<B, M, E> {
    /// Create a worker, pulling the current global parameters into its local
    /// model before the first episode.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: usize,
        config: WorkerConfig,
        env: E,
        model: M,
        device: B::Device,
        global: SharedGlobalModel,
        aggregator: SharedEpisodeAggregator,
        results: Sender<ResultMsg>,
        checkpoint: Option<Arc<dyn CheckpointStore<B, M>>>,
        completed: Arc<AtomicUsize>,
        seed: u64,
    ) -> Result<Self, SyncError> {
        let model = global.pull_into(model)?;
        Ok(Self {
            id,
            config,
            env,
            model,
            device,
            trajectory: Trajectory::with_capacity(config.update_interval),
            global,
            aggregator,
            results,
            checkpoint,
            completed,
            rng: fastrand::Rng::with_seed(seed.wrapping_add(id as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)),
        })
    }

    /// The worker's local model (equal to the global parameters immediately
    /// after any synchronization).
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Run up to `episodes` episodes.
    ///
    /// A failed synchronization abandons the affected episode and continues
    /// with the next one; an environment reset failure ends the incarnation.
    pub fn run(&mut self, episodes: usize) -> Result<(), WorkerError> {
        for _ in 0..episodes {
            match self.run_episode() {
                Ok(reward) => {
                    log::debug!("worker {}: episode finished, reward {:.3}", self.id, reward);
                    self.completed.fetch_add(1, Ordering::SeqCst);
                }
                Err(WorkerError::Sync(e)) => {
                    log::error!(
                        "worker {}: synchronization failed ({} buffered steps dropped): {}",
                        self.id,
                        self.trajectory.len(),
                        e
                    );
                    self.trajectory.clear();
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// One episode: environment interaction plus cadence/terminal syncs.
    fn run_episode(&mut self) -> Result<f64, WorkerError> {
        self.env.reset().map_err(WorkerError::Environment)?;
        self.trajectory.clear();
        let mut episode_reward = 0.0f64;

        loop {
            match self.env.observe() {
                Ok(mut obs) => {
                    self.env.normalize_state(&mut obs.state);

                    if self.trajectory.len() >= self.config.update_interval {
                        // Non-terminal cut: bootstrap from the value of the
                        // state the episode continues from.
                        let bootstrap = value_estimate(&self.model, &obs.state, &self.device);
                        self.synchronize(bootstrap, None)?;
                    }

                    let action = select_action(&self.model, &obs.state, &mut self.rng, &self.device);
                    match self.env.actuate(action as usize) {
                        Ok(_signal) => {
                            episode_reward += obs.reward as f64;
                            self.trajectory.push(Sample {
                                state: obs.state,
                                action,
                                reward: obs.reward,
                            });
                        }
                        Err(e) => {
                            log::warn!("worker {}: actuation rejected, step dropped: {}", self.id, e)
                        }
                    }
                }
                Err(e) => {
                    log::warn!("worker {}: invalid observation, step skipped: {}", self.id, e)
                }
            }

            if !self.env.advance() {
                break;
            }
        }

        self.synchronize(0.0, Some(episode_reward))?;
        Ok(episode_reward)
    }

    /// The push/step/pull sequence, optionally recording a completed episode.
    ///
    /// An empty trajectory pushes nothing but still pulls, so the worker
    /// stays current with the global model even on a vacuous interval. When
    /// `completed_reward` is set, episode recording and checkpoint-on-best
    /// run inside the same critical section as the update (a no-op section
    /// under the lock-free discipline).
    fn synchronize(
        &mut self,
        bootstrap: f32,
        completed_reward: Option<f64>,
    ) -> Result<(), WorkerError> {
        // Step 1 is purely local: loss and gradients from the consistent
        // (model, trajectory) pair, outside any critical section.
        let gradients = if self.trajectory.is_empty() {
            None
        } else {
            let (flat, loss) = compute_gradients(
                &self.model,
                &self.trajectory,
                self.config.gamma,
                bootstrap,
                self.config.advantage_mode,
                &self.device,
            );
            log::debug!(
                "worker {}: pushing {} steps, loss {:.4}",
                self.id,
                self.trajectory.len(),
                loss
            );
            Some(flat)
        };

        let guard = self.global.enter();

        if let Some(flat) = &gradients {
            self.global.apply_gradients(flat)?;
        }
        self.model = self.global.pull_into(self.model.clone())?;

        if let Some(reward) = completed_reward {
            let outcome = self.aggregator.record(reward);
            if let Some(store) = &self.checkpoint {
                // Save failures degrade persistence, never training.
                if let Err(e) = store.save(&self.model, "latest") {
                    log::error!("worker {}: failed to save 'latest' checkpoint: {}", self.id, e);
                }
                if outcome.improved {
                    if let Err(e) = store.save(&self.model, "best") {
                        log::error!("worker {}: failed to save 'best' checkpoint: {}", self.id, e);
                    }
                }
            }
            let record = EpisodeRecord {
                episode: outcome.episode,
                worker_id: self.id,
                reward,
                running_reward: outcome.running_reward,
                new_best: outcome.improved,
            };
            let _ = self.results.send(ResultMsg::Episode(record));
        }

        drop(guard);
        self.trajectory.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::episode_stats::{episode_aggregator, RewardTracking};
    use crate::environment::Observation;
    use crate::model::PolicyValueNet;
    use crate::sync::{flatten_params, global_model, SyncDiscipline};
    use burn::backend::{Autodiff, NdArray};

    type TestBackend = Autodiff<NdArray<f32>>;
    type TestNet = PolicyValueNet<TestBackend>;

    /// Fixed-length episode with unit rewards; optionally fails one
    /// observation per episode.
    struct FixedEnv {
        len: usize,
        step: usize,
        fail_at: Option<usize>,
    }

    impl FixedEnv {
        fn new(len: usize) -> Self {
            Self {
                len,
                step: 0,
                fail_at: None,
            }
        }
    }

    impl Environment for FixedEnv {
        fn state_size(&self) -> usize {
            2
        }

        fn action_count(&self) -> usize {
            3
        }

        fn reset(&mut self) -> Result<(), EnvironmentError> {
            self.step = 0;
            Ok(())
        }

        fn observe(&mut self) -> Result<Observation, EnvironmentError> {
            if self.fail_at == Some(self.step) {
                return Err(EnvironmentError::StaleTimestamp);
            }
            Ok(Observation {
                state: vec![self.step as f32 / self.len as f32, 1.0],
                reward: 1.0,
            })
        }

        fn actuate(&mut self, _action: usize) -> Result<f32, EnvironmentError> {
            Ok(0.0)
        }

        fn advance(&mut self) -> bool {
            self.step += 1;
            self.step < self.len
        }
    }

    fn worker_config() -> WorkerConfig {
        WorkerConfig {
            update_interval: 5,
            gamma: 0.9,
            advantage_mode: AdvantageMode::TemporalDifference,
        }
    }

    fn build_worker(
        env: FixedEnv,
        discipline: SyncDiscipline,
    ) -> (
        Worker<TestBackend, TestNet, FixedEnv>,
        crossbeam_channel::Receiver<ResultMsg>,
        SharedGlobalModel,
        SharedEpisodeAggregator,
    ) {
        let device = Default::default();
        let model = TestNet::new(2, 3, 8, &device);
        let global = global_model(&model, 1e-3, (0.92, 0.999), discipline);
        let aggregator = episode_aggregator(RewardTracking::Ema { decay: 0.99 });
        let (tx, rx) = crossbeam_channel::unbounded();

        let worker = Worker::new(
            0,
            worker_config(),
            env,
            model,
            device,
            Arc::clone(&global),
            Arc::clone(&aggregator),
            tx,
            None,
            Arc::new(AtomicUsize::new(0)),
            7,
        )
        .unwrap();
        (worker, rx, global, aggregator)
    }

    #[test]
    fn test_worker_runs_episodes_and_reports() {
        let (mut worker, rx, _global, aggregator) = build_worker(
            FixedEnv::new(4),
            SyncDiscipline::Exclusive,
        );

        worker.run(2).unwrap();

        assert_eq!(aggregator.episodes(), 2);
        let records: Vec<_> = rx.try_iter().collect();
        assert_eq!(records.len(), 2);
        for (i, msg) in records.iter().enumerate() {
            match msg {
                ResultMsg::Episode(record) => {
                    assert_eq!(record.episode, i + 1);
                    assert!((record.reward - 4.0).abs() < 1e-9);
                }
                other => panic!("unexpected message: {:?}", other),
            }
        }
    }

    #[test]
    fn test_pull_back_invariant_after_run() {
        for discipline in [SyncDiscipline::Exclusive, SyncDiscipline::LockFree] {
            let (mut worker, _rx, global, _aggregator) =
                build_worker(FixedEnv::new(7), discipline);

            worker.run(1).unwrap();

            // The episode ends in a synchronization, so the local model must
            // equal the global parameters exactly.
            assert_eq!(flatten_params(worker.model()), global.store().snapshot());
        }
    }

    #[test]
    fn test_cadence_triggers_global_updates_mid_episode() {
        // 12 steps with interval 5 forces at least two interim syncs plus
        // the terminal one.
        let (mut worker, _rx, global, _aggregator) =
            build_worker(FixedEnv::new(12), SyncDiscipline::Exclusive);

        worker.run(1).unwrap();
        assert_eq!(global.updates(), 3);
    }

    #[test]
    fn test_invalid_observation_skips_step_and_continues() {
        let mut env = FixedEnv::new(4);
        env.fail_at = Some(2);
        let (mut worker, rx, _global, aggregator) =
            build_worker(env, SyncDiscipline::Exclusive);

        worker.run(1).unwrap();

        // The failed step contributed neither a sample nor reward.
        assert_eq!(aggregator.episodes(), 1);
        match rx.try_recv().unwrap() {
            ResultMsg::Episode(record) => assert!((record.reward - 3.0).abs() < 1e-9),
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_empty_trajectory_sync_is_pull_only() {
        // Every observation fails: the terminal sync pushes nothing but the
        // episode is still recorded and the model still pulls.
        let mut env = FixedEnv::new(1);
        env.fail_at = Some(0);
        let (mut worker, rx, global, aggregator) =
            build_worker(env, SyncDiscipline::Exclusive);

        worker.run(1).unwrap();

        assert_eq!(global.updates(), 0, "no gradient from an empty trajectory");
        assert_eq!(aggregator.episodes(), 1);
        assert_eq!(flatten_params(worker.model()), global.store().snapshot());
        assert_eq!(rx.try_iter().count(), 1);
    }
}
