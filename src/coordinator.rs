//! Training coordinator.
//!
//! The coordinator owns the process: it validates the configuration, seeds
//! the shared global model (optionally from a checkpoint), spawns one
//! supervisor per worker slot, and drains the result channel until every
//! slot has sent its sentinel. Supervisors run worker incarnations on OS
//! threads, recycling them after a bounded number of episodes and replacing
//! crashed ones within the configured restart budget. A crashed worker
//! degrades throughput, never shared state.

use burn::tensor::backend::AutodiffBackend;
use crossbeam_channel::Sender;
use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use crate::checkpoint::CheckpointStore;
use crate::config::{ConfigError, TrainerConfig};
use crate::core::episode_stats::{episode_aggregator, SharedEpisodeAggregator};
use crate::environment::Environment;
use crate::messages::{EpisodeRecord, FinishReason, ResultMsg};
use crate::metrics::{ConsoleLogger, EpisodeLogger};
use crate::model::PolicyValue;
use crate::sync::{global_model, SharedGlobalModel};
use crate::worker::{Worker, WorkerConfig};

/// Everything the coordinator learned from one training run.
#[derive(Debug, Default)]
pub struct TrainingReport {
    /// Every episode record, in arrival order.
    pub episodes: Vec<EpisodeRecord>,
    /// Final value of the shared episode counter.
    pub episodes_completed: usize,
    /// Best running reward reached during the run.
    pub best_running_reward: f64,
    /// Running reward at the end of the run.
    pub final_running_reward: f64,
    /// Per-slot finish reasons, in arrival order.
    pub finish_reasons: Vec<(usize, FinishReason)>,
}

/// Spawns workers against one shared global model and aggregates results.
pub struct Coordinator<B: AutodiffBackend, M: PolicyValue<B>> {
    config: TrainerConfig,
    device: B::Device,
    checkpoint: Option<Arc<dyn CheckpointStore<B, M>>>,
    logger: Box<dyn EpisodeLogger>,
}

impl<B: AutodiffBackend, M: PolicyValue<B>> Coordinator<B, M> {
    /// Create a coordinator with a validated configuration.
    pub fn new(config: TrainerConfig, device: B::Device) -> Result<Self, ConfigError> {
        config.validate()?;
        let logger = Box::new(ConsoleLogger::new(config.total_episodes));
        Ok(Self {
            config,
            device,
            checkpoint: None,
            logger,
        })
    }

    /// Attach a checkpoint store ("latest" on every episode, "best" on
    /// improvement, resume from "latest" at startup).
    pub fn with_checkpoint_store(mut self, store: Arc<dyn CheckpointStore<B, M>>) -> Self {
        self.checkpoint = Some(store);
        self
    }

    /// Replace the episode logger.
    pub fn with_logger(mut self, logger: Box<dyn EpisodeLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Run training to completion and return the aggregated report.
    ///
    /// `env_factory` is called once per worker incarnation with the slot id.
    pub fn train<E, F>(&mut self, initial_model: M, env_factory: F) -> TrainingReport
    where
        E: Environment + 'static,
        F: Fn(usize) -> E + Send + Sync + 'static,
    {
        let initial_model = self.resume_model(initial_model);
        let global = global_model(
            &initial_model,
            self.config.learning_rate,
            self.config.betas,
            self.config.discipline,
        );
        let aggregator = episode_aggregator(self.config.reward_tracking);
        let (tx, rx) = crossbeam_channel::unbounded();
        let env_factory = Arc::new(env_factory);

        log::info!(
            "starting training: {} workers, {} episodes, {:?} discipline",
            self.config.workers,
            self.config.total_episodes,
            self.config.discipline
        );

        let mut supervisors = Vec::with_capacity(self.config.workers);
        for worker_id in 0..self.config.workers {
            let quota = self.slot_quota(worker_id);
            supervisors.push(self.spawn_supervisor(
                worker_id,
                quota,
                initial_model.clone(),
                Arc::clone(&global),
                Arc::clone(&aggregator),
                tx.clone(),
                Arc::clone(&env_factory),
            ));
        }
        drop(tx);

        let mut report = TrainingReport::default();
        let mut finished = 0usize;
        while finished < self.config.workers {
            match rx.recv() {
                Ok(ResultMsg::Episode(record)) => {
                    self.logger.log(&record);
                    report.episodes.push(record);
                }
                Ok(ResultMsg::Finished { worker_id, reason }) => {
                    match &reason {
                        FinishReason::Completed => {
                            log::info!("worker {} finished", worker_id)
                        }
                        FinishReason::Failed(msg) => {
                            log::error!("worker {} gave up: {}", worker_id, msg)
                        }
                    }
                    report.finish_reasons.push((worker_id, reason));
                    finished += 1;
                }
                Err(_) => {
                    // All senders gone without a full sentinel count; should
                    // not happen, but never hang the coordinator on it.
                    log::error!("result channel closed before all workers reported completion");
                    break;
                }
            }
        }
        self.logger.flush();

        for supervisor in supervisors {
            let _ = supervisor.join();
        }

        report.episodes_completed = aggregator.episodes();
        report.best_running_reward = aggregator.best();
        report.final_running_reward = aggregator.running_reward();
        log::info!(
            "training complete: {} episodes, best running reward {:.3}",
            report.episodes_completed,
            report.best_running_reward
        );
        report
    }

    /// Load "latest" into the initial model when a checkpoint store is
    /// attached and has one; otherwise pass the model through.
    fn resume_model(&self, initial_model: M) -> M {
        let Some(store) = &self.checkpoint else {
            return initial_model;
        };
        if !store.exists("latest") {
            return initial_model;
        }
        match store.load(initial_model.clone(), "latest", &self.device) {
            Ok(model) => {
                log::info!("resuming global model from 'latest' checkpoint");
                model
            }
            Err(e) => {
                log::warn!("failed to load 'latest' checkpoint, starting fresh: {}", e);
                initial_model
            }
        }
    }

    /// Episodes assigned to a slot: an even split with the remainder spread
    /// over the first slots.
    fn slot_quota(&self, worker_id: usize) -> usize {
        let base = self.config.total_episodes / self.config.workers;
        let extra = self.config.total_episodes % self.config.workers;
        base + usize::from(worker_id < extra)
    }

    #[allow(clippy::too_many_arguments)]
    fn spawn_supervisor<E, F>(
        &self,
        worker_id: usize,
        quota: usize,
        template: M,
        global: SharedGlobalModel,
        aggregator: SharedEpisodeAggregator,
        results: Sender<ResultMsg>,
        env_factory: Arc<F>,
    ) -> thread::JoinHandle<()>
    where
        E: Environment + 'static,
        F: Fn(usize) -> E + Send + Sync + 'static,
    {
        let worker_config = WorkerConfig::from(&self.config);
        let episodes_per_task = self.config.episodes_per_task;
        let restart_limit = self.config.worker_restart_limit;
        let seed = self.config.seed;
        let device = self.device.clone();
        let checkpoint = self.checkpoint.clone();

        thread::Builder::new()
            .name(format!("worker-supervisor-{}", worker_id))
            .spawn(move || {
                let completed = Arc::new(AtomicUsize::new(0));
                let mut remaining = quota;
                let mut restarts = 0usize;

                while remaining > 0 {
                    let batch = if episodes_per_task == 0 {
                        remaining
                    } else {
                        remaining.min(episodes_per_task)
                    };
                    let done_before = completed.load(Ordering::SeqCst);

                    let handle = {
                        let template = template.clone();
                        let global = Arc::clone(&global);
                        let aggregator = Arc::clone(&aggregator);
                        let results = results.clone();
                        let checkpoint = checkpoint.clone();
                        let completed = Arc::clone(&completed);
                        let env_factory = Arc::clone(&env_factory);
                        let device = device.clone();
                        thread::Builder::new()
                            .name(format!("worker-{}", worker_id))
                            .spawn(move || {
                                let mut worker = Worker::new(
                                    worker_id,
                                    worker_config,
                                    (env_factory)(worker_id),
                                    template,
                                    device,
                                    global,
                                    aggregator,
                                    results,
                                    checkpoint,
                                    completed,
                                    seed,
                                )?;
                                worker.run(batch)
                            })
                            .expect("failed to spawn worker thread")
                    };

                    let outcome = handle.join();
                    let done_in_batch = completed.load(Ordering::SeqCst) - done_before;

                    match outcome {
                        Ok(Ok(())) => {
                            remaining -= batch;
                        }
                        Ok(Err(e)) => {
                            remaining -= done_in_batch;
                            restarts += 1;
                            if restarts > restart_limit {
                                let _ = results.send(ResultMsg::Finished {
                                    worker_id,
                                    reason: FinishReason::Failed(e.to_string()),
                                });
                                return;
                            }
                            log::error!(
                                "worker {} failed ({}), starting replacement for {} episodes",
                                worker_id,
                                e,
                                remaining
                            );
                        }
                        Err(panic) => {
                            remaining -= done_in_batch;
                            restarts += 1;
                            let msg = panic_message(panic);
                            if restarts > restart_limit {
                                let _ = results.send(ResultMsg::Finished {
                                    worker_id,
                                    reason: FinishReason::Failed(msg),
                                });
                                return;
                            }
                            log::error!(
                                "worker {} panicked ({}), starting replacement for {} episodes",
                                worker_id,
                                msg,
                                remaining
                            );
                        }
                    }
                }

                let _ = results.send(ResultMsg::Finished {
                    worker_id,
                    reason: FinishReason::Completed,
                });
            })
            .expect("failed to spawn supervisor thread")
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}
