//! The shared global model and the synchronization disciplines.
//!
//! A [`GlobalModel`] bundles the parameter store, the shared optimizer and
//! one process-wide update lock. Workers never touch the store directly:
//! they call [`GlobalModel::enter`] to honor the configured discipline, push
//! gradients through [`GlobalModel::apply_gradients`], and pull the result
//! back with [`GlobalModel::pull_into`].

use burn::module::Module;
use burn::tensor::backend::Backend;
use parking_lot::{Mutex, MutexGuard};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::adam::SharedAdam;
use super::flatten::{flatten_params, load_params};
use super::store::ParameterStore;
use super::SyncError;

/// Concurrency discipline for global updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncDiscipline {
    /// No mutual exclusion between workers' push/step/pull sequences.
    /// Cell-level atomics keep the interleaving memory-safe; value-level
    /// mixing is the classic asynchronous-SGD approximation.
    LockFree,
    /// At most one worker updates the global model at a time; episode
    /// recording and checkpoint-on-best join the same critical section.
    Exclusive,
}

/// Guard returned by [`GlobalModel::enter`].
///
/// Holds the update lock under [`SyncDiscipline::Exclusive`]; empty under
/// [`SyncDiscipline::LockFree`]. Dropping it leaves the critical section.
pub struct SyncGuard<'a> {
    _guard: Option<MutexGuard<'a, ()>>,
}

/// Shared global parameters plus optimizer.
#[derive(Debug)]
pub struct GlobalModel {
    store: ParameterStore,
    optimizer: SharedAdam,
    update_lock: Mutex<()>,
    discipline: SyncDiscipline,
}

impl GlobalModel {
    /// Build the global model by flattening `model`'s parameters.
    pub fn from_model<B: Backend, M: Module<B>>(
        model: &M,
        learning_rate: f32,
        betas: (f32, f32),
        discipline: SyncDiscipline,
    ) -> Self {
        let flat = flatten_params(model);
        let optimizer = SharedAdam::new(flat.len(), learning_rate, betas);
        Self {
            store: ParameterStore::from_flat(&flat),
            optimizer,
            update_lock: Mutex::new(()),
            discipline,
        }
    }

    /// The configured discipline.
    pub fn discipline(&self) -> SyncDiscipline {
        self.discipline
    }

    /// The underlying parameter store.
    pub fn store(&self) -> &ParameterStore {
        &self.store
    }

    /// Number of optimizer steps applied so far.
    pub fn updates(&self) -> u64 {
        self.optimizer.steps()
    }

    /// Enter the update critical section.
    ///
    /// Blocks until the lock is available under the exclusive discipline;
    /// returns immediately under the lock-free one.
    pub fn enter(&self) -> SyncGuard<'_> {
        SyncGuard {
            _guard: match self.discipline {
                SyncDiscipline::Exclusive => Some(self.update_lock.lock()),
                SyncDiscipline::LockFree => None,
            },
        }
    }

    /// Stage `gradients` into the global slots and apply one optimizer step.
    ///
    /// Callers must already be inside [`enter`](Self::enter); the method
    /// itself takes no lock so the discipline stays a caller decision.
    pub fn apply_gradients(&self, gradients: &[f32]) -> Result<(), SyncError> {
        self.store.stage_gradients(gradients)?;
        self.optimizer.step(&self.store);
        Ok(())
    }

    /// Overwrite `model`'s parameters with the current global values.
    pub fn pull_into<B: Backend, M: Module<B>>(&self, model: M) -> Result<M, SyncError> {
        load_params(model, &self.store.snapshot())
    }
}

/// Shared handle to a [`GlobalModel`].
pub type SharedGlobalModel = Arc<GlobalModel>;

/// Create a new shared global model from an initial module.
pub fn global_model<B: Backend, M: Module<B>>(
    model: &M,
    learning_rate: f32,
    betas: (f32, f32),
    discipline: SyncDiscipline,
) -> SharedGlobalModel {
    Arc::new(GlobalModel::from_model(model, learning_rate, betas, discipline))
}
