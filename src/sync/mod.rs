//! Shared-model synchronization: parameter store, shared optimizer, and the
//! push-gradients / apply-step / pull-weights protocol.

pub mod adam;
pub mod flatten;
pub mod global;
pub mod store;

pub use adam::SharedAdam;
pub use flatten::{collect_gradients, flatten_params, load_params};
pub use global::{global_model, GlobalModel, SharedGlobalModel, SyncDiscipline, SyncGuard};
pub use store::ParameterStore;

use std::fmt;

/// Errors raised while pushing gradients or pulling parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// A flat buffer's length did not match the shared region.
    SizeMismatch {
        /// Length the region expects.
        expected: usize,
        /// Length that was supplied.
        actual: usize,
    },
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::SizeMismatch { expected, actual } => write!(
                f,
                "parameter region size mismatch: expected {} values, got {}",
                expected, actual
            ),
        }
    }
}

impl std::error::Error for SyncError {}
