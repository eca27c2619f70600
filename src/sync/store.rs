//! Shared parameter region.
//!
//! The global parameters live in one flat region of `AtomicU32` cells, each
//! holding the bit pattern of an `f32`. A second region of the same length
//! holds the staged gradient for the next optimizer step. Every worker holds
//! an `Arc` to the same store; all mutation funnels through the
//! synchronization protocol.
//!
//! Under the lock-free discipline concurrent workers interleave their
//! element-wise reads and writes. Each cell is individually atomic, so the
//! interleaving is memory-safe; value-level mixing across cells is the
//! accepted asynchronous-SGD approximation.

use std::sync::atomic::{AtomicU32, Ordering};

use super::SyncError;

#[inline]
fn load_f32(cell: &AtomicU32) -> f32 {
    f32::from_bits(cell.load(Ordering::Relaxed))
}

#[inline]
fn store_f32(cell: &AtomicU32, value: f32) {
    cell.store(value.to_bits(), Ordering::Relaxed);
}

/// Flat shared storage for parameters and their staged gradients.
#[derive(Debug)]
pub struct ParameterStore {
    params: Vec<AtomicU32>,
    grads: Vec<AtomicU32>,
}

impl ParameterStore {
    /// Create a store seeded with `values`; gradient slots start at zero.
    pub fn from_flat(values: &[f32]) -> Self {
        Self {
            params: values.iter().map(|v| AtomicU32::new(v.to_bits())).collect(),
            grads: values.iter().map(|_| AtomicU32::new(0.0f32.to_bits())).collect(),
        }
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Copy the current parameter values out.
    pub fn snapshot(&self) -> Vec<f32> {
        self.params.iter().map(load_f32).collect()
    }

    /// Overwrite every parameter from `values`.
    pub fn overwrite(&self, values: &[f32]) -> Result<(), SyncError> {
        if values.len() != self.params.len() {
            return Err(SyncError::SizeMismatch {
                expected: self.params.len(),
                actual: values.len(),
            });
        }
        for (cell, value) in self.params.iter().zip(values.iter()) {
            store_f32(cell, *value);
        }
        Ok(())
    }

    /// Copy `gradients` into the staged-gradient slots.
    ///
    /// This is a copy, never an accumulation: whatever a previous worker
    /// staged is replaced wholesale.
    pub fn stage_gradients(&self, gradients: &[f32]) -> Result<(), SyncError> {
        if gradients.len() != self.grads.len() {
            return Err(SyncError::SizeMismatch {
                expected: self.grads.len(),
                actual: gradients.len(),
            });
        }
        for (cell, value) in self.grads.iter().zip(gradients.iter()) {
            store_f32(cell, *value);
        }
        Ok(())
    }

    pub(crate) fn param_at(&self, index: usize) -> f32 {
        load_f32(&self.params[index])
    }

    pub(crate) fn set_param_at(&self, index: usize, value: f32) {
        store_f32(&self.params[index], value);
    }

    pub(crate) fn grad_at(&self, index: usize) -> f32 {
        load_f32(&self.grads[index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_roundtrip_is_exact() {
        let values = vec![0.1f32, -2.5, 3.25e-7, f32::MIN_POSITIVE, 1234.5];
        let store = ParameterStore::from_flat(&values);

        // Bit-exact: the store holds raw f32 bit patterns.
        assert_eq!(store.snapshot(), values);
    }

    #[test]
    fn test_gradient_slots_start_zeroed() {
        let store = ParameterStore::from_flat(&[1.0, 2.0, 3.0]);
        for i in 0..store.len() {
            assert_eq!(store.grad_at(i), 0.0);
        }
    }

    #[test]
    fn test_stage_copies_not_accumulates() {
        let store = ParameterStore::from_flat(&[0.0; 4]);

        store.stage_gradients(&[1.0, 1.0, 1.0, 1.0]).unwrap();
        store.stage_gradients(&[0.5, 0.5, 0.5, 0.5]).unwrap();

        for i in 0..4 {
            assert_eq!(store.grad_at(i), 0.5);
        }
    }

    #[test]
    fn test_size_mismatch_rejected() {
        let store = ParameterStore::from_flat(&[0.0; 4]);

        let err = store.stage_gradients(&[1.0; 3]).unwrap_err();
        assert!(matches!(
            err,
            SyncError::SizeMismatch {
                expected: 4,
                actual: 3
            }
        ));
        assert!(store.overwrite(&[1.0; 5]).is_err());
    }

    #[test]
    fn test_overwrite_replaces_all_values() {
        let store = ParameterStore::from_flat(&[1.0, 2.0]);
        store.overwrite(&[-1.0, -2.0]).unwrap();
        assert_eq!(store.snapshot(), vec![-1.0, -2.0]);
    }
}
