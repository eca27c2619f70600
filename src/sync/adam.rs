//! Adam with shared moment estimates.
//!
//! The optimizer statistics (first/second moments and the step counter) live
//! in the same kind of shared region as the parameters, one cell per
//! parameter, so every worker advances the same optimizer. The statistics are
//! mutated only inside a synchronization step.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use super::store::ParameterStore;

/// Adam optimizer over a [`ParameterStore`], with shared moments.
///
/// Defaults: learning rate `1e-4`, betas `(0.92, 0.999)`, epsilon `1e-8`.
/// The low first-moment decay suits the short, noisy pushes asynchronous
/// workers produce.
#[derive(Debug)]
pub struct SharedAdam {
    learning_rate: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    first_moment: Vec<AtomicU32>,
    second_moment: Vec<AtomicU32>,
    steps: AtomicU64,
}

impl SharedAdam {
    /// Default learning rate.
    pub const DEFAULT_LEARNING_RATE: f32 = 1e-4;
    /// Default (beta1, beta2).
    pub const DEFAULT_BETAS: (f32, f32) = (0.92, 0.999);

    /// Create an optimizer for `len` parameters.
    pub fn new(len: usize, learning_rate: f32, betas: (f32, f32)) -> Self {
        let zero = || (0..len).map(|_| AtomicU32::new(0.0f32.to_bits())).collect();
        Self {
            learning_rate,
            beta1: betas.0,
            beta2: betas.1,
            epsilon: 1e-8,
            first_moment: zero(),
            second_moment: zero(),
            steps: AtomicU64::new(0),
        }
    }

    /// Number of optimizer steps applied so far.
    pub fn steps(&self) -> u64 {
        self.steps.load(Ordering::SeqCst)
    }

    /// Configured learning rate.
    pub fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    /// Apply one Adam step to `store` using its staged gradients.
    ///
    /// The caller is responsible for the concurrency discipline: under the
    /// exclusive discipline this runs inside the global critical section;
    /// under the lock-free discipline concurrent steps interleave per cell.
    pub fn step(&self, store: &ParameterStore) {
        debug_assert_eq!(store.len(), self.first_moment.len());

        let t = self.steps.fetch_add(1, Ordering::SeqCst) + 1;
        let bias1 = 1.0 - self.beta1.powi(t.min(i32::MAX as u64) as i32);
        let bias2 = 1.0 - self.beta2.powi(t.min(i32::MAX as u64) as i32);

        for i in 0..store.len() {
            let grad = store.grad_at(i);

            let m = self.beta1 * load(&self.first_moment[i]) + (1.0 - self.beta1) * grad;
            let v = self.beta2 * load(&self.second_moment[i]) + (1.0 - self.beta2) * grad * grad;
            put(&self.first_moment[i], m);
            put(&self.second_moment[i], v);

            let m_hat = m / bias1;
            let v_hat = v / bias2;
            let update = self.learning_rate * m_hat / (v_hat.sqrt() + self.epsilon);
            store.set_param_at(i, store.param_at(i) - update);
        }
    }
}

#[inline]
fn load(cell: &AtomicU32) -> f32 {
    f32::from_bits(cell.load(Ordering::Relaxed))
}

#[inline]
fn put(cell: &AtomicU32, value: f32) {
    cell.store(value.to_bits(), Ordering::Relaxed);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_step_matches_closed_form() {
        let store = ParameterStore::from_flat(&[1.0]);
        let optimizer = SharedAdam::new(1, 0.1, (0.9, 0.999));

        store.stage_gradients(&[2.0]).unwrap();
        optimizer.step(&store);

        // After bias correction the first step is lr * g / (|g| + eps).
        let expected = 1.0 - 0.1 * 2.0 / (2.0 + 1e-8);
        let actual = store.snapshot()[0];
        assert!((actual - expected).abs() < 1e-5, "got {}", actual);
        assert_eq!(optimizer.steps(), 1);
    }

    #[test]
    fn test_moments_persist_across_steps() {
        let store = ParameterStore::from_flat(&[0.0]);
        let optimizer = SharedAdam::new(1, 0.01, (0.9, 0.999));

        store.stage_gradients(&[1.0]).unwrap();
        optimizer.step(&store);
        let after_one = store.snapshot()[0];

        // Same gradient again: the moment estimates have warmed up, so the
        // parameter keeps moving in the same direction.
        optimizer.step(&store);
        let after_two = store.snapshot()[0];

        assert!(after_one < 0.0);
        assert!(after_two < after_one);
        assert_eq!(optimizer.steps(), 2);
    }

    #[test]
    fn test_zero_gradient_is_a_fixed_point_initially() {
        let store = ParameterStore::from_flat(&[3.5, -2.0]);
        let optimizer = SharedAdam::new(2, 0.1, SharedAdam::DEFAULT_BETAS);

        optimizer.step(&store); // staged gradients are still zero

        let snapshot = store.snapshot();
        assert!((snapshot[0] - 3.5).abs() < 1e-6);
        assert!((snapshot[1] - -2.0).abs() < 1e-6);
    }
}
