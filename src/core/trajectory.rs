//! Per-worker trajectory storage.
//!
//! A trajectory is the ordered sequence of (state, action, reward) samples a
//! worker observed since its last synchronization point. It is owned by
//! exactly one worker and cleared after every push/pull cycle, so it never
//! grows beyond one update interval (or one episode, whichever ends first).

/// One observed step: the state the action was chosen in, the discrete
/// action index, and the reward reported for the step.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Observed state vector (already normalized by the environment hook).
    pub state: Vec<f32>,
    /// Discrete action index in `[0, action_count)`.
    pub action: u32,
    /// Scalar reward.
    pub reward: f32,
}

/// Ordered, insertion-significant sample buffer.
///
/// Reward discounting runs backward over this sequence, so ordering matters.
#[derive(Debug, Clone, Default)]
pub struct Trajectory {
    samples: Vec<Sample>,
}

impl Trajectory {
    /// Create an empty trajectory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty trajectory with reserved capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity),
        }
    }

    /// Append a sample.
    pub fn push(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    /// Number of stored samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the buffer holds no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Drop all samples, keeping the allocation.
    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Stored samples in insertion order.
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Rewards in insertion order.
    pub fn rewards(&self) -> Vec<f32> {
        self.samples.iter().map(|s| s.reward).collect()
    }

    /// Action indices in insertion order.
    pub fn actions(&self) -> Vec<u32> {
        self.samples.iter().map(|s| s.action).collect()
    }

    /// States flattened into one row-major buffer `[len * state_size]`.
    pub fn flattened_states(&self) -> Vec<f32> {
        let state_size = self.samples.first().map_or(0, |s| s.state.len());
        let mut out = Vec::with_capacity(self.samples.len() * state_size);
        for sample in &self.samples {
            out.extend_from_slice(&sample.state);
        }
        out
    }

    /// Sum of all rewards in the buffer.
    pub fn total_reward(&self) -> f32 {
        self.samples.iter().map(|s| s.reward).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(action: u32, reward: f32) -> Sample {
        Sample {
            state: vec![0.1, 0.2],
            action,
            reward,
        }
    }

    #[test]
    fn test_push_and_accessors() {
        let mut trajectory = Trajectory::new();
        assert!(trajectory.is_empty());

        trajectory.push(sample(1, 0.5));
        trajectory.push(sample(3, -0.25));

        assert_eq!(trajectory.len(), 2);
        assert_eq!(trajectory.actions(), vec![1, 3]);
        assert_eq!(trajectory.rewards(), vec![0.5, -0.25]);
        assert_eq!(
            trajectory.flattened_states(),
            vec![0.1, 0.2, 0.1, 0.2]
        );
        assert!((trajectory.total_reward() - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_clear_resets_without_dropping_capacity() {
        let mut trajectory = Trajectory::with_capacity(8);
        for i in 0..5 {
            trajectory.push(sample(i, 1.0));
        }
        trajectory.clear();

        assert!(trajectory.is_empty());
        assert_eq!(trajectory.flattened_states(), Vec::<f32>::new());
    }

    #[test]
    fn test_insertion_order_preserved() {
        let mut trajectory = Trajectory::new();
        for i in 0..4 {
            trajectory.push(sample(i, i as f32));
        }
        let actions = trajectory.actions();
        assert_eq!(actions, vec![0, 1, 2, 3]);
    }
}
