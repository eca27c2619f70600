//! Discounted returns and advantage targets.
//!
//! Returns are computed backward over a trajectory:
//!
//! ```text
//! R_t = r_t + γ * R_{t+1}
//! ```
//!
//! seeded with a bootstrap value: zero when the trajectory ends at a terminal
//! state, otherwise the local model's value estimate for the final observed
//! state. Advantages are `R_t - V(s_t)` against the current local value head
//! and are always plain data: gradients never flow through them.

use serde::{Deserialize, Serialize};

/// How advantages are derived from the return sequence.
///
/// Both are legitimate policy configurations; they correspond to the two
/// update styles this trainer supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdvantageMode {
    /// Temporal-difference advantage on raw discounted returns (A3C style).
    TemporalDifference,
    /// Full-episode returns normalized to zero mean / unit std before the
    /// advantage is formed (A2C style).
    NormalizedReturn,
}

/// Per-step targets fed into the actor-critic loss.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnTargets {
    /// Regression target for the value head, one per step.
    pub value_targets: Vec<f32>,
    /// Policy-gradient weight, one per step. Constant with respect to the
    /// gradient by construction.
    pub advantages: Vec<f32>,
}

/// Compute discounted returns backward over `rewards`.
///
/// `R_{L-1} = r_{L-1} + gamma * bootstrap`, then
/// `R_t = r_t + gamma * R_{t+1}` for all earlier steps.
pub fn discounted_returns(rewards: &[f32], gamma: f32, bootstrap: f32) -> Vec<f32> {
    let mut returns = vec![0.0f32; rewards.len()];
    let mut running = bootstrap;
    for t in (0..rewards.len()).rev() {
        running = rewards[t] + gamma * running;
        returns[t] = running;
    }
    returns
}

/// Normalize to zero mean and unit standard deviation, in place.
///
/// # Edge Cases
///
/// - Empty slice: no-op
/// - Single element: sets to 0.0 (no meaningful variance)
/// - All equal values: sets all to 0.0 (epsilon prevents NaN)
pub fn normalize(values: &mut [f32]) {
    if values.is_empty() {
        return;
    }
    if values.len() == 1 {
        values[0] = 0.0;
        return;
    }

    let n = values.len() as f32;
    let mean = values.iter().sum::<f32>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n;
    let std = (variance + 1e-8).sqrt();

    for v in values.iter_mut() {
        *v = (*v - mean) / std;
    }
}

/// Turn a return sequence and value estimates into loss targets.
///
/// In [`AdvantageMode::NormalizedReturn`] the return sequence is normalized
/// first and also serves as the value-regression target, matching the
/// episodic update style.
pub fn advantage_targets(
    mut returns: Vec<f32>,
    values: &[f32],
    mode: AdvantageMode,
) -> ReturnTargets {
    debug_assert_eq!(returns.len(), values.len());

    if mode == AdvantageMode::NormalizedReturn {
        normalize(&mut returns);
    }

    let advantages = returns
        .iter()
        .zip(values.iter())
        .map(|(r, v)| r - v)
        .collect();

    ReturnTargets {
        value_targets: returns,
        advantages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_returns_recurrence() {
        let rewards = vec![0.5, -1.0, 2.0, 0.25];
        let gamma = 0.97;
        let bootstrap = 1.5;

        let returns = discounted_returns(&rewards, gamma, bootstrap);

        assert_eq!(returns.len(), 4);
        assert!((returns[3] - (rewards[3] + gamma * bootstrap)).abs() < 1e-6);
        for t in 0..3 {
            assert!(
                (returns[t] - (rewards[t] + gamma * returns[t + 1])).abs() < 1e-6,
                "recurrence broken at t={}",
                t
            );
        }
    }

    #[test]
    fn test_returns_unit_rewards() {
        // Four unit rewards, gamma 0.9, zero bootstrap.
        let returns = discounted_returns(&[1.0, 1.0, 1.0, 1.0], 0.9, 0.0);
        let expected = [3.439, 2.71, 1.9, 1.0];
        for (r, e) in returns.iter().zip(expected.iter()) {
            assert!((r - e).abs() < 1e-4, "expected {}, got {}", e, r);
        }
    }

    #[test]
    fn test_returns_empty() {
        assert!(discounted_returns(&[], 0.99, 0.5).is_empty());
    }

    #[test]
    fn test_normalize_mean_and_std() {
        let mut values = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        normalize(&mut values);

        let mean: f32 = values.iter().sum::<f32>() / values.len() as f32;
        let std: f32 = (values.iter().map(|v| v.powi(2)).sum::<f32>() / values.len() as f32).sqrt();
        assert!(mean.abs() < 1e-6);
        assert!((std - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_normalize_single_element() {
        let mut values = vec![7.0];
        normalize(&mut values);
        assert_eq!(values, vec![0.0]);
    }

    #[test]
    fn test_normalize_constant_sequence() {
        let mut values = vec![3.0, 3.0, 3.0];
        normalize(&mut values);
        for v in values {
            assert!(v.abs() < 1e-3);
        }
    }

    #[test]
    fn test_td_advantages() {
        let returns = vec![2.0, 1.0];
        let values = vec![0.5, 0.25];
        let targets = advantage_targets(returns.clone(), &values, AdvantageMode::TemporalDifference);

        assert_eq!(targets.value_targets, returns);
        assert_eq!(targets.advantages, vec![1.5, 0.75]);
    }

    #[test]
    fn test_normalized_return_advantages() {
        let returns = vec![1.0, 2.0, 3.0];
        let values = vec![0.0, 0.0, 0.0];
        let targets = advantage_targets(returns, &values, AdvantageMode::NormalizedReturn);

        // Targets are normalized; advantages equal them since V = 0.
        let mean: f32 =
            targets.value_targets.iter().sum::<f32>() / targets.value_targets.len() as f32;
        assert!(mean.abs() < 1e-6);
        assert_eq!(targets.value_targets, targets.advantages);
    }

    #[test]
    fn test_single_sample_batch_does_not_error() {
        let targets = advantage_targets(vec![4.0], &[1.0], AdvantageMode::NormalizedReturn);
        assert_eq!(targets.value_targets, vec![0.0]);
        assert_eq!(targets.advantages, vec![-1.0]);
    }
}
