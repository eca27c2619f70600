//! Policy/value model seam and the actor-critic loss.
//!
//! The trainer is generic over any [`PolicyValue`] module: a network that
//! maps a batch of states to policy logits and value estimates. Action
//! selection samples the categorical distribution (never argmax; exploration
//! depends on stochastic draws), and the loss combines
//! value regression with the log-probability policy-gradient term.

use burn::module::Module;
use burn::tensor::activation::{log_softmax, softmax};
use burn::tensor::backend::{AutodiffBackend, Backend};
use burn::tensor::{ElementConversion, Int, Tensor};

use crate::core::returns::{advantage_targets, discounted_returns, AdvantageMode, ReturnTargets};
use crate::core::trajectory::Trajectory;
use crate::sync::collect_gradients;

/// Output of one policy/value forward pass.
#[derive(Clone)]
pub struct PolicyValueOutput<B: Backend> {
    /// Unnormalized action log-probabilities `[batch, action_count]`.
    pub logits: Tensor<B, 2>,
    /// Value estimates `[batch, 1]`.
    pub values: Tensor<B, 2>,
}

/// A module producing policy logits and value estimates from states.
pub trait PolicyValue<B: Backend>: Module<B> + Clone + Send + 'static {
    /// Forward pass over a batch of states `[batch, state_size]`.
    fn forward(&self, states: Tensor<B, 2>) -> PolicyValueOutput<B>;

    /// Length of one state vector.
    fn state_size(&self) -> usize;

    /// Number of discrete actions.
    fn action_count(&self) -> usize;
}

/// Sample an action index from the categorical distribution over `state`.
pub fn select_action<B: Backend, M: PolicyValue<B>>(
    model: &M,
    state: &[f32],
    rng: &mut fastrand::Rng,
    device: &B::Device,
) -> u32 {
    let input = Tensor::<B, 1>::from_floats(state, device).reshape([1, state.len()]);
    let output = model.forward(input);
    let probs = softmax(output.logits, 1);
    let data = probs.to_data();
    let probs: &[f32] = data.as_slice().expect("policy probabilities are f32");
    sample_categorical(probs, rng.f32())
}

/// Categorical sampling by cumulative sum.
///
/// The last action absorbs any floating-point shortfall in the probability
/// mass, so a draw of ~1.0 still selects a valid index.
fn sample_categorical(probs: &[f32], draw: f32) -> u32 {
    let mut cumulative = 0.0f32;
    for (action, p) in probs.iter().enumerate() {
        cumulative += p;
        if draw < cumulative || action == probs.len() - 1 {
            return action as u32;
        }
    }
    0
}

/// Value estimate for a single state (bootstrap helper).
pub fn value_estimate<B: Backend, M: PolicyValue<B>>(
    model: &M,
    state: &[f32],
    device: &B::Device,
) -> f32 {
    let input = Tensor::<B, 1>::from_floats(state, device).reshape([1, state.len()]);
    let output = model.forward(input);
    let data = output.values.to_data();
    data.as_slice::<f32>().expect("value estimates are f32")[0]
}

/// Value estimates for every state in a trajectory, as plain data.
pub fn value_estimates<B: Backend, M: PolicyValue<B>>(
    model: &M,
    trajectory: &Trajectory,
    device: &B::Device,
) -> Vec<f32> {
    let n = trajectory.len();
    if n == 0 {
        return Vec::new();
    }
    let states = Tensor::<B, 1>::from_floats(trajectory.flattened_states().as_slice(), device)
        .reshape([n, model.state_size()]);
    let output = model.forward(states);
    output
        .values
        .to_data()
        .to_vec::<f32>()
        .expect("value estimates are f32")
}

/// Mean over the batch of (squared value error + policy-gradient term).
///
/// The targets are plain data tensors, so the advantage is a constant with
/// respect to the gradient: nothing flows through it into the value head.
/// A batch of one goes through the same reductions.
pub fn actor_critic_loss<B: Backend, M: PolicyValue<B>>(
    model: &M,
    trajectory: &Trajectory,
    targets: &ReturnTargets,
    device: &B::Device,
) -> Tensor<B, 1> {
    let n = trajectory.len();
    debug_assert!(n > 0, "loss over an empty trajectory");
    debug_assert_eq!(targets.value_targets.len(), n);

    let states = Tensor::<B, 1>::from_floats(trajectory.flattened_states().as_slice(), device)
        .reshape([n, model.state_size()]);
    let output = model.forward(states);

    let values: Tensor<B, 1> = output.values.flatten(0, 1);
    let log_probs = log_softmax(output.logits, 1);

    let indices: Vec<i32> = trajectory.actions().iter().map(|&a| a as i32).collect();
    let actions: Tensor<B, 2, Int> =
        Tensor::<B, 1, Int>::from_ints(indices.as_slice(), device).reshape([n, 1]);
    let taken_log_probs: Tensor<B, 1> = log_probs.gather(1, actions).flatten(0, 1);

    let value_targets = Tensor::<B, 1>::from_floats(targets.value_targets.as_slice(), device);
    let advantages = Tensor::<B, 1>::from_floats(targets.advantages.as_slice(), device);

    let value_loss = (value_targets - values).powf_scalar(2.0);
    let policy_loss = -(taken_log_probs * advantages);
    (value_loss + policy_loss).mean()
}

/// Full local gradient computation for one synchronization.
///
/// Builds returns with the given bootstrap, forms advantage targets in the
/// configured mode, runs the backward pass, and flattens the gradients in
/// parameter traversal order. Returns the flat gradients and the scalar loss.
pub fn compute_gradients<B: AutodiffBackend, M: PolicyValue<B>>(
    model: &M,
    trajectory: &Trajectory,
    gamma: f32,
    bootstrap: f32,
    mode: AdvantageMode,
    device: &B::Device,
) -> (Vec<f32>, f32) {
    let returns = discounted_returns(&trajectory.rewards(), gamma, bootstrap);
    let values = value_estimates(model, trajectory, device);
    let targets = advantage_targets(returns, &values, mode);

    let loss = actor_critic_loss(model, trajectory, &targets, device);
    let loss_value: f32 = loss.clone().into_scalar().elem();

    let grads = loss.backward();
    (collect_gradients(model, &grads), loss_value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::trajectory::Sample;
    use crate::model::net::PolicyValueNet;
    use crate::sync::flatten_params;
    use burn::backend::{Autodiff, NdArray};

    type TestBackend = Autodiff<NdArray<f32>>;

    fn trajectory(steps: usize, state_size: usize) -> Trajectory {
        let mut t = Trajectory::new();
        for i in 0..steps {
            t.push(Sample {
                state: (0..state_size).map(|j| (i + j) as f32 * 0.1).collect(),
                action: (i % 2) as u32,
                reward: 1.0,
            });
        }
        t
    }

    #[test]
    fn test_select_action_in_range_and_stochastic() {
        let device = Default::default();
        let model = PolicyValueNet::<TestBackend>::new(3, 4, 16, &device);
        let mut rng = fastrand::Rng::with_seed(7);

        let mut seen = std::collections::HashSet::new();
        for _ in 0..64 {
            let action = select_action(&model, &[0.1, 0.2, 0.3], &mut rng, &device);
            assert!(action < 4);
            seen.insert(action);
        }
        // A near-uniform fresh network must not collapse to a single action.
        assert!(seen.len() > 1, "sampling degenerated to argmax");
    }

    #[test]
    fn test_sample_categorical_mass_shortfall() {
        // Draw beyond the accumulated mass still yields a valid index.
        assert_eq!(sample_categorical(&[0.3, 0.3, 0.3], 0.999), 2);
        assert_eq!(sample_categorical(&[1.0, 0.0], 0.5), 0);
    }

    #[test]
    fn test_loss_single_sample_batch() {
        let device = Default::default();
        let model = PolicyValueNet::<TestBackend>::new(2, 3, 8, &device);
        let t = trajectory(1, 2);
        let values = value_estimates(&model, &t, &device);
        let targets = advantage_targets(
            discounted_returns(&t.rewards(), 0.9, 0.0),
            &values,
            AdvantageMode::TemporalDifference,
        );

        let loss = actor_critic_loss(&model, &t, &targets, &device);
        let loss: f32 = loss.into_scalar().elem();
        assert!(loss.is_finite());
    }

    #[test]
    fn test_compute_gradients_shape_and_signal() {
        let device = Default::default();
        let model = PolicyValueNet::<TestBackend>::new(2, 3, 8, &device);
        let t = trajectory(5, 2);

        let (grads, loss) = compute_gradients(
            &model,
            &t,
            0.9,
            0.0,
            AdvantageMode::TemporalDifference,
            &device,
        );

        assert_eq!(grads.len(), flatten_params(&model).len());
        assert!(loss.is_finite());
        assert!(grads.iter().any(|g| g.abs() > 0.0));
    }

    #[test]
    fn test_value_estimates_length() {
        let device = Default::default();
        let model = PolicyValueNet::<TestBackend>::new(2, 3, 8, &device);
        let t = trajectory(4, 2);
        assert_eq!(value_estimates(&model, &t, &device).len(), 4);
        assert!(value_estimates(&model, &Trajectory::new(), &device).is_empty());
    }
}
