//! Default policy/value network.

use burn::module::Module;
use burn::nn::{Linear, LinearConfig};
use burn::tensor::activation::tanh;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use super::policy_value::{PolicyValue, PolicyValueOutput};

/// Two-head MLP: a policy head and a value head, each with one hidden layer
/// and tanh activation.
///
/// The layer shapes are construction parameters; the trainer itself never
/// assumes a particular architecture.
#[derive(Module, Debug)]
pub struct PolicyValueNet<B: Backend> {
    pi1: Linear<B>,
    pi2: Linear<B>,
    v1: Linear<B>,
    v2: Linear<B>,
    #[module(skip)]
    state_size: usize,
    #[module(skip)]
    action_count: usize,
}

impl<B: Backend> PolicyValueNet<B> {
    /// Create a network for `state_size` inputs and `action_count` outputs.
    pub fn new(
        state_size: usize,
        action_count: usize,
        hidden_size: usize,
        device: &B::Device,
    ) -> Self {
        Self {
            pi1: LinearConfig::new(state_size, hidden_size).init(device),
            pi2: LinearConfig::new(hidden_size, action_count).init(device),
            v1: LinearConfig::new(state_size, hidden_size).init(device),
            v2: LinearConfig::new(hidden_size, 1).init(device),
            state_size,
            action_count,
        }
    }
}

impl<B: Backend> PolicyValue<B> for PolicyValueNet<B> {
    fn forward(&self, states: Tensor<B, 2>) -> PolicyValueOutput<B> {
        let logits = self.pi2.forward(tanh(self.pi1.forward(states.clone())));
        let values = self.v2.forward(tanh(self.v1.forward(states)));
        PolicyValueOutput { logits, values }
    }

    fn state_size(&self) -> usize {
        self.state_size
    }

    fn action_count(&self) -> usize {
        self.action_count
    }
}
