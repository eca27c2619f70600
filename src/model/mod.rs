//! Policy/value model abstraction and default network.

pub mod net;
pub mod policy_value;

pub use net::PolicyValueNet;
pub use policy_value::{
    actor_critic_loss, compute_gradients, select_action, value_estimate, value_estimates,
    PolicyValue, PolicyValueOutput,
};
