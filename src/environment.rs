//! Environment capability interface.
//!
//! The trainer drives an external stateful simulator through a narrow,
//! synchronous contract: observe the current timestep, actuate the chosen
//! action, advance the simulation. Implementations wrap whatever simulator
//! they like; tests substitute scripted doubles.

use std::fmt;

/// One observation: the state vector and the reward for the current timestep.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    /// Fixed-length numeric state vector.
    pub state: Vec<f32>,
    /// Scalar reward for the current timestep.
    pub reward: f32,
}

/// Errors an environment may report for a single timestep.
///
/// These are per-step conditions: the worker skips the affected sample and
/// continues the episode.
#[derive(Debug, Clone, PartialEq)]
pub enum EnvironmentError {
    /// The simulator reported data from a timestep that is not current.
    StaleTimestamp,
    /// An observed quantity fell outside its physical bounds.
    OutOfRange {
        /// Index of the offending state component.
        index: usize,
        /// The observed value.
        value: f32,
    },
    /// Any other per-step failure.
    Failed(String),
}

impl fmt::Display for EnvironmentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvironmentError::StaleTimestamp => write!(f, "observation has a stale timestamp"),
            EnvironmentError::OutOfRange { index, value } => {
                write!(f, "state component {} out of range: {}", index, value)
            }
            EnvironmentError::Failed(msg) => write!(f, "environment failure: {}", msg),
        }
    }
}

impl std::error::Error for EnvironmentError {}

/// Synchronous simulation interface polled once per timestep.
///
/// The per-timestep order is: [`observe`](Self::observe) →
/// [`actuate`](Self::actuate) → [`advance`](Self::advance). `observe` must be
/// idempotent between advances: calling it twice without an intervening
/// timestep returns the same reward both times.
pub trait Environment: Send {
    /// Length of the state vector.
    fn state_size(&self) -> usize;

    /// Number of discrete actions.
    fn action_count(&self) -> usize;

    /// Reset to the start of a fresh episode.
    fn reset(&mut self) -> Result<(), EnvironmentError>;

    /// Observe the current timestep.
    fn observe(&mut self) -> Result<Observation, EnvironmentError>;

    /// Apply a discrete action, returning the continuous control signal it
    /// was mapped to (e.g. a linear scaling into an actuation range).
    fn actuate(&mut self, action: usize) -> Result<f32, EnvironmentError>;

    /// Run one simulation timestep. Returns `false` once the episode has
    /// reached its terminal state.
    fn advance(&mut self) -> bool;

    /// Normalize a raw state vector in place.
    ///
    /// Physical bounds belong to the simulator, not the trainer; the default
    /// passes states through untouched.
    fn normalize_state(&self, _state: &mut [f32]) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal scripted environment used to pin down the contract itself.
    struct Scripted {
        step: usize,
        len: usize,
        actuated: Vec<usize>,
    }

    impl Environment for Scripted {
        fn state_size(&self) -> usize {
            2
        }

        fn action_count(&self) -> usize {
            3
        }

        fn reset(&mut self) -> Result<(), EnvironmentError> {
            self.step = 0;
            self.actuated.clear();
            Ok(())
        }

        fn observe(&mut self) -> Result<Observation, EnvironmentError> {
            Ok(Observation {
                state: vec![self.step as f32, 0.5],
                reward: self.step as f32 * 0.1,
            })
        }

        fn actuate(&mut self, action: usize) -> Result<f32, EnvironmentError> {
            self.actuated.push(action);
            Ok(action as f32 / self.action_count() as f32)
        }

        fn advance(&mut self) -> bool {
            self.step += 1;
            self.step < self.len
        }

        fn normalize_state(&self, state: &mut [f32]) {
            for v in state.iter_mut() {
                *v /= self.len as f32;
            }
        }
    }

    #[test]
    fn test_observe_is_idempotent_between_advances() {
        let mut env = Scripted {
            step: 3,
            len: 10,
            actuated: Vec::new(),
        };

        let first = env.observe().unwrap();
        let second = env.observe().unwrap();
        assert_eq!(first.reward, second.reward);
        assert_eq!(first.state, second.state);

        env.advance();
        let third = env.observe().unwrap();
        assert!(third.reward > first.reward);
    }

    #[test]
    fn test_actuate_reports_control_signal() {
        let mut env = Scripted {
            step: 0,
            len: 4,
            actuated: Vec::new(),
        };
        let signal = env.actuate(2).unwrap();
        assert!((signal - 2.0 / 3.0).abs() < 1e-6);
        assert_eq!(env.actuated, vec![2]);
    }

    #[test]
    fn test_normalize_hook_applies_bounds() {
        let env = Scripted {
            step: 0,
            len: 10,
            actuated: Vec::new(),
        };
        let mut state = vec![5.0, 10.0];
        env.normalize_state(&mut state);
        assert_eq!(state, vec![0.5, 1.0]);
    }
}
