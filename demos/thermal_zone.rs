//! Train a ventilation policy against a toy thermal-zone simulator.
//!
//! The simulator is a crude single-zone model: the zone exchanges heat with
//! the outdoors and with supply air, and the agent picks one of ten fan
//! levels per timestep. The reward trades occupant comfort (distance from
//! the temperature setpoint) against fan power.
//!
//! Run with: `cargo run --example thermal_zone`

use async_actor_critic::{
    Coordinator, Environment, EnvironmentError, Observation, PolicyValueNet, RewardTracking,
    SyncDiscipline, TrainerConfig,
};
use burn::backend::{Autodiff, NdArray};

type Backend = Autodiff<NdArray<f32>>;

const STATE_SIZE: usize = 4;
const ACTION_COUNT: usize = 10;

/// Ten-minute timesteps over one simulated day.
const EPISODE_STEPS: usize = 144;

/// Maximum fan mass flow in kg/s; actions scale linearly into this range.
const MAX_FLOW: f32 = 2.18;

const SETPOINT: f32 = 21.0;

struct ThermalZone {
    step: usize,
    zone_temp: f32,
    outdoor_temp: f32,
    fan_flow: f32,
    rng: fastrand::Rng,
}

impl ThermalZone {
    fn new(seed: u64) -> Self {
        Self {
            step: 0,
            zone_temp: 23.0,
            outdoor_temp: 5.0,
            fan_flow: 0.0,
            rng: fastrand::Rng::with_seed(seed),
        }
    }

    fn fan_power(&self) -> f32 {
        // Fan affinity: power grows with the cube of flow.
        3000.0 * (self.fan_flow / MAX_FLOW).powi(3)
    }
}

impl Environment for ThermalZone {
    fn state_size(&self) -> usize {
        STATE_SIZE
    }

    fn action_count(&self) -> usize {
        ACTION_COUNT
    }

    fn reset(&mut self) -> Result<(), EnvironmentError> {
        self.step = 0;
        self.zone_temp = 23.0 + self.rng.f32() * 2.0;
        self.outdoor_temp = 2.0 + self.rng.f32() * 6.0;
        self.fan_flow = 0.0;
        Ok(())
    }

    fn observe(&mut self) -> Result<Observation, EnvironmentError> {
        let state = vec![
            self.step as f32 / EPISODE_STEPS as f32,
            self.zone_temp,
            self.outdoor_temp,
            self.fan_flow,
        ];
        let comfort = (self.zone_temp - SETPOINT).abs() / 10.0;
        let power = self.fan_power() / 3000.0;
        let reward = -(comfort + 0.5 * power);
        Ok(Observation { state, reward })
    }

    fn actuate(&mut self, action: usize) -> Result<f32, EnvironmentError> {
        self.fan_flow = action as f32 * (MAX_FLOW / ACTION_COUNT as f32);
        Ok(self.fan_flow)
    }

    fn advance(&mut self) -> bool {
        // Internal gains warm the zone; ventilation pulls it toward the
        // (cool) supply air, conduction toward the outdoors.
        let gains = 0.35 + self.rng.f32() * 0.1;
        let ventilation = 0.12 * self.fan_flow * (14.0 - self.zone_temp);
        let conduction = 0.02 * (self.outdoor_temp - self.zone_temp);
        self.zone_temp += gains + ventilation + conduction;

        self.step += 1;
        self.step < EPISODE_STEPS
    }

    fn normalize_state(&self, state: &mut [f32]) {
        // time-of-day already in [0, 1]
        state[1] = (state[1] - 15.0) / 20.0;
        state[2] = (state[2] + 10.0) / 20.0;
        state[3] = state[3] / MAX_FLOW;
    }
}

fn main() {
    env_logger::init();

    let config = TrainerConfig::new()
        .with_workers(4)
        .with_total_episodes(200)
        .with_update_interval(5)
        .with_gamma(0.9)
        .with_discipline(SyncDiscipline::Exclusive)
        .with_reward_tracking(RewardTracking::Ema { decay: 0.99 })
        .with_seed(1);

    let device = Default::default();
    let model = PolicyValueNet::<Backend>::new(STATE_SIZE, ACTION_COUNT, 128, &device);

    let mut coordinator = Coordinator::<Backend, _>::new(config, device)
        .expect("configuration is valid");

    let report = coordinator.train(model, |worker_id| ThermalZone::new(1000 + worker_id as u64));

    println!(
        "finished {} episodes; best running reward {:.3}, final {:.3}",
        report.episodes_completed, report.best_running_reward, report.final_running_reward
    );
}
