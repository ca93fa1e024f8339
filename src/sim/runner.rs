use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::control::{BulletproofController, Controller, Mode};
use crate::dynamics::{DipDynamics, PlantState};
use crate::error::DynamicsError;

use super::event::{default_detectors, EventKind, Sample, SimEvent};
use super::integrator::{advance, Integration};

// ---------------------------------------------------------------------------
// Run configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub steps: usize,
    pub initial_state: PlantState,
    pub integration: Integration,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            steps: 1000,
            initial_state: PlantState::new(0.0, 0.05, -0.03, 0.0, 0.0, 0.0),
            integration: Integration::Euler,
        }
    }
}

/// Result of one closed-loop run. `samples[0]` is the initial state.
#[derive(Debug, Clone)]
pub struct SimRun {
    pub controller: String,
    pub samples: Vec<Sample>,
    pub events: Vec<SimEvent>,
    /// Set when the plant refused to advance and the run stopped early.
    pub halted: Option<DynamicsError>,
}

impl SimRun {
    pub fn final_sample(&self) -> Option<&Sample> {
        self.samples.last()
    }

    pub fn stayed_stable(&self) -> bool {
        self.halted.is_none() && self.samples.iter().all(|s| DipDynamics::is_stable(&s.state))
    }
}

// ---------------------------------------------------------------------------
// Closed loop
// ---------------------------------------------------------------------------

/// Run the plant in closed loop with a custom controller.
/// The controller sees each state as a raw six-element frame.
pub fn simulate_with(
    dynamics: &DipDynamics,
    config: &SimConfig,
    controller: &mut dyn Controller,
) -> SimRun {
    let dt = dynamics.interval().seconds();
    let mut detectors = default_detectors();

    let mut state = config.initial_state;
    let mut samples = Vec::with_capacity(config.steps.min(1_000_000) + 1);
    let mut events = Vec::new();
    let mut halted = None;

    info!(
        "run start: controller={} steps={} dt={}s integration={:?}",
        controller.name(),
        config.steps,
        dt,
        config.integration
    );

    samples.push(Sample {
        tick: 0,
        time: 0.0,
        state,
        force: 0.0,
        mode: Mode::Normal,
        fault_count: 0,
    });

    for k in 1..=config.steps {
        let force = controller.control(&state.to_array());

        state = match advance(dynamics, config.integration, &state, force) {
            Ok(next) => next,
            Err(e) => {
                warn!("tick {k}: plant refused to advance: {e}");
                halted = Some(e);
                break;
            }
        };

        let sample = Sample {
            tick: k as u64,
            time: k as f64 * dt,
            state,
            force,
            mode: controller.mode(),
            fault_count: controller.fault_count(),
        };

        let prev = samples.last().copied().unwrap_or(sample);
        for det in detectors.iter_mut() {
            if let Some(kind) = det.check(&prev, &sample) {
                if kind == EventKind::StabilityLost {
                    warn!(
                        "tick {k}: stability lost (theta1={:.3}, theta2={:.3})",
                        state.theta1, state.theta2
                    );
                }
                events.push(SimEvent { tick: sample.tick, time: sample.time, kind, state });
            }
        }
        samples.push(sample);
    }

    info!(
        "run end: {} samples, {} events, faults={}",
        samples.len(),
        events.len(),
        controller.fault_count()
    );

    SimRun { controller: controller.name().to_string(), samples, events, halted }
}

/// Simulate with the default bulletproof controller (convenience wrapper).
pub fn simulate(dynamics: &DipDynamics, config: &SimConfig) -> SimRun {
    let mut controller = BulletproofController::with_interval(dynamics.interval());
    simulate_with(dynamics, config, &mut controller)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
