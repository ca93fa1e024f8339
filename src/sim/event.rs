use serde::Serialize;

use crate::control::Mode;
use crate::dynamics::{DipDynamics, PlantState};

// ---------------------------------------------------------------------------
// Simulation samples and events
// ---------------------------------------------------------------------------

/// One closed-loop tick: the state reached and the force that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    pub tick: u64,
    pub time: f64,
    pub state: PlantState,
    pub force: f64,
    pub mode: Mode,
    pub fault_count: u64,
}

/// Kinds of simulation events.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventKind {
    ModeChange { from: Mode, to: Mode },
    StabilityLost,
    Fault { total: u64 },
}

/// A discrete event that occurred during simulation.
#[derive(Debug, Clone, Serialize)]
pub struct SimEvent {
    pub tick: u64,
    pub time: f64,
    pub kind: EventKind,
    pub state: PlantState,
}

/// Trait for passive event detectors.
/// Implementations inspect consecutive samples and report events.
pub trait EventDetector {
    fn check(&mut self, prev: &Sample, current: &Sample) -> Option<EventKind>;
}

/// Reports every controller mode transition.
pub struct ModeChangeDetector;

impl EventDetector for ModeChangeDetector {
    fn check(&mut self, prev: &Sample, current: &Sample) -> Option<EventKind> {
        (prev.mode != current.mode).then_some(EventKind::ModeChange {
            from: prev.mode,
            to: current.mode,
        })
    }
}

/// Fires once, the first time either pole leaves the stable band.
#[derive(Default)]
pub struct StabilityDetector {
    fired: bool,
}

impl StabilityDetector {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventDetector for StabilityDetector {
    fn check(&mut self, prev: &Sample, current: &Sample) -> Option<EventKind> {
        if self.fired {
            return None;
        }
        if DipDynamics::is_stable(&prev.state) && !DipDynamics::is_stable(&current.state) {
            self.fired = true;
            Some(EventKind::StabilityLost)
        } else {
            None
        }
    }
}

/// Reports ticks on which the controller's fault counter moved.
pub struct FaultDetector;

impl EventDetector for FaultDetector {
    fn check(&mut self, prev: &Sample, current: &Sample) -> Option<EventKind> {
        (current.fault_count > prev.fault_count)
            .then_some(EventKind::Fault { total: current.fault_count })
    }
}

/// Detectors installed by the runner.
pub fn default_detectors() -> Vec<Box<dyn EventDetector>> {
    vec![
        Box::new(ModeChangeDetector),
        Box::new(StabilityDetector::new()),
        Box::new(FaultDetector),
    ]
}
