pub mod integrator;
pub mod runner;
pub mod event;

pub use event::{EventDetector, EventKind, Sample, SimEvent};
pub use integrator::{advance, rk4_step, Integration};
pub use runner::{simulate, simulate_with, SimConfig, SimRun};
