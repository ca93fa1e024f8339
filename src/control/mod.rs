pub mod params;
pub mod pid;
pub mod safety;
pub mod mode;
pub mod laws;
pub mod monitor;
pub mod controller;
pub mod bulletproof;
pub mod shared;

pub use bulletproof::{BulletproofController, ControllerState, ControllerStatus};
pub use controller::Controller;
pub use mode::Mode;
pub use monitor::FaultRecord;
pub use params::{ControllerParameters, GainTriple, NormalLaw};
pub use pid::Pid;
pub use safety::SaturationCounters;
pub use shared::SharedController;
