pub mod state;
pub mod pendulum;

pub use pendulum::{DipDynamics, PlantParameters};
pub use state::{wrap_angle, PlantState, SampleInterval, StateDot, DEFAULT_SAMPLE_INTERVAL, STATE_DIM};
