//! Fault-tolerant control core for a cart-mounted double inverted pendulum:
//! a numerically safe plant model, a mode-switching controller that never
//! emits a non-finite or out-of-range force, and a closed-loop harness.

pub mod error;
pub mod dynamics;
pub mod control;
pub mod config;
pub mod sim;
pub mod io;

pub use config::DipConfig;
pub use control::{BulletproofController, Controller, ControllerParameters, Mode};
pub use dynamics::{DipDynamics, PlantParameters, PlantState, SampleInterval};
pub use error::{ConfigError, ControlFault, DynamicsError, InvalidInputError};
