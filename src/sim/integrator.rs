use serde::{Deserialize, Serialize};

use crate::dynamics::{DipDynamics, PlantState};
use crate::error::DynamicsError;

// ---------------------------------------------------------------------------
// Integration schemes (constant force over the step)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Integration {
    /// The model's own forward-Euler step.
    #[default]
    Euler,
    /// Classical RK4 over the derivative form.
    Rk4,
}

/// Single RK4 step with constant force over the model's interval.
pub fn rk4_step(dynamics: &DipDynamics, state: &PlantState, force: f64) -> PlantState {
    let dt = dynamics.interval().seconds();
    let s = DipDynamics::condition(state);

    let k1 = dynamics.derivatives(&s, force);
    let k2 = dynamics.derivatives(&s.apply(&k1, dt * 0.5), force);
    let k3 = dynamics.derivatives(&s.apply(&k2, dt * 0.5), force);
    let k4 = dynamics.derivatives(&s.apply(&k3, dt), force);

    let next = s.to_vector() + (k1 + k2 * 2.0 + k3 * 2.0 + k4) * (dt / 6.0);
    PlantState::from_vector(&next).wrapped()
}

/// Advance one tick with the chosen scheme, refusing non-finite input.
pub fn advance(
    dynamics: &DipDynamics,
    scheme: Integration,
    state: &PlantState,
    force: f64,
) -> Result<PlantState, DynamicsError> {
    match scheme {
        Integration::Euler => dynamics.try_step(state, force),
        Integration::Rk4 => {
            if !force.is_finite() {
                return Err(DynamicsError::NonFiniteForce(force));
            }
            if let Some(index) = state.first_non_finite() {
                return Err(DynamicsError::NonFiniteState { index });
            }
            Ok(rk4_step(dynamics, state, force))
        }
    }
}
