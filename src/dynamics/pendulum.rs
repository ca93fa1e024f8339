use nalgebra::Vector6;
use serde::{Deserialize, Serialize};

use super::state::{wrap_angle, PlantState, SampleInterval, StateDot, STANDARD_GRAVITY};
use crate::error::{require_positive, ConfigResult, DynamicsError};

// ---------------------------------------------------------------------------
// Numerical-safety envelope of the plant (wider than the controller's)
// ---------------------------------------------------------------------------

pub const MAX_CART_POSITION: f64 = 10.0;     // m
pub const MAX_CART_VELOCITY: f64 = 20.0;     // m/s
pub const MAX_ANGULAR_VELOCITY: f64 = 50.0;  // rad/s

const CART_DAMPING: f64 = 0.05;
const CART_RESTORING: f64 = 0.1;
const POLE_COUPLING: f64 = 0.05;
const SMALL_ANGLE: f64 = 0.5;   // rad, edge of the linearised gravity region
const STABLE_ANGLE: f64 = 0.5;  // rad, is_stable() bound

// ---------------------------------------------------------------------------
// Physical parameters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlantParameters {
    pub cart_mass: f64,   // kg
    pub pole1_mass: f64,  // kg
    pub pole2_mass: f64,  // kg
    pub pole1_length: f64, // m
    pub pole2_length: f64, // m
    pub gravity: f64,     // m/s^2
    pub damping: f64,     // 1/s, angular velocity damping
}

impl Default for PlantParameters {
    fn default() -> Self {
        Self {
            cart_mass: 1.0,
            pole1_mass: 0.1,
            pole2_mass: 0.1,
            pole1_length: 0.5,
            pole2_length: 0.5,
            gravity: STANDARD_GRAVITY,
            damping: 0.1,
        }
    }
}

impl PlantParameters {
    pub fn total_mass(&self) -> f64 {
        self.cart_mass + self.pole1_mass + self.pole2_mass
    }

    pub fn validate(&self) -> ConfigResult<()> {
        require_positive("plant.cart_mass", self.cart_mass)?;
        require_positive("plant.pole1_mass", self.pole1_mass)?;
        require_positive("plant.pole2_mass", self.pole2_mass)?;
        require_positive("plant.pole1_length", self.pole1_length)?;
        require_positive("plant.pole2_length", self.pole2_length)?;
        require_positive("plant.gravity", self.gravity)?;
        if !self.damping.is_finite() || self.damping < 0.0 {
            return Err(crate::error::ConfigError::invalid(
                "plant.damping",
                format!("must be finite and >= 0, got {}", self.damping),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Simplified, energy-dissipative DIP model
// ---------------------------------------------------------------------------

/// Stateless plant model: every call is a pure function of
/// (state, force, parameters, interval), so one instance can be shared
/// across threads.
#[derive(Debug, Clone)]
pub struct DipDynamics {
    params: PlantParameters,
    interval: SampleInterval,
    total_mass: f64,
}

impl DipDynamics {
    pub fn new(params: PlantParameters, interval: SampleInterval) -> ConfigResult<Self> {
        params.validate()?;
        let total_mass = params.total_mass();
        Ok(Self { params, interval, total_mass })
    }

    pub fn params(&self) -> &PlantParameters {
        &self.params
    }

    pub fn interval(&self) -> SampleInterval {
        self.interval
    }

    /// Wrap angles and clamp to the plant's numerical envelope. Silent:
    /// the model must always be able to advance.
    pub fn condition(state: &PlantState) -> PlantState {
        PlantState {
            x: state.x.clamp(-MAX_CART_POSITION, MAX_CART_POSITION),
            theta1: wrap_angle(state.theta1),
            theta2: wrap_angle(state.theta2),
            x_dot: state.x_dot.clamp(-MAX_CART_VELOCITY, MAX_CART_VELOCITY),
            theta1_dot: state.theta1_dot.clamp(-MAX_ANGULAR_VELOCITY, MAX_ANGULAR_VELOCITY),
            theta2_dot: state.theta2_dot.clamp(-MAX_ANGULAR_VELOCITY, MAX_ANGULAR_VELOCITY),
        }
    }

    /// Accelerations [cart, pole1, pole2] for an already conditioned state.
    fn accelerations(&self, s: &PlantState, force: f64) -> (f64, f64, f64) {
        let p = &self.params;

        let cart_accel = force / self.total_mass - CART_DAMPING * s.x_dot - CART_RESTORING * s.x;

        let pole1 = gravity_term(s.theta1, p.gravity, p.pole1_length)
            - cart_accel * s.theta1.cos() / p.pole1_length
            - p.damping * s.theta1_dot;
        let pole2 = gravity_term(s.theta2, p.gravity, p.pole2_length)
            - cart_accel * s.theta2.cos() / p.pole2_length
            - p.damping * s.theta2_dot;

        // Equal and opposite, so the pair's net coupling is zero.
        let coupling = POLE_COUPLING * (s.theta2 - s.theta1);

        (cart_accel, pole1 + coupling, pole2 - coupling)
    }

    /// Derivative-only form for ODE-style harnesses.
    ///
    /// A non-finite `force` propagates into the result; use
    /// [`DipDynamics::try_step`] when a guard is wanted.
    pub fn derivatives(&self, state: &PlantState, force: f64) -> StateDot {
        let s = Self::condition(state);
        let (cart, pole1, pole2) = self.accelerations(&s, force);
        Vector6::new(s.x_dot, s.theta1_dot, s.theta2_dot, cart, pole1, pole2)
    }

    /// Full step: condition, forward Euler over the model's fixed interval,
    /// re-wrap angles.
    pub fn step(&self, state: &PlantState, force: f64) -> PlantState {
        let s = Self::condition(state);
        let d = self.derivatives(&s, force);
        s.apply(&d, self.interval.seconds()).wrapped()
    }

    /// Checked full step: rejects non-finite inputs instead of propagating.
    pub fn try_step(&self, state: &PlantState, force: f64) -> Result<PlantState, DynamicsError> {
        if !force.is_finite() {
            return Err(DynamicsError::NonFiniteForce(force));
        }
        if let Some(index) = state.first_non_finite() {
            return Err(DynamicsError::NonFiniteState { index });
        }
        Ok(self.step(state, force))
    }

    /// Both poles strictly within 0.5 rad of upright.
    pub fn is_stable(state: &PlantState) -> bool {
        state.theta1.abs() < STABLE_ANGLE && state.theta2.abs() < STABLE_ANGLE
    }
}

impl Default for DipDynamics {
    fn default() -> Self {
        let params = PlantParameters::default();
        let total_mass = params.total_mass();
        Self { params, interval: SampleInterval::default(), total_mass }
    }
}

/// Sign-corrected gravity: restoring and linear near upright, saturated
/// beyond the small-angle region.
fn gravity_term(theta: f64, g: f64, length: f64) -> f64 {
    if theta.abs() < SMALL_ANGLE {
        -(g / length) * theta
    } else {
        -theta.signum() * g / length
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
