use std::f64::consts::PI;

use nalgebra::Vector6;
use serde::{Deserialize, Serialize};

use crate::error::{require_positive, ConfigResult, InvalidInputError};

// ---------------------------------------------------------------------------
// Shared constants
// ---------------------------------------------------------------------------

pub const STATE_DIM: usize = 6;
pub const DEFAULT_SAMPLE_INTERVAL: f64 = 0.01; // s, 100 Hz
pub const STANDARD_GRAVITY: f64 = 9.81;

// ---------------------------------------------------------------------------
// Sample interval
// ---------------------------------------------------------------------------

/// Fixed control/integration period, shared by the plant model and the
/// controller's rate limiter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SampleInterval(f64);

impl SampleInterval {
    pub fn new(seconds: f64) -> ConfigResult<Self> {
        require_positive("sample_interval", seconds)?;
        Ok(Self(seconds))
    }

    #[inline]
    pub fn seconds(self) -> f64 {
        self.0
    }

    pub fn hz(self) -> f64 {
        1.0 / self.0
    }
}

impl Default for SampleInterval {
    fn default() -> Self {
        Self(DEFAULT_SAMPLE_INTERVAL)
    }
}

// ---------------------------------------------------------------------------
// Plant state: [x, theta1, theta2, x_dot, theta1_dot, theta2_dot]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlantState {
    pub x: f64,          // m, cart position
    pub theta1: f64,     // rad, pole 1 (0 = upright)
    pub theta2: f64,     // rad, pole 2
    pub x_dot: f64,      // m/s
    pub theta1_dot: f64, // rad/s
    pub theta2_dot: f64, // rad/s
}

/// Time derivative of a [`PlantState`], same component ordering.
pub type StateDot = Vector6<f64>;

impl PlantState {
    pub const fn new(
        x: f64,
        theta1: f64,
        theta2: f64,
        x_dot: f64,
        theta1_dot: f64,
        theta2_dot: f64,
    ) -> Self {
        Self { x, theta1, theta2, x_dot, theta1_dot, theta2_dot }
    }

    pub const fn from_array(v: [f64; STATE_DIM]) -> Self {
        Self::new(v[0], v[1], v[2], v[3], v[4], v[5])
    }

    pub fn to_array(&self) -> [f64; STATE_DIM] {
        [self.x, self.theta1, self.theta2, self.x_dot, self.theta1_dot, self.theta2_dot]
    }

    pub fn to_vector(&self) -> Vector6<f64> {
        Vector6::from(self.to_array())
    }

    pub fn from_vector(v: &Vector6<f64>) -> Self {
        Self::new(v[0], v[1], v[2], v[3], v[4], v[5])
    }

    /// Strict conversion from an untrusted slice: exactly six finite values.
    pub fn try_from_slice(values: &[f64]) -> Result<Self, InvalidInputError> {
        if values.len() != STATE_DIM {
            return Err(InvalidInputError::WrongLength { len: values.len() });
        }
        if let Some(index) = values.iter().position(|v| !v.is_finite()) {
            return Err(InvalidInputError::NonFinite { index });
        }
        let mut arr = [0.0; STATE_DIM];
        arr.copy_from_slice(values);
        Ok(Self::from_array(arr))
    }

    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }

    /// Index of the first non-finite component, if any.
    pub fn first_non_finite(&self) -> Option<usize> {
        self.to_array().iter().position(|v| !v.is_finite())
    }

    /// Euclidean norm over all six components (mixed units).
    pub fn norm(&self) -> f64 {
        self.to_vector().norm()
    }

    /// Same state with both pole angles wrapped into (-pi, pi].
    pub fn wrapped(&self) -> Self {
        Self {
            theta1: wrap_angle(self.theta1),
            theta2: wrap_angle(self.theta2),
            ..*self
        }
    }

    /// Apply a derivative over dt (forward Euler), no wrapping.
    pub fn apply(&self, d: &StateDot, dt: f64) -> Self {
        Self::from_vector(&(self.to_vector() + d * dt))
    }
}

impl From<[f64; STATE_DIM]> for PlantState {
    fn from(v: [f64; STATE_DIM]) -> Self {
        Self::from_array(v)
    }
}

// ---------------------------------------------------------------------------
// Angle wrapping
// ---------------------------------------------------------------------------

/// Wrap an angle into (-pi, pi] via atan2(sin, cos).
///
/// atan2 can return exactly -pi (e.g. for -pi itself), which is folded onto
/// +pi to keep the interval half-open.
#[inline]
pub fn wrap_angle(theta: f64) -> f64 {
    let w = theta.sin().atan2(theta.cos());
    if w <= -PI {
        PI
    } else {
        w
    }
}
