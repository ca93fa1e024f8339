//! Safety envelope: small, independent clamps applied around the control
//! laws. Each returns the value it produced plus whether it had to intervene,
//! so the orchestrator can count saturation without treating it as a fault.

use serde::Serialize;

use crate::dynamics::state::{PlantState, SampleInterval};
use crate::error::InvalidInputError;

// ---------------------------------------------------------------------------
// Controller operating envelope (tighter than the plant's numerical one)
// ---------------------------------------------------------------------------

pub const STATE_BOUNDS: [f64; 6] = [
    2.0,  // cart position, m
    0.5,  // pole 1 angle, rad
    0.5,  // pole 2 angle, rad
    5.0,  // cart velocity, m/s
    10.0, // pole 1 rate, rad/s
    10.0, // pole 2 rate, rad/s
];

/// A clamped value and whether the clamp was active.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Clamped {
    pub value: f64,
    pub saturated: bool,
}

impl Clamped {
    #[inline]
    fn symmetric(value: f64, limit: f64) -> Self {
        let clamped = value.clamp(-limit, limit);
        // NaN is left for the sanitizer, not counted as saturation.
        Self { value: clamped, saturated: !value.is_nan() && clamped != value }
    }
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Reject malformed frames, then clip every axis to [`STATE_BOUNDS`].
pub fn validate_and_clip(raw: &[f64]) -> Result<PlantState, InvalidInputError> {
    let state = PlantState::try_from_slice(raw)?;
    let mut arr = state.to_array();
    for (v, bound) in arr.iter_mut().zip(STATE_BOUNDS) {
        *v = v.clamp(-bound, bound);
    }
    Ok(PlantState::from_array(arr))
}

// ---------------------------------------------------------------------------
// Output shaping
// ---------------------------------------------------------------------------

/// Limit the change from `previous` to `rate_limit * interval`, keeping the
/// direction of the proposed change. With no previous output, passes through.
pub fn rate_limit(
    previous: Option<f64>,
    proposed: f64,
    rate_limit: f64,
    interval: SampleInterval,
) -> Clamped {
    let Some(prev) = previous else {
        return Clamped { value: proposed, saturated: false };
    };
    let max_change = rate_limit * interval.seconds();
    let delta = proposed - prev;
    if delta.abs() > max_change {
        Clamped { value: prev + delta.signum() * max_change, saturated: true }
    } else {
        Clamped { value: proposed, saturated: false }
    }
}

/// Anti-windup: clamp an already-accumulated integral to +/- `max_integral`.
#[inline]
pub fn clamp_integral(accumulated: f64, max_integral: f64) -> Clamped {
    Clamped::symmetric(accumulated, max_integral)
}

/// Clip a per-tick error difference before it is scaled by kd.
#[inline]
pub fn limit_derivative(delta: f64, max_derivative: f64) -> Clamped {
    Clamped::symmetric(delta, max_derivative)
}

#[inline]
pub fn limit_force(force: f64, max_force: f64) -> Clamped {
    Clamped::symmetric(force, max_force)
}

/// Hold the last good output in place of a non-finite candidate.
#[inline]
pub fn sanitize(candidate: f64, last_valid: f64) -> Clamped {
    if candidate.is_finite() {
        Clamped { value: candidate, saturated: false }
    } else {
        Clamped { value: last_valid, saturated: true }
    }
}

// ---------------------------------------------------------------------------
// Saturation telemetry
// ---------------------------------------------------------------------------

/// Which clamps fired during one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaturationFlags {
    pub force: bool,
    pub rate: bool,
    pub integral: bool,
    pub emergency_clip: bool,
    pub sanitized: bool,
}

impl SaturationFlags {
    pub fn any(&self) -> bool {
        self.force || self.rate || self.integral || self.emergency_clip || self.sanitized
    }
}

/// Cumulative clamp activity since the last reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SaturationCounters {
    pub force: u64,
    pub rate: u64,
    pub integral: u64,
    pub emergency_clip: u64,
    pub sanitized: u64,
    /// Ticks with at least one active clamp.
    pub saturated_ticks: u64,
}

impl SaturationCounters {
    pub fn record(&mut self, flags: SaturationFlags) {
        self.force += u64::from(flags.force);
        self.rate += u64::from(flags.rate);
        self.integral += u64::from(flags.integral);
        self.emergency_clip += u64::from(flags.emergency_clip);
        self.sanitized += u64::from(flags.sanitized);
        self.saturated_ticks += u64::from(flags.any());
    }
}
