use super::params::GainTriple;
use super::safety::{clamp_integral, limit_derivative, Clamped};

// ---------------------------------------------------------------------------
// PID with anti-windup (single axis, per-tick: no dt scaling)
// ---------------------------------------------------------------------------

/// Clamp limits shared by every axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidLimits {
    pub max_integral: f64,
    pub max_derivative: f64,
}

/// Memory for one axis. Gains are passed per call so safe mode can run the
/// same memory with a scaled gain set.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Pid {
    integral: f64,
    prev_error: f64,
}

/// Output of one PID update plus whether the integral clamp fired.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidOutput {
    pub value: f64,
    pub integral_saturated: bool,
}

impl Pid {
    pub fn new() -> Self {
        Self::default()
    }

    /// kp*e + ki*clamp(sum e) + kd*clamp(e - e_prev).
    ///
    /// The integral is clamped after accumulation. The derivative is taken
    /// on the error, not the measurement.
    pub fn update(&mut self, gains: GainTriple, limits: PidLimits, error: f64) -> PidOutput {
        let Clamped { value: integral, saturated } =
            clamp_integral(self.integral + error, limits.max_integral);
        self.integral = integral;

        let derivative = limit_derivative(error - self.prev_error, limits.max_derivative);
        self.prev_error = error;

        PidOutput {
            value: gains.kp * error + gains.ki * self.integral + gains.kd * derivative.value,
            integral_saturated: saturated,
        }
    }

    pub fn integral(&self) -> f64 {
        self.integral
    }

    pub fn prev_error(&self) -> f64 {
        self.prev_error
    }

    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.prev_error = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const LIMITS: PidLimits = PidLimits { max_integral: 1.0, max_derivative: 2.0 };

    #[test]
    fn pid_proportional() {
        let mut pid = Pid::new();
        let out = pid.update(GainTriple::new(1.0, 0.0, 0.0), LIMITS, 0.5);
        assert!((out.value - 0.5).abs() < 1e-10, "Pure P should output Kp * error");
    }

    #[test]
    fn pid_integral_accumulates() {
        let mut pid = Pid::new();
        let g = GainTriple::new(0.0, 1.0, 0.0);
        pid.update(g, LIMITS, 0.25);
        let out = pid.update(g, LIMITS, 0.25);
        assert!((out.value - 0.5).abs() < 1e-10, "Integral should accumulate per tick");
        assert!(!out.integral_saturated);
    }

    #[test]
    fn integral_clamped_after_accumulation() {
        let mut pid = Pid::new();
        let g = GainTriple::new(0.0, 1.0, 0.0);
        pid.update(g, LIMITS, 0.8);
        let out = pid.update(g, LIMITS, 0.8);
        assert!(out.integral_saturated);
        assert_eq!(pid.integral(), 1.0);
        // Opposite error unwinds immediately from the clamp, not from 1.6.
        pid.update(g, LIMITS, -0.5);
        assert!((pid.integral() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn derivative_is_on_error_and_limited() {
        let mut pid = Pid::new();
        let g = GainTriple::new(0.0, 0.0, 1.0);
        let out = pid.update(g, LIMITS, 10.0);
        assert_eq!(out.value, 2.0, "jump of 10 clipped to max_derivative");
        let out = pid.update(g, LIMITS, 10.5);
        assert!((out.value - 0.5).abs() < 1e-12);
        assert_eq!(pid.prev_error(), 10.5);
    }

    #[test]
    fn reset_clears_memory() {
        let mut pid = Pid::new();
        pid.update(GainTriple::new(1.0, 1.0, 1.0), LIMITS, 0.7);
        pid.reset();
        assert_eq!(pid, Pid::new());
    }

    proptest! {
        #[test]
        fn integral_never_exceeds_limit(errors in prop::collection::vec(-1.0e3f64..1.0e3, 1..200)) {
            let mut pid = Pid::new();
            let g = GainTriple::new(0.5, 0.001, 0.05);
            for e in errors {
                pid.update(g, LIMITS, e);
                prop_assert!(pid.integral().abs() <= LIMITS.max_integral);
            }
        }
    }
}
