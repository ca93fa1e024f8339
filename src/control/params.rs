use serde::{Deserialize, Serialize};

use crate::error::{require_positive, ConfigError, ConfigResult};

// ---------------------------------------------------------------------------
// Gains
// ---------------------------------------------------------------------------

/// One axis of PID gains.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GainTriple {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
}

impl GainTriple {
    pub const fn new(kp: f64, ki: f64, kd: f64) -> Self {
        Self { kp, ki, kd }
    }

    pub fn scaled(self, factor: f64) -> Self {
        Self::new(self.kp * factor, self.ki * factor, self.kd * factor)
    }

    fn is_finite(&self) -> bool {
        self.kp.is_finite() && self.ki.is_finite() && self.kd.is_finite()
    }
}

/// Which law runs in NORMAL (and, attenuated, in SAFE) mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalLaw {
    /// Fixed-coefficient energy dissipation; ignores the gain triples.
    #[default]
    EnergyDissipation,
    /// Deadbanded three-axis PID built on the anti-windup primitive.
    GainScheduledPid,
}

// ---------------------------------------------------------------------------
// Controller parameters
// ---------------------------------------------------------------------------

/// Immutable controller configuration. Safe mode works on a scaled copy
/// (see [`ControllerParameters::scaled`]), never on the original.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerParameters {
    pub position_gains: GainTriple,
    pub angle1_gains: GainTriple,
    pub angle2_gains: GainTriple,

    pub max_force: f64,      // N
    pub max_integral: f64,   // anti-windup clamp on the accumulated error
    pub max_derivative: f64, // clamp on the per-tick error difference
    pub deadband: f64,       // rad / m, PID law only
    pub rate_limit: f64,     // N/s
    pub emergency_threshold: f64,
    pub max_faults: u32,
    pub recovery_time: f64,  // s
    pub stability_gain: f64,

    pub normal_law: NormalLaw,
    /// Minimum ticks in a mode before de-escalating. 0 = re-evaluate freely.
    pub mode_dwell_ticks: u32,
}

impl Default for ControllerParameters {
    fn default() -> Self {
        // Deliberately conservative: low gains, tight limits.
        Self {
            position_gains: GainTriple::new(0.01, 0.0001, 0.005),
            angle1_gains: GainTriple::new(0.5, 0.001, 0.05),
            angle2_gains: GainTriple::new(0.5, 0.001, 0.05),
            max_force: 5.0,
            max_integral: 1.0,
            max_derivative: 2.0,
            deadband: 0.05,
            rate_limit: 5.0,
            emergency_threshold: 1.0,
            max_faults: 2,
            recovery_time: 2.0,
            stability_gain: 0.1,
            normal_law: NormalLaw::EnergyDissipation,
            mode_dwell_ticks: 0,
        }
    }
}

impl ControllerParameters {
    /// Copy with all three gain triples multiplied by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            position_gains: self.position_gains.scaled(factor),
            angle1_gains: self.angle1_gains.scaled(factor),
            angle2_gains: self.angle2_gains.scaled(factor),
            ..self.clone()
        }
    }

    /// Gain triples indexed by controlled axis (position, angle1, angle2).
    pub fn axis_gains(&self) -> [GainTriple; 3] {
        [self.position_gains, self.angle1_gains, self.angle2_gains]
    }

    pub fn validate(&self) -> ConfigResult<()> {
        for (field, g) in [
            ("controller.position_gains", self.position_gains),
            ("controller.angle1_gains", self.angle1_gains),
            ("controller.angle2_gains", self.angle2_gains),
        ] {
            if !g.is_finite() {
                return Err(ConfigError::invalid(field, "gains must be finite"));
            }
        }
        require_positive("controller.max_force", self.max_force)?;
        require_positive("controller.max_integral", self.max_integral)?;
        require_positive("controller.max_derivative", self.max_derivative)?;
        require_positive("controller.rate_limit", self.rate_limit)?;
        require_positive("controller.emergency_threshold", self.emergency_threshold)?;
        if !self.deadband.is_finite() || self.deadband < 0.0 {
            return Err(ConfigError::invalid(
                "controller.deadband",
                format!("must be finite and >= 0, got {}", self.deadband),
            ));
        }
        if !self.recovery_time.is_finite() || self.recovery_time < 0.0 {
            return Err(ConfigError::invalid(
                "controller.recovery_time",
                format!("must be finite and >= 0, got {}", self.recovery_time),
            ));
        }
        if !self.stability_gain.is_finite() {
            return Err(ConfigError::invalid("controller.stability_gain", "must be finite"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaled_copy_leaves_original_untouched() {
        let base = ControllerParameters::default();
        let safe = base.scaled(0.2);
        assert!((safe.angle1_gains.kp - 0.1).abs() < 1e-12);
        assert!((safe.position_gains.kd - 0.001).abs() < 1e-12);
        assert_eq!(base, ControllerParameters::default());
        assert_eq!(safe.max_force, base.max_force);
    }

    #[test]
    fn defaults_validate() {
        assert!(ControllerParameters::default().validate().is_ok());
    }

    #[test]
    fn rejects_bad_limits() {
        let p = ControllerParameters { max_force: -1.0, ..Default::default() };
        assert!(p.validate().is_err());
        let p = ControllerParameters { rate_limit: f64::NAN, ..Default::default() };
        assert!(p.validate().is_err());
        let p = ControllerParameters {
            angle2_gains: GainTriple::new(f64::INFINITY, 0.0, 0.0),
            ..Default::default()
        };
        assert!(p.validate().is_err());
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let p: ControllerParameters =
            serde_json::from_str(r#"{ "max_force": 12.5, "normal_law": "gain_scheduled_pid" }"#)
                .unwrap();
        assert_eq!(p.max_force, 12.5);
        assert_eq!(p.normal_law, NormalLaw::GainScheduledPid);
        assert_eq!(p.rate_limit, 5.0);
    }
}
