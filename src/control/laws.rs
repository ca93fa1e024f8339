use crate::dynamics::state::{wrap_angle, PlantState};
use crate::error::{ControlFault, ControlResult};

use super::params::{ControllerParameters, NormalLaw};
use super::pid::{Pid, PidLimits};

// ---------------------------------------------------------------------------
// Fixed coefficients of the energy-dissipation law
// ---------------------------------------------------------------------------

const CART_DAMPING: f64 = 0.05;
const POLE_DAMPING: f64 = 0.2;
const POSITION_RESTORING: f64 = 0.01;
const POSITION_DEADZONE: f64 = 0.1;   // m, restoring only outside this
const ANGLE_RESTORING: f64 = 0.5;
const ANGLE_LINEAR_REGION: f64 = 0.2; // rad, restoring only inside this

pub const SAFE_GAIN_SCALE: f64 = 0.2;
pub const SAFE_OUTPUT_SCALE: f64 = 0.3;

const EMERGENCY_CART_DAMPING: f64 = 0.02;
const EMERGENCY_POLE_DAMPING: f64 = 0.05;
pub const EMERGENCY_FORCE_LIMIT: f64 = 1.0;

/// Angle-axis weight in the PID law's force sum.
const PID_ANGLE_WEIGHT: f64 = 0.1;

pub const AXES: usize = 3;

/// Law output before the safety envelope.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LawOutput {
    pub force: f64,
    pub integral_saturated: bool,
    pub emergency_clipped: bool,
}

impl LawOutput {
    fn plain(force: f64) -> Self {
        Self { force, integral_saturated: false, emergency_clipped: false }
    }
}

// ---------------------------------------------------------------------------
// Laws
// ---------------------------------------------------------------------------

/// Energy dissipation: damping on every velocity, with weak restoring terms
/// gated so they never act at large deflections.
pub fn energy_dissipation(state: &PlantState) -> f64 {
    let theta1 = wrap_angle(state.theta1);
    let theta2 = wrap_angle(state.theta2);

    let mut force = -CART_DAMPING * state.x_dot;
    force -= POLE_DAMPING * theta1.sin() * state.theta1_dot;
    force -= POLE_DAMPING * theta2.sin() * state.theta2_dot;

    if state.x.abs() > POSITION_DEADZONE {
        force -= POSITION_RESTORING * state.x;
    }
    if theta1.abs() < ANGLE_LINEAR_REGION {
        force -= ANGLE_RESTORING * theta1;
    }
    if theta2.abs() < ANGLE_LINEAR_REGION {
        force -= ANGLE_RESTORING * theta2;
    }
    force
}

/// Deadbanded per-axis PID on (x, theta1, theta2), scaled by `stability_gain`.
pub fn gain_scheduled_pid(
    state: &PlantState,
    params: &ControllerParameters,
    pids: &mut [Pid; AXES],
) -> ControlResult<LawOutput> {
    let limits = PidLimits {
        max_integral: params.max_integral,
        max_derivative: params.max_derivative,
    };
    let deadband = |v: f64| if v.abs() < params.deadband { 0.0 } else { v };
    let errors = [
        deadband(state.x),
        deadband(wrap_angle(state.theta1)),
        deadband(wrap_angle(state.theta2)),
    ];

    // Work on copies; memory is committed only for a finite force.
    let mut next = *pids;
    let mut terms = [0.0; AXES];
    let mut integral_saturated = false;
    for ((pid, gains), (error, term)) in next
        .iter_mut()
        .zip(params.axis_gains())
        .zip(errors.into_iter().zip(terms.iter_mut()))
    {
        let out = pid.update(gains, limits, error);
        integral_saturated |= out.integral_saturated;
        *term = out.value;
    }

    let force = params.stability_gain
        * (terms[0] + PID_ANGLE_WEIGHT * terms[1] + PID_ANGLE_WEIGHT * terms[2]);
    if !force.is_finite() {
        return Err(ControlFault::NumericalDegradation { stage: "pid law" });
    }
    *pids = next;
    Ok(LawOutput { force, integral_saturated, emergency_clipped: false })
}

/// NORMAL mode dispatch on the configured law.
pub fn normal(
    state: &PlantState,
    params: &ControllerParameters,
    pids: &mut [Pid; AXES],
) -> ControlResult<LawOutput> {
    match params.normal_law {
        NormalLaw::EnergyDissipation => Ok(LawOutput::plain(energy_dissipation(state))),
        NormalLaw::GainScheduledPid => gain_scheduled_pid(state, params, pids),
    }
}

/// SAFE mode: the normal law on a 20%-gain copy of the parameters, then a
/// further 0.3 output factor.
pub fn safe(
    state: &PlantState,
    params: &ControllerParameters,
    pids: &mut [Pid; AXES],
) -> ControlResult<LawOutput> {
    let attenuated = params.scaled(SAFE_GAIN_SCALE);
    let out = normal(state, &attenuated, pids)?;
    Ok(LawOutput { force: out.force * SAFE_OUTPUT_SCALE, ..out })
}

/// EMERGENCY mode: pure velocity damping, clipped to +/-1 N whatever the
/// configured force limit.
pub fn emergency(state: &PlantState) -> LawOutput {
    let raw = -EMERGENCY_CART_DAMPING * state.x_dot
        - EMERGENCY_POLE_DAMPING * state.theta1_dot
        - EMERGENCY_POLE_DAMPING * state.theta2_dot;
    let force = raw.clamp(-EMERGENCY_FORCE_LIMIT, EMERGENCY_FORCE_LIMIT);
    LawOutput { force, integral_saturated: false, emergency_clipped: force != raw }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::params::GainTriple;

    fn pids() -> [Pid; AXES] {
        [Pid::new(); AXES]
    }

    #[test]
    fn damping_opposes_aligned_angle_and_rate() {
        let s = PlantState::new(0.0, 0.1, 0.1, 0.0, 1.0, 1.0);
        let f = energy_dissipation(&s);
        assert!(f < 0.0, "expected negative force, got {f}");
        let expected = -2.0 * POLE_DAMPING * 0.1_f64.sin() - 2.0 * ANGLE_RESTORING * 0.1;
        assert!((f - expected).abs() < 1e-12);
    }

    #[test]
    fn restoring_terms_are_gated() {
        // Inside the position deadzone: no position term.
        assert_eq!(energy_dissipation(&PlantState::new(0.05, 0.0, 0.0, 0.0, 0.0, 0.0)), 0.0);
        let far = energy_dissipation(&PlantState::new(1.0, 0.0, 0.0, 0.0, 0.0, 0.0));
        assert!((far + POSITION_RESTORING).abs() < 1e-12);
        // Large angle: only damping remains, which is zero at rest.
        assert_eq!(energy_dissipation(&PlantState::new(0.0, 0.3, -0.3, 0.0, 0.0, 0.0)), 0.0);
    }

    #[test]
    fn energy_law_ignores_configured_gains() {
        let s = PlantState::new(0.3, 0.1, -0.05, 0.2, 0.4, -0.1);
        let soft = ControllerParameters::default();
        let stiff = ControllerParameters {
            angle1_gains: GainTriple::new(100.0, 10.0, 10.0),
            ..Default::default()
        };
        let a = normal(&s, &soft, &mut pids()).unwrap();
        let b = normal(&s, &stiff, &mut pids()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn safe_law_is_thirty_percent_of_energy_law() {
        let s = PlantState::new(0.3, 0.1, -0.05, 0.2, 0.4, -0.1);
        let p = ControllerParameters::default();
        let n = normal(&s, &p, &mut pids()).unwrap().force;
        let f = safe(&s, &p, &mut pids()).unwrap().force;
        assert!((f - SAFE_OUTPUT_SCALE * n).abs() < 1e-12);
    }

    #[test]
    fn safe_law_scales_pid_gains() {
        let s = PlantState::new(0.5, 0.2, 0.2, 0.0, 0.0, 0.0);
        let p = ControllerParameters { normal_law: NormalLaw::GainScheduledPid, ..Default::default() };
        let n = normal(&s, &p, &mut pids()).unwrap().force;
        let f = safe(&s, &p, &mut pids()).unwrap().force;
        assert!((f - SAFE_GAIN_SCALE * SAFE_OUTPUT_SCALE * n).abs() < 1e-12);
    }

    #[test]
    fn pid_law_respects_deadband() {
        let p = ControllerParameters { normal_law: NormalLaw::GainScheduledPid, ..Default::default() };
        let mut mem = pids();
        let out = normal(&PlantState::new(0.04, -0.04, 0.01, 0.0, 0.0, 0.0), &p, &mut mem).unwrap();
        assert_eq!(out.force, 0.0);
        assert!(mem.iter().all(|pid| pid.integral() == 0.0));
    }

    #[test]
    fn overflowing_pid_law_leaves_memory_untouched() {
        let p = ControllerParameters {
            normal_law: NormalLaw::GainScheduledPid,
            position_gains: GainTriple::new(f64::MAX, 0.0, 0.0),
            stability_gain: f64::MAX,
            ..Default::default()
        };
        let mut mem = pids();
        let err = normal(&PlantState::new(1.0, 0.2, -0.1, 0.0, 0.0, 0.0), &p, &mut mem).unwrap_err();
        assert_eq!(err, ControlFault::NumericalDegradation { stage: "pid law" });
        assert_eq!(mem, pids());
    }

    #[test]
    fn emergency_is_clipped_to_one_newton() {
        let out = emergency(&PlantState::new(0.0, 0.0, 0.0, 5.0, 10.0, 10.0));
        assert_eq!(out.force, -EMERGENCY_FORCE_LIMIT);
        assert!(out.emergency_clipped);
        let gentle = emergency(&PlantState::new(0.0, 0.0, 0.0, 1.0, 0.0, 0.0));
        assert!((gentle.force + 0.02).abs() < 1e-12);
        assert!(!gentle.emergency_clipped);
    }
}
