//! Fault-tolerant orchestrator: validate, classify, dispatch, envelope,
//! bookkeeping. One call per control tick; never panics on caller input
//! and never returns a non-finite or out-of-range force.

use log::{info, trace, warn};
use serde::Serialize;

use crate::dynamics::state::SampleInterval;
use crate::error::{ConfigResult, ControlFault, ControlResult};

use super::controller::Controller;
use super::laws::{self, AXES};
use super::mode::{classify, Mode, ModeSelector};
use super::monitor::{FaultRecord, Ring, StabilityMonitor, HISTORY_CAPACITY};
use super::params::ControllerParameters;
use super::pid::Pid;
use super::safety::{self, SaturationCounters, SaturationFlags};

pub const FAULT_HISTORY_CAPACITY: usize = 100;
pub const STATUS_RECENT_FAULTS: usize = 5;

// ---------------------------------------------------------------------------
// Mutable controller state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ControllerState {
    pids: [Pid; AXES],
    outputs: Ring<f64>,
    selector: ModeSelector,
    fault_count: u64,
    last_valid_output: f64,
}

impl ControllerState {
    fn new(dwell_ticks: u32) -> Self {
        Self {
            pids: [Pid::new(); AXES],
            outputs: Ring::with_capacity(HISTORY_CAPACITY),
            selector: ModeSelector::new(dwell_ticks),
            fault_count: 0,
            last_valid_output: 0.0,
        }
    }

    pub fn integral_error(&self) -> [f64; AXES] {
        self.pids.map(|p| p.integral())
    }

    pub fn previous_error(&self) -> [f64; AXES] {
        self.pids.map(|p| p.prev_error())
    }

    pub fn output_history(&self) -> &Ring<f64> {
        &self.outputs
    }

    pub fn mode(&self) -> Mode {
        self.selector.current()
    }

    pub fn fault_count(&self) -> u64 {
        self.fault_count
    }

    pub fn last_valid_output(&self) -> f64 {
        self.last_valid_output
    }

    fn reset(&mut self) {
        self.pids.iter_mut().for_each(Pid::reset);
        self.outputs.clear();
        self.selector.reset();
        self.fault_count = 0;
        self.last_valid_output = 0.0;
    }
}

// ---------------------------------------------------------------------------
// Status snapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControllerStatus {
    pub mode: Mode,
    pub tick_count: u64,
    pub fault_count: u64,
    pub max_state_magnitude: f64,
    pub oscillation_detected: bool,
    pub recent_faults: Vec<FaultRecord>,
    pub last_valid_output: f64,
    /// Largest |integral| across the controlled axes.
    pub integral_windup: f64,
    pub saturation: SaturationCounters,
    pub history_len: usize,
    pub maintenance: bool,
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct BulletproofController {
    params: ControllerParameters,
    interval: SampleInterval,
    state: ControllerState,
    monitor: StabilityMonitor,
    faults: Ring<FaultRecord>,
    saturation: SaturationCounters,
    tick: u64,
    maintenance: bool,
}

impl BulletproofController {
    pub fn new(params: ControllerParameters, interval: SampleInterval) -> ConfigResult<Self> {
        params.validate()?;
        let mut controller = Self::with_interval(interval);
        controller.state = ControllerState::new(params.mode_dwell_ticks);
        controller.params = params;
        Ok(controller)
    }

    /// Default parameters at a caller-chosen interval. Infallible because
    /// the defaults always validate.
    pub fn with_interval(interval: SampleInterval) -> Self {
        let params = ControllerParameters::default();
        let state = ControllerState::new(params.mode_dwell_ticks);
        Self {
            params,
            interval,
            state,
            monitor: StabilityMonitor::default(),
            faults: Ring::with_capacity(FAULT_HISTORY_CAPACITY),
            saturation: SaturationCounters::default(),
            tick: 0,
            maintenance: false,
        }
    }

    pub fn interval(&self) -> SampleInterval {
        self.interval
    }

    pub fn params(&self) -> &ControllerParameters {
        &self.params
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// One control tick. Any fault yields exactly 0.0 and one fault count.
    pub fn compute_control(&mut self, raw: &[f64]) -> f64 {
        if self.maintenance {
            return self.maintenance_tick();
        }
        match self.try_compute(raw) {
            Ok(force) => force,
            Err(fault) => self.record_fault(fault),
        }
    }

    fn try_compute(&mut self, raw: &[f64]) -> ControlResult<f64> {
        let plant = safety::validate_and_clip(raw)?;

        let candidate = classify(&plant, self.state.fault_count, self.params.emergency_threshold);
        if let Some(previous) = self.state.selector.update(candidate) {
            info!("tick {}: mode {} -> {}", self.tick, previous, self.state.selector.current());
        }
        let mode = self.state.selector.current();

        let law = match mode {
            Mode::Emergency => laws::emergency(&plant),
            Mode::Safe => laws::safe(&plant, &self.params, &mut self.state.pids)?,
            Mode::Normal | Mode::Maintenance => {
                laws::normal(&plant, &self.params, &mut self.state.pids)?
            }
        };

        let mut flags = SaturationFlags {
            integral: law.integral_saturated,
            emergency_clip: law.emergency_clipped,
            ..Default::default()
        };

        let limited = safety::limit_force(law.force, self.params.max_force);
        flags.force = limited.saturated;

        let rated = safety::rate_limit(
            self.state.outputs.last().copied(),
            limited.value,
            self.params.rate_limit,
            self.interval,
        );
        flags.rate = rated.saturated;

        let clean = safety::sanitize(rated.value, self.state.last_valid_output);
        flags.sanitized = clean.saturated;
        if !clean.value.is_finite() {
            return Err(ControlFault::NumericalDegradation { stage: "safety envelope" });
        }

        self.commit(clean.value, plant.norm(), flags);
        trace!("tick {}: mode={} force={:.5}", self.tick, mode, clean.value);
        Ok(clean.value)
    }

    fn commit(&mut self, force: f64, state_norm: f64, flags: SaturationFlags) {
        self.state.outputs.push(force);
        self.state.last_valid_output = force;
        self.monitor.observe(state_norm, &self.state.outputs);
        self.saturation.record(flags);
        self.tick += 1;
    }

    fn record_fault(&mut self, fault: ControlFault) -> f64 {
        self.state.fault_count += 1;
        self.faults.push(FaultRecord { tick: self.tick, fault });
        warn!(
            "tick {}: {} (fault #{}), commanding zero force",
            self.tick, fault, self.state.fault_count
        );
        0.0
    }

    fn maintenance_tick(&mut self) -> f64 {
        self.state.outputs.push(0.0);
        self.state.last_valid_output = 0.0;
        self.tick += 1;
        0.0
    }

    /// Latch MAINTENANCE: every tick commands 0.0 until released.
    pub fn engage_maintenance(&mut self) {
        if !self.maintenance {
            info!("tick {}: maintenance engaged", self.tick);
        }
        self.maintenance = true;
        self.state.selector.force(Mode::Maintenance);
    }

    /// Release the latch; the next tick reclassifies from scratch.
    /// No-op when the latch is not engaged.
    pub fn release_maintenance(&mut self) {
        if !self.maintenance {
            return;
        }
        info!("tick {}: maintenance released", self.tick);
        self.maintenance = false;
        self.state.selector.force(Mode::Normal);
    }

    pub fn in_maintenance(&self) -> bool {
        self.maintenance
    }

    /// Zero every piece of mutable state, including the maintenance latch.
    pub fn reset(&mut self) {
        self.state.reset();
        self.monitor.reset();
        self.faults.clear();
        self.saturation = SaturationCounters::default();
        self.tick = 0;
        self.maintenance = false;
    }

    pub fn get_status(&self) -> ControllerStatus {
        let integral_windup = self
            .state
            .integral_error()
            .iter()
            .fold(0.0_f64, |m, v| m.max(v.abs()));
        ControllerStatus {
            mode: self.state.mode(),
            tick_count: self.tick,
            fault_count: self.state.fault_count,
            max_state_magnitude: self.monitor.max_state_magnitude(),
            oscillation_detected: self.monitor.oscillation_detected(),
            recent_faults: self.faults.recent(STATUS_RECENT_FAULTS).copied().collect(),
            last_valid_output: self.state.last_valid_output,
            integral_windup,
            saturation: self.saturation,
            history_len: self.state.outputs.len(),
            maintenance: self.maintenance,
        }
    }

    /// Every fault still held in the bounded history, oldest first.
    pub fn fault_history(&self) -> impl Iterator<Item = &FaultRecord> {
        self.faults.recent(FAULT_HISTORY_CAPACITY)
    }
}

impl Default for BulletproofController {
    /// Conservative hard-coded defaults at 100 Hz.
    fn default() -> Self {
        Self::with_interval(SampleInterval::default())
    }
}

impl Controller for BulletproofController {
    fn control(&mut self, state: &[f64]) -> f64 {
        self.compute_control(state)
    }

    fn reset(&mut self) {
        BulletproofController::reset(self);
    }

    fn name(&self) -> &str {
        "BulletproofController"
    }

    fn mode(&self) -> Mode {
        self.state.mode()
    }

    fn fault_count(&self) -> u64 {
        self.state.fault_count
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::params::NormalLaw;
    use crate::error::InvalidInputError;
    use proptest::prelude::*;

    const REST: [f64; 6] = [0.0; 6];

    #[test]
    fn rest_state_commands_zero_in_normal_mode() {
        let mut c = BulletproofController::default();
        assert_eq!(c.compute_control(&REST), 0.0);
        let st = c.get_status();
        assert_eq!(st.mode, Mode::Normal);
        assert_eq!(st.tick_count, 1);
        assert_eq!(st.fault_count, 0);
    }

    #[test]
    fn wrong_length_and_nan_take_fault_path() {
        let mut c = BulletproofController::default();
        c.compute_control(&[0.01, 0.02, 0.0, 0.0, 0.0, 0.0]);
        let before = c.get_status();

        assert_eq!(c.compute_control(&[0.0; 5]), 0.0);
        assert_eq!(c.get_status().fault_count, before.fault_count + 1);

        assert_eq!(c.compute_control(&[0.0, f64::NAN, 0.0, 0.0, 0.0, 0.0]), 0.0);
        let after = c.get_status();
        assert_eq!(after.fault_count, before.fault_count + 2);
        // Faulted ticks leave tick count and history untouched.
        assert_eq!(after.tick_count, before.tick_count);
        assert_eq!(after.history_len, before.history_len);
        assert_eq!(
            after.recent_faults.last().map(|r| r.fault),
            Some(ControlFault::InvalidInput(InvalidInputError::NonFinite { index: 1 }))
        );
    }

    #[test]
    fn four_faults_escalate_to_emergency() {
        let mut c = BulletproofController::default();
        for _ in 0..3 {
            c.compute_control(&[0.0; 4]);
        }
        c.compute_control(&REST);
        assert_eq!(c.get_status().mode, Mode::Safe, "3 faults is SAFE, not yet EMERGENCY");

        c.compute_control(&[0.0; 4]);
        assert_eq!(c.get_status().fault_count, 4);
        c.compute_control(&REST);
        assert_eq!(c.get_status().mode, Mode::Emergency);
    }

    #[test]
    fn two_faults_select_safe_mode() {
        let mut c = BulletproofController::default();
        c.compute_control(&[]);
        c.compute_control(&[]);
        c.compute_control(&REST);
        assert_eq!(c.get_status().mode, Mode::Safe);
    }

    #[test]
    fn high_energy_selects_emergency_and_clips() {
        let mut c = BulletproofController::default();
        let f = c.compute_control(&[0.0, 0.0, 0.0, 5.0, 10.0, 10.0]);
        assert_eq!(c.get_status().mode, Mode::Emergency);
        assert_eq!(f, -1.0);
        assert_eq!(c.get_status().saturation.emergency_clip, 1);
    }

    #[test]
    fn mode_drops_straight_back_without_dwell() {
        let mut c = BulletproofController::default();
        c.compute_control(&[0.0, 0.0, 0.0, 5.0, 10.0, 10.0]);
        assert_eq!(c.get_status().mode, Mode::Emergency);
        c.compute_control(&REST);
        assert_eq!(c.get_status().mode, Mode::Normal);
    }

    #[test]
    fn dwell_holds_emergency() {
        let params = ControllerParameters { mode_dwell_ticks: 5, ..Default::default() };
        let mut c = BulletproofController::new(params, SampleInterval::default()).unwrap();
        c.compute_control(&[0.0, 0.0, 0.0, 5.0, 10.0, 10.0]);
        for _ in 0..3 {
            c.compute_control(&REST);
            assert_eq!(c.get_status().mode, Mode::Emergency);
        }
    }

    #[test]
    fn rate_limit_applies_between_ticks() {
        let params = ControllerParameters { emergency_threshold: 50.0, ..Default::default() };
        let mut c = BulletproofController::new(params, SampleInterval::default()).unwrap();
        let first = c.compute_control(&[0.0, 0.15, 0.15, 0.0, 0.0, 0.0]);
        let second = c.compute_control(&[0.0, -0.15, -0.15, 0.0, 0.0, 0.0]);
        assert!((first + 0.15).abs() < 1e-12, "first tick is not rate limited");
        assert!((second - first - 0.05).abs() < 1e-12);
        assert_eq!(c.get_status().saturation.rate, 1);
    }

    #[test]
    fn reset_is_total_and_idempotent() {
        let params = ControllerParameters {
            normal_law: NormalLaw::GainScheduledPid,
            ..Default::default()
        };
        let mut c = BulletproofController::new(params, SampleInterval::default()).unwrap();
        for _ in 0..20 {
            c.compute_control(&[0.3, 0.1, 0.1, 0.0, 0.0, 0.0]);
        }
        c.compute_control(&[1.0]);
        c.engage_maintenance();

        c.reset();
        let once = c.get_status();
        let once_integral = c.state().integral_error();
        c.reset();
        assert_eq!(c.get_status(), once);
        assert_eq!(c.state().integral_error(), once_integral);

        assert_eq!(once.fault_count, 0);
        assert_eq!(once.tick_count, 0);
        assert_eq!(once.history_len, 0);
        assert_eq!(once.mode, Mode::Normal);
        assert!(once.recent_faults.is_empty());
        assert!(!once.maintenance);
        assert_eq!(once_integral, [0.0; AXES]);
        assert_eq!(c.state().previous_error(), [0.0; AXES]);
    }

    #[test]
    fn maintenance_latch_zeroes_output_without_faulting() {
        let mut c = BulletproofController::default();
        c.engage_maintenance();
        assert_eq!(c.compute_control(&[0.0, 0.1, 0.1, 0.0, 0.2, 0.2]), 0.0);
        assert_eq!(c.compute_control(&[f64::NAN]), 0.0);
        let st = c.get_status();
        assert_eq!(st.mode, Mode::Maintenance);
        assert_eq!(st.fault_count, 0);
        assert_eq!(st.tick_count, 2);

        c.release_maintenance();
        c.compute_control(&REST);
        assert_eq!(c.get_status().mode, Mode::Normal);
    }

    #[test]
    fn fault_history_is_bounded() {
        let mut c = BulletproofController::default();
        for _ in 0..(FAULT_HISTORY_CAPACITY + 25) {
            c.compute_control(&[]);
        }
        assert_eq!(c.fault_history().count(), FAULT_HISTORY_CAPACITY);
        assert_eq!(c.get_status().recent_faults.len(), STATUS_RECENT_FAULTS);
        assert_eq!(c.get_status().fault_count, (FAULT_HISTORY_CAPACITY + 25) as u64);
    }

    #[test]
    fn pid_law_integral_stays_clamped_under_constant_error() {
        let params = ControllerParameters {
            normal_law: NormalLaw::GainScheduledPid,
            ..Default::default()
        };
        let mut c = BulletproofController::new(params, SampleInterval::default()).unwrap();
        for _ in 0..500 {
            c.compute_control(&[0.2, 0.1, 0.1, 0.0, 0.0, 0.0]);
        }
        let st = c.get_status();
        assert_eq!(st.integral_windup, 1.0);
        assert!(st.saturation.integral > 0);
    }

    #[test]
    fn invalid_params_rejected_at_construction() {
        let params = ControllerParameters { max_integral: 0.0, ..Default::default() };
        assert!(BulletproofController::new(params, SampleInterval::default()).is_err());
    }

    #[test]
    fn stray_release_keeps_dwell_hold() {
        let params = ControllerParameters { mode_dwell_ticks: 50, ..Default::default() };
        let mut c = BulletproofController::new(params, SampleInterval::default()).unwrap();
        c.compute_control(&[0.0, 0.0, 0.0, 5.0, 10.0, 10.0]);
        assert_eq!(c.get_status().mode, Mode::Emergency);

        c.release_maintenance();
        c.compute_control(&REST);
        assert_eq!(c.get_status().mode, Mode::Emergency, "dwell must still hold");
        assert!(!c.in_maintenance());
    }

    #[test]
    fn safe_mode_output_is_attenuated_normal_output() {
        let frame = [0.3, 0.1, -0.05, 0.2, 0.1, -0.1];
        let mut normal = BulletproofController::default();
        let nominal = normal.compute_control(&frame);
        assert_eq!(normal.get_status().mode, Mode::Normal);

        let mut safe = BulletproofController::default();
        safe.compute_control(&[]);
        safe.compute_control(&[]);
        let attenuated = safe.compute_control(&frame);
        assert_eq!(safe.get_status().mode, Mode::Safe);
        assert!(nominal.abs() > 0.0);
        assert!((attenuated - SAFE_OUTPUT_SCALE * nominal).abs() < 1e-12);
        assert!(attenuated.abs() <= safe_bound());
    }

    /// Net SAFE authority: 20% gains, then the 0.3 output factor.
    fn safe_bound() -> f64 {
        laws::SAFE_GAIN_SCALE * SAFE_OUTPUT_SCALE * ControllerParameters::default().max_force
    }
    const SAFE_OUTPUT_SCALE: f64 = laws::SAFE_OUTPUT_SCALE;

    fn finite_frame() -> impl Strategy<Value = Vec<f64>> {
        prop::collection::vec(-100.0f64..100.0, 6)
    }

    /// States whose total energy stays below the default emergency
    /// threshold (at most 3 * 0.15 + 3 * 0.1 = 0.75).
    fn calm_frame() -> impl Strategy<Value = Vec<f64>> {
        (
            prop::collection::vec(-0.15f64..0.15, 3),
            prop::collection::vec(-0.1f64..0.1, 3),
        )
            .prop_map(|(pos, vel)| pos.into_iter().chain(vel).collect())
    }

    proptest! {
        #[test]
        fn output_bounded_for_any_finite_input(frames in prop::collection::vec(finite_frame(), 1..60)) {
            let mut c = BulletproofController::default();
            for f in &frames {
                let u = c.compute_control(f);
                prop_assert!(u.is_finite());
                prop_assert!(u.abs() <= c.params().max_force);
                if c.get_status().mode == Mode::Emergency {
                    prop_assert!(u.abs() <= 1.0);
                }
            }
        }

        #[test]
        fn consecutive_outputs_respect_rate_limit(frames in prop::collection::vec(finite_frame(), 2..60)) {
            let mut c = BulletproofController::default();
            let max_step = c.params().rate_limit * SampleInterval::default().seconds();
            let mut prev = c.compute_control(&frames[0]);
            for f in &frames[1..] {
                let u = c.compute_control(f);
                prop_assert!((u - prev).abs() <= max_step + 1e-12);
                prev = u;
            }
        }

        #[test]
        fn normal_mode_output_bounded_and_rate_limited(frames in prop::collection::vec(calm_frame(), 2..60)) {
            let mut c = BulletproofController::default();
            let max_step = c.params().rate_limit * SampleInterval::default().seconds();
            let mut prev: Option<f64> = None;
            for f in &frames {
                let u = c.compute_control(f);
                prop_assert_eq!(c.get_status().mode, Mode::Normal);
                prop_assert!(u.is_finite() && u.abs() <= c.params().max_force);
                if let Some(p) = prev {
                    prop_assert!((u - p).abs() <= max_step + 1e-12);
                }
                prev = Some(u);
            }
        }

        #[test]
        fn safe_mode_output_bounded_and_rate_limited(frames in prop::collection::vec(calm_frame(), 2..60)) {
            let mut c = BulletproofController::default();
            c.compute_control(&[]);
            c.compute_control(&[]);
            let max_step = c.params().rate_limit * SampleInterval::default().seconds();
            let mut prev: Option<f64> = None;
            for f in &frames {
                let u = c.compute_control(f);
                prop_assert_eq!(c.get_status().mode, Mode::Safe);
                prop_assert!(u.is_finite() && u.abs() <= safe_bound());
                if let Some(p) = prev {
                    prop_assert!((u - p).abs() <= max_step + 1e-12);
                }
                prev = Some(u);
            }
        }

        #[test]
        fn malformed_frames_always_cost_one_fault(len in 0usize..12, bad in any::<bool>()) {
            prop_assume!(len != 6 || bad);
            let mut frame = vec![0.0; len];
            if bad && len > 0 {
                frame[len - 1] = f64::NAN;
            }
            let mut c = BulletproofController::default();
            let before = c.get_status().fault_count;
            prop_assert_eq!(c.compute_control(&frame), 0.0);
            prop_assert_eq!(c.get_status().fault_count, before + 1);
        }
    }
}
