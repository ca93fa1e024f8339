use std::fmt;

use serde::{Deserialize, Serialize};

use crate::dynamics::state::PlantState;

// ---------------------------------------------------------------------------
// Operating modes
// ---------------------------------------------------------------------------

pub const EMERGENCY_FAULT_COUNT: u64 = 3; // strictly more escalates
pub const SAFE_FAULT_COUNT: u64 = 1;
pub const SAFE_ENERGY: f64 = 2.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Normal,
    Safe,
    Emergency,
    /// Operator latch only; never selected by classification.
    Maintenance,
}

impl Mode {
    /// Ordering used by the dwell logic: higher is more conservative.
    fn severity(self) -> u8 {
        match self {
            Mode::Normal => 0,
            Mode::Safe => 1,
            Mode::Emergency => 2,
            Mode::Maintenance => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Normal => "normal",
            Mode::Safe => "safe",
            Mode::Emergency => "emergency",
            Mode::Maintenance => "maintenance",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sum of absolute state components: cart terms plus pole terms.
pub fn total_energy(s: &PlantState) -> f64 {
    let position_energy = s.x.abs() + s.x_dot.abs();
    let angle_energy = s.theta1.abs() + s.theta2.abs() + s.theta1_dot.abs() + s.theta2_dot.abs();
    position_energy + angle_energy
}

/// Stateless classification. EMERGENCY wins over SAFE wins over NORMAL.
pub fn classify(state: &PlantState, fault_count: u64, emergency_threshold: f64) -> Mode {
    let energy = total_energy(state);
    if energy > emergency_threshold || fault_count > EMERGENCY_FAULT_COUNT {
        Mode::Emergency
    } else if fault_count > SAFE_FAULT_COUNT || energy > SAFE_ENERGY {
        Mode::Safe
    } else {
        Mode::Normal
    }
}

// ---------------------------------------------------------------------------
// Mode selector with optional de-escalation dwell
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ModeSelector {
    current: Mode,
    ticks_in_mode: u64,
    dwell_ticks: u64,
}

impl ModeSelector {
    pub fn new(dwell_ticks: u32) -> Self {
        Self { current: Mode::Normal, ticks_in_mode: 0, dwell_ticks: u64::from(dwell_ticks) }
    }

    pub fn current(&self) -> Mode {
        self.current
    }

    /// Apply a fresh classification. Escalation is immediate; de-escalation
    /// waits until the current mode has been held for `dwell_ticks`.
    /// Returns the previous mode when the mode changed.
    pub fn update(&mut self, candidate: Mode) -> Option<Mode> {
        let held = self.dwell_ticks > 0
            && candidate.severity() < self.current.severity()
            && self.ticks_in_mode < self.dwell_ticks;
        if held || candidate == self.current {
            self.ticks_in_mode += 1;
            return None;
        }
        let previous = self.current;
        self.current = candidate;
        self.ticks_in_mode = 1;
        Some(previous)
    }

    /// Unconditional switch (operator latch).
    pub fn force(&mut self, mode: Mode) -> Option<Mode> {
        if mode == self.current {
            return None;
        }
        let previous = self.current;
        self.current = mode;
        self.ticks_in_mode = 0;
        Some(previous)
    }

    pub fn reset(&mut self) {
        self.current = Mode::Normal;
        self.ticks_in_mode = 0;
    }
}
