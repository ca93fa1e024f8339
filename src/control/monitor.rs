use std::collections::VecDeque;

use serde::Serialize;

use crate::error::ControlFault;

pub const HISTORY_CAPACITY: usize = 100;
pub const OSCILLATION_WINDOW: usize = 10;
pub const OSCILLATION_STD_THRESHOLD: f64 = 5.0;

// ---------------------------------------------------------------------------
// Fixed-capacity ring buffer
// ---------------------------------------------------------------------------

/// Keeps the newest `capacity` items; pushing past capacity drops the oldest.
/// Storage is allocated once up front.
#[derive(Debug, Clone)]
pub struct Ring<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> Ring<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self { items: VecDeque::with_capacity(capacity), capacity }
    }

    pub fn push(&mut self, item: T) {
        if self.items.len() == self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(item);
    }

    pub fn last(&self) -> Option<&T> {
        self.items.back()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The newest `n` items, oldest first.
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &T> + Clone {
        self.items.iter().skip(self.items.len().saturating_sub(n))
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

// ---------------------------------------------------------------------------
// Fault records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FaultRecord {
    pub tick: u64,
    pub fault: ControlFault,
}

// ---------------------------------------------------------------------------
// Stability monitor
// ---------------------------------------------------------------------------

/// Observational record: written by the controller once per tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StabilityMonitor {
    max_state_magnitude: f64,
    oscillation_detected: bool,
}

impl StabilityMonitor {
    /// Fold in one accepted tick. The oscillation flag latches until reset.
    pub fn observe(&mut self, state_norm: f64, outputs: &Ring<f64>) {
        if state_norm > self.max_state_magnitude {
            self.max_state_magnitude = state_norm;
        }
        if outputs.len() > OSCILLATION_WINDOW
            && std_dev(outputs.recent(OSCILLATION_WINDOW).copied()) > OSCILLATION_STD_THRESHOLD
        {
            self.oscillation_detected = true;
        }
    }

    pub fn max_state_magnitude(&self) -> f64 {
        self.max_state_magnitude
    }

    pub fn oscillation_detected(&self) -> bool {
        self.oscillation_detected
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Population standard deviation; 0 for an empty input.
pub fn std_dev(values: impl Iterator<Item = f64> + Clone) -> f64 {
    let (n, sum) = values.clone().fold((0usize, 0.0), |(n, s), v| (n + 1, s + v));
    if n == 0 {
        return 0.0;
    }
    let mean = sum / n as f64;
    let var = values.map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
    var.sqrt()
}
