use std::sync::Arc;

use parking_lot::Mutex;

use super::bulletproof::{BulletproofController, ControllerStatus};
use super::controller::Controller;
use super::mode::Mode;

/// Cloneable handle for driving one controller from several threads, e.g.
/// a sensor thread computing ticks while a supervisor polls status.
///
/// Every operation holds the lock for exactly one call, so a tick is never
/// observed half-applied.
#[derive(Debug, Clone, Default)]
pub struct SharedController {
    inner: Arc<Mutex<BulletproofController>>,
}

impl SharedController {
    pub fn new(controller: BulletproofController) -> Self {
        Self { inner: Arc::new(Mutex::new(controller)) }
    }

    pub fn compute_control(&self, raw: &[f64]) -> f64 {
        self.inner.lock().compute_control(raw)
    }

    pub fn get_status(&self) -> ControllerStatus {
        self.inner.lock().get_status()
    }

    pub fn reset(&self) {
        self.inner.lock().reset();
    }

    pub fn engage_maintenance(&self) {
        self.inner.lock().engage_maintenance();
    }

    pub fn release_maintenance(&self) {
        self.inner.lock().release_maintenance();
    }
}

impl Controller for SharedController {
    fn control(&mut self, state: &[f64]) -> f64 {
        self.compute_control(state)
    }

    fn reset(&mut self) {
        SharedController::reset(self);
    }

    fn name(&self) -> &str {
        "SharedController"
    }

    fn mode(&self) -> Mode {
        self.inner.lock().get_status().mode
    }

    fn fault_count(&self) -> u64 {
        self.inner.lock().get_status().fault_count
    }
}
