use super::mode::Mode;

/// Trait for per-tick force controllers.
///
/// Implement this to plug a custom control law into the closed-loop
/// simulation. Implementations receive the raw sensor frame and must not
/// assume it is well formed.
pub trait Controller {
    /// Compute the cart force (N) for one tick.
    fn control(&mut self, state: &[f64]) -> f64;

    /// Reset internal state (integrators, histories, counters).
    fn reset(&mut self) {}

    /// Human-readable name for logging/display.
    fn name(&self) -> &str {
        "unnamed"
    }

    /// Operating mode after the most recent tick.
    fn mode(&self) -> Mode {
        Mode::Normal
    }

    /// Cumulative faults since the last reset.
    fn fault_count(&self) -> u64 {
        0
    }
}
