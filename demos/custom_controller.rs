use dip_control::control::{Controller, ControllerParameters, GainTriple, NormalLaw};
use dip_control::dynamics::{DipDynamics, PlantState};
use dip_control::io::RunSummary;
use dip_control::sim::{self, SimConfig};
use dip_control::BulletproofController;

/// Plain linear state feedback with no safety envelope at all: a baseline to
/// compare the fault-tolerant controller against.
struct LinearFeedback {
    gains: [f64; 6],
}

impl Controller for LinearFeedback {
    fn control(&mut self, state: &[f64]) -> f64 {
        let Ok(s) = PlantState::try_from_slice(state) else {
            return 0.0;
        };
        -self.gains.iter().zip(s.to_array()).map(|(k, v)| k * v).sum::<f64>()
    }

    fn name(&self) -> &str {
        "LinearFeedback"
    }
}

fn report(summary: &RunSummary) {
    println!(
        "  {:<24} peak th1 {:.4}  peak th2 {:.4}  peak |F| {:.4}  stable {}",
        summary.controller,
        summary.peak_theta1,
        summary.peak_theta2,
        summary.peak_force,
        summary.stayed_stable
    );
}

fn main() {
    env_logger::init();
    let dynamics = DipDynamics::default();
    let config = SimConfig {
        steps: 2000,
        initial_state: PlantState::new(0.0, 0.08, -0.04, 0.0, 0.0, 0.0),
        ..Default::default()
    };

    let mut linear = LinearFeedback { gains: [0.05, 0.6, 0.6, 0.1, 0.1, 0.1] };
    println!("Simulating with {} controller...", linear.name());
    report(&RunSummary::from_run(&sim::simulate_with(&dynamics, &config, &mut linear)));

    let mut energy = BulletproofController::with_interval(dynamics.interval());
    println!("Simulating with {} (energy dissipation)...", energy.name());
    report(&RunSummary::from_run(&sim::simulate_with(&dynamics, &config, &mut energy)));

    let pid_params = ControllerParameters {
        normal_law: NormalLaw::GainScheduledPid,
        angle1_gains: GainTriple::new(2.0, 0.001, 0.2),
        angle2_gains: GainTriple::new(2.0, 0.001, 0.2),
        ..Default::default()
    };
    match BulletproofController::new(pid_params, dynamics.interval()) {
        Ok(mut pid) => {
            println!("Simulating with {} (gain-scheduled PID)...", pid.name());
            report(&RunSummary::from_run(&sim::simulate_with(&dynamics, &config, &mut pid)));
        }
        Err(e) => eprintln!("invalid PID parameters: {e}"),
    }
}
