use dip_control::dynamics::{DipDynamics, PlantState};
use dip_control::io::RunSummary;
use dip_control::sim::{self, Integration, SimConfig};

fn main() {
    env_logger::init();
    let dynamics = DipDynamics::default();

    for integration in [Integration::Euler, Integration::Rk4] {
        let config = SimConfig {
            steps: 1000,
            initial_state: PlantState::new(0.0, 0.1, 0.05, 0.0, 0.0, 0.0),
            integration,
        };
        let run = sim::simulate(&dynamics, &config);
        let summary = RunSummary::from_run(&run);

        println!("{integration:?}:");
        println!(
            "  peak |theta1| {:.4} rad, peak |theta2| {:.4} rad",
            summary.peak_theta1, summary.peak_theta2
        );
        println!(
            "  peak |force|  {:.4} N, mode changes {}",
            summary.peak_force, summary.mode_changes
        );
        println!("  ticks per mode {:?}", summary.ticks_per_mode);
        if let Some(last) = run.final_sample() {
            println!(
                "  final: t={:.2}s x={:.4} th1={:.4} th2={:.4} mode={}",
                last.time, last.state.x, last.state.theta1, last.state.theta2, last.mode
            );
        }
    }
}
