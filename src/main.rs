use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::error;

use dip_control::config::DipConfig;
use dip_control::dynamics::PlantState;
use dip_control::io::{self, RunSummary};
use dip_control::sim::{simulate_with, EventKind, Integration};

/// Closed-loop double-inverted-pendulum run with the fault-tolerant controller.
#[derive(Parser, Debug)]
#[command(name = "dip-control", version, about)]
struct Cli {
    /// JSON configuration file (missing fields use defaults)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of control ticks to simulate
    #[arg(short, long)]
    steps: Option<usize>,

    /// Initial state: x,theta1,theta2,x_dot,theta1_dot,theta2_dot
    #[arg(long, value_delimiter = ',', num_args = 6, allow_negative_numbers = true)]
    initial: Option<Vec<f64>>,

    /// Integrate with RK4 instead of the model's Euler step
    #[arg(long)]
    rk4: bool,

    /// Write the trajectory as CSV
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Write the run summary as JSON
    #[arg(long)]
    json: Option<PathBuf>,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    // -----------------------------------------------------------------------
    // Configuration: file, then command-line overrides
    // -----------------------------------------------------------------------
    let mut config = match &cli.config {
        Some(path) => DipConfig::load(path)?,
        None => DipConfig::default(),
    };
    if let Some(steps) = cli.steps {
        config.sim.steps = steps;
    }
    if let Some(initial) = &cli.initial {
        config.sim.initial_state = PlantState::try_from_slice(initial)?;
    }
    if cli.rk4 {
        config.sim.integration = Integration::Rk4;
    }
    config.validate()?;

    let dynamics = config.dynamics()?;
    let mut controller = config.controller()?;

    // -----------------------------------------------------------------------
    // Run simulation
    // -----------------------------------------------------------------------
    let run = simulate_with(&dynamics, &config.sim, &mut controller);
    let summary = RunSummary::from_run(&run);
    let status = controller.get_status();

    // -----------------------------------------------------------------------
    // Print results
    // -----------------------------------------------------------------------
    let p = dynamics.params();
    let s0 = config.sim.initial_state;
    println!();
    println!("====================================================================");
    println!("  DOUBLE INVERTED PENDULUM: {}", run.controller);
    println!("====================================================================");
    println!();
    println!("  Plant");
    println!("  ──────────────────────────────────────────────────────────────────");
    println!(
        "  Cart mass:     {:>8.3} kg    Pole masses:  {:>6.3} / {:.3} kg",
        p.cart_mass, p.pole1_mass, p.pole2_mass
    );
    println!(
        "  Pole lengths:  {:>8.3} m     Damping:      {:>8.3}",
        p.pole1_length, p.damping
    );
    println!(
        "  Interval:      {:>8.4} s     ({:.0} Hz, {:?})",
        dynamics.interval().seconds(),
        dynamics.interval().hz(),
        config.sim.integration
    );
    println!(
        "  Initial:       x={:.3} th1={:.3} th2={:.3} xd={:.3} th1d={:.3} th2d={:.3}",
        s0.x, s0.theta1, s0.theta2, s0.x_dot, s0.theta1_dot, s0.theta2_dot
    );
    println!();

    println!("  Events");
    println!("  ──────────────────────────────────────────────────────────────────");
    if run.events.is_empty() {
        println!("  (none)");
    }
    for e in run.events.iter().take(20) {
        let what = match &e.kind {
            EventKind::ModeChange { from, to } => format!("MODE      {from} -> {to}"),
            EventKind::StabilityLost => "UNSTABLE  pole left the stable band".to_string(),
            EventKind::Fault { total } => format!("FAULT     total {total}"),
        };
        println!("  t={:>7.2}s  tick {:>6}  {}", e.time, e.tick, what);
    }
    if run.events.len() > 20 {
        println!("  ... {} more", run.events.len() - 20);
    }
    println!();

    println!("  Performance Summary");
    println!("  ──────────────────────────────────────────────────────────────────");
    println!(
        "  Peak |theta1|: {:>8.4} rad   Peak |theta2|: {:>8.4} rad",
        summary.peak_theta1, summary.peak_theta2
    );
    println!(
        "  Peak |x|:      {:>8.4} m     Peak |force|:  {:>8.4} N",
        summary.peak_cart_offset, summary.peak_force
    );
    for (mode, ticks) in &summary.ticks_per_mode {
        println!("  Ticks {:<12} {:>8}", format!("{mode}:"), ticks);
    }
    println!(
        "  Faults:        {:>8}       Saturated ticks: {}",
        status.fault_count, status.saturation.saturated_ticks
    );
    println!(
        "  Stable:        {:>8}       Oscillation:     {}",
        summary.stayed_stable, status.oscillation_detected
    );
    if let Some(reason) = &summary.halted {
        println!("  Halted:        {reason}");
    }
    println!();

    // -----------------------------------------------------------------------
    // Trajectory table (sampled)
    // -----------------------------------------------------------------------
    println!("  Trajectory");
    println!("  ──────────────────────────────────────────────────────────────────");
    println!(
        "  {:>7}  {:>9}  {:>9}  {:>9}  {:>9}  {:>9}",
        "t (s)", "x (m)", "th1 (rad)", "th2 (rad)", "force (N)", "mode"
    );
    println!("  {}", "─".repeat(64));

    let stride = (run.samples.len() / 25).max(1);
    for (i, s) in run.samples.iter().enumerate() {
        if i % stride != 0 && i != run.samples.len() - 1 {
            continue;
        }
        println!(
            "  {:>7.2}  {:>9.4}  {:>9.4}  {:>9.4}  {:>9.4}  {:>9}",
            s.time, s.state.x, s.state.theta1, s.state.theta2, s.force, s.mode.as_str()
        );
    }
    println!();
    println!("  Simulation: {} ticks", summary.ticks);
    println!("====================================================================");
    println!();

    // -----------------------------------------------------------------------
    // Export
    // -----------------------------------------------------------------------
    if let Some(path) = &cli.csv {
        io::write_trajectory_file(path, &run.samples)?;
        println!("  Trajectory written to {}", path.display());
    }
    if let Some(path) = &cli.json {
        io::write_summary_file(path, &summary)?;
        println!("  Summary written to {}", path.display());
    }

    Ok(())
}
