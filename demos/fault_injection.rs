use dip_control::control::{BulletproofController, Mode};
use dip_control::dynamics::{DipDynamics, PlantState};

/// Drive the controller by hand and corrupt the sensor frame on a schedule:
/// truncated frames, NaN, infinities. The controller must answer every one
/// with a finite force and escalate its mode as faults pile up.
fn main() {
    env_logger::init();
    let dynamics = DipDynamics::default();
    let mut controller = BulletproofController::with_interval(dynamics.interval());
    let mut state = PlantState::new(0.0, 0.05, -0.02, 0.0, 0.0, 0.0);
    let mut last_mode = Mode::Normal;

    for tick in 0..600u32 {
        let clean = state.to_array();
        let frame: Vec<f64> = match tick {
            100 | 101 => clean[..4].to_vec(),
            200 => vec![f64::NAN; 6],
            250 => {
                let mut f = clean.to_vec();
                f[4] = f64::INFINITY;
                f
            }
            _ => clean.to_vec(),
        };

        let force = controller.compute_control(&frame);
        assert!(force.is_finite());

        let status = controller.get_status();
        if status.mode != last_mode {
            println!(
                "tick {tick:>4}: {last_mode} -> {} (faults {})",
                status.mode, status.fault_count
            );
            last_mode = status.mode;
        }
        if tick == 400 {
            println!("tick {tick:>4}: operator engages maintenance");
            controller.engage_maintenance();
        }
        if tick == 450 {
            println!("tick {tick:>4}: operator releases maintenance");
            controller.release_maintenance();
        }

        state = dynamics.step(&state, force);
    }

    let status = controller.get_status();
    println!();
    println!("final mode: {}", status.mode);
    println!("faults: {} (recent: {:?})", status.fault_count, status.recent_faults);
    println!("saturation: {:?}", status.saturation);
    println!("stable: {}", DipDynamics::is_stable(&state));
}
