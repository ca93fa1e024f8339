use eframe::egui;
use egui_plot::{Line, Plot, PlotPoints};

use dip_control::control::BulletproofController;
use dip_control::dynamics::DipDynamics;
use dip_control::io::RunSummary;
use dip_control::sim::{self, Sample, SimConfig};

fn main() -> eframe::Result {
    env_logger::init();
    let dynamics = DipDynamics::default();
    let config = SimConfig { steps: 3000, ..Default::default() };
    let mut controller = BulletproofController::with_interval(dynamics.interval());
    let run = sim::simulate_with(&dynamics, &config, &mut controller);
    let summary = RunSummary::from_run(&run);

    let app = SimViz { samples: run.samples, summary };
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1200.0, 800.0]),
        ..Default::default()
    };
    eframe::run_native("Double Inverted Pendulum", options, Box::new(|_| Ok(Box::new(app))))
}

struct SimViz {
    samples: Vec<Sample>,
    summary: RunSummary,
}

impl eframe::App for SimViz {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let step = (self.samples.len() / 2000).max(1);
        let sampled: Vec<&Sample> = self.samples.iter().step_by(step).collect();

        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            ui.heading(format!("Controller: {}", self.summary.controller));
            ui.label(format!(
                "Peak |th1|: {:.3} rad  |  Peak |th2|: {:.3} rad  |  Peak |F|: {:.3} N  |  \
                 Faults: {}  |  Stable: {}",
                self.summary.peak_theta1,
                self.summary.peak_theta2,
                self.summary.peak_force,
                self.summary.final_fault_count,
                self.summary.stayed_stable,
            ));
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            let available = ui.available_size();
            let half_w = available.x / 2.0 - 8.0;
            let half_h = available.y / 2.0 - 8.0;

            ui.horizontal(|ui| {
                // Pole angles vs Time
                ui.vertical(|ui| {
                    ui.label("Pole angles (rad)");
                    let th1: PlotPoints = sampled.iter().map(|s| [s.time, s.state.theta1]).collect();
                    let th2: PlotPoints = sampled.iter().map(|s| [s.time, s.state.theta2]).collect();
                    Plot::new("angles")
                        .width(half_w)
                        .height(half_h)
                        .x_axis_label("Time (s)")
                        .show(ui, |plot_ui| {
                            plot_ui.line(Line::new("theta1", th1));
                            plot_ui.line(Line::new("theta2", th2));
                        });
                });

                // Cart position vs Time
                ui.vertical(|ui| {
                    ui.label("Cart position (m)");
                    let points: PlotPoints = sampled.iter().map(|s| [s.time, s.state.x]).collect();
                    Plot::new("cart")
                        .width(half_w)
                        .height(half_h)
                        .x_axis_label("Time (s)")
                        .show(ui, |plot_ui| {
                            plot_ui.line(Line::new("x", points));
                        });
                });
            });

            ui.horizontal(|ui| {
                // Commanded force vs Time
                ui.vertical(|ui| {
                    ui.label("Force (N)");
                    let points: PlotPoints = sampled.iter().map(|s| [s.time, s.force]).collect();
                    Plot::new("force")
                        .width(half_w)
                        .height(half_h)
                        .x_axis_label("Time (s)")
                        .show(ui, |plot_ui| {
                            plot_ui.line(Line::new("force", points));
                        });
                });

                // Phase portrait of pole 1
                ui.vertical(|ui| {
                    ui.label("Pole 1 phase portrait");
                    let points: PlotPoints = sampled
                        .iter()
                        .map(|s| [s.state.theta1, s.state.theta1_dot])
                        .collect();
                    Plot::new("phase")
                        .width(half_w)
                        .height(half_h)
                        .x_axis_label("theta1 (rad)")
                        .show(ui, |plot_ui| {
                            plot_ui.line(Line::new("theta1_dot", points));
                        });
                });
            });
        });
    }
}
