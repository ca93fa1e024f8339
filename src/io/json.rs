use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::control::Mode;
use crate::dynamics::DipDynamics;
use crate::error::ExportError;
use crate::sim::{EventKind, Sample, SimRun};

/// Summary statistics computed from a closed-loop run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub controller: String,
    pub ticks: u64,
    pub duration_s: f64,
    pub peak_theta1: f64,
    pub peak_theta2: f64,
    pub peak_cart_offset: f64,
    pub peak_force: f64,
    pub final_fault_count: u64,
    pub mode_changes: usize,
    pub ticks_per_mode: BTreeMap<String, u64>,
    pub stayed_stable: bool,
    /// Tick at which a pole first left the stable band, if it did.
    pub stability_lost_at: Option<u64>,
    pub halted: Option<String>,
}

impl RunSummary {
    /// Compute summary from run data. The initial sample counts towards the
    /// peaks but not towards `ticks_per_mode`.
    pub fn from_run(run: &SimRun) -> Self {
        let peak = |f: fn(&Sample) -> f64| {
            run.samples.iter().map(f).fold(0.0_f64, f64::max)
        };

        let mut ticks_per_mode = BTreeMap::new();
        for mode in [Mode::Normal, Mode::Safe, Mode::Emergency, Mode::Maintenance] {
            ticks_per_mode.insert(mode.to_string(), 0);
        }
        for s in run.samples.iter().skip(1) {
            *ticks_per_mode.entry(s.mode.to_string()).or_insert(0) += 1;
        }

        let last = run.samples.last();

        RunSummary {
            controller: run.controller.clone(),
            ticks: last.map_or(0, |s| s.tick),
            duration_s: last.map_or(0.0, |s| s.time),
            peak_theta1: peak(|s| s.state.theta1.abs()),
            peak_theta2: peak(|s| s.state.theta2.abs()),
            peak_cart_offset: peak(|s| s.state.x.abs()),
            peak_force: peak(|s| s.force.abs()),
            final_fault_count: last.map_or(0, |s| s.fault_count),
            mode_changes: run
                .events
                .iter()
                .filter(|e| matches!(e.kind, EventKind::ModeChange { .. }))
                .count(),
            ticks_per_mode,
            stayed_stable: run.stayed_stable(),
            stability_lost_at: run
                .samples
                .iter()
                .find(|s| !DipDynamics::is_stable(&s.state))
                .map(|s| s.tick),
            halted: run.halted.map(|e| e.to_string()),
        }
    }
}

/// Write run summary as pretty JSON to a writer.
pub fn write_summary<W: Write>(writer: W, summary: &RunSummary) -> Result<(), ExportError> {
    serde_json::to_writer_pretty(writer, summary)?;
    Ok(())
}

/// Write run summary JSON to a file.
pub fn write_summary_file(path: impl AsRef<Path>, summary: &RunSummary) -> Result<(), ExportError> {
    let mut out = BufWriter::new(File::create(path)?);
    write_summary(&mut out, summary)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}
