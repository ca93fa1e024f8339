use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::control::Mode;
use crate::error::ExportError;
use crate::sim::Sample;

/// Flat CSV row; the csv crate cannot serialise nested structs with headers.
#[derive(Debug, Serialize)]
struct TrajectoryRow {
    tick: u64,
    time: f64,
    x: f64,
    theta1: f64,
    theta2: f64,
    x_dot: f64,
    theta1_dot: f64,
    theta2_dot: f64,
    force: f64,
    mode: Mode,
    fault_count: u64,
}

impl From<&Sample> for TrajectoryRow {
    fn from(s: &Sample) -> Self {
        Self {
            tick: s.tick,
            time: s.time,
            x: s.state.x,
            theta1: s.state.theta1,
            theta2: s.state.theta2,
            x_dot: s.state.x_dot,
            theta1_dot: s.state.theta1_dot,
            theta2_dot: s.state.theta2_dot,
            force: s.force,
            mode: s.mode,
            fault_count: s.fault_count,
        }
    }
}

/// Write closed-loop samples as CSV, one row per tick.
///
/// Columns: tick, time, x, theta1, theta2, x_dot, theta1_dot, theta2_dot,
///          force, mode, fault_count
pub fn write_trajectory<W: Write>(writer: W, samples: &[Sample]) -> Result<(), ExportError> {
    let mut wtr = csv::Writer::from_writer(writer);
    for s in samples {
        wtr.serialize(TrajectoryRow::from(s))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write trajectory to a CSV file at the given path.
pub fn write_trajectory_file(path: impl AsRef<Path>, samples: &[Sample]) -> Result<(), ExportError> {
    let file = File::create(path)?;
    write_trajectory(BufWriter::new(file), samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::PlantState;

    #[test]
    fn csv_output_has_header_and_rows() {
        let samples = vec![
            Sample {
                tick: 0,
                time: 0.0,
                state: PlantState::new(0.0, 0.05, -0.03, 0.0, 0.0, 0.0),
                force: 0.0,
                mode: Mode::Normal,
                fault_count: 0,
            },
            Sample {
                tick: 1,
                time: 0.01,
                state: PlantState::new(0.0, 0.049, -0.03, 0.0, -0.1, 0.05),
                force: -0.01,
                mode: Mode::Emergency,
                fault_count: 2,
            },
        ];

        let mut buf = Vec::new();
        write_trajectory(&mut buf, &samples).unwrap();
        let output = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(
            lines[0],
            "tick,time,x,theta1,theta2,x_dot,theta1_dot,theta2_dot,force,mode,fault_count"
        );
        assert_eq!(lines.len(), 3); // header + 2 data rows
        assert!(lines[2].starts_with("1,0.01,"));
        assert!(lines[2].ends_with(",emergency,2"));
    }
}
