use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};

use super::{CalibrationEvent, CalibrationUi};
use crate::models::{DetectionParameters, EdgeMap};

/// Line-oriented calibration console.
///
/// Each preview is saved as a PNG at `preview_path` for an external viewer;
/// commands are read one per line:
/// `low N`, `high N`, `aperture N`, and an empty line or `ok` to confirm.
/// End of input confirms as well.
pub struct TerminalCalibration<R, W> {
    input: R,
    output: W,
    preview_path: PathBuf,
}

impl<R: BufRead, W: Write> TerminalCalibration<R, W> {
    pub fn new(input: R, output: W, preview_path: PathBuf) -> Self {
        Self {
            input,
            output,
            preview_path,
        }
    }

    pub fn preview_path(&self) -> &std::path::Path {
        &self.preview_path
    }
}

/// Parse one console line into an event.
pub fn parse_command(line: &str) -> Option<CalibrationEvent> {
    let mut parts = line.split_whitespace();
    let Some(command) = parts.next() else {
        return Some(CalibrationEvent::Confirm);
    };
    let command = command.to_ascii_lowercase();
    if matches!(command.as_str(), "ok" | "done" | "confirm") {
        return Some(CalibrationEvent::Confirm);
    }
    let value: i32 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    match command.as_str() {
        "low" | "min" => Some(CalibrationEvent::SetLow(value)),
        "high" | "max" => Some(CalibrationEvent::SetHigh(value)),
        "aperture" | "ap" => Some(CalibrationEvent::SetAperture(value)),
        _ => None,
    }
}

impl<R: BufRead, W: Write> CalibrationUi for TerminalCalibration<R, W> {
    fn render_edge_preview(&mut self, edges: &EdgeMap, params: &DetectionParameters) -> Result<()> {
        edges
            .save(&self.preview_path)
            .map_err(|e| anyhow::anyhow!("Failed to save calibration preview: {}", e))?;
        writeln!(
            self.output,
            "Edge preview of the first frame ({params}) saved to {}",
            self.preview_path.display()
        )?;
        writeln!(
            self.output,
            "Adjust with `low N`, `high N`, `aperture N`; press enter when satisfied."
        )?;
        self.output.flush()?;
        Ok(())
    }

    fn receive_update(&mut self) -> Result<CalibrationEvent> {
        loop {
            let mut line = String::new();
            let read = self
                .input
                .read_line(&mut line)
                .context("Failed to read calibration command")?;
            if read == 0 {
                return Ok(CalibrationEvent::Confirm);
            }
            match parse_command(&line) {
                Some(event) => return Ok(event),
                None => {
                    writeln!(self.output, "Unrecognized command: {}", line.trim())?;
                    self.output.flush()?;
                }
            }
        }
    }
}
