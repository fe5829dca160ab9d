//! Integration tests for first-frame calibration.
//!
//! Tests cover:
//! - Threshold coupling when one threshold crosses the other
//! - Aperture coercion to odd values in [3, 7]
//! - Preview re-rendering after every accepted change
//! - The console front end driving a full calibration

mod common;

use std::io::Cursor;

use image::GrayImage;
use vid2svg::calibration::terminal::TerminalCalibration;
use vid2svg::calibration::THRESHOLD_GAP;
use vid2svg::detection::preprocessing;
use vid2svg::{CalibrationController, CalibrationState, CalibrationUi, EdgeMap};

use common::*;

/// Records every preview it is asked to show.
struct RecordingUi {
    events: Vec<CalibrationEvent>,
    shown: Vec<(DetectionParameters, usize)>,
}

impl RecordingUi {
    fn new(events: Vec<CalibrationEvent>) -> Self {
        Self {
            events: events.into_iter().rev().collect(),
            shown: Vec::new(),
        }
    }
}

impl CalibrationUi for RecordingUi {
    fn render_edge_preview(
        &mut self,
        edges: &EdgeMap,
        params: &DetectionParameters,
    ) -> anyhow::Result<()> {
        let lit = edges.pixels().filter(|p| p[0] > 0).count();
        self.shown.push((*params, lit));
        Ok(())
    }

    fn receive_update(&mut self) -> anyhow::Result<CalibrationEvent> {
        Ok(self.events.pop().unwrap_or(CalibrationEvent::Confirm))
    }
}

fn normalized_square() -> GrayImage {
    preprocessing::normalize(&square_frame(), preprocessing::DEFAULT_BLUR_KERNEL)
}

fn thresholds(c: &CalibrationController) -> (i32, i32) {
    (c.current().low_threshold(), c.current().high_threshold())
}

#[test]
fn test_raising_low_above_high_pushes_high() {
    let mut c = CalibrationController::new(normalized_square());
    c.apply(CalibrationEvent::SetHigh(480));
    c.apply(CalibrationEvent::SetLow(500));
    assert_eq!(thresholds(&c), (500, 500 + THRESHOLD_GAP));
}

#[test]
fn test_lowering_high_below_low_pulls_low() {
    let mut c = CalibrationController::new(normalized_square());
    assert!(c.apply(CalibrationEvent::SetHigh(10)));
    assert_eq!(thresholds(&c), (0, 10));

    c.apply(CalibrationEvent::SetLow(300));
    c.apply(CalibrationEvent::SetHigh(250));
    assert_eq!(thresholds(&c), (230, 250));
}

#[test]
fn test_even_apertures_round_up() {
    let mut c = CalibrationController::new(normalized_square());
    c.apply(CalibrationEvent::SetAperture(4));
    assert_eq!(c.current().aperture(), 5);
    c.apply(CalibrationEvent::SetAperture(6));
    assert_eq!(c.current().aperture(), 7);
    c.apply(CalibrationEvent::SetAperture(9));
    assert_eq!(c.current().aperture(), 7);
    c.apply(CalibrationEvent::SetAperture(1));
    assert_eq!(c.current().aperture(), 3);
}

#[test]
fn test_every_accepted_change_rerenders_preview() -> anyhow::Result<()> {
    let mut ui = RecordingUi::new(vec![
        CalibrationEvent::SetLow(100),
        CalibrationEvent::SetHigh(900),
        CalibrationEvent::SetAperture(4),
        CalibrationEvent::Confirm,
        CalibrationEvent::SetLow(5),
    ]);

    let params = CalibrationController::new(normalized_square()).run(&mut ui)?;

    assert_eq!(params, DetectionParameters::new(100, 900, 5)?);
    // Initial preview, then one per change; SetLow(100) is a no-op and the
    // event after Confirm is never read.
    let rendered: Vec<DetectionParameters> = ui.shown.iter().map(|(p, _)| *p).collect();
    assert_eq!(
        rendered,
        vec![
            DetectionParameters::new(100, 200, 3)?,
            DetectionParameters::new(100, 900, 3)?,
            DetectionParameters::new(100, 900, 5)?,
        ]
    );
    assert!(ui.shown[0].1 > 0, "default parameters find the square");
    assert_eq!(ui.events, vec![CalibrationEvent::SetLow(5)]);

    Ok(())
}

#[test]
fn test_frozen_parameters_cannot_change() {
    let mut c = CalibrationController::new(normalized_square());
    c.apply(CalibrationEvent::SetLow(40));
    let frozen = c.freeze();
    assert_eq!(c.state(), CalibrationState::Frozen);
    assert!(!c.apply(CalibrationEvent::SetLow(70)));
    assert_eq!(c.current(), frozen);
}

#[test]
fn test_console_calibration_writes_preview_png() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let preview = dir.path().join("preview.png");
    let input = Cursor::new("high 400\nlow 450\naperture 6\n\n");
    let mut output = Vec::new();
    let mut ui = TerminalCalibration::new(input, &mut output, preview.clone());

    let params = CalibrationController::new(normalized_square()).run(&mut ui)?;
    drop(ui);

    assert_eq!(params, DetectionParameters::new(450, 470, 7)?);
    let saved = image::open(&preview)?.to_luma8();
    assert_eq!(saved.dimensions(), (64, 48));
    let text = String::from_utf8(output)?;
    assert!(text.contains("low=450 high=470 aperture=7"));

    Ok(())
}
