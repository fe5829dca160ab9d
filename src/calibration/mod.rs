//! First-frame calibration of the edge detection parameters.
//!
//! [`CalibrationController`] is a two-state machine: it starts in
//! [`CalibrationState::AwaitingAdjustment`], accepts threshold and aperture
//! updates, and moves to [`CalibrationState::Frozen`] on [`CalibrationEvent::Confirm`].
//! Display and input live behind [`CalibrationUi`]; the controller only
//! recomputes the edge preview after each accepted change.
pub mod terminal;

use anyhow::Result;
use image::GrayImage;
use log::{debug, info};

use crate::detection::edges::detect_edges;
use crate::models::{
    DetectionParameters, EdgeMap, APERTURE_MAX, APERTURE_MIN, THRESHOLD_MAX, THRESHOLD_MIN,
};

/// Minimum distance kept between the two thresholds when one pushes the other.
pub const THRESHOLD_GAP: i32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationEvent {
    SetLow(i32),
    SetHigh(i32),
    SetAperture(i32),
    Confirm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationState {
    AwaitingAdjustment,
    Frozen,
}

/// Display and input side of the calibration loop.
pub trait CalibrationUi {
    /// Show the edge map produced by the current parameters.
    fn render_edge_preview(&mut self, edges: &EdgeMap, params: &DetectionParameters) -> Result<()>;

    /// Block until the operator changes a parameter or confirms.
    fn receive_update(&mut self) -> Result<CalibrationEvent>;
}

/// Round an aperture request to an odd value within `[3, 7]`.
pub fn coerce_aperture(value: i32) -> i32 {
    let odd = if value % 2 == 0 { value + 1 } else { value };
    odd.clamp(APERTURE_MIN, APERTURE_MAX)
}

pub struct CalibrationController {
    normalized: GrayImage,
    low: i32,
    high: i32,
    aperture: i32,
    state: CalibrationState,
}

impl CalibrationController {
    /// Start calibrating against the normalized first frame.
    pub fn new(normalized: GrayImage) -> Self {
        Self::with_initial(normalized, DetectionParameters::default())
    }

    pub fn with_initial(normalized: GrayImage, initial: DetectionParameters) -> Self {
        Self {
            normalized,
            low: initial.low_threshold(),
            high: initial.high_threshold(),
            aperture: initial.aperture(),
            state: CalibrationState::AwaitingAdjustment,
        }
    }

    pub fn state(&self) -> CalibrationState {
        self.state
    }

    /// The parameter triple currently selected.
    pub fn current(&self) -> DetectionParameters {
        DetectionParameters::from_parts_unchecked(self.low, self.high, self.aperture)
    }

    /// Edge map of the first frame under the current parameters.
    pub fn preview(&self) -> EdgeMap {
        detect_edges(&self.normalized, &self.current())
    }

    /// Apply one event, enforcing the parameter invariants on write.
    ///
    /// Returns `true` when the parameters changed and the preview is stale.
    /// Once frozen, every event is ignored.
    pub fn apply(&mut self, event: CalibrationEvent) -> bool {
        if self.state == CalibrationState::Frozen {
            return false;
        }
        let before = (self.low, self.high, self.aperture);
        match event {
            CalibrationEvent::SetLow(value) => {
                self.low = value.clamp(THRESHOLD_MIN, THRESHOLD_MAX - 1);
                if self.low >= self.high {
                    self.high = (self.low + THRESHOLD_GAP).min(THRESHOLD_MAX);
                }
            }
            CalibrationEvent::SetHigh(value) => {
                self.high = value.clamp(THRESHOLD_MIN + 1, THRESHOLD_MAX);
                if self.high <= self.low {
                    self.low = (self.high - THRESHOLD_GAP).max(THRESHOLD_MIN);
                }
            }
            CalibrationEvent::SetAperture(value) => {
                self.aperture = coerce_aperture(value);
            }
            CalibrationEvent::Confirm => {
                self.state = CalibrationState::Frozen;
                return false;
            }
        }
        before != (self.low, self.high, self.aperture)
    }

    /// Freeze and hand out the final parameters.
    pub fn freeze(&mut self) -> DetectionParameters {
        self.state = CalibrationState::Frozen;
        self.current()
    }

    /// Drive the calibration loop until the operator confirms.
    pub fn run<U: CalibrationUi + ?Sized>(mut self, ui: &mut U) -> Result<DetectionParameters> {
        ui.render_edge_preview(&self.preview(), &self.current())?;
        while self.state == CalibrationState::AwaitingAdjustment {
            let event = ui.receive_update()?;
            debug!("calibration event {event:?}");
            if self.apply(event) {
                ui.render_edge_preview(&self.preview(), &self.current())?;
            }
        }
        let params = self.freeze();
        info!("Calibration frozen: {params}");
        Ok(params)
    }
}

/// Non-interactive calibration replaying a fixed list of events.
///
/// Confirms automatically once the script runs out.
#[derive(Debug, Clone, Default)]
pub struct ScriptedCalibration {
    events: std::collections::VecDeque<CalibrationEvent>,
    pub previews: usize,
}

impl ScriptedCalibration {
    pub fn new(events: impl IntoIterator<Item = CalibrationEvent>) -> Self {
        Self {
            events: events.into_iter().collect(),
            previews: 0,
        }
    }

    /// Script that sets all three parameters and confirms.
    pub fn fixed(low: i32, high: i32, aperture: i32) -> Self {
        Self::new([
            CalibrationEvent::SetHigh(high),
            CalibrationEvent::SetLow(low),
            CalibrationEvent::SetAperture(aperture),
            CalibrationEvent::Confirm,
        ])
    }
}

impl CalibrationUi for ScriptedCalibration {
    fn render_edge_preview(&mut self, _edges: &EdgeMap, _params: &DetectionParameters) -> Result<()> {
        self.previews += 1;
        Ok(())
    }

    fn receive_update(&mut self) -> Result<CalibrationEvent> {
        Ok(self.events.pop_front().unwrap_or(CalibrationEvent::Confirm))
    }
}
