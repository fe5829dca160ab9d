pub mod calibration;
pub mod detection;
pub mod input;
pub mod models;
pub mod pipeline;
pub mod source;
pub mod svg;

pub use calibration::{
    CalibrationController, CalibrationEvent, CalibrationState, CalibrationUi, ScriptedCalibration,
};
pub use detection::contours::ChainApproximation;
pub use detection::ContourDetector;
pub use models::{Contour, ContourSet, DetectionParameters, EdgeMap, Frame, ParameterError, Point};
pub use pipeline::{FramePipeline, PipelineConfig, PipelineReport, Termination};
pub use source::{FrameSource, FrameSourceError};
