mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from vid2svg for tests
pub use vid2svg::source::InMemorySource;
pub use vid2svg::{
    CalibrationEvent, ChainApproximation, DetectionParameters, FramePipeline, PipelineConfig,
    PipelineReport, ScriptedCalibration, Termination,
};
