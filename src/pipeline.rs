use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use log::{debug, info, warn};

use crate::calibration::{CalibrationController, CalibrationUi};
use crate::detection::contours::ChainApproximation;
use crate::detection::{preprocessing, ContourDetector};
use crate::models::{DetectionParameters, Frame};
use crate::source::{FrameSource, FrameSourceError};
use crate::svg;

/// Settings shared by every frame of a run.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Odd Gaussian kernel size used before edge detection
    pub blur_kernel: u32,
    /// Frames are shrunk to this percentage of their size before analysis
    pub scale_percent: u32,
    pub approximation: ChainApproximation,
    /// Worker threads for frames after the first
    pub workers: usize,
    /// Artifact file names are `{file_prefix}{index}.svg`
    pub file_prefix: String,
    /// Parameters calibration starts from
    pub initial_parameters: DetectionParameters,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            blur_kernel: preprocessing::DEFAULT_BLUR_KERNEL,
            scale_percent: 100,
            approximation: ChainApproximation::None,
            workers: 1,
            file_prefix: "svg_frame_".to_string(),
            initial_parameters: DetectionParameters::default(),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.blur_kernel % 2 == 0 {
            return Err(anyhow!("Blur kernel size must be odd, got {}", self.blur_kernel));
        }
        if !(1..=100).contains(&self.scale_percent) {
            return Err(anyhow!("Scale must be within 1..=100 percent, got {}", self.scale_percent));
        }
        if self.workers == 0 {
            return Err(anyhow!("At least one worker is required"));
        }
        Ok(())
    }
}

/// How a run ended.
#[derive(Debug)]
pub enum Termination {
    /// The frame source ran out of frames.
    Exhausted,
    /// The frame source failed before it was exhausted.
    DecodeFailure(FrameSourceError),
}

/// Summary of a finished run.
#[derive(Debug)]
pub struct PipelineReport {
    pub frames_written: usize,
    /// Indices of frames in which no contour was found, ascending
    pub empty_frames: Vec<usize>,
    /// `None` when the source produced no frame at all
    pub parameters: Option<DetectionParameters>,
    pub termination: Termination,
}

impl PipelineReport {
    pub fn empty_frame_count(&self) -> usize {
        self.empty_frames.len()
    }

    pub fn completed(&self) -> bool {
        matches!(self.termination, Termination::Exhausted)
    }
}

/// Outcome of one processed frame
#[derive(Debug, Clone, Copy)]
struct FrameOutcome {
    index: usize,
    contours: usize,
}

/// Converts a video, frame by frame, into one SVG per frame.
pub struct FramePipeline {
    output_dir: PathBuf,
    config: PipelineConfig,
}

impl FramePipeline {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            config: PipelineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_blur_kernel(mut self, ksize: u32) -> Self {
        self.config.blur_kernel = ksize;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    pub fn with_approximation(mut self, approximation: ChainApproximation) -> Self {
        self.config.approximation = approximation;
        self
    }

    pub fn with_initial_parameters(mut self, params: DetectionParameters) -> Self {
        self.config.initial_parameters = params;
        self
    }

    /// Deterministic artifact path of a frame.
    pub fn artifact_path(&self, index: usize) -> PathBuf {
        artifact_path(&self.output_dir, &self.config.file_prefix, index)
    }

    /// Calibrate on the first frame, then convert every frame of `source`.
    ///
    /// The output directory is created here and must not exist yet. A decode
    /// failure stops the run but is reported in the returned summary, not as
    /// an error; artifacts written before it are kept.
    pub fn run<S, U>(&self, source: &mut S, ui: &mut U) -> Result<PipelineReport>
    where
        S: FrameSource + ?Sized,
        U: CalibrationUi + ?Sized,
    {
        self.config.validate()?;
        std::fs::create_dir(&self.output_dir).with_context(|| {
            format!("Failed to create output directory {}", self.output_dir.display())
        })?;
        info!("Writing frames to {}", self.output_dir.display());

        let mut report = PipelineReport {
            frames_written: 0,
            empty_frames: Vec::new(),
            parameters: None,
            termination: Termination::Exhausted,
        };

        let first = match source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                warn!("Frame source is empty, nothing to convert");
                return Ok(report);
            }
            Err(e) => {
                warn!("Can't receive frame (stream end?): {e}");
                report.termination = Termination::DecodeFailure(e);
                return Ok(report);
            }
        };

        let first_image = preprocessing::resize(&first.image, self.config.scale_percent);
        let dimensions = (first.width(), first.height());
        let normalized = preprocessing::normalize(&first_image, self.config.blur_kernel);
        let params =
            CalibrationController::with_initial(normalized, self.config.initial_parameters).run(ui)?;
        report.parameters = Some(params);

        let detector = ContourDetector::new(params)
            .with_blur_kernel(self.config.blur_kernel)
            .with_approximation(self.config.approximation);
        let job = FrameJob {
            detector,
            output_dir: &self.output_dir,
            file_prefix: &self.config.file_prefix,
            scale_percent: self.config.scale_percent,
        };

        let outcome = job.process(first)?;
        report.record(outcome);

        let mut frames = CheckedFrames {
            source,
            dimensions,
        };
        let termination = if self.config.workers > 1 {
            self.run_parallel(&job, &mut frames, &mut report)?
        } else {
            self.run_sequential(&job, &mut frames, &mut report)?
        };
        report.termination = termination;
        report.empty_frames.sort_unstable();

        info!(
            "Processed {} frames, {} without contours",
            report.frames_written,
            report.empty_frame_count()
        );
        Ok(report)
    }

    fn run_sequential<S: FrameSource + ?Sized>(
        &self,
        job: &FrameJob<'_>,
        frames: &mut CheckedFrames<'_, S>,
        report: &mut PipelineReport,
    ) -> Result<Termination> {
        loop {
            match frames.next() {
                Ok(Some(frame)) => {
                    let outcome = job.process(frame)?;
                    report.record(outcome);
                }
                Ok(None) => return Ok(Termination::Exhausted),
                Err(e) => {
                    warn!("Can't receive frame (stream end?): {e}");
                    return Ok(Termination::DecodeFailure(e));
                }
            }
        }
    }

    /// Fan frames out to worker threads over a bounded channel.
    ///
    /// The source is only read from this thread, so decoding stays in order;
    /// each worker names its artifact after the frame index it received.
    /// The first failed frame stops every worker and the reading loop.
    fn run_parallel<S: FrameSource + ?Sized>(
        &self,
        job: &FrameJob<'_>,
        frames: &mut CheckedFrames<'_, S>,
        report: &mut PipelineReport,
    ) -> Result<Termination> {
        let workers = self.config.workers;
        let (sender, receiver) = mpsc::sync_channel::<Frame>(workers * 2);
        let (result_sender, result_receiver) = mpsc::channel::<Result<FrameOutcome>>();
        let stop = AtomicBool::new(false);

        let termination = std::thread::scope(|scope| {
            // Workers hold the only handles, so `send` fails once all of them quit.
            let receiver = Arc::new(Mutex::new(receiver));
            for _ in 0..workers {
                let receiver = Arc::clone(&receiver);
                let results = result_sender.clone();
                let stop = &stop;
                scope.spawn(move || {
                    while !stop.load(Ordering::Acquire) {
                        let next = match receiver.lock() {
                            Ok(guard) => guard.recv(),
                            Err(_) => break,
                        };
                        let Ok(frame) = next else { break };
                        let outcome = job.process(frame);
                        let failed = outcome.is_err();
                        if failed {
                            stop.store(true, Ordering::Release);
                        }
                        if results.send(outcome).is_err() || failed {
                            break;
                        }
                    }
                });
            }
            drop(receiver);
            drop(result_sender);

            let termination = loop {
                if stop.load(Ordering::Acquire) {
                    break None;
                }
                match frames.next() {
                    Ok(Some(frame)) => {
                        if sender.send(frame).is_err() {
                            break None;
                        }
                    }
                    Ok(None) => break Some(Termination::Exhausted),
                    Err(e) => {
                        warn!("Can't receive frame (stream end?): {e}");
                        break Some(Termination::DecodeFailure(e));
                    }
                }
            };
            drop(sender);
            termination
        });

        let mut failure = None;
        for outcome in result_receiver {
            match outcome {
                Ok(outcome) => report.record(outcome),
                Err(e) => {
                    failure.get_or_insert(e);
                }
            }
        }
        if let Some(e) = failure {
            return Err(e);
        }
        termination.ok_or_else(|| anyhow!("Workers stopped before the frame source was exhausted"))
    }
}

impl PipelineReport {
    fn record(&mut self, outcome: FrameOutcome) {
        self.frames_written += 1;
        if outcome.contours == 0 {
            warn!("No contour extracted in frame {}", outcome.index);
            self.empty_frames.push(outcome.index);
        }
    }
}

pub fn artifact_path(dir: &Path, prefix: &str, index: usize) -> PathBuf {
    dir.join(format!("{prefix}{index}.svg"))
}

/// Everything a worker needs to turn a frame into an artifact.
struct FrameJob<'a> {
    detector: ContourDetector,
    output_dir: &'a Path,
    file_prefix: &'a str,
    scale_percent: u32,
}

impl FrameJob<'_> {
    fn process(&self, frame: Frame) -> Result<FrameOutcome> {
        let image = preprocessing::resize(&frame.image, self.scale_percent);
        let contours = self.detector.detect(&image);
        let path = artifact_path(self.output_dir, self.file_prefix, frame.index);
        svg::write_svg(&path, &contours, image.width(), image.height())?;
        debug!(
            "Frame {}: {} contours -> {}",
            frame.index,
            contours.len(),
            path.display()
        );
        Ok(FrameOutcome {
            index: frame.index,
            contours: contours.len(),
        })
    }
}

/// Wraps a source and rejects frames whose size differs from the first one.
struct CheckedFrames<'a, S: ?Sized> {
    source: &'a mut S,
    dimensions: (u32, u32),
}

impl<S: FrameSource + ?Sized> CheckedFrames<'_, S> {
    fn next(&mut self) -> Result<Option<Frame>, FrameSourceError> {
        let Some(frame) = self.source.next_frame()? else {
            return Ok(None);
        };
        let (width, height) = self.dimensions;
        if (frame.width(), frame.height()) != (width, height) {
            return Err(FrameSourceError::DimensionMismatch {
                index: frame.index,
                width,
                height,
                got_width: frame.width(),
                got_height: frame.height(),
            });
        }
        Ok(Some(frame))
    }
}
