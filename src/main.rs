use clap::Parser;
use std::io;
use std::path::PathBuf;

use vid2svg::calibration::terminal::TerminalCalibration;
use vid2svg::input::{self, InputKind};
use vid2svg::source::{FfmpegSource, FrameSource, ImageSequence};
use vid2svg::{
    CalibrationUi, ChainApproximation, DetectionParameters, FramePipeline, PipelineConfig,
    ScriptedCalibration, Termination,
};

#[derive(Parser)]
#[command(name = "vid2svg")]
#[command(about = "Convert each frame of a video into an SVG of its outer contours")]
struct Cli {
    /// Video file (.mp4, .mpeg, .avi) or a directory of frame images
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Saving directory to create (must not exist)
    #[arg(short, long, value_name = "DIR")]
    out: PathBuf,

    /// Gaussian blur kernel size (odd)
    #[arg(long, default_value_t = 3)]
    ksize: u32,

    /// Shrink frames to this percentage before contour extraction
    #[arg(long, default_value_t = 70)]
    scale: u32,

    /// Worker threads for frames after the first
    #[arg(long, default_value_t = 1)]
    workers: usize,

    /// Low hysteresis threshold calibration starts from
    #[arg(long, default_value_t = 100)]
    low: i32,

    /// High hysteresis threshold calibration starts from
    #[arg(long, default_value_t = 200)]
    high: i32,

    /// Sobel aperture calibration starts from (3, 5 or 7)
    #[arg(long, default_value_t = 3)]
    aperture: i32,

    /// Keep --low/--high/--aperture without interactive calibration
    #[arg(long)]
    no_calibrate: bool,

    /// Keep only direction changes of each contour instead of every pixel
    #[arg(long)]
    simplify: bool,

    /// Where the calibration edge preview is written
    #[arg(long, value_name = "PNG")]
    preview: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn open_source(kind: &InputKind) -> anyhow::Result<Box<dyn FrameSource>> {
    Ok(match kind {
        InputKind::Video(path) => Box::new(FfmpegSource::open(path)?),
        InputKind::ImageDirectory(dir) => Box::new(ImageSequence::open(dir)?),
    })
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let (kind, out) = if args.no_calibrate {
        (
            input::validate_input(&args.input)?,
            input::require_new_dir(&args.out)?,
        )
    } else {
        let mut answers = io::stdin().lock();
        (
            input::resolve_input(&args.input, &mut answers, &mut io::stdout())?,
            input::resolve_output_dir(&args.out, &mut answers, &mut io::stdout())?,
        )
    };

    let initial = DetectionParameters::new(args.low, args.high, args.aperture)?;
    let config = PipelineConfig {
        blur_kernel: args.ksize,
        scale_percent: args.scale,
        approximation: if args.simplify {
            ChainApproximation::Simple
        } else {
            ChainApproximation::None
        },
        workers: args.workers,
        initial_parameters: initial,
        ..PipelineConfig::default()
    };
    config.validate()?;
    let pipeline = FramePipeline::new(&out).with_config(config);

    let mut source = open_source(&kind)?;
    let mut ui: Box<dyn CalibrationUi> = if args.no_calibrate {
        Box::new(ScriptedCalibration::default())
    } else {
        let preview = args
            .preview
            .unwrap_or_else(|| std::env::temp_dir().join("vid2svg_calibration_preview.png"));
        println!("--------------------------------------------------------");
        println!("Calibrating edge detection on the first frame. The settings are kept for");
        println!("every other frame, which assumes the contrast stays even through the video.");
        let console = TerminalCalibration::new(io::stdin().lock(), io::stdout(), preview);
        println!("Edge previews are written to {}", console.preview_path().display());
        Box::new(console)
    };

    let report = pipeline.run(&mut source, ui.as_mut())?;

    println!("\n=== Conversion Results ===");
    println!("Saving directory: {}", out.display());
    println!("Frames written: {}", report.frames_written);
    if let Some(params) = report.parameters {
        println!("Detection parameters: {params}");
    }
    if report.empty_frames.is_empty() {
        println!("Every frame produced at least one contour.");
    } else {
        println!(
            "No contour extracted in {} frames: {:?}",
            report.empty_frame_count(),
            report.empty_frames
        );
    }
    if let Termination::DecodeFailure(e) = &report.termination {
        println!("Stopped early: {e}");
    }

    Ok(())
}
