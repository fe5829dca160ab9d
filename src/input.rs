//! Checks performed before a run: the input must exist and be a supported
//! video or an image directory, and the output directory must be new.
//! The `resolve_*` variants ask for a replacement instead of failing.
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::source::has_extension;

/// Container extensions accepted for video input.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mpeg", "avi"];

#[derive(Debug, Error)]
pub enum InputError {
    #[error("input file '{0}' not found")]
    NotFound(PathBuf),
    #[error("input file '{0}' format not supported, expected .mp4, .avi or .mpeg")]
    UnsupportedFormat(PathBuf),
    #[error("saving directory '{0}' already exists")]
    OutputExists(PathBuf),
    #[error("no alternative saving directory given")]
    NoAlternative,
    #[error("no alternative input file given")]
    NoAlternativeInput,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// What kind of frame source an input path names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputKind {
    Video(PathBuf),
    ImageDirectory(PathBuf),
}

pub fn validate_input(path: &Path) -> Result<InputKind, InputError> {
    if !path.exists() {
        return Err(InputError::NotFound(path.to_path_buf()));
    }
    if path.is_dir() {
        return Ok(InputKind::ImageDirectory(path.to_path_buf()));
    }
    if !has_extension(path, VIDEO_EXTENSIONS) {
        return Err(InputError::UnsupportedFormat(path.to_path_buf()));
    }
    Ok(InputKind::Video(path.to_path_buf()))
}

/// Validate `path`, asking for another input while it is missing or unsupported.
///
/// Each answer is checked again; an empty answer gives up.
pub fn resolve_input<R: BufRead, W: Write>(
    path: &Path,
    input: &mut R,
    output: &mut W,
) -> Result<InputKind, InputError> {
    let mut candidate = path.to_path_buf();
    loop {
        let request = match validate_input(&candidate) {
            Ok(kind) => return Ok(kind),
            Err(InputError::NotFound(p)) => {
                format!("Input file '{}' not found. Please input another video", p.display())
            }
            Err(InputError::UnsupportedFormat(p)) => format!(
                "Input file '{}' format not supported. Please input another video with type .mp4, .avi or .mpeg",
                p.display()
            ),
            Err(e) => return Err(e),
        };
        writeln!(output, "{request}")?;
        output.flush()?;

        let mut line = String::new();
        input.read_line(&mut line)?;
        let answer = line.trim();
        if answer.is_empty() {
            return Err(InputError::NoAlternativeInput);
        }
        candidate = PathBuf::from(answer);
    }
}

/// Return `path` if it does not exist yet, otherwise ask for another name.
///
/// Answers are resolved against the parent of `path` unless absolute. Asking
/// repeats until a free name is given; an empty answer gives up.
pub fn resolve_output_dir<R: BufRead, W: Write>(
    path: &Path,
    input: &mut R,
    output: &mut W,
) -> Result<PathBuf, InputError> {
    let mut candidate = path.to_path_buf();
    while candidate.exists() {
        writeln!(
            output,
            "Saving directory '{}' already exists. Please input another saving directory name",
            candidate.display()
        )?;
        output.flush()?;

        let mut line = String::new();
        input.read_line(&mut line)?;
        let answer = line.trim();
        if answer.is_empty() {
            return Err(InputError::NoAlternative);
        }
        let answer = Path::new(answer);
        candidate = if answer.is_absolute() {
            answer.to_path_buf()
        } else {
            path.parent()
                .map(|p| p.join(answer))
                .unwrap_or_else(|| answer.to_path_buf())
        };
    }
    Ok(candidate)
}

/// Non-interactive variant: an existing directory is an error.
pub fn require_new_dir(path: &Path) -> Result<PathBuf, InputError> {
    if path.exists() {
        Err(InputError::OutputExists(path.to_path_buf()))
    } else {
        Ok(path.to_path_buf())
    }
}
