//! Frame supply.
//!
//! A [`FrameSource`] yields frames in decoding order. `Ok(None)` means the
//! stream is exhausted; an `Err` is a decode failure and ends processing.
use std::collections::VecDeque;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};

use image::{DynamicImage, RgbImage};
use log::debug;
use thiserror::Error;

use crate::models::Frame;

#[derive(Debug, Error)]
pub enum FrameSourceError {
    #[error("failed to decode frame {index}: {message}")]
    Decode { index: usize, message: String },
    #[error("frame {index} is truncated ({got} of {expected} bytes)")]
    Truncated {
        index: usize,
        got: usize,
        expected: usize,
    },
    #[error("frame {index} is {got_width}x{got_height}, expected {width}x{height}")]
    DimensionMismatch {
        index: usize,
        width: u32,
        height: u32,
        got_width: u32,
        got_height: u32,
    },
    #[error("failed to probe {path}: {message}")]
    Probe { path: PathBuf, message: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, FrameSourceError>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn next_frame(&mut self) -> Result<Option<Frame>, FrameSourceError> {
        (**self).next_frame()
    }
}

/// Frames held in memory, optionally interleaved with injected failures.
#[derive(Debug, Default)]
pub struct InMemorySource {
    items: VecDeque<Result<DynamicImage, FrameSourceError>>,
    next_index: usize,
}

impl InMemorySource {
    pub fn new(frames: impl IntoIterator<Item = DynamicImage>) -> Self {
        Self {
            items: frames.into_iter().map(Ok).collect(),
            next_index: 0,
        }
    }

    /// Queue a decode failure after the frames pushed so far.
    pub fn push_failure(&mut self, message: impl Into<String>) {
        let index = self.next_index + self.items.len();
        self.items.push_back(Err(FrameSourceError::Decode {
            index,
            message: message.into(),
        }));
    }

    pub fn push(&mut self, frame: DynamicImage) {
        self.items.push_back(Ok(frame));
    }
}

impl FrameSource for InMemorySource {
    fn next_frame(&mut self) -> Result<Option<Frame>, FrameSourceError> {
        match self.items.pop_front() {
            None => Ok(None),
            Some(item) => {
                let index = self.next_index;
                self.next_index += 1;
                item.map(|image| Some(Frame::new(index, image)))
            }
        }
    }
}

/// Image files of one directory, decoded in file-name order.
pub struct ImageSequence {
    paths: VecDeque<PathBuf>,
    next_index: usize,
}

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "gif", "tif", "tiff", "webp"];

impl ImageSequence {
    pub fn open(dir: &Path) -> Result<Self, FrameSourceError> {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && has_extension(p, IMAGE_EXTENSIONS))
            .collect();
        paths.sort();
        debug!("ImageSequence::open {} frames in {}", paths.len(), dir.display());
        Ok(Self {
            paths: paths.into(),
            next_index: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

pub(crate) fn has_extension(path: &Path, allowed: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| allowed.iter().any(|a| e.eq_ignore_ascii_case(a)))
        .unwrap_or(false)
}

impl FrameSource for ImageSequence {
    fn next_frame(&mut self) -> Result<Option<Frame>, FrameSourceError> {
        let Some(path) = self.paths.pop_front() else {
            return Ok(None);
        };
        let index = self.next_index;
        self.next_index += 1;
        let image = image::open(&path).map_err(|e| FrameSourceError::Decode {
            index,
            message: format!("{}: {}", path.display(), e),
        })?;
        Ok(Some(Frame::new(index, image)))
    }
}

/// Packed 8-bit RGB frames of a known size read back to back.
pub struct RawVideoReader<R> {
    reader: R,
    width: u32,
    height: u32,
    next_index: usize,
}

impl<R: Read> RawVideoReader<R> {
    pub fn new(reader: R, width: u32, height: u32) -> Self {
        Self {
            reader,
            width,
            height,
            next_index: 0,
        }
    }

    fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }

    /// Fill `buf` as far as the stream allows; returns the bytes read.
    fn read_full(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }
}

impl<R: Read> FrameSource for RawVideoReader<R> {
    fn next_frame(&mut self) -> Result<Option<Frame>, FrameSourceError> {
        let expected = self.frame_len();
        let mut buf = vec![0u8; expected];
        let got = self.read_full(&mut buf)?;
        let index = self.next_index;
        if got == 0 {
            return Ok(None);
        }
        if got < expected {
            return Err(FrameSourceError::Truncated {
                index,
                got,
                expected,
            });
        }
        self.next_index += 1;
        let image = RgbImage::from_raw(self.width, self.height, buf).ok_or(
            FrameSourceError::Decode {
                index,
                message: "buffer does not match frame size".to_string(),
            },
        )?;
        Ok(Some(Frame::new(index, DynamicImage::ImageRgb8(image))))
    }
}

/// Video file decoded by an `ffmpeg` child process.
pub struct FfmpegSource {
    child: Child,
    frames: RawVideoReader<ChildStdout>,
    finished: bool,
}

/// Query the first video stream's size with `ffprobe`.
pub fn probe_dimensions(path: &Path) -> Result<(u32, u32), FrameSourceError> {
    let probe_err = |message: String| FrameSourceError::Probe {
        path: path.to_path_buf(),
        message,
    };
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height",
            "-of",
            "csv=p=0:s=x",
        ])
        .arg(path)
        .output()
        .map_err(|e| probe_err(format!("cannot run ffprobe: {e}")))?;
    if !output.status.success() {
        return Err(probe_err(String::from_utf8_lossy(&output.stderr).trim().to_string()));
    }
    parse_dimensions(&String::from_utf8_lossy(&output.stdout))
        .ok_or_else(|| probe_err("no video stream found".to_string()))
}

fn parse_dimensions(text: &str) -> Option<(u32, u32)> {
    let line = text.lines().find(|l| !l.trim().is_empty())?;
    let (w, h) = line.trim().trim_end_matches('x').split_once('x')?;
    Some((w.trim().parse().ok()?, h.trim().parse().ok()?))
}

impl FfmpegSource {
    pub fn open(path: &Path) -> Result<Self, FrameSourceError> {
        let (width, height) = probe_dimensions(path)?;
        debug!("FfmpegSource::open {} ({}x{})", path.display(), width, height);
        let mut child = Command::new("ffmpeg")
            .args(["-v", "error", "-nostdin", "-i"])
            .arg(path)
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()?;
        let stdout = child.stdout.take().ok_or_else(|| FrameSourceError::Decode {
            index: 0,
            message: "ffmpeg stdout is not captured".to_string(),
        })?;
        Ok(Self {
            child,
            frames: RawVideoReader::new(stdout, width, height),
            finished: false,
        })
    }
}

impl FrameSource for FfmpegSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, FrameSourceError> {
        if self.finished {
            return Ok(None);
        }
        let next = self.frames.next_frame();
        if let Ok(None) = next {
            self.finished = true;
            let status = self.child.wait()?;
            if !status.success() {
                return Err(FrameSourceError::Decode {
                    index: self.frames.next_index,
                    message: format!("ffmpeg exited with {status}"),
                });
            }
        }
        next
    }
}

impl Drop for FfmpegSource {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ffprobe_csv() {
        assert_eq!(parse_dimensions("1920x1080\n"), Some((1920, 1080)));
        assert_eq!(parse_dimensions("640x480x\n"), Some((640, 480)));
        assert_eq!(parse_dimensions(""), None);
    }

    #[test]
    fn raw_reader_splits_frames_and_flags_truncation() {
        let mut bytes = vec![10u8; 2 * 2 * 3 * 2];
        bytes.extend_from_slice(&[1, 2, 3]);
        let mut reader = RawVideoReader::new(std::io::Cursor::new(bytes), 2, 2);
        assert_eq!(reader.next_frame().unwrap().unwrap().index, 0);
        assert_eq!(reader.next_frame().unwrap().unwrap().index, 1);
        match reader.next_frame() {
            Err(FrameSourceError::Truncated { index, got, expected }) => {
                assert_eq!((index, got, expected), (2, 3, 12));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn raw_reader_ends_cleanly_on_frame_boundary() {
        let bytes = vec![0u8; 4 * 3 * 3];
        let mut reader = RawVideoReader::new(std::io::Cursor::new(bytes), 4, 3);
        assert!(reader.next_frame().unwrap().is_some());
        assert!(reader.next_frame().unwrap().is_none());
    }

    #[test]
    fn memory_source_reports_injected_failure_after_frames() {
        let mut source = InMemorySource::new([DynamicImage::new_rgb8(2, 2)]);
        source.push_failure("corrupt packet");
        assert_eq!(source.next_frame().unwrap().unwrap().index, 0);
        match source.next_frame() {
            Err(FrameSourceError::Decode { index, .. }) => assert_eq!(index, 1),
            other => panic!("unexpected {other:?}"),
        }
        assert!(source.next_frame().unwrap().is_none());
    }
}
