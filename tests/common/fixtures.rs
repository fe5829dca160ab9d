use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageBuffer, Rgb};
use tempfile::TempDir;

pub const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// Filled rectangle `[x0, x1) x [y0, y1)` painted on a frame.
#[derive(Debug, Clone, Copy)]
pub struct Rect {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
    pub color: Rgb<u8>,
}

pub fn rect(x0: u32, y0: u32, x1: u32, y1: u32, color: Rgb<u8>) -> Rect {
    Rect {
        x0,
        y0,
        x1,
        y1,
        color,
    }
}

/// Paints `rects` in order over a background; later rectangles win.
pub fn frame_with(width: u32, height: u32, background: Rgb<u8>, rects: &[Rect]) -> DynamicImage {
    let img = ImageBuffer::from_fn(width, height, |x, y| {
        rects
            .iter()
            .rev()
            .find(|r| (r.x0..r.x1).contains(&x) && (r.y0..r.y1).contains(&y))
            .map(|r| r.color)
            .unwrap_or(background)
    });
    DynamicImage::ImageRgb8(img)
}

/// 64x48 black frame with a 24x24 white square in the middle.
pub fn square_frame() -> DynamicImage {
    frame_with(64, 48, BLACK, &[rect(20, 12, 44, 36, WHITE)])
}

pub fn uniform_frame(width: u32, height: u32, color: Rgb<u8>) -> DynamicImage {
    frame_with(width, height, color, &[])
}

/// A temp directory plus a not-yet-existing output directory inside it.
/// The temp directory must be kept alive for the duration of the test.
pub fn output_dir() -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let out = dir.path().join("frames");
    (dir, out)
}

pub fn read_artifact(dir: &Path, index: usize) -> String {
    let path = dir.join(format!("svg_frame_{index}.svg"));
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {e}", path.display()))
}

pub fn path_count(svg: &str) -> usize {
    svg.matches("<path ").count()
}

/// Points of every `d` attribute in document order.
pub fn path_points(svg: &str) -> Vec<Vec<(i32, i32)>> {
    svg.lines()
        .filter_map(|line| {
            let start = line.find("d=\"")? + 3;
            let end = start + line[start..].find('"')?;
            Some(&line[start..end])
        })
        .map(|d| {
            let numbers: Vec<i32> = d
                .split_whitespace()
                .filter(|t| *t != "M" && *t != "L")
                .map(|t| t.parse().expect("coordinate"))
                .collect();
            numbers.chunks(2).map(|c| (c[0], c[1])).collect()
        })
        .collect()
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
