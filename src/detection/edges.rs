//! Canny-style edge detection with a selectable Sobel aperture.
//!
//! - Gradients use separable integer kernels (binomial smoothing crossed with
//!   a central difference) of size 3, 5 or 7, correlated over an `i32` copy of
//!   the frame with clamped borders.
//! - Magnitude is the L1 norm `|gx| + |gy|`, which is what the thresholds are
//!   compared against.
//! - Non-maximum suppression quantizes the gradient direction into four bins.
//!   Along the horizontal and vertical bins the comparison is asymmetric
//!   (`>` before, `>=` after) so plateaus yield one-pixel wide edges.
//! - Hysteresis grows strong pixels (`> high`) into 8-connected weak pixels
//!   (`> low`).
//!
//! Everything is integer arithmetic, so identical inputs give identical maps.
use image::{GrayImage, ImageBuffer, Luma};
use imageproc::filter::separable_filter;

use crate::models::{DetectionParameters, EdgeMap};

pub const EDGE: u8 = 255;

/// tan(22.5°) and tan(67.5°) scaled by 2^15, as integer ratios.
const TAN_22_5_Q15: i64 = 13573;
const TAN_67_5_Q15: i64 = 79109;

/// Horizontal and vertical gradients of one image.
#[derive(Debug, Clone)]
pub struct Gradients {
    pub width: usize,
    pub height: usize,
    pub gx: Vec<i32>,
    pub gy: Vec<i32>,
}

impl Gradients {
    /// L1 gradient magnitude per pixel.
    pub fn magnitude(&self) -> Vec<i32> {
        self.gx
            .iter()
            .zip(&self.gy)
            .map(|(gx, gy)| gx.abs() + gy.abs())
            .collect()
    }
}

fn binomial(n: usize) -> Vec<i32> {
    let mut row = vec![1i32];
    for _ in 0..n {
        let mut next = vec![1i32; row.len() + 1];
        for i in 1..row.len() {
            next[i] = row[i - 1] + row[i];
        }
        row = next;
    }
    row
}

/// Smoothing and derivative taps of a Sobel operator with the given aperture.
///
/// Aperture 3 gives `[1, 2, 1]` / `[-1, 0, 1]`, 5 gives `[1, 4, 6, 4, 1]` /
/// `[-1, -2, 0, 2, 1]`, 7 gives `[1, 6, 15, 20, 15, 6, 1]` /
/// `[-1, -4, -5, 0, 5, 4, 1]`.
pub fn sobel_kernels(aperture: i32) -> (Vec<i32>, Vec<i32>) {
    let size = aperture.clamp(3, 7) as usize | 1;
    let smooth = binomial(size - 1);
    let base = binomial(size - 3);
    let mut deriv = vec![0i32; size];
    for (i, &b) in base.iter().enumerate() {
        deriv[i] -= b;
        deriv[i + 2] += b;
    }
    (smooth, deriv)
}

/// Sobel gradients of a single-channel image.
pub fn image_gradients(img: &GrayImage, aperture: i32) -> Gradients {
    let (width, height) = (img.width() as usize, img.height() as usize);
    if width == 0 || height == 0 {
        return Gradients {
            width,
            height,
            gx: Vec::new(),
            gy: Vec::new(),
        };
    }
    let src: ImageBuffer<Luma<i32>, Vec<i32>> =
        ImageBuffer::from_fn(img.width(), img.height(), |x, y| Luma([img.get_pixel(x, y)[0] as i32]));
    let (smooth, deriv) = sobel_kernels(aperture);
    let gx = separable_filter(&src, &deriv, &smooth).into_raw();
    let gy = separable_filter(&src, &smooth, &deriv).into_raw();
    Gradients {
        width,
        height,
        gx,
        gy,
    }
}

/// Candidate classification after non-maximum suppression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Candidate {
    None,
    Weak,
    Strong,
}

fn suppress_non_maxima(grad: &Gradients, mag: &[i32], low: i32, high: i32) -> Vec<Candidate> {
    let (w, h) = (grad.width, grad.height);
    let at = |x: isize, y: isize| -> i32 {
        if x < 0 || y < 0 || x >= w as isize || y >= h as isize {
            0
        } else {
            mag[y as usize * w + x as usize]
        }
    };

    let mut out = vec![Candidate::None; w * h];
    for y in 0..h {
        for x in 0..w {
            let idx = y * w + x;
            let m = mag[idx];
            if m <= low {
                continue;
            }
            let (xi, yi) = (x as isize, y as isize);
            let gx = grad.gx[idx] as i64;
            let gy = grad.gy[idx] as i64;
            let ax = gx.abs();
            let ay = gy.abs() << 15;

            let is_max = if ay <= ax * TAN_22_5_Q15 {
                m > at(xi - 1, yi) && m >= at(xi + 1, yi)
            } else if ay > ax * TAN_67_5_Q15 {
                m > at(xi, yi - 1) && m >= at(xi, yi + 1)
            } else {
                let s = if (gx < 0) != (gy < 0) { -1 } else { 1 };
                m > at(xi - s, yi - 1) && m > at(xi + s, yi + 1)
            };

            if is_max {
                out[idx] = if m > high {
                    Candidate::Strong
                } else {
                    Candidate::Weak
                };
            }
        }
    }
    out
}

/// Promote weak candidates 8-connected to strong ones.
fn hysteresis(candidates: &[Candidate], w: usize, h: usize) -> EdgeMap {
    let mut edges = GrayImage::new(w as u32, h as u32);
    let mut visited = vec![false; w * h];
    let mut stack: Vec<usize> = candidates
        .iter()
        .enumerate()
        .filter(|(_, c)| **c == Candidate::Strong)
        .map(|(i, _)| i)
        .collect();
    for &i in &stack {
        visited[i] = true;
    }

    while let Some(idx) = stack.pop() {
        let (x, y) = (idx % w, idx / w);
        edges.put_pixel(x as u32, y as u32, Luma([EDGE]));
        for dy in -1isize..=1 {
            for dx in -1isize..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let nx = x as isize + dx;
                let ny = y as isize + dy;
                if nx < 0 || ny < 0 || nx >= w as isize || ny >= h as isize {
                    continue;
                }
                let n = ny as usize * w + nx as usize;
                if !visited[n] && candidates[n] != Candidate::None {
                    visited[n] = true;
                    stack.push(n);
                }
            }
        }
    }
    edges
}

/// Detect edges in a normalized frame.
pub fn detect_edges(img: &GrayImage, params: &DetectionParameters) -> EdgeMap {
    let (w, h) = (img.width() as usize, img.height() as usize);
    if w == 0 || h == 0 {
        return GrayImage::new(img.width(), img.height());
    }
    let grad = image_gradients(img, params.aperture());
    let mag = grad.magnitude();
    let candidates = suppress_non_maxima(&grad, &mag, params.low_threshold(), params.high_threshold());
    hysteresis(&candidates, w, h)
}
