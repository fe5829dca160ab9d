use image::{GrayImage, Luma};
use imageproc::contours::{find_contours as trace_borders, BorderType};

use crate::models::{Contour, EdgeMap, Point};

/// Contours with fewer points than this are dropped.
pub const MIN_CONTOUR_POINTS: usize = 3;

/// How many boundary pixels of a traced contour are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChainApproximation {
    /// Every boundary pixel, in traversal order.
    #[default]
    None,
    /// Only the pixels where the step direction changes.
    Simple,
}

/// Copy of the edge map with a one-pixel background margin.
///
/// The border follower does not start outer borders in the first column, so
/// shapes touching the frame edge would otherwise be missed.
fn pad(edges: &EdgeMap) -> GrayImage {
    let mut padded = GrayImage::new(edges.width() + 2, edges.height() + 2);
    for (x, y, pixel) in edges.enumerate_pixels() {
        if pixel[0] > 0 {
            padded.put_pixel(x + 1, y + 1, Luma([255]));
        }
    }
    padded
}

/// Find the outer contours of an edge map.
///
/// Holes and every border nested inside another contour are discarded.
/// Tracing starts at the first boundary pixel in raster order.
pub fn find_contours(edges: &EdgeMap, approximation: ChainApproximation) -> Vec<Contour> {
    if edges.pixels().all(|p| p[0] == 0) {
        return Vec::new();
    }

    trace_borders::<i32>(&pad(edges))
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .map(|c| {
            let points: Vec<Point> = c
                .points
                .iter()
                .map(|p| Point::new(p.x - 1, p.y - 1))
                .collect();
            match approximation {
                ChainApproximation::None => points,
                ChainApproximation::Simple => compress_runs(&points),
            }
        })
        .filter(|points| points.len() >= MIN_CONTOUR_POINTS)
        .map(Contour::new)
        .collect()
}

/// Keep only the points of a closed chain where the step direction changes.
pub fn compress_runs(points: &[Point]) -> Vec<Point> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }
    let step = |a: Point, b: Point| ((b.x - a.x).signum(), (b.y - a.y).signum());
    let kept: Vec<Point> = (0..n)
        .filter(|&i| {
            let prev = points[(i + n - 1) % n];
            let next = points[(i + 1) % n];
            step(prev, points[i]) != step(points[i], next)
        })
        .map(|i| points[i])
        .collect();
    if kept.len() < MIN_CONTOUR_POINTS {
        points.to_vec()
    } else {
        kept
    }
}
