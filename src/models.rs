use image::{DynamicImage, GrayImage};
use thiserror::Error;

/// Binary edge raster: 255 marks an edge pixel, 0 everything else.
pub type EdgeMap = GrayImage;

/// Lowest value the low threshold slider accepts.
pub const THRESHOLD_MIN: i32 = 0;
/// Highest value the high threshold slider accepts.
pub const THRESHOLD_MAX: i32 = 1000;
pub const APERTURE_MIN: i32 = 3;
pub const APERTURE_MAX: i32 = 7;

/// A decoded video frame together with its position in decoding order.
#[derive(Debug, Clone)]
pub struct Frame {
    pub index: usize,
    pub image: DynamicImage,
}

impl Frame {
    pub fn new(index: usize, image: DynamicImage) -> Self {
        Self { index, image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParameterError {
    #[error("low threshold {low} must be below high threshold {high}")]
    ThresholdOrder { low: i32, high: i32 },
    #[error("threshold {0} is outside [0, 1000]")]
    ThresholdRange(i32),
    #[error("aperture {0} must be odd and within [3, 7]")]
    Aperture(i32),
}

/// Edge detection parameters, frozen after calibration.
///
/// The fields are private so that every value in circulation satisfies
/// `low < high` and an odd aperture in `[3, 7]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectionParameters {
    low_threshold: i32,
    high_threshold: i32,
    aperture: i32,
}

impl DetectionParameters {
    pub fn new(low_threshold: i32, high_threshold: i32, aperture: i32) -> Result<Self, ParameterError> {
        for t in [low_threshold, high_threshold] {
            if !(THRESHOLD_MIN..=THRESHOLD_MAX).contains(&t) {
                return Err(ParameterError::ThresholdRange(t));
            }
        }
        if low_threshold >= high_threshold {
            return Err(ParameterError::ThresholdOrder {
                low: low_threshold,
                high: high_threshold,
            });
        }
        if aperture % 2 == 0 || !(APERTURE_MIN..=APERTURE_MAX).contains(&aperture) {
            return Err(ParameterError::Aperture(aperture));
        }
        Ok(Self {
            low_threshold,
            high_threshold,
            aperture,
        })
    }

    /// Used by the calibration controller, which maintains the invariants itself.
    pub(crate) fn from_parts_unchecked(low_threshold: i32, high_threshold: i32, aperture: i32) -> Self {
        debug_assert!(low_threshold < high_threshold);
        Self {
            low_threshold,
            high_threshold,
            aperture,
        }
    }

    pub fn low_threshold(&self) -> i32 {
        self.low_threshold
    }

    pub fn high_threshold(&self) -> i32 {
        self.high_threshold
    }

    pub fn aperture(&self) -> i32 {
        self.aperture
    }
}

impl Default for DetectionParameters {
    fn default() -> Self {
        Self {
            low_threshold: 100,
            high_threshold: 200,
            aperture: 3,
        }
    }
}

impl std::fmt::Display for DetectionParameters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "low={} high={} aperture={}",
            self.low_threshold, self.high_threshold, self.aperture
        )
    }
}

/// A 2-D integer pixel coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Closed outer boundary traced from an edge map.
#[derive(Debug, Clone, PartialEq)]
pub struct Contour {
    points: Vec<Point>,
    enclosed_area: f64,
}

impl Contour {
    pub fn new(points: Vec<Point>) -> Self {
        let enclosed_area = shoelace_area(&points);
        Self {
            points,
            enclosed_area,
        }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn enclosed_area(&self) -> f64 {
        self.enclosed_area
    }

    /// Inclusive bounding box as `(min_x, min_y, max_x, max_y)`.
    pub fn bounds(&self) -> Option<(i32, i32, i32, i32)> {
        let first = self.points.first()?;
        Some(self.points.iter().fold(
            (first.x, first.y, first.x, first.y),
            |(min_x, min_y, max_x, max_y), p| {
                (min_x.min(p.x), min_y.min(p.y), max_x.max(p.x), max_y.max(p.y))
            },
        ))
    }
}

/// Planar area of a closed polygon; zero for fewer than three vertices.
pub fn shoelace_area(points: &[Point]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let twice: i64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64)
        .sum();
    twice.abs() as f64 / 2.0
}

/// Contours of one frame, ordered by enclosed area, largest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContourSet {
    contours: Vec<Contour>,
}

impl ContourSet {
    /// Wraps contours that are already ranked.
    pub(crate) fn from_ranked(contours: Vec<Contour>) -> Self {
        Self { contours }
    }

    pub fn contours(&self) -> &[Contour] {
        &self.contours
    }

    pub fn len(&self) -> usize {
        self.contours.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contours.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Contour> {
        self.contours.iter()
    }
}

impl<'a> IntoIterator for &'a ContourSet {
    type Item = &'a Contour;
    type IntoIter = std::slice::Iter<'a, Contour>;

    fn into_iter(self) -> Self::IntoIter {
        self.contours.iter()
    }
}
