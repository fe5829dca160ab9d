pub mod preprocessing;
pub mod edges;
pub mod contours;
pub mod ranking;

use image::{DynamicImage, GrayImage};
use log::debug;

use crate::models::{ContourSet, DetectionParameters, EdgeMap};
use contours::ChainApproximation;

/// Per-frame contour detection: normalize, detect edges, trace, rank.
///
/// Holds only immutable settings, so one detector can be shared by every
/// worker once calibration has frozen the parameters.
#[derive(Debug, Clone, Copy)]
pub struct ContourDetector {
    pub params: DetectionParameters,
    pub blur_kernel: u32,
    pub approximation: ChainApproximation,
}

impl ContourDetector {
    pub fn new(params: DetectionParameters) -> Self {
        Self {
            params,
            blur_kernel: preprocessing::DEFAULT_BLUR_KERNEL,
            approximation: ChainApproximation::None,
        }
    }

    pub fn with_blur_kernel(mut self, ksize: u32) -> Self {
        self.blur_kernel = ksize;
        self
    }

    pub fn with_approximation(mut self, approximation: ChainApproximation) -> Self {
        self.approximation = approximation;
        self
    }

    /// Grayscale + Gaussian blur.
    pub fn normalize(&self, img: &DynamicImage) -> GrayImage {
        preprocessing::normalize(img, self.blur_kernel)
    }

    /// Edge map of an already normalized frame.
    pub fn edges(&self, normalized: &GrayImage) -> EdgeMap {
        edges::detect_edges(normalized, &self.params)
    }

    /// Run the full detection chain on one frame.
    pub fn detect(&self, img: &DynamicImage) -> ContourSet {
        let normalized = self.normalize(img);
        let edge_map = self.edges(&normalized);
        let traced = contours::find_contours(&edge_map, self.approximation);
        debug!(
            "ContourDetector::detect {}x{} traced {} outer contours ({})",
            img.width(),
            img.height(),
            traced.len(),
            self.params
        );
        ranking::rank_by_area(traced)
    }
}

impl Default for ContourDetector {
    fn default() -> Self {
        Self::new(DetectionParameters::default())
    }
}
