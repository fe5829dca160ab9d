use crate::models::{Contour, ContourSet};

/// Order contours by enclosed area, largest first.
///
/// The sort is stable: contours of equal area keep their extraction order.
pub fn rank_by_area(mut contours: Vec<Contour>) -> ContourSet {
    contours.sort_by(|a, b| b.enclosed_area().total_cmp(&a.enclosed_area()));
    ContourSet::from_ranked(contours)
}
