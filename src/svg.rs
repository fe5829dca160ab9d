//! SVG rendering of ranked contours.
//!
//! One `<path>` per contour: a move to the first point, then a line to each
//! following point. Output is a pure function of the contour set and the
//! frame size, so repeated runs are byte-identical.
use std::path::Path;

use anyhow::{Context, Result};

use crate::models::{Contour, ContourSet};

pub const PATH_STYLE: &str = "fill: none; stroke: #000000; stroke-width: 1.5; stroke-linecap: square";

/// Path data (`d` attribute) of one contour.
pub fn path_data(contour: &Contour) -> String {
    let mut d = String::with_capacity(contour.len() * 10);
    for (i, p) in contour.points().iter().enumerate() {
        if i > 0 {
            d.push(' ');
        }
        let cmd = if i == 0 { 'M' } else { 'L' };
        d.push_str(&format!("{cmd} {} {}", p.x, p.y));
    }
    d
}

/// Render a full SVG document for one frame.
pub fn render_svg(contours: &ContourSet, width: u32, height: u32) -> String {
    let mut svg = String::new();
    svg.push_str("<?xml version=\"1.0\" encoding=\"utf-8\" ?>\n");
    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" version=\"1.1\" baseProfile=\"full\" \
         width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">\n"
    ));
    for contour in contours {
        svg.push_str(&format!(
            "  <path d=\"{}\" style=\"{PATH_STYLE}\" />\n",
            path_data(contour)
        ));
    }
    svg.push_str("</svg>\n");
    svg
}

/// Write the SVG document of one frame to `path`.
pub fn write_svg(path: &Path, contours: &ContourSet, width: u32, height: u32) -> Result<()> {
    std::fs::write(path, render_svg(contours, width, height))
        .with_context(|| format!("Failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::ranking::rank_by_area;
    use crate::models::Point;

    #[test]
    fn path_is_one_move_then_lines() {
        let contour = Contour::new(vec![Point::new(1, 2), Point::new(5, 2), Point::new(5, 7)]);
        assert_eq!(path_data(&contour), "M 1 2 L 5 2 L 5 7");
    }

    #[test]
    fn empty_set_renders_document_without_paths() {
        let svg = render_svg(&ContourSet::default(), 32, 24);
        assert!(svg.contains("width=\"32\" height=\"24\""));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert!(!svg.contains("<path"));
    }

    #[test]
    fn paths_follow_ranked_order() {
        let small = Contour::new(vec![Point::new(0, 0), Point::new(2, 0), Point::new(2, 2)]);
        let large = Contour::new(vec![Point::new(10, 10), Point::new(20, 10), Point::new(20, 20)]);
        let set = rank_by_area(vec![small, large]);
        let svg = render_svg(&set, 30, 30);
        let first = svg.find("M 10 10").unwrap();
        let second = svg.find("M 0 0").unwrap();
        assert!(first < second);
        assert_eq!(svg.matches("<path").count(), 2);
    }
}
