//! Outer contour extraction from a binary edge map.
//!
//! Uses Suzuki-Abe border following via
//! [`imageproc::contours::find_contours`] and keeps only outermost
//! borders, reporting each as its bounding rectangle.

use image::GrayImage;
use imageproc::contours::{BorderType, Contour};

use crate::types::Rect;

/// Bounding rectangles of all outermost contours in `edges`.
///
/// Non-zero pixels are foreground. Hole borders and borders nested inside
/// another contour are skipped. Rectangles are inclusive of their edge
/// pixels, so a single foreground pixel yields a 1x1 rectangle.
#[must_use]
pub fn outer_bounding_boxes(edges: &GrayImage) -> Vec<Rect> {
    let contours: Vec<Contour<u32>> = imageproc::contours::find_contours(edges);

    contours
        .iter()
        .filter(|c| matches!(c.border_type, BorderType::Outer) && c.parent.is_none())
        .filter_map(bounding_box)
        .collect()
}

fn bounding_box(contour: &Contour<u32>) -> Option<Rect> {
    let first = contour.points.first()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for p in &contour.points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    Some(Rect::new(
        min_x,
        min_y,
        max_x - min_x + 1,
        max_y - min_y + 1,
    ))
}
