//! Region detection: find a rectangular paste target on a template.
//!
//! This module defines the [`RegionDetector`] trait for pluggable
//! detection heuristics and the [`DetectorKind`] enum selecting one at
//! runtime. Heuristics are composed into an ordered chain with
//! first-success semantics by [`detect_first`]; the chains the catalog
//! uses are [`blank_area_chain`] and [`screen_chain`].
//!
//! "Not found" is `None`, never an error. Callers fall back to a fixed
//! rectangle or manual offsets.

use serde::{Deserialize, Serialize};

use crate::types::{Rect, RgbaImage};
use crate::{blur, contour, decode, edge};

/// Which heuristic produced a detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum DetectionMethod {
    /// Per-channel brightness threshold.
    Brightness {
        /// Threshold every channel had to reach.
        threshold: u8,
    },
    /// Rec.709 luma threshold.
    Luminance {
        /// Threshold the luma had to reach.
        threshold: u8,
    },
    /// Edge/contour shape search.
    Edges,
}

/// A detected region and how it was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detection {
    /// The detected rectangle.
    #[serde(flatten)]
    pub rect: Rect,
    /// The heuristic that found it.
    #[serde(flatten)]
    pub method: DetectionMethod,
}

/// Parameters of the edge/contour heuristic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeParams {
    /// Gaussian sigma applied before Canny.
    pub blur_sigma: f32,
    /// Canny low threshold.
    pub canny_low: f32,
    /// Canny high threshold.
    pub canny_high: f32,
    /// Dilation radius (2 = 5x5 square).
    pub dilate_radius: u8,
    /// Minimum bounding-box area as a fraction of the image area.
    pub min_area_fraction: f64,
    /// Minimum width/height ratio.
    pub min_aspect: f64,
    /// Maximum width/height ratio.
    pub max_aspect: f64,
}

impl Default for EdgeParams {
    fn default() -> Self {
        Self {
            blur_sigma: blur::sigma_for_kernel(5),
            canny_low: 50.0,
            canny_high: 150.0,
            dilate_radius: 2,
            min_area_fraction: 0.005,
            min_aspect: 1.2,
            max_aspect: 6.0,
        }
    }
}

/// Selects a detection heuristic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DetectorKind {
    /// Rows/columns with enough pixels whose R, G and B all reach
    /// `threshold`. A row qualifies when its bright count is at least
    /// `max(1, floor(fraction * width))`; columns use the height.
    Brightness {
        /// Per-channel threshold.
        threshold: u8,
        /// Fraction of the cross extent a row/column must cover.
        fraction: f64,
    },
    /// Same as [`Brightness`](Self::Brightness) but thresholding Rec.709
    /// luma instead of every channel.
    Luminance {
        /// Luma threshold.
        threshold: u8,
        /// Fraction of the cross extent a row/column must cover.
        fraction: f64,
    },
    /// Blur, Canny, dilate, then pick the largest outer contour whose
    /// bounding box is big enough and wider than tall.
    Edges(EdgeParams),
}

/// Trait for detection heuristics.
pub trait RegionDetector {
    /// Look for a region in `image`.
    fn detect(&self, image: &RgbaImage) -> Option<Detection>;
}

impl RegionDetector for DetectorKind {
    fn detect(&self, image: &RgbaImage) -> Option<Detection> {
        match *self {
            Self::Brightness {
                threshold,
                fraction,
            } => mask_bounds(image, fraction, |[r, g, b, _]| {
                r >= threshold && g >= threshold && b >= threshold
            })
            .map(|rect| Detection {
                rect,
                method: DetectionMethod::Brightness { threshold },
            }),
            Self::Luminance {
                threshold,
                fraction,
            } => mask_bounds(image, fraction, |[r, g, b, _]| luma709(r, g, b) >= threshold).map(
                |rect| Detection {
                    rect,
                    method: DetectionMethod::Luminance { threshold },
                },
            ),
            Self::Edges(params) => detect_edges(image, &params).map(|rect| Detection {
                rect,
                method: DetectionMethod::Edges,
            }),
        }
    }
}

/// Run `chain` in order and return the first detection.
#[must_use]
pub fn detect_first<D: RegionDetector>(chain: &[D], image: &RgbaImage) -> Option<Detection> {
    chain.iter().find_map(|d| {
        let found = d.detect(image);
        if found.is_none() {
            tracing::debug!("detector found nothing, trying next");
        }
        found
    })
}

/// Thresholds tried, brightest first, when looking for a blank area.
pub const BRIGHTNESS_THRESHOLDS: [u8; 6] = [240, 230, 220, 200, 180, 160];

/// Chain for "the large near-white area intended for artwork".
///
/// Strict coverage (2%) at the brightest threshold first, then relaxed
/// coverage (1%) at decreasing thresholds, then luma.
#[must_use]
pub fn blank_area_chain() -> Vec<DetectorKind> {
    let mut chain = vec![DetectorKind::Brightness {
        threshold: BRIGHTNESS_THRESHOLDS[0],
        fraction: 0.02,
    }];
    chain.extend(
        BRIGHTNESS_THRESHOLDS
            .iter()
            .map(|&threshold| DetectorKind::Brightness {
                threshold,
                fraction: 0.01,
            }),
    );
    chain.push(DetectorKind::Luminance {
        threshold: 200,
        fraction: 0.01,
    });
    chain
}

/// Chain for "the laptop-screen-shaped rectangle".
#[must_use]
pub fn screen_chain() -> Vec<DetectorKind> {
    vec![DetectorKind::Edges(EdgeParams::default())]
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn luma709(r: u8, g: u8, b: u8) -> u8 {
    0.0722f64
        .mul_add(f64::from(b), 0.2126f64.mul_add(f64::from(r), 0.7152 * f64::from(g)))
        .floor()
        .clamp(0.0, 255.0) as u8
}

/// Minimum count a row/column of `extent` pixels must reach.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn coverage_floor(extent: u32, fraction: f64) -> u32 {
    ((f64::from(extent) * fraction).floor() as u32).max(1)
}

/// Bounding box of rows and columns whose matching-pixel count reaches
/// the coverage floor.
fn mask_bounds(
    image: &RgbaImage,
    fraction: f64,
    matches: impl Fn([u8; 4]) -> bool,
) -> Option<Rect> {
    let (w, h) = image.dimensions();
    let mut rows = vec![0u32; h as usize];
    let mut cols = vec![0u32; w as usize];
    for (x, y, p) in image.enumerate_pixels() {
        if matches(p.0) {
            rows[y as usize] += 1;
            cols[x as usize] += 1;
        }
    }

    let row_floor = coverage_floor(w, fraction);
    let col_floor = coverage_floor(h, fraction);
    let (min_y, max_y) = span(&rows, row_floor)?;
    let (min_x, max_x) = span(&cols, col_floor)?;

    Some(Rect::new(
        min_x,
        min_y,
        max_x - min_x + 1,
        max_y - min_y + 1,
    ))
}

/// First and last index whose count reaches `floor`.
fn span(counts: &[u32], floor: u32) -> Option<(u32, u32)> {
    let first = counts.iter().position(|&c| c >= floor)?;
    let last = counts.iter().rposition(|&c| c >= floor)?;
    Some((u32::try_from(first).ok()?, u32::try_from(last).ok()?))
}

#[allow(clippy::cast_precision_loss)]
fn detect_edges(image: &RgbaImage, params: &EdgeParams) -> Option<Rect> {
    let gray = decode::to_grayscale(image);
    let blurred = blur::gaussian_blur(&gray, params.blur_sigma);
    let edges = edge::canny(&blurred, params.canny_low, params.canny_high);
    let closed = edge::dilate(&edges, params.dilate_radius);

    let image_area = f64::from(image.width()) * f64::from(image.height());
    let min_area = image_area * params.min_area_fraction;

    let mut best: Option<Rect> = None;
    for rect in contour::outer_bounding_boxes(&closed) {
        let area = rect.area() as f64;
        if area < min_area {
            continue;
        }
        let aspect = f64::from(rect.width) / f64::from(rect.height.max(1));
        if aspect < params.min_aspect || aspect > params.max_aspect {
            continue;
        }
        if best.is_none_or(|b| rect.area() > b.area()) {
            best = Some(rect);
        }
    }
    best
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Black canvas with a solid rectangle of `color`.
    fn canvas_with_rect(w: u32, h: u32, rect: Rect, color: [u8; 3]) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, y| {
            let inside = x >= rect.x
                && x < rect.x + rect.width
                && y >= rect.y
                && y < rect.y + rect.height;
            if inside {
                image::Rgba([color[0], color[1], color[2], 255])
            } else {
                image::Rgba([0, 0, 0, 255])
            }
        })
    }

    fn within(a: Rect, b: Rect, tolerance: u32) -> bool {
        a.x.abs_diff(b.x) <= tolerance
            && a.y.abs_diff(b.y) <= tolerance
            && a.width.abs_diff(b.width) <= tolerance
            && a.height.abs_diff(b.height) <= tolerance
    }

    #[test]
    fn brightness_finds_white_rectangle() {
        let rect = Rect::new(50, 50, 200, 100);
        let img = canvas_with_rect(400, 300, rect, [255, 255, 255]);
        let found = DetectorKind::Brightness {
            threshold: 240,
            fraction: 0.02,
        }
        .detect(&img)
        .unwrap();
        assert!(within(found.rect, rect, 2), "got {:?}", found.rect);
        assert_eq!(found.method, DetectionMethod::Brightness { threshold: 240 });
    }

    #[test]
    fn brightness_ignores_sparse_noise() {
        let rect = Rect::new(50, 50, 200, 100);
        let mut img = canvas_with_rect(400, 300, rect, [250, 250, 250]);
        // A lone bright pixel far away does not reach 2% coverage.
        img.put_pixel(390, 290, image::Rgba([255, 255, 255, 255]));
        let found = DetectorKind::Brightness {
            threshold: 240,
            fraction: 0.02,
        }
        .detect(&img)
        .unwrap();
        assert_eq!(found.rect, rect);
    }

    #[test]
    fn black_image_detects_nothing() {
        let img = RgbaImage::from_pixel(50, 50, image::Rgba([0, 0, 0, 255]));
        assert!(detect_first(&blank_area_chain(), &img).is_none());
        assert!(detect_first(&screen_chain(), &img).is_none());
    }

    #[test]
    fn chain_falls_through_to_lower_threshold() {
        let rect = Rect::new(20, 30, 100, 40);
        let img = canvas_with_rect(200, 120, rect, [205, 205, 205]);
        let found = detect_first(&blank_area_chain(), &img).unwrap();
        assert_eq!(found.rect, rect);
        assert_eq!(found.method, DetectionMethod::Brightness { threshold: 200 });
    }

    #[test]
    fn chain_falls_through_to_luminance() {
        // Pure green is dim in the blue channel but bright in luma.
        let rect = Rect::new(10, 10, 60, 30);
        let img = canvas_with_rect(100, 60, rect, [120, 255, 120]);
        let found = detect_first(&blank_area_chain(), &img).unwrap();
        assert_eq!(found.rect, rect);
        assert_eq!(found.method, DetectionMethod::Luminance { threshold: 200 });
    }

    #[test]
    fn edges_find_wide_screen_shape() {
        let rect = Rect::new(60, 80, 240, 120);
        let img = canvas_with_rect(400, 300, rect, [200, 200, 200]);
        let found = detect_first(&screen_chain(), &img).unwrap();
        assert_eq!(found.method, DetectionMethod::Edges);
        // Dilation grows the outline by the kernel radius plus Canny's
        // one-pixel placement slack.
        assert!(within(found.rect, rect, 6), "got {:?}", found.rect);
    }

    #[test]
    fn edges_reject_tall_shapes() {
        let rect = Rect::new(150, 40, 80, 220);
        let img = canvas_with_rect(400, 300, rect, [200, 200, 200]);
        assert!(detect_first(&screen_chain(), &img).is_none());
    }

    #[test]
    fn detection_serializes_flat() {
        let d = Detection {
            rect: Rect::new(1, 2, 3, 4),
            method: DetectionMethod::Brightness { threshold: 230 },
        };
        let json = serde_json::to_value(d).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "x": 1, "y": 2, "width": 3, "height": 4,
                "method": "brightness", "threshold": 230
            })
        );
        let back: Detection = serde_json::from_value(json).unwrap();
        assert_eq!(back, d);
    }
}
