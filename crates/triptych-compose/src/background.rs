//! Near-white background removal for sticker art.

use image::GrayImage;

use crate::blur;
use crate::types::RgbaImage;

/// Channel value at or above which a pixel counts as paper white.
pub const DEFAULT_WHITE_THRESHOLD: u8 = 245;

/// Sigma used to soften the cut-out edge.
pub const DEFAULT_EDGE_SIGMA: f32 = 1.0;

/// Make near-white pixels transparent.
///
/// Pixels whose R, G and B all reach `threshold` get alpha 0, every other
/// pixel alpha 255; the resulting mask is blurred with `edge_sigma` and
/// replaces the image's alpha channel.
#[must_use = "returns the cut-out image"]
pub fn remove_background(image: &RgbaImage, threshold: u8, edge_sigma: f32) -> RgbaImage {
    let mask = GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b, _] = image.get_pixel(x, y).0;
        let white = r >= threshold && g >= threshold && b >= threshold;
        image::Luma([if white { 0 } else { 255 }])
    });
    let mask = blur::gaussian_blur(&mask, edge_sigma);

    let mut out = image.clone();
    for (x, y, p) in out.enumerate_pixels_mut() {
        p.0[3] = mask.get_pixel(x, y).0[0];
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn white_becomes_transparent_and_art_stays() {
        let img = RgbaImage::from_fn(30, 30, |x, _| {
            if x < 15 {
                image::Rgba([255, 255, 255, 255])
            } else {
                image::Rgba([200, 30, 30, 255])
            }
        });
        let cut = remove_background(&img, DEFAULT_WHITE_THRESHOLD, DEFAULT_EDGE_SIGMA);
        assert_eq!(cut.get_pixel(2, 10).0[3], 0);
        assert_eq!(cut.get_pixel(27, 10).0[3], 255);
        // Colour channels are untouched.
        assert_eq!(&cut.get_pixel(27, 10).0[..3], &[200, 30, 30]);
        // The boundary is softened.
        let edge = cut.get_pixel(15, 10).0[3];
        assert!(edge > 0 && edge < 255, "edge alpha {edge}");
    }

    #[test]
    fn hard_edge_without_blur() {
        let img = RgbaImage::from_fn(4, 1, |x, _| {
            if x < 2 {
                image::Rgba([250, 250, 250, 255])
            } else {
                image::Rgba([240, 250, 250, 255])
            }
        });
        let cut = remove_background(&img, 245, 0.0);
        let alphas: Vec<u8> = cut.pixels().map(|p| p.0[3]).collect();
        assert_eq!(alphas, vec![0, 0, 255, 255]);
    }
}
