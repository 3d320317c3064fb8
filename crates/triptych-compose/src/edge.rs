//! Canny edge detection and edge-map dilation.
//!
//! Wraps [`imageproc::edges::canny`] and [`imageproc::morphology::dilate`].
//! Dilation closes the small gaps Canny leaves in the outline of a screen
//! or frame so the outline traces as one contour.

use image::GrayImage;
use imageproc::distance_transform::Norm;

/// Minimum allowed Canny threshold.
///
/// A low threshold of zero marks every pixel with any gradient as a
/// candidate edge, which floods the contour stage.
pub const MIN_THRESHOLD: f32 = 1.0;
const _: () = assert!(MIN_THRESHOLD > 0.0);

/// Detect edges using the Canny algorithm.
///
/// Returns a binary image: 255 for edge pixels, 0 for non-edge. Both
/// thresholds are clamped to at least [`MIN_THRESHOLD`], and `low` is
/// clamped to at most `high`.
#[must_use = "returns the binary edge map"]
pub fn canny(image: &GrayImage, low_threshold: f32, high_threshold: f32) -> GrayImage {
    let high = high_threshold.max(MIN_THRESHOLD);
    let low = low_threshold.max(MIN_THRESHOLD).min(high);
    imageproc::edges::canny(image, low, high)
}

/// Grow edge pixels by `radius` in every direction using a square
/// structuring element (`radius = 2` is a 5x5 kernel).
#[must_use = "returns the dilated edge map"]
pub fn dilate(edges: &GrayImage, radius: u8) -> GrayImage {
    if radius == 0 {
        return edges.clone();
    }
    imageproc::morphology::dilate(edges, Norm::LInf, radius)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count_on(img: &GrayImage) -> u32 {
        img.pixels().map(|p| u32::from(p.0[0] > 0)).sum()
    }

    #[test]
    fn uniform_image_has_no_edges() {
        let img = GrayImage::from_pixel(20, 20, image::Luma([90]));
        assert_eq!(count_on(&canny(&img, 50.0, 150.0)), 0);
    }

    #[test]
    fn boundary_is_detected() {
        let img = GrayImage::from_fn(20, 20, |x, _| image::Luma([if x < 10 { 0 } else { 255 }]));
        assert!(count_on(&canny(&img, 50.0, 150.0)) > 0);
    }

    #[test]
    fn inverted_thresholds_are_clamped() {
        let img = GrayImage::from_fn(20, 20, |x, _| image::Luma([if x < 10 { 0 } else { 255 }]));
        assert_eq!(canny(&img, 200.0, 100.0), canny(&img, 100.0, 100.0));
        assert_eq!(canny(&img, 0.0, 150.0), canny(&img, MIN_THRESHOLD, 150.0));
    }

    #[test]
    fn dilation_grows_single_pixel_to_square() {
        let mut img = GrayImage::new(11, 11);
        img.put_pixel(5, 5, image::Luma([255]));
        let grown = dilate(&img, 2);
        assert_eq!(count_on(&grown), 25);
        assert_eq!(grown.get_pixel(3, 3).0[0], 255);
        assert_eq!(grown.get_pixel(7, 7).0[0], 255);
        assert_eq!(grown.get_pixel(2, 5).0[0], 0);
    }

    #[test]
    fn zero_radius_is_identity() {
        let mut img = GrayImage::new(5, 5);
        img.put_pixel(2, 2, image::Luma([255]));
        assert_eq!(dilate(&img, 0), img);
    }
}
