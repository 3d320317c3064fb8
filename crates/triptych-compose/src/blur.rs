//! Gaussian smoothing for detection and mask softening.
//!
//! Wraps [`imageproc::filter::gaussian_blur_f32`]. The region detector
//! blurs before Canny to suppress texture edges; background removal blurs
//! its alpha mask so cut-out stickers do not get jagged borders.

use image::GrayImage;

/// Sigma equivalent to a square Gaussian kernel of side `kernel_size`.
///
/// Template geometry was tuned against a 5x5 kernel; this converts that
/// kernel size into the sigma `imageproc` expects using the conventional
/// `0.3 * ((k - 1) / 2 - 1) + 0.8` relation.
#[must_use]
pub fn sigma_for_kernel(kernel_size: u32) -> f32 {
    #[allow(clippy::cast_precision_loss)]
    let k = kernel_size.max(1) as f32;
    0.3f32.mul_add((k - 1.0).mul_add(0.5, -1.0), 0.8)
}

/// Apply Gaussian blur to a grayscale image.
///
/// Non-positive sigma values return the image unchanged, since
/// `imageproc` panics on `sigma <= 0.0`.
#[must_use = "returns the blurred image"]
pub fn gaussian_blur(image: &GrayImage, sigma: f32) -> GrayImage {
    if sigma <= 0.0 || sigma.is_nan() {
        return image.clone();
    }

    imageproc::filter::gaussian_blur_f32(image, sigma)
}
