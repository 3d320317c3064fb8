//! Image decoding and grayscale conversion.
//!
//! Accepts raw image bytes (PNG, JPEG, BMP, WebP) and produces the RGBA
//! raster every other stage works on. The region detector additionally
//! needs a single-channel view, provided by [`to_grayscale`].

use image::GrayImage;

use crate::types::{ComposeError, RgbaImage};

/// Decode raw image bytes into an RGBA raster.
///
/// Opaque formats get a fully opaque alpha channel.
///
/// # Errors
///
/// Returns [`ComposeError::EmptyInput`] if `bytes` is empty.
/// Returns [`ComposeError::ImageDecode`] if the image format is
/// unrecognized or the data is corrupt.
pub fn decode_rgba(bytes: &[u8]) -> Result<RgbaImage, ComposeError> {
    if bytes.is_empty() {
        return Err(ComposeError::EmptyInput);
    }

    let img = image::load_from_memory(bytes)?;
    Ok(img.to_rgba8())
}

/// Convert an RGBA raster to grayscale, ignoring alpha.
///
/// Uses the `image` crate's weighted luminance, so green contributes
/// more than red and red more than blue.
#[must_use = "returns the grayscale image"]
pub fn to_grayscale(image: &RgbaImage) -> GrayImage {
    image::imageops::grayscale(image)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Helper: encode an RGBA image as a PNG byte buffer.
    fn encode_png(img: &RgbaImage) -> Vec<u8> {
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgba8,
        )
        .ok();
        buf
    }

    #[test]
    fn empty_input_returns_error() {
        let result = decode_rgba(&[]);
        assert!(matches!(result, Err(ComposeError::EmptyInput)));
    }

    #[test]
    fn corrupt_bytes_returns_image_decode_error() {
        let result = decode_rgba(&[0xFF, 0xFE, 0x00, 0x01]);
        assert!(matches!(result, Err(ComposeError::ImageDecode(_))));
    }

    #[test]
    fn png_round_trips_pixels() {
        let img = RgbaImage::from_fn(17, 31, |x, y| {
            image::Rgba([u8::try_from(x).unwrap(), u8::try_from(y).unwrap(), 7, 200])
        });
        let decoded = decode_rgba(&encode_png(&img)).unwrap();
        assert_eq!(decoded, img);
    }

    #[test]
    fn grayscale_weights_green_highest() {
        let img = RgbaImage::from_fn(3, 1, |x, _| match x {
            0 => image::Rgba([255, 0, 0, 255]),
            1 => image::Rgba([0, 255, 0, 255]),
            _ => image::Rgba([0, 0, 255, 255]),
        });
        let gray = to_grayscale(&img);
        let r = gray.get_pixel(0, 0).0[0];
        let g = gray.get_pixel(1, 0).0[0];
        let b = gray.get_pixel(2, 0).0[0];
        assert!(
            g > r && r > b,
            "expected green > red > blue, got {r} {g} {b}"
        );
    }
}
