//! Template paste: choose where an image goes on a template and
//! composite it onto a copy of the template.
//!
//! Placement is resolved by [`resolve`] into a final [`Rect`] before any
//! pixels move. Every resolved rectangle lies inside the template: an
//! image larger than the template is shrunk to fit and positions are
//! clamped to the canvas.

use image::imageops::{self, FilterType};
use image::RgbImage;

use crate::types::{Dimensions, Rect, RgbaImage, Variant};

/// Margin kept between a strip and the template's edges when placing
/// relative to a detected region.
pub const EDGE_MARGIN: u32 = 8;

/// Gap left between a strip and the top of a detected region.
pub const REGION_MARGIN: u32 = 12;

/// Paste y-offset used when nothing else decides the position.
pub const DEFAULT_Y_OFFSET: u32 = 150;

/// Paste y-offset used by [`Variant::RotatedRows`] outputs.
pub const ROTATED_ROWS_Y_OFFSET: u32 = 120;

/// Fallback target area when neither a reference placement nor a
/// detected region is available.
pub const DEFAULT_RECT: Rect = Rect::new(158, 151, 468, 355);

/// Where to put an image on a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasteTarget {
    /// Stretch the image to exactly this rectangle.
    Exact(Rect),
    /// Centre over a detected region and sit just above it.
    AboveRegion(Rect),
    /// Fixed offsets; `None` centres on that axis.
    Offset {
        /// Left edge, or centred.
        x: Option<u32>,
        /// Top edge, or centred.
        y: Option<u32>,
    },
    /// Fit inside the rectangle preserving aspect ratio, centred in it.
    FitInside(Rect),
    /// Scale to the rectangle's width and centre vertically in it.
    FitWidth(Rect),
}

/// How source pixels combine with the template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PasteMode {
    /// Blend using the pasted image's alpha channel.
    #[default]
    Alpha,
    /// Overwrite template pixels.
    Opaque,
}

/// A template with an image composited onto it.
#[derive(Debug, Clone)]
pub struct Pasted {
    /// The composited copy of the template.
    pub image: RgbaImage,
    /// Where the image ended up, in template coordinates.
    pub bbox: Rect,
}

impl Variant {
    /// Default paste target for strips of this variant.
    ///
    /// A detected region wins over offsets, except for
    /// [`Variant::Horizontal`] whose stacked strip is always centred
    /// vertically (and horizontally unless `x_offset` is non-zero).
    #[must_use]
    pub fn paste_target(
        self,
        region: Option<Rect>,
        x_offset: Option<u32>,
        y_offset: Option<u32>,
    ) -> PasteTarget {
        match (self, region) {
            (Self::Horizontal, _) => PasteTarget::Offset {
                x: x_offset.filter(|&x| x > 0),
                y: None,
            },
            (_, Some(region)) => PasteTarget::AboveRegion(region),
            (Self::RotatedRows, None) => PasteTarget::Offset {
                x: None,
                y: Some(y_offset.unwrap_or(ROTATED_ROWS_Y_OFFSET)),
            },
            (_, None) => PasteTarget::Offset {
                x: None,
                y: Some(y_offset.unwrap_or(DEFAULT_Y_OFFSET)),
            },
        }
    }
}

/// Aspect-preserving scale factor that fits `image` inside `rect`.
#[must_use]
pub fn fit_scale(image: Dimensions, rect: Rect) -> f64 {
    let sw = f64::from(image.width.max(1));
    let sh = f64::from(image.height.max(1));
    (f64::from(rect.width) / sw).min(f64::from(rect.height) / sh)
}

/// Resolve a paste target for an image of size `image` on a template of
/// size `template`.
///
/// The returned rectangle may differ in size from `image` (exact and fit
/// targets resize); it is always inside the template.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn resolve(image: Dimensions, template: Dimensions, target: PasteTarget) -> Rect {
    let tw = i64::from(template.width);
    let th = i64::from(template.height);
    let margin = i64::from(EDGE_MARGIN);

    let (x, y, size) = match target {
        PasteTarget::Exact(rect) => (i64::from(rect.x), i64::from(rect.y), rect.dimensions()),
        PasteTarget::AboveRegion(region) => {
            let sw = i64::from(image.width);
            let sh = i64::from(image.height);
            let ry = i64::from(region.y);
            let mut x = i64::from(region.x) + (i64::from(region.width) - sw).div_euclid(2);
            let mut y = ry - sh - i64::from(REGION_MARGIN);
            if y < margin {
                // No room above the region: tuck just inside its top edge.
                y = margin.max(ry + margin);
            }
            x = margin.max(x.min(tw - sw - margin));
            (x, y, image)
        }
        PasteTarget::Offset { x, y } => {
            let cx = (tw - i64::from(image.width)).div_euclid(2);
            let cy = (th - i64::from(image.height)).div_euclid(2);
            (
                x.map_or(cx, i64::from),
                y.map_or(cy, i64::from),
                image,
            )
        }
        PasteTarget::FitInside(rect) => {
            let scale = fit_scale(image, rect);
            let w = (f64::from(image.width) * scale).floor().max(1.0) as u32;
            let h = (f64::from(image.height) * scale).floor().max(1.0) as u32;
            let x = i64::from(rect.x) + (i64::from(rect.width) - i64::from(w)).div_euclid(2);
            let y = i64::from(rect.y) + (i64::from(rect.height) - i64::from(h)).div_euclid(2);
            (x, y, Dimensions::new(w, h))
        }
        PasteTarget::FitWidth(rect) => {
            let w = rect.width.max(1);
            let h = (f64::from(image.height) * f64::from(w) / f64::from(image.width.max(1)))
                .floor()
                .max(1.0) as u32;
            let y = i64::from(rect.y) + (i64::from(rect.height) - i64::from(h)).div_euclid(2);
            (i64::from(rect.x), y, Dimensions::new(w, h))
        }
    };

    clamp_into(x, y, size, template)
}

/// Shrink `size` to fit the template (preserving aspect ratio) and clamp
/// the position so the rectangle lies entirely inside it.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn clamp_into(x: i64, y: i64, size: Dimensions, template: Dimensions) -> Rect {
    let mut size = size;
    if size.width > template.width || size.height > template.height {
        let factor = (f64::from(template.width) / f64::from(size.width.max(1)))
            .min(f64::from(template.height) / f64::from(size.height.max(1)));
        size = Dimensions::new(
            ((f64::from(size.width) * factor).floor() as u32).clamp(1, template.width.max(1)),
            ((f64::from(size.height) * factor).floor() as u32).clamp(1, template.height.max(1)),
        );
    }

    let max_x = i64::from(template.width.saturating_sub(size.width));
    let max_y = i64::from(template.height.saturating_sub(size.height));
    let x = x.clamp(0, max_x);
    let y = y.clamp(0, max_y);

    Rect::new(
        u32::try_from(x).unwrap_or(0),
        u32::try_from(y).unwrap_or(0),
        size.width,
        size.height,
    )
}

/// Composite `image` onto a copy of `template` at `target`.
///
/// The image is resized (Lanczos) when the resolved rectangle differs
/// from its own size. The template itself is left untouched.
#[must_use = "returns the composited template"]
pub fn paste(
    template: &RgbaImage,
    image: &RgbaImage,
    target: PasteTarget,
    mode: PasteMode,
) -> Pasted {
    let bbox = resolve(Dimensions::of(image), Dimensions::of(template), target);

    let resized;
    let image = if bbox.dimensions() == Dimensions::of(image) {
        image
    } else {
        resized = imageops::resize(image, bbox.width, bbox.height, FilterType::Lanczos3);
        &resized
    };

    let mut out = template.clone();
    let (x, y) = (i64::from(bbox.x), i64::from(bbox.y));
    match mode {
        PasteMode::Alpha => imageops::overlay(&mut out, image, x, y),
        PasteMode::Opaque => imageops::replace(&mut out, image, x, y),
    }
    tracing::debug!(%bbox, ?mode, "pasted onto template");

    Pasted { image: out, bbox }
}

/// Drop the alpha channel for encoding as an opaque format.
#[must_use = "returns the flattened image"]
pub fn flatten(image: RgbaImage) -> RgbImage {
    image::DynamicImage::ImageRgba8(image).into_rgb8()
}

/// Shrink `image` to fit a transparent `size` canvas (never enlarging it)
/// and centre it there. Used for icon sets.
#[must_use = "returns the letterboxed image"]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn letterbox(image: &RgbaImage, size: Dimensions) -> RgbaImage {
    let scale = fit_scale(
        Dimensions::of(image),
        Rect::new(0, 0, size.width, size.height),
    )
    .min(1.0);
    let w = ((f64::from(image.width()) * scale).round() as u32).clamp(1, size.width.max(1));
    let h = ((f64::from(image.height()) * scale).round() as u32).clamp(1, size.height.max(1));
    let thumb = imageops::resize(image, w, h, FilterType::Lanczos3);

    let mut canvas = RgbaImage::new(size.width, size.height);
    let x = (size.width - w) / 2;
    let y = (size.height - h) / 2;
    imageops::overlay(&mut canvas, &thumb, i64::from(x), i64::from(y));
    canvas
}
