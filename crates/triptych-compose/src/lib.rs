//! triptych-compose: Pure image compositing core (sans-IO).
//!
//! Turns poster art into catalog mockups through:
//! slice -> rotate -> resize -> compose strip -> place -> paste.
//!
//! A separate region detector finds paste targets on templates without
//! manual input, and two small helpers cover sticker background removal
//! and icon letterboxing.
//!
//! This crate has **no filesystem dependencies**: it works on decoded
//! rasters and byte slices. Directory scanning, sidecars and the
//! manifest live in `triptych-catalog`.

pub mod background;
pub mod blur;
pub mod compose;
pub mod contour;
pub mod decode;
pub mod detect;
pub mod edge;
pub mod place;
pub mod slice;
pub mod types;

pub use compose::{Strip, Triptych, compose_triptych};
pub use detect::{Detection, DetectionMethod, DetectorKind, RegionDetector, detect_first};
pub use place::{PasteMode, PasteTarget, Pasted};
pub use types::{
    ComposeConfig, ComposeError, Dimensions, Layout, Orientation, Rect, RgbaImage, SplitAxis,
    Variant,
};

/// A source composed into a strip and pasted onto a template.
#[derive(Debug, Clone)]
pub struct Composite {
    /// The strip and the decisions that produced it.
    pub triptych: Triptych,
    /// The template copy with the strip pasted on.
    pub output: RgbaImage,
    /// Where the strip was pasted.
    pub bbox: Rect,
}

/// Run Slice-Rotate-Compose on `source` and paste the strip onto a copy
/// of `template` at `target`, blending with the strip's alpha.
///
/// # Errors
///
/// Returns [`ComposeError::InvalidConfig`] if `config` is invalid or the
/// template leaves no room for the cells, and
/// [`ComposeError::SourceTooSmall`] if the source cannot be cut into the
/// requested number of panels.
pub fn composite(
    source: &RgbaImage,
    template: &RgbaImage,
    config: &ComposeConfig,
    target: PasteTarget,
) -> Result<Composite, ComposeError> {
    let triptych = compose_triptych(source, Dimensions::of(template), config)?;
    let pasted = place::paste(template, triptych.strip.image(), target, PasteMode::Alpha);
    Ok(Composite {
        triptych,
        output: pasted.image,
        bbox: pasted.bbox,
    })
}
