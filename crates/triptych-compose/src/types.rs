//! Shared types for the triptych compositing core.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Re-export `RgbaImage` so downstream crates can pass decoded images
/// around without depending on `image` directly.
pub use image::RgbaImage;

/// Re-export `GrayImage` for the detector's intermediate rasters.
pub use image::GrayImage;

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Create new dimensions.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Dimensions of an RGBA image.
    #[must_use]
    pub fn of(image: &RgbaImage) -> Self {
        Self::new(image.width(), image.height())
    }

    /// Portrait when strictly taller than wide; square images count as
    /// landscape.
    #[must_use]
    pub const fn orientation(self) -> Orientation {
        if self.height > self.width {
            Orientation::Portrait
        } else {
            Orientation::Landscape
        }
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// An axis-aligned rectangle relative to a template's top-left corner.
///
/// Serves both as the output of region detection and as the paste
/// target of a later run: the `paste_bbox` written into one sidecar can
/// be fed back verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge in pixels.
    pub x: u32,
    /// Top edge in pixels.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Rect {
    /// Create a new rectangle.
    #[must_use]
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Exclusive right edge.
    #[must_use]
    pub const fn right(self) -> u64 {
        self.x as u64 + self.width as u64
    }

    /// Exclusive bottom edge.
    #[must_use]
    pub const fn bottom(self) -> u64 {
        self.y as u64 + self.height as u64
    }

    /// Area in pixels.
    #[must_use]
    pub const fn area(self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Size of the rectangle.
    #[must_use]
    pub const fn dimensions(self) -> Dimensions {
        Dimensions::new(self.width, self.height)
    }

    /// Whether the rectangle lies entirely inside a canvas of the given
    /// dimensions.
    #[must_use]
    pub const fn fits_within(self, canvas: Dimensions) -> bool {
        self.right() <= canvas.width as u64 && self.bottom() <= canvas.height as u64
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.x, self.y, self.width, self.height)
    }
}

/// Parses `"x,y,width,height"`; whitespace around or instead of the
/// commas is accepted.
impl FromStr for Rect {
    type Err = ComposeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|p| !p.is_empty())
            .collect();
        let [x, y, width, height] = parts.as_slice() else {
            return Err(ComposeError::InvalidRect(s.to_owned()));
        };
        let parse = |v: &str| {
            v.parse::<u32>()
                .map_err(|_| ComposeError::InvalidRect(s.to_owned()))
        };
        let rect = Self::new(parse(x)?, parse(y)?, parse(width)?, parse(height)?);
        if rect.width == 0 || rect.height == 0 {
            return Err(ComposeError::InvalidRect(s.to_owned()));
        }
        Ok(rect)
    }
}

/// Source orientation, recorded in slice-composite sidecars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Taller than wide.
    Portrait,
    /// Wider than tall, or square.
    Landscape,
}

/// Direction in which a source image is cut into panels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitAxis {
    /// Cut along the width into vertical strips.
    Columns,
    /// Cut along the height into horizontal strips.
    Rows,
}

/// How composed cells are laid out in the strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// Left to right; main axis is width, cells centred vertically.
    Row,
    /// Top to bottom; main axis is height, cells centred horizontally.
    Stack,
}

impl Layout {
    /// Extent of `dims` along this layout's main axis.
    #[must_use]
    pub const fn main(self, dims: Dimensions) -> u32 {
        match self {
            Self::Row => dims.width,
            Self::Stack => dims.height,
        }
    }

    /// Extent of `dims` across this layout's main axis.
    #[must_use]
    pub const fn cross(self, dims: Dimensions) -> u32 {
        match self {
            Self::Row => dims.height,
            Self::Stack => dims.width,
        }
    }

    /// Build dimensions from main/cross extents.
    #[must_use]
    pub const fn dimensions(self, main: u32, cross: u32) -> Dimensions {
        match self {
            Self::Row => Dimensions::new(main, cross),
            Self::Stack => Dimensions::new(cross, main),
        }
    }
}

/// Which slicing/composition recipe to apply.
///
/// Each variant corresponds to one family of catalog outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Variant {
    /// Portrait sources split into columns, landscape into rows; cells
    /// laid out in a row sized from the template width.
    #[default]
    Auto,
    /// Always split into columns, laid out in a row.
    Vertical,
    /// Always split into rows, stacked top to bottom and sized from the
    /// template height.
    Horizontal,
    /// Split into rows, rotate each row a quarter turn so it stands
    /// upright, then lay them out in a row.
    RotatedRows,
}

impl Variant {
    /// Axis to cut a source of the given dimensions along.
    #[must_use]
    pub const fn split_axis(self, source: Dimensions) -> SplitAxis {
        match self {
            Self::Auto => match source.orientation() {
                Orientation::Portrait => SplitAxis::Columns,
                Orientation::Landscape => SplitAxis::Rows,
            },
            Self::Vertical => SplitAxis::Columns,
            Self::Horizontal | Self::RotatedRows => SplitAxis::Rows,
        }
    }

    /// Layout of the composed strip.
    #[must_use]
    pub const fn layout(self) -> Layout {
        match self {
            Self::Horizontal => Layout::Stack,
            Self::Auto | Self::Vertical | Self::RotatedRows => Layout::Row,
        }
    }

    /// Whether each slice is turned a quarter before resizing.
    #[must_use]
    pub const fn rotates_slices(self) -> bool {
        matches!(self, Self::RotatedRows)
    }

    /// Filename token appended to the source stem.
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::RotatedRows => "_C_triptych",
            Self::Auto | Self::Vertical | Self::Horizontal => "_triptych",
        }
    }

    /// Name recorded in sidecar `params.variant`.
    #[must_use]
    pub const fn record_name(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Vertical => "vertical",
            Self::Horizontal => "horizontal",
            Self::RotatedRows => "C_rows_rotated_columns",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.record_name())
    }
}

/// Configuration for Slice-Rotate-Compose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposeConfig {
    /// Slicing/composition recipe.
    pub variant: Variant,

    /// Fraction of the template's main-axis extent the strip should
    /// occupy. Must be in `(0, 1]`.
    pub scale: f64,

    /// Gap between neighbouring cells in pixels.
    pub spacing: u32,

    /// Number of panels the source is cut into.
    pub panels: u32,

    /// Optional cap on each cell's cross-axis extent. A cell that would
    /// exceed it is shrunk proportionally.
    pub max_cross: Option<u32>,

    /// Turn the whole source upside down before slicing.
    pub flip: bool,
}

impl ComposeConfig {
    /// Default strip scale relative to the template.
    pub const DEFAULT_SCALE: f64 = 0.6;
    /// Default gap between cells.
    pub const DEFAULT_SPACING: u32 = 12;
    /// Default panel count.
    pub const DEFAULT_PANELS: u32 = 3;

    /// Check the configuration before any image work is done.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::InvalidConfig`] when `scale` is outside
    /// `(0, 1]`, `panels` is zero, or `max_cross` is zero.
    pub fn validate(&self) -> Result<(), ComposeError> {
        if !(self.scale > 0.0 && self.scale <= 1.0) {
            return Err(ComposeError::InvalidConfig(format!(
                "scale must be in (0, 1], got {}",
                self.scale
            )));
        }
        if self.panels == 0 {
            return Err(ComposeError::InvalidConfig(
                "panel count must be at least 1".to_owned(),
            ));
        }
        if self.max_cross == Some(0) {
            return Err(ComposeError::InvalidConfig(
                "max cross extent must be positive".to_owned(),
            ));
        }
        Ok(())
    }
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self {
            variant: Variant::default(),
            scale: Self::DEFAULT_SCALE,
            spacing: Self::DEFAULT_SPACING,
            panels: Self::DEFAULT_PANELS,
            max_cross: None,
            flip: false,
        }
    }
}

/// Errors produced by the compositing core.
#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// Compose configuration is invalid.
    #[error("invalid compose configuration: {0}")]
    InvalidConfig(String),

    /// A rectangle string could not be parsed.
    #[error("invalid rectangle '{0}': expected x,y,width,height")]
    InvalidRect(String),

    /// The source is too small to cut into the requested panels.
    #[error("source extent {extent}px cannot be cut into {panels} panels")]
    SourceTooSmall {
        /// Extent along the split axis.
        extent: u32,
        /// Requested panel count.
        panels: u32,
    },

    /// Composition was given no cells.
    #[error("cannot compose a strip from zero cells")]
    EmptyStrip,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn rect_parses_commas_and_spaces() {
        let a: Rect = "100,50,300,150".parse().unwrap();
        let b: Rect = "100 50 300 150".parse().unwrap();
        let c: Rect = " 100, 50, 300, 150 ".parse().unwrap();
        assert_eq!(a, Rect::new(100, 50, 300, 150));
        assert_eq!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn rect_rejects_wrong_arity_and_zero_size() {
        assert!(matches!(
            "1,2,3".parse::<Rect>(),
            Err(ComposeError::InvalidRect(_))
        ));
        assert!(matches!(
            "1,2,3,x".parse::<Rect>(),
            Err(ComposeError::InvalidRect(_))
        ));
        assert!(matches!(
            "1,2,0,4".parse::<Rect>(),
            Err(ComposeError::InvalidRect(_))
        ));
    }

    #[test]
    fn rect_display_round_trips_through_parse() {
        let r = Rect::new(158, 151, 468, 355);
        assert_eq!(r.to_string().parse::<Rect>().unwrap(), r);
    }

    #[test]
    fn rect_serializes_with_flat_keys() {
        let json = serde_json::to_value(Rect::new(1, 2, 3, 4)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"x": 1, "y": 2, "width": 3, "height": 4})
        );
    }

    #[test]
    fn fits_within_checks_far_edges() {
        let canvas = Dimensions::new(100, 50);
        assert!(Rect::new(0, 0, 100, 50).fits_within(canvas));
        assert!(!Rect::new(1, 0, 100, 50).fits_within(canvas));
        assert!(!Rect::new(0, 1, 100, 50).fits_within(canvas));
    }

    #[test]
    fn square_is_landscape() {
        assert_eq!(
            Dimensions::new(10, 10).orientation(),
            Orientation::Landscape
        );
        assert_eq!(Dimensions::new(10, 11).orientation(), Orientation::Portrait);
    }

    #[test]
    fn auto_variant_splits_by_orientation() {
        assert_eq!(
            Variant::Auto.split_axis(Dimensions::new(600, 900)),
            SplitAxis::Columns
        );
        assert_eq!(
            Variant::Auto.split_axis(Dimensions::new(900, 600)),
            SplitAxis::Rows
        );
        assert_eq!(
            Variant::Vertical.split_axis(Dimensions::new(900, 600)),
            SplitAxis::Columns
        );
    }

    #[test]
    fn layout_axes() {
        let d = Dimensions::new(30, 20);
        assert_eq!(Layout::Row.main(d), 30);
        assert_eq!(Layout::Stack.main(d), 20);
        assert_eq!(Layout::Stack.dimensions(20, 30), d);
    }

    #[test]
    fn default_config_is_valid() {
        ComposeConfig::default().validate().unwrap();
    }

    #[test]
    fn invalid_scale_rejected() {
        for scale in [0.0, -0.5, 1.5, f64::NAN] {
            let config = ComposeConfig {
                scale,
                ..ComposeConfig::default()
            };
            assert!(matches!(
                config.validate(),
                Err(ComposeError::InvalidConfig(_))
            ));
        }
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: ComposeConfig =
            serde_json::from_str(r#"{"variant": "rotated-rows", "spacing": 20}"#).unwrap();
        assert_eq!(config.variant, Variant::RotatedRows);
        assert_eq!(config.spacing, 20);
        assert!(
            (config.scale - ComposeConfig::DEFAULT_SCALE).abs() < f64::EPSILON
        );
        assert_eq!(config.panels, 3);
    }
}
