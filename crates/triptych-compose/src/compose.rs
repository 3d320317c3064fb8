//! Cell sizing and strip composition.
//!
//! Cells are resized so their main-axis extent equals a common target
//! derived from the template, then laid out along the main axis with a
//! fixed gap, each centred on the cross axis of a transparent canvas.

use image::imageops::{self, FilterType};

use crate::slice;
use crate::types::{
    ComposeConfig, ComposeError, Dimensions, Layout, Orientation, Rect, RgbaImage, SplitAxis,
    Variant,
};

/// A composed strip of cells.
#[derive(Debug, Clone)]
pub struct Strip {
    image: RgbaImage,
    cells: Vec<Rect>,
    layout: Layout,
}

impl Strip {
    /// The composed RGBA image (transparent between and around cells).
    #[must_use]
    pub const fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Consume the strip and return its image.
    #[must_use]
    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    /// Where each cell was placed inside the strip, in layout order.
    #[must_use]
    pub fn cells(&self) -> &[Rect] {
        &self.cells
    }

    /// Layout the cells were composed with.
    #[must_use]
    pub const fn layout(&self) -> Layout {
        self.layout
    }

    /// Size of the composed image.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions::of(&self.image)
    }
}

/// A strip produced from a source by [`compose_triptych`], plus what was
/// decided along the way.
#[derive(Debug, Clone)]
pub struct Triptych {
    /// The composed strip.
    pub strip: Strip,
    /// Orientation of the (possibly flipped) source.
    pub orientation: Orientation,
    /// Axis the source was cut along.
    pub split: SplitAxis,
    /// Main-axis extent every cell was resized to.
    pub cell_target: u32,
}

/// Main-axis extent each cell should be resized to.
///
/// `target_total = floor(template_extent * scale)`, then the gaps are
/// removed and the remainder shared equally:
/// `floor((target_total - (count - 1) * spacing) / count)`.
///
/// # Errors
///
/// Returns [`ComposeError::InvalidConfig`] when `count` is zero or the
/// spacing leaves no room for cells.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn cell_target(
    template_extent: u32,
    scale: f64,
    spacing: u32,
    count: u32,
) -> Result<u32, ComposeError> {
    if count == 0 {
        return Err(ComposeError::InvalidConfig(
            "panel count must be at least 1".to_owned(),
        ));
    }
    let target_total = (f64::from(template_extent) * scale).floor().max(0.0) as u64;
    let gaps = u64::from(spacing) * u64::from(count - 1);
    let cell = target_total.saturating_sub(gaps) / u64::from(count);
    if cell == 0 {
        return Err(ComposeError::InvalidConfig(format!(
            "template extent {template_extent}px at scale {scale} leaves no room for {count} cells with {spacing}px spacing"
        )));
    }
    Ok(u32::try_from(cell).unwrap_or(u32::MAX))
}

/// Size a cell would be resized to: main axis `target`, cross axis
/// `round(cross * target / main)`, never below one pixel.
///
/// When `max_cross` is set and exceeded, the cross axis is capped and the
/// main axis shrunk by the same factor.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn fitted_size(
    cell: Dimensions,
    layout: Layout,
    target: u32,
    max_cross: Option<u32>,
) -> Dimensions {
    let main = layout.main(cell).max(1);
    let cross = layout.cross(cell);

    let mut new_main = target.max(1);
    let mut new_cross = (f64::from(cross) * f64::from(new_main) / f64::from(main))
        .round()
        .max(1.0) as u32;

    if let Some(limit) = max_cross
        && new_cross > limit
    {
        let factor = f64::from(limit) / f64::from(new_cross);
        new_main = (f64::from(new_main) * factor).floor().max(1.0) as u32;
        new_cross = limit.max(1);
    }

    layout.dimensions(new_main, new_cross)
}

/// Resize a cell to [`fitted_size`] with a Lanczos filter.
#[must_use = "returns the resized cell"]
pub fn fit_cell(
    cell: &RgbaImage,
    layout: Layout,
    target: u32,
    max_cross: Option<u32>,
) -> RgbaImage {
    let size = fitted_size(Dimensions::of(cell), layout, target, max_cross);
    if size == Dimensions::of(cell) {
        return cell.clone();
    }
    imageops::resize(cell, size.width, size.height, FilterType::Lanczos3)
}

/// Lay cells out along `layout`'s main axis separated by `spacing`.
///
/// The strip's main extent is `sum(main) + (n - 1) * spacing`; its cross
/// extent is the largest cell's cross extent. Each cell is centred on the
/// cross axis. The background is fully transparent.
///
/// # Errors
///
/// Returns [`ComposeError::EmptyStrip`] if `cells` is empty.
pub fn compose(cells: &[RgbaImage], layout: Layout, spacing: u32) -> Result<Strip, ComposeError> {
    if cells.is_empty() {
        return Err(ComposeError::EmptyStrip);
    }

    let sizes: Vec<Dimensions> = cells.iter().map(Dimensions::of).collect();
    let cross = sizes.iter().map(|&d| layout.cross(d)).max().unwrap_or(0);
    let gaps = u32::try_from(cells.len() - 1).unwrap_or(u32::MAX).saturating_mul(spacing);
    let main = sizes
        .iter()
        .map(|&d| layout.main(d))
        .fold(gaps, u32::saturating_add);

    let canvas_size = layout.dimensions(main, cross);
    let mut canvas = RgbaImage::new(canvas_size.width, canvas_size.height);
    let mut placed = Vec::with_capacity(cells.len());

    let mut cursor = 0u32;
    for (cell, &size) in cells.iter().zip(&sizes) {
        let offset = (cross - layout.cross(size)) / 2;
        let (x, y) = match layout {
            Layout::Row => (cursor, offset),
            Layout::Stack => (offset, cursor),
        };
        imageops::replace(&mut canvas, cell, i64::from(x), i64::from(y));
        placed.push(Rect::new(x, y, size.width, size.height));
        cursor = cursor.saturating_add(layout.main(size)).saturating_add(spacing);
    }

    Ok(Strip {
        image: canvas,
        cells: placed,
        layout,
    })
}

/// Run Slice-Rotate-Compose on a source for a template of the given size.
///
/// 1. Optionally turn the source upside down.
/// 2. Cut it into `config.panels` panels along the variant's split axis.
/// 3. Optionally turn each panel a quarter so rows stand as columns.
/// 4. Resize every panel to the common cell target.
/// 5. Compose the strip.
///
/// # Errors
///
/// Returns [`ComposeError::InvalidConfig`] for an invalid configuration or
/// a template too small for the requested scale and spacing, and
/// [`ComposeError::SourceTooSmall`] when the source cannot be cut.
pub fn compose_triptych(
    source: &RgbaImage,
    template: Dimensions,
    config: &ComposeConfig,
) -> Result<Triptych, ComposeError> {
    config.validate()?;

    let flipped;
    let source = if config.flip {
        flipped = slice::half_turn(source);
        &flipped
    } else {
        source
    };

    let dims = Dimensions::of(source);
    let variant: Variant = config.variant;
    let split = variant.split_axis(dims);
    let layout = variant.layout();

    let mut panels = slice::slice(source, split, config.panels)?;
    if variant.rotates_slices() {
        panels = panels.iter().map(slice::quarter_turn).collect();
    }

    let target = cell_target(layout.main(template), config.scale, config.spacing, config.panels)?;
    let cells: Vec<RgbaImage> = panels
        .iter()
        .map(|p| fit_cell(p, layout, target, config.max_cross))
        .collect();

    let strip = compose(&cells, layout, config.spacing)?;
    tracing::debug!(
        source = %dims,
        strip = %strip.dimensions(),
        cell_target = target,
        ?split,
        "composed strip"
    );

    Ok(Triptych {
        strip,
        orientation: dims.orientation(),
        split,
        cell_target: target,
    })
}
