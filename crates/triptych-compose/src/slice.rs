//! Equal-partition slicing and quarter/half turns.
//!
//! A source is cut into `count` panels along one axis. Every panel but the
//! last gets `floor(extent / count)` pixels; the last absorbs the
//! remainder so the panels always sum to the original extent.

use image::imageops;

use crate::types::{ComposeError, Dimensions, RgbaImage, SplitAxis};

/// Offsets and lengths of `count` panels covering `extent` pixels.
///
/// Returns an empty vector when `count` is zero.
#[must_use]
pub fn partition(extent: u32, count: u32) -> Vec<(u32, u32)> {
    if count == 0 {
        return Vec::new();
    }
    let share = extent / count;
    (0..count)
        .map(|i| {
            let offset = i * share;
            let len = if i + 1 == count { extent - offset } else { share };
            (offset, len)
        })
        .collect()
}

/// Cut `image` into `count` panels along `axis`.
///
/// # Errors
///
/// Returns [`ComposeError::SourceTooSmall`] when the extent along `axis`
/// is smaller than `count`, since some panels would be empty.
pub fn slice(
    image: &RgbaImage,
    axis: SplitAxis,
    count: u32,
) -> Result<Vec<RgbaImage>, ComposeError> {
    let dims = Dimensions::of(image);
    let extent = match axis {
        SplitAxis::Columns => dims.width,
        SplitAxis::Rows => dims.height,
    };
    if count == 0 || extent < count {
        return Err(ComposeError::SourceTooSmall {
            extent,
            panels: count,
        });
    }

    let panels = partition(extent, count)
        .into_iter()
        .map(|(offset, len)| match axis {
            SplitAxis::Columns => imageops::crop_imm(image, offset, 0, len, dims.height).to_image(),
            SplitAxis::Rows => imageops::crop_imm(image, 0, offset, dims.width, len).to_image(),
        })
        .collect();
    Ok(panels)
}

/// Turn an image a quarter counter-clockwise, swapping width and height.
///
/// Applied to row panels so they stand upright as columns.
#[must_use = "returns the rotated image"]
pub fn quarter_turn(image: &RgbaImage) -> RgbaImage {
    imageops::rotate270(image)
}

/// Turn an image upside down.
#[must_use = "returns the rotated image"]
pub fn half_turn(image: &RgbaImage) -> RgbaImage {
    imageops::rotate180(image)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn partition_sums_to_extent() {
        for extent in [3, 4, 5, 99, 100, 101, 1024, 1999] {
            let parts = partition(extent, 3);
            assert_eq!(parts.len(), 3);
            let total: u32 = parts.iter().map(|&(_, len)| len).sum();
            assert_eq!(total, extent, "extent {extent}");
            assert_eq!(parts[0].1, extent / 3);
            assert_eq!(parts[1].1, extent / 3);
            assert_eq!(parts[2].1, extent - 2 * (extent / 3));
        }
    }

    #[test]
    fn partition_offsets_are_contiguous() {
        let parts = partition(100, 3);
        assert_eq!(parts, vec![(0, 33), (33, 33), (66, 34)]);
    }

    #[test]
    fn partition_zero_count_is_empty() {
        assert!(partition(100, 0).is_empty());
    }

    #[test]
    fn columns_cover_source() {
        let img = RgbaImage::from_fn(10, 4, |x, _| {
            image::Rgba([u8::try_from(x).unwrap(), 0, 0, 255])
        });
        let panels = slice(&img, SplitAxis::Columns, 3).unwrap();
        let widths: Vec<u32> = panels.iter().map(RgbaImage::width).collect();
        assert_eq!(widths, vec![3, 3, 4]);
        assert!(panels.iter().all(|p| p.height() == 4));
        // First pixel of the last panel is column 6 of the source.
        assert_eq!(panels[2].get_pixel(0, 0).0[0], 6);
    }

    #[test]
    fn rows_cover_source() {
        let img = RgbaImage::new(5, 11);
        let panels = slice(&img, SplitAxis::Rows, 3).unwrap();
        let heights: Vec<u32> = panels.iter().map(RgbaImage::height).collect();
        assert_eq!(heights, vec![3, 3, 5]);
        assert!(panels.iter().all(|p| p.width() == 5));
    }

    #[test]
    fn too_small_source_is_rejected() {
        let img = RgbaImage::new(2, 10);
        assert!(matches!(
            slice(&img, SplitAxis::Columns, 3),
            Err(ComposeError::SourceTooSmall {
                extent: 2,
                panels: 3
            })
        ));
    }

    #[test]
    fn quarter_turn_is_counter_clockwise() {
        // Mark the top-right pixel; after a counter-clockwise quarter turn
        // it ends up top-left.
        let mut img = RgbaImage::new(4, 2);
        img.put_pixel(3, 0, image::Rgba([255, 0, 0, 255]));
        let turned = quarter_turn(&img);
        assert_eq!(turned.dimensions(), (2, 4));
        assert_eq!(turned.get_pixel(0, 0).0, [255, 0, 0, 255]);
    }

    #[test]
    fn half_turn_swaps_corners() {
        let mut img = RgbaImage::new(3, 2);
        img.put_pixel(0, 0, image::Rgba([9, 9, 9, 255]));
        let turned = half_turn(&img);
        assert_eq!(turned.dimensions(), (3, 2));
        assert_eq!(turned.get_pixel(2, 1).0, [9, 9, 9, 255]);
    }
}
