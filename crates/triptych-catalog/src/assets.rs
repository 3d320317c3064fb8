//! Sticker cut-outs and site icons.

use std::path::{Path, PathBuf};

use triptych_compose::background::{self, DEFAULT_EDGE_SIGMA, DEFAULT_WHITE_THRESHOLD};
use triptych_compose::{Dimensions, place};

use crate::batch::{BatchSummary, Outcome};
use crate::{CatalogError, files};

/// Icon file names and their square sizes.
pub const ICON_SIZES: [(&str, u32); 5] = [
    ("logo-48.png", 48),
    ("logo-96.png", 96),
    ("favicon-32.png", 32),
    ("favicon-64.png", 64),
    ("apple-touch-180.png", 180),
];

/// Default logo the icons are made from, inside the assets directory.
pub const LOGO_SOURCE: &str = "014.png";

/// Make the near-white background of every `*_full.*` image in `dir`
/// transparent, writing a PNG with the same stem beside it.
///
/// # Errors
///
/// Returns [`CatalogError::MissingDirectory`] if `dir` does not exist.
pub fn strip_backgrounds(dir: &Path) -> Result<BatchSummary, CatalogError> {
    let mut summary = BatchSummary::default();
    for source in files::list_images(dir)? {
        if !files::stem(&source).ends_with("_full") {
            continue;
        }
        let output = source.with_extension("png");
        let result = files::load_image(&source).and_then(|image| {
            let cut = background::remove_background(
                &image,
                DEFAULT_WHITE_THRESHOLD,
                DEFAULT_EDGE_SIGMA,
            );
            files::save_image(cut, &output).map(|()| Outcome::Written)
        });
        summary.record(&source, result);
    }
    Ok(summary)
}

/// Write every size of [`ICON_SIZES`] into `out_dir`, letterboxing
/// `source` onto transparent squares. Returns the written paths.
///
/// # Errors
///
/// Returns [`CatalogError::MissingSource`] if `source` is absent, or a
/// load or write error.
pub fn generate_icons(source: &Path, out_dir: &Path) -> Result<Vec<PathBuf>, CatalogError> {
    if !source.is_file() {
        return Err(CatalogError::MissingSource(source.display().to_string()));
    }
    let logo = files::load_image(source)?;
    ICON_SIZES
        .iter()
        .map(|&(name, size)| {
            let path = out_dir.join(name);
            let icon = place::letterbox(&logo, Dimensions::new(size, size));
            files::save_image(icon, &path)?;
            Ok(path)
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use triptych_compose::RgbaImage;

    use super::*;

    #[test]
    fn only_full_outputs_are_cut() {
        let dir = tempfile::tempdir().unwrap();
        let img = RgbaImage::from_fn(20, 20, |x, _| {
            if x < 10 {
                image::Rgba([255, 255, 255, 255])
            } else {
                image::Rgba([10, 10, 10, 255])
            }
        });
        files::save_image(img.clone(), &dir.path().join("a_full.jpg")).unwrap();
        files::save_image(img, &dir.path().join("b.jpg")).unwrap();

        let summary = strip_backgrounds(dir.path()).unwrap();
        assert_eq!(summary.processed, 1);
        let cut = files::load_image(&dir.path().join("a_full.png")).unwrap();
        assert_eq!(cut.get_pixel(0, 10).0[3], 0);
        assert_eq!(cut.get_pixel(19, 10).0[3], 255);
        assert!(!dir.path().join("b.png").exists());
    }

    #[test]
    fn icons_are_square_and_named() {
        let dir = tempfile::tempdir().unwrap();
        let logo = dir.path().join(LOGO_SOURCE);
        RgbaImage::from_pixel(200, 100, image::Rgba([0, 0, 255, 255]))
            .save(&logo)
            .unwrap();

        let written = generate_icons(&logo, dir.path()).unwrap();
        assert_eq!(written.len(), ICON_SIZES.len());
        let icon = files::load_image(&dir.path().join("logo-48.png")).unwrap();
        assert_eq!(icon.dimensions(), (48, 48));
        // Wide logo: top row is padding, centre is art.
        assert_eq!(icon.get_pixel(24, 0).0[3], 0);
        assert_eq!(icon.get_pixel(24, 24).0, [0, 0, 255, 255]);
    }

    #[test]
    fn missing_logo() {
        let dir = tempfile::tempdir().unwrap();
        let err = generate_icons(&dir.path().join("none.png"), dir.path()).unwrap_err();
        assert!(err.is_missing_input());
    }
}
