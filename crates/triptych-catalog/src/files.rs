//! Image discovery, decoding, encoding and JSON I/O.

use std::fs;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder, ImageFormat, RgbImage};
use serde::Serialize;
use serde::de::DeserializeOwned;
use triptych_compose::{RgbaImage, decode, place};

use crate::CatalogError;

/// Extensions accepted as input images, compared case-insensitively.
pub const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

/// JPEG quality used for every written JPEG.
pub const JPEG_QUALITY: u8 = 92;

/// Lowercased extension of `path`, if any.
fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

/// Whether `path` has an accepted image extension.
#[must_use]
pub fn is_image(path: &Path) -> bool {
    extension(path).is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

/// File stem as a string (empty if missing or not UTF-8).
#[must_use]
pub fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// File name as a string (empty if missing).
#[must_use]
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Extension an output derived from `source` should use: the source's
/// own `jpg`/`jpeg`/`png`, or `jpg` for anything else.
#[must_use]
pub fn output_extension(source: &Path) -> &'static str {
    match extension(source).as_deref() {
        Some("png") => "png",
        Some("jpeg") => "jpeg",
        _ => "jpg",
    }
}

/// Image files directly inside `dir`, sorted by file name.
///
/// # Errors
///
/// Returns [`CatalogError::MissingDirectory`] if `dir` does not exist and
/// [`CatalogError::Io`] if it cannot be read.
pub fn list_images(dir: &Path) -> Result<Vec<PathBuf>, CatalogError> {
    if !dir.is_dir() {
        return Err(CatalogError::MissingDirectory(dir.to_path_buf()));
    }
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| CatalogError::io(dir, e))? {
        let path = entry.map_err(|e| CatalogError::io(dir, e))?.path();
        if path.is_file() && is_image(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Subdirectories of `dir`, sorted by name. A missing `dir` yields none.
///
/// # Errors
///
/// Returns [`CatalogError::Io`] if `dir` exists but cannot be read.
pub fn list_dirs(dir: &Path) -> Result<Vec<PathBuf>, CatalogError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut dirs = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| CatalogError::io(dir, e))? {
        let path = entry.map_err(|e| CatalogError::io(dir, e))?.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Read and decode an image.
///
/// # Errors
///
/// Returns [`CatalogError::Io`] if the file cannot be read and
/// [`CatalogError::Decode`] if it is not a supported image.
pub fn load_image(path: &Path) -> Result<RgbaImage, CatalogError> {
    let bytes = fs::read(path).map_err(|e| CatalogError::io(path, e))?;
    decode::decode_rgba(&bytes).map_err(|source| CatalogError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

/// Load a template, reporting a missing file as
/// [`CatalogError::MissingTemplate`].
///
/// # Errors
///
/// See [`load_image`].
pub fn load_template(path: &Path) -> Result<RgbaImage, CatalogError> {
    if !path.is_file() {
        return Err(CatalogError::MissingTemplate(path.to_path_buf()));
    }
    load_image(path)
}

fn create_parent(path: &Path) -> Result<(), CatalogError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| CatalogError::io(parent, e))?;
    }
    Ok(())
}

fn encode_err(path: &Path) -> impl FnOnce(image::ImageError) -> CatalogError {
    move |source| CatalogError::Encode {
        path: path.to_path_buf(),
        source,
    }
}

fn write_rgb(rgb: &RgbImage, path: &Path) -> Result<(), CatalogError> {
    if extension(path).as_deref() == Some("png") {
        rgb.save_with_format(path, ImageFormat::Png)
            .map_err(encode_err(path))?;
    } else {
        let file = fs::File::create(path).map_err(|e| CatalogError::io(path, e))?;
        JpegEncoder::new_with_quality(BufWriter::new(file), JPEG_QUALITY)
            .write_image(
                rgb.as_raw(),
                rgb.width(),
                rgb.height(),
                ExtendedColorType::Rgb8,
            )
            .map_err(encode_err(path))?;
    }
    Ok(())
}

/// Write `image` to `path`, as RGBA PNG for a `.png` extension and as
/// opaque JPEG (quality [`JPEG_QUALITY`]) otherwise. Parent directories
/// are created as needed.
///
/// Use this for images whose transparency matters: strips, cut-outs and
/// icons.
///
/// # Errors
///
/// Returns [`CatalogError::Io`] or [`CatalogError::Encode`].
pub fn save_image(image: RgbaImage, path: &Path) -> Result<(), CatalogError> {
    create_parent(path)?;
    if extension(path).as_deref() == Some("png") {
        image
            .save_with_format(path, ImageFormat::Png)
            .map_err(encode_err(path))?;
    } else {
        write_rgb(&place::flatten(image), path)?;
    }
    tracing::info!(path = %path.display(), "wrote image");
    Ok(())
}

/// Write a composited template to `path`, always flattened to opaque RGB.
///
/// # Errors
///
/// Returns [`CatalogError::Io`] or [`CatalogError::Encode`].
pub fn save_output(image: RgbaImage, path: &Path) -> Result<(), CatalogError> {
    create_parent(path)?;
    write_rgb(&place::flatten(image), path)?;
    tracing::info!(path = %path.display(), "wrote output");
    Ok(())
}

/// Write `value` as pretty-printed JSON.
///
/// # Errors
///
/// Returns [`CatalogError::Io`] or [`CatalogError::Json`].
pub fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<(), CatalogError> {
    create_parent(path)?;
    let text = serde_json::to_string_pretty(value).map_err(|source| CatalogError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, text).map_err(|e| CatalogError::io(path, e))
}

/// Read a JSON file.
///
/// # Errors
///
/// Returns [`CatalogError::Io`] or [`CatalogError::Json`].
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, CatalogError> {
    let text = fs::read_to_string(path).map_err(|e| CatalogError::io(path, e))?;
    serde_json::from_str(&text).map_err(|source| CatalogError::Json {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn extensions_are_case_insensitive() {
        assert!(is_image(Path::new("a/SP-001.JPG")));
        assert!(is_image(Path::new("b.WebP")));
        assert!(!is_image(Path::new("c.json")));
        assert!(!is_image(Path::new("noext")));
    }

    #[test]
    fn webp_sources_become_jpg() {
        assert_eq!(output_extension(Path::new("x.webp")), "jpg");
        assert_eq!(output_extension(Path::new("x.PNG")), "png");
        assert_eq!(output_extension(Path::new("x.jpeg")), "jpeg");
        assert_eq!(output_extension(Path::new("x.jpg")), "jpg");
    }

    #[test]
    fn list_images_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.png", "a.JPG", "notes.txt", "c.webp"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        fs::create_dir(dir.path().join("sub.jpg")).unwrap();
        let names: Vec<String> = list_images(dir.path())
            .unwrap()
            .iter()
            .map(|p| file_name(p))
            .collect();
        assert_eq!(names, ["a.JPG", "b.png", "c.webp"]);
    }

    #[test]
    fn missing_directory_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = list_images(&dir.path().join("nope")).unwrap_err();
        assert!(err.is_missing_input());
    }

    #[test]
    fn save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let img = RgbaImage::from_pixel(8, 6, image::Rgba([10, 200, 30, 255]));

        let png = dir.path().join("out/x.png");
        save_image(img.clone(), &png).unwrap();
        assert_eq!(load_image(&png).unwrap(), img);

        let jpg = dir.path().join("out/x.jpg");
        save_image(img, &jpg).unwrap();
        let back = load_image(&jpg).unwrap();
        assert_eq!(back.dimensions(), (8, 6));
        assert_eq!(back.get_pixel(0, 0).0[3], 255);
    }

    #[test]
    fn outputs_are_flattened_even_as_png() {
        let dir = tempfile::tempdir().unwrap();
        let img = RgbaImage::from_pixel(4, 4, image::Rgba([10, 20, 30, 0]));

        let png = dir.path().join("x_triptych.png");
        save_output(img.clone(), &png).unwrap();
        assert_eq!(image::open(&png).unwrap().color(), image::ColorType::Rgb8);

        let strip = dir.path().join("x_triptych_strip.png");
        save_image(img, &strip).unwrap();
        assert_eq!(
            image::open(&strip).unwrap().color(),
            image::ColorType::Rgba8
        );
    }

    #[test]
    fn undecodable_file_is_a_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.jpg");
        fs::write(&path, b"not an image").unwrap();
        assert!(matches!(
            load_image(&path),
            Err(CatalogError::Decode { .. })
        ));
    }
}
