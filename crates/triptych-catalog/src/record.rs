//! Paste-record sidecars.
//!
//! Every written output gets a JSON sidecar with the same stem describing
//! where the strip or poster landed. Later runs read the `paste_bbox` of a
//! reference sidecar to reproduce an exact placement.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use triptych_compose::{Orientation, Rect, Variant};
use walkdir::WalkDir;

use crate::{CatalogError, files};

/// Parameters of a slice composite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SliceParams {
    /// Gap between cells.
    pub spacing: u32,
    /// Strip scale relative to the template.
    pub scale: f64,
    /// Vertical offset, when one was used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_offset: Option<u32>,
    /// Horizontal offset, when one was used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_offset: Option<u32>,
    /// Whether the template region was detected automatically.
    pub auto_detect: bool,
    /// Composition recipe.
    pub variant: Variant,
    /// Whether the source was turned upside down first.
    pub flipped: bool,
    /// Number of panels.
    pub panels: u32,
}

/// Sidecar of a Slice-Rotate-Compose output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SliceCompositeRecord {
    /// Source poster.
    pub source: PathBuf,
    /// Composited template.
    pub output: PathBuf,
    /// Transparent strip written beside the output.
    pub strip: PathBuf,
    /// Where the strip was pasted.
    pub paste_bbox: Rect,
    /// Orientation of the source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orientation: Option<Orientation>,
    /// How the strip was built.
    pub params: SliceParams,
}

/// What a whole-image paste was for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FullPasteMode {
    /// A poster pasted whole onto the poster template.
    FullPaste,
    /// A bookmark pasted onto the bookmark template.
    Bookmark,
}

/// Parameters of a whole-image paste.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullParams {
    /// Scale applied to the source to fit the bbox.
    pub scale: f64,
    /// What the paste was for.
    pub mode: FullPasteMode,
    /// Template file name.
    pub template: String,
}

/// Sidecar of a whole-image paste.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullPasteRecord {
    /// Source image.
    pub source: PathBuf,
    /// Composited template.
    pub output: PathBuf,
    /// Where the image was pasted.
    pub paste_bbox: Rect,
    /// How it was pasted.
    pub params: FullParams,
}

/// Sidecar of a strip pasted at a reference placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    /// Strip that was pasted.
    pub source_strip: PathBuf,
    /// Composited template.
    pub output: PathBuf,
    /// Where the strip was pasted.
    pub paste_bbox: Rect,
    /// Identifier of the output the placement was copied from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

/// Any paste-record sidecar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PasteRecord {
    /// Slice-Rotate-Compose output.
    SliceComposite(SliceCompositeRecord),
    /// Whole-image paste.
    FullPaste(FullPasteRecord),
    /// Strip pasted at a reference placement.
    Match(MatchRecord),
}

impl PasteRecord {
    /// Where the strip or image was pasted.
    #[must_use]
    pub const fn paste_bbox(&self) -> Rect {
        match self {
            Self::SliceComposite(r) => r.paste_bbox,
            Self::FullPaste(r) => r.paste_bbox,
            Self::Match(r) => r.paste_bbox,
        }
    }

    /// Write this record as the sidecar of `output`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Io`] or [`CatalogError::Json`].
    pub fn write_beside(&self, output: &Path) -> Result<PathBuf, CatalogError> {
        let path = sidecar_path(output);
        files::write_json(self, &path)?;
        Ok(path)
    }
}

impl From<SliceCompositeRecord> for PasteRecord {
    fn from(r: SliceCompositeRecord) -> Self {
        Self::SliceComposite(r)
    }
}

impl From<FullPasteRecord> for PasteRecord {
    fn from(r: FullPasteRecord) -> Self {
        Self::FullPaste(r)
    }
}

impl From<MatchRecord> for PasteRecord {
    fn from(r: MatchRecord) -> Self {
        Self::Match(r)
    }
}

/// Sidecar path of an output image: same stem, `.json`.
#[must_use]
pub fn sidecar_path(output: &Path) -> PathBuf {
    output.with_extension("json")
}

#[derive(Deserialize)]
struct Placement {
    paste_bbox: Rect,
}

/// Read the `paste_bbox` from any JSON object that carries one, including
/// sidecars written without a `kind` tag.
///
/// # Errors
///
/// Returns [`CatalogError::MissingReference`] if `path` does not exist,
/// otherwise [`CatalogError::Io`] or [`CatalogError::Json`].
pub fn read_paste_bbox(path: &Path) -> Result<Rect, CatalogError> {
    if !path.is_file() {
        return Err(CatalogError::MissingReference(path.to_path_buf()));
    }
    files::read_json::<Placement>(path).map(|p| p.paste_bbox)
}

/// Read a bare rectangle (such as a detected-region sidecar).
///
/// # Errors
///
/// Returns [`CatalogError::MissingReference`] if `path` does not exist,
/// otherwise [`CatalogError::Io`] or [`CatalogError::Json`].
pub fn read_rect(path: &Path) -> Result<Rect, CatalogError> {
    if !path.is_file() {
        return Err(CatalogError::MissingReference(path.to_path_buf()));
    }
    files::read_json(path)
}

/// First sidecar under `root` (walked in file-name order) that has a
/// `paste_bbox`.
#[must_use]
pub fn find_any_paste_bbox(root: &Path) -> Option<Rect> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .is_some_and(|x| x.eq_ignore_ascii_case("json"))
        })
        .find_map(|e| files::read_json::<Placement>(e.path()).ok())
        .map(|p| p.paste_bbox)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::fs;

    use super::*;

    fn slice_record() -> SliceCompositeRecord {
        SliceCompositeRecord {
            source: PathBuf::from("images/SPLIT POSTERS/SP-001.jpg"),
            output: PathBuf::from("outputs/SPLIT POSTERS/SP-001_triptych.jpg"),
            strip: PathBuf::from("outputs/SPLIT POSTERS/SP-001_triptych_strip.png"),
            paste_bbox: Rect::new(200, 150, 600, 43),
            orientation: Some(Orientation::Landscape),
            params: SliceParams {
                spacing: 12,
                scale: 0.6,
                y_offset: Some(150),
                x_offset: None,
                auto_detect: false,
                variant: Variant::Auto,
                flipped: false,
                panels: 3,
            },
        }
    }

    #[test]
    fn record_is_tagged_and_flat() {
        let json = serde_json::to_value(PasteRecord::from(slice_record())).unwrap();
        assert_eq!(json["kind"], "slice_composite");
        assert_eq!(json["paste_bbox"]["width"], 600);
        assert_eq!(json["orientation"], "landscape");
        assert_eq!(json["params"]["variant"], "auto");
        assert!(json["params"].get("x_offset").is_none());
    }

    #[test]
    fn legacy_sidecar_still_provides_bbox() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("SP-001_triptych.json");
        fs::write(
            &path,
            r#"{"source": "a.jpg", "paste_bbox": {"x": 1, "y": 2, "width": 3, "height": 4}}"#,
        )
        .unwrap();
        assert_eq!(read_paste_bbox(&path).unwrap(), Rect::new(1, 2, 3, 4));
    }

    #[test]
    fn written_sidecar_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("SP-001_triptych.jpg");
        let record = PasteRecord::from(slice_record());
        let path = record.write_beside(&output).unwrap();
        assert_eq!(path, dir.path().join("SP-001_triptych.json"));

        let back: PasteRecord = files::read_json(&path).unwrap();
        assert_eq!(back, record);
        assert_eq!(read_paste_bbox(&path).unwrap(), record.paste_bbox());
    }

    #[test]
    fn missing_reference() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_paste_bbox(&dir.path().join("none.json")).unwrap_err();
        assert!(matches!(err, CatalogError::MissingReference(_)));
    }

    #[test]
    fn finds_first_bbox_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("B");
        fs::create_dir(&sub).unwrap();
        fs::write(dir.path().join("A.json"), r#"{"other": 1}"#).unwrap();
        fs::write(
            sub.join("x.json"),
            r#"{"paste_bbox": {"x": 5, "y": 6, "width": 7, "height": 8}}"#,
        )
        .unwrap();
        assert_eq!(find_any_paste_bbox(dir.path()), Some(Rect::new(5, 6, 7, 8)));
        assert_eq!(find_any_paste_bbox(&dir.path().join("missing")), None);
    }

    #[test]
    fn detection_sidecar_reads_as_rect() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("detected_bbox.json");
        fs::write(
            &path,
            r#"{"x": 10, "y": 20, "width": 30, "height": 40, "method": "brightness", "threshold": 240}"#,
        )
        .unwrap();
        assert_eq!(read_rect(&path).unwrap(), Rect::new(10, 20, 30, 40));
    }
}
