//! Where catalog inputs and outputs live.
//!
//! Every path is derived from an explicit root instead of the process
//! working directory, so batches can be pointed at any checkout.

use std::path::{Path, PathBuf};

/// Category whose sources are sliced into triptychs.
pub const SPLIT_POSTERS: &str = "SPLIT POSTERS";

/// Category pasted onto the bookmark template.
pub const BOOKMARK: &str = "BOOKMARK";

/// Category of stickers that get their background removed.
pub const SINGLE_STICKERS: &str = "SINGLE STICKERS";

/// Category of full-page prints.
pub const FULLPAGE: &str = "FULLPAGE";

/// Categories that are neither sliced nor pasted as full posters.
pub const NON_POSTER_CATEGORIES: [&str; 3] = [BOOKMARK, FULLPAGE, SINGLE_STICKERS];

/// Category name of a directory: underscores read as spaces.
#[must_use]
pub fn normalize_category(dir_name: &str) -> String {
    dir_name.replace('_', " ").trim().to_owned()
}

/// Paths of a catalog checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    /// Checkout root.
    pub root: PathBuf,
    /// Source images, one directory per category.
    pub images_root: PathBuf,
    /// Generated outputs, one directory per category.
    pub outputs_root: PathBuf,
    /// Static manifest consumed by the gallery.
    pub manifest_path: PathBuf,
    /// Template for posters and triptychs.
    pub poster_template: PathBuf,
    /// Template for bookmarks.
    pub bookmark_template: PathBuf,
    /// Site assets (logo, icons).
    pub assets_dir: PathBuf,
}

impl Workspace {
    /// Lay out the default structure under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            images_root: root.join("images").join("PINTEREST IMAGES"),
            outputs_root: root.join("outputs"),
            manifest_path: root.join("js").join("manifest.static.js"),
            poster_template: root.join("011.jpg"),
            bookmark_template: root.join("013.jpg"),
            assets_dir: root.join("assets"),
            root,
        }
    }

    /// Source directory of a category.
    #[must_use]
    pub fn category_images(&self, category: &str) -> PathBuf {
        self.images_root.join(category)
    }

    /// Output directory of a category.
    #[must_use]
    pub fn category_outputs(&self, category: &str) -> PathBuf {
        self.outputs_root.join(category)
    }

    /// Where the bookmark template's detected region is stored.
    #[must_use]
    pub fn detected_bbox_path(&self) -> PathBuf {
        self.category_outputs(BOOKMARK).join("detected_bbox.json")
    }

    /// Express `path` relative to the root with forward slashes, as the
    /// gallery expects. Paths outside the root are returned unchanged.
    #[must_use]
    pub fn relative(&self, path: &Path) -> String {
        let rel = path.strip_prefix(&self.root).unwrap_or(path);
        rel.components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new(".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout() {
        let ws = Workspace::new("/srv/site");
        assert_eq!(
            ws.category_images(SPLIT_POSTERS),
            PathBuf::from("/srv/site/images/PINTEREST IMAGES/SPLIT POSTERS")
        );
        assert_eq!(
            ws.detected_bbox_path(),
            PathBuf::from("/srv/site/outputs/BOOKMARK/detected_bbox.json")
        );
        assert_eq!(ws.poster_template, PathBuf::from("/srv/site/011.jpg"));
    }

    #[test]
    fn underscores_normalize_to_spaces() {
        assert_eq!(normalize_category("SPLIT_POSTERS"), SPLIT_POSTERS);
        assert_eq!(normalize_category("SINGLE STICKERS"), SINGLE_STICKERS);
    }

    #[test]
    fn relative_uses_forward_slashes() {
        let ws = Workspace::new("/srv/site");
        let p = ws.category_outputs("SPLIT POSTERS").join("SP-001_triptych.jpeg");
        assert_eq!(
            ws.relative(&p),
            "outputs/SPLIT POSTERS/SP-001_triptych.jpeg"
        );
    }
}
