//! Catalog error type.

use std::path::PathBuf;

use triptych_compose::ComposeError;

/// Errors raised while reading or writing catalog files.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// A required input directory does not exist.
    #[error("directory not found: {}", .0.display())]
    MissingDirectory(PathBuf),

    /// A template image does not exist.
    #[error("template not found: {}", .0.display())]
    MissingTemplate(PathBuf),

    /// No source image matched a requested name.
    #[error("no source image found for '{0}'")]
    MissingSource(String),

    /// No reference placement could be loaded.
    #[error("reference placement not found: {}", .0.display())]
    MissingReference(PathBuf),

    /// No backup directory was found.
    #[error("no outputs_backup_* directory found in {}", .0.display())]
    NoBackup(PathBuf),

    /// Filesystem error.
    #[error("{}: {source}", path.display())]
    Io {
        /// Path being read or written.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// An image could not be decoded.
    #[error("{}: {source}", path.display())]
    Decode {
        /// Image path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: ComposeError,
    },

    /// An image could not be encoded.
    #[error("{}: {source}", path.display())]
    Encode {
        /// Image path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: image::ImageError,
    },

    /// A JSON file could not be read or written.
    #[error("{}: {source}", path.display())]
    Json {
        /// JSON file path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// The manifest file could not be read back.
    #[error("manifest {}: {problem}", path.display())]
    Manifest {
        /// Manifest path.
        path: PathBuf,
        /// What was wrong.
        problem: ManifestProblem,
    },

    /// Compositing failed.
    #[error(transparent)]
    Compose(#[from] ComposeError),
}

/// Why a manifest could not be read back.
#[derive(Debug, thiserror::Error)]
pub enum ManifestProblem {
    /// No manifest file.
    #[error("not found")]
    Missing,
    /// No `window.imageCatalog = {...}` assignment.
    #[error("no window.imageCatalog assignment")]
    NoAssignment,
    /// The assigned value is not a category map of arrays.
    #[error("invalid catalog JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),
}

impl CatalogError {
    /// Wrap an I/O error with the path it concerns.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error means a required input is absent, which aborts
    /// a whole batch rather than a single item.
    #[must_use]
    pub const fn is_missing_input(&self) -> bool {
        matches!(
            self,
            Self::MissingDirectory(_)
                | Self::MissingTemplate(_)
                | Self::MissingSource(_)
                | Self::MissingReference(_)
                | Self::NoBackup(_)
        )
    }
}
