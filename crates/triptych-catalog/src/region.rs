//! Template region detection from the filesystem.

use std::path::Path;

use triptych_compose::detect::{self, DetectorKind};
use triptych_compose::{Detection, detect_first};

use crate::{CatalogError, files};

/// Which detectors to try, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetectChain {
    /// Blank-area thresholds, then edge shapes.
    #[default]
    All,
    /// Blank-area thresholds only.
    Brightness,
    /// Edge shapes only.
    Edges,
}

impl DetectChain {
    /// The detectors this chain runs.
    #[must_use]
    pub fn detectors(self) -> Vec<DetectorKind> {
        match self {
            Self::Brightness => detect::blank_area_chain(),
            Self::Edges => detect::screen_chain(),
            Self::All => {
                let mut chain = detect::blank_area_chain();
                chain.extend(detect::screen_chain());
                chain
            }
        }
    }
}

/// Run `chain` on the template at `path`.
///
/// # Errors
///
/// Returns [`CatalogError::MissingTemplate`] or a load error.
pub fn detect_template(path: &Path, chain: DetectChain) -> Result<Option<Detection>, CatalogError> {
    let template = files::load_template(path)?;
    let found = detect_first(&chain.detectors(), &template);
    match &found {
        Some(d) => tracing::info!(rect = %d.rect, method = ?d.method, "region detected"),
        None => tracing::warn!(template = %path.display(), "no region detected"),
    }
    Ok(found)
}
