//! triptych-catalog: filesystem side of the poster catalog.
//!
//! Wraps the pure compositing core with everything that touches disk:
//! image discovery and encoding, paste-record sidecars, the batch
//! runners, the static gallery manifest, serial renaming and backups.
//! All paths hang off an explicit [`Workspace`].

pub mod assets;
pub mod backup;
pub mod batch;
mod error;
pub mod files;
pub mod manifest;
pub mod record;
pub mod region;
pub mod rename;
pub mod workspace;

pub use batch::{BatchSummary, BookmarkJob, ComposeJob, FullJob, MatchJob, Outcome};
pub use error::{CatalogError, ManifestProblem};
pub use record::PasteRecord;
pub use region::DetectChain;
pub use workspace::Workspace;
