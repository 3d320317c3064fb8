//! Timestamped copies of the outputs directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use walkdir::WalkDir;

use crate::CatalogError;
use crate::workspace::Workspace;

/// Name prefix of backup directories.
pub const BACKUP_PREFIX: &str = "outputs_backup_";

/// Name prefix of the snapshot taken before a restore.
pub const SNAPSHOT_PREFIX: &str = "outputs_before_restore_";

fn timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Recursively copy `from` into `to`, which must not exist yet.
///
/// # Errors
///
/// Returns [`CatalogError::Io`] on the first failure.
pub fn copy_tree(from: &Path, to: &Path) -> Result<u64, CatalogError> {
    if to.exists() {
        return Err(CatalogError::io(
            to,
            std::io::Error::from(std::io::ErrorKind::AlreadyExists),
        ));
    }
    let mut copied = 0;
    for entry in WalkDir::new(from).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(from).to_path_buf();
            CatalogError::io(path, e.into())
        })?;
        let rel = entry.path().strip_prefix(from).unwrap_or(entry.path());
        let dest = to.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest).map_err(|e| CatalogError::io(&dest, e))?;
        } else {
            fs::copy(entry.path(), &dest).map_err(|e| CatalogError::io(entry.path(), e))?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// Copy the outputs to `outputs_backup_<YYYYMMDD_HHMMSS>` beside them.
///
/// # Errors
///
/// Returns [`CatalogError::MissingDirectory`] when there are no outputs.
pub fn create_backup(ws: &Workspace) -> Result<PathBuf, CatalogError> {
    if !ws.outputs_root.is_dir() {
        return Err(CatalogError::MissingDirectory(ws.outputs_root.clone()));
    }
    let dest = ws.root.join(format!("{BACKUP_PREFIX}{}", timestamp()));
    let copied = copy_tree(&ws.outputs_root, &dest)?;
    tracing::info!(backup = %dest.display(), files = copied, "outputs backed up");
    Ok(dest)
}

/// The most recently modified backup directory under `root`.
///
/// # Errors
///
/// Returns [`CatalogError::NoBackup`] when none exists.
pub fn newest_backup(root: &Path) -> Result<PathBuf, CatalogError> {
    let entries = fs::read_dir(root).map_err(|e| CatalogError::io(root, e))?;
    entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| {
            p.is_dir()
                && p.file_name()
                    .is_some_and(|n| n.to_string_lossy().starts_with(BACKUP_PREFIX))
        })
        .max_by_key(|p| {
            let modified = fs::metadata(p)
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            (modified, p.clone())
        })
        .ok_or_else(|| CatalogError::NoBackup(root.to_path_buf()))
}

/// What a restore did, or would do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Restore {
    /// Backup copied into the outputs.
    pub backup: PathBuf,
    /// Snapshot of the replaced outputs, if there were any.
    pub snapshot: Option<PathBuf>,
}

/// Replace the outputs with `backup` (or the newest backup), first
/// snapshotting the current outputs. With `dry_run` nothing is touched.
///
/// # Errors
///
/// Returns [`CatalogError::NoBackup`] or [`CatalogError::MissingDirectory`]
/// when there is nothing to restore from, or [`CatalogError::Io`].
pub fn restore(
    ws: &Workspace,
    backup: Option<&Path>,
    dry_run: bool,
) -> Result<Restore, CatalogError> {
    let backup = match backup {
        Some(path) if path.is_dir() => path.to_path_buf(),
        Some(path) => return Err(CatalogError::MissingDirectory(path.to_path_buf())),
        None => newest_backup(&ws.root)?,
    };
    let snapshot = ws
        .outputs_root
        .is_dir()
        .then(|| ws.root.join(format!("{SNAPSHOT_PREFIX}{}", timestamp())));
    let plan = Restore { backup, snapshot };
    if dry_run {
        return Ok(plan);
    }

    if let Some(snapshot) = &plan.snapshot {
        copy_tree(&ws.outputs_root, snapshot)?;
        tracing::info!(snapshot = %snapshot.display(), "current outputs saved");
        fs::remove_dir_all(&ws.outputs_root).map_err(|e| CatalogError::io(&ws.outputs_root, e))?;
    }
    let copied = copy_tree(&plan.backup, &ws.outputs_root)?;
    tracing::info!(backup = %plan.backup.display(), files = copied, "outputs restored");
    Ok(plan)
}
