//! The static gallery manifest.
//!
//! The manifest is a small JavaScript file assigning a category map to
//! `window.imageCatalog`. It is always regenerated wholesale from the
//! directory tree: categories and their entries are sorted, so two runs
//! over the same tree produce byte-identical files.
//!
//! Entry rules:
//! - `SPLIT POSTERS` lists composited `*_triptych.<ext>` outputs (never
//!   the `_strip` images) from the outputs directory naming that category.
//! - Any other category lists its `*_full.<ext>` outputs when it has any,
//!   otherwise its original images.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::error::ManifestProblem;
use crate::workspace::{self, Workspace};
use crate::{CatalogError, files};

/// Category name to ordered relative image paths.
pub type Catalog = BTreeMap<String, Vec<String>>;

/// A manifest as read back, before entries are known to be strings.
pub type RawCatalog = BTreeMap<String, Vec<Value>>;

const ASSIGNMENT: &str = "window.imageCatalog";

const HEADER: &str = "// Static manifest generated from outputs folder \
(SPLIT POSTERS use outputs; others use original images)";

const FOOTER: &str = "console.info('manifest.static (generated) loaded - categories:', \
Object.keys(window.imageCatalog).map(c => `${c}:${window.imageCatalog[c].length}`).join(', '));";

/// Subdirectories of `root` keyed by normalized category name. When two
/// directories normalize to the same name the one spelled with a space
/// wins, otherwise the first in name order.
fn category_dirs(root: &Path) -> Result<BTreeMap<String, String>, CatalogError> {
    let mut map = BTreeMap::new();
    for dir in files::list_dirs(root)? {
        let name = files::file_name(&dir);
        match map.entry(workspace::normalize_category(&name)) {
            Entry::Vacant(slot) => {
                slot.insert(name);
            }
            Entry::Occupied(mut slot) => {
                if name.contains(' ') && !slot.get().contains(' ') {
                    slot.insert(name);
                }
            }
        }
    }
    Ok(map)
}

/// Whether `name` is `<anything><token>.<image ext>`, ignoring case.
fn has_token(name: &str, token: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.rsplit_once('.').is_some_and(|(stem, ext)| {
        files::IMAGE_EXTENSIONS.contains(&ext) && stem.ends_with(token)
    })
}

/// Relative paths of images in `dir` whose names carry `token`.
fn outputs_with_token(
    ws: &Workspace,
    dir: &Path,
    token: &str,
) -> Result<Vec<String>, CatalogError> {
    Ok(files::list_images(dir)?
        .iter()
        .filter(|p| has_token(&files::file_name(p), token))
        .map(|p| ws.relative(p))
        .collect())
}

/// Remove repeated entries, keeping the first occurrence.
fn dedupe(entries: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    entries
        .into_iter()
        .filter(|e| seen.insert(e.clone()))
        .collect()
}

/// Build the catalog from the workspace's directory tree.
///
/// # Errors
///
/// Returns [`CatalogError::MissingDirectory`] when neither the images
/// nor the outputs root exists.
pub fn build(ws: &Workspace) -> Result<Catalog, CatalogError> {
    if !ws.images_root.is_dir() && !ws.outputs_root.is_dir() {
        return Err(CatalogError::MissingDirectory(ws.images_root.clone()));
    }
    let outputs = category_dirs(&ws.outputs_root)?;
    let images = category_dirs(&ws.images_root)?;
    let mut catalog = Catalog::new();

    if let Some(dir) = outputs.get(workspace::SPLIT_POSTERS) {
        let entries = outputs_with_token(ws, &ws.outputs_root.join(dir), "_triptych")?;
        if !entries.is_empty() {
            catalog.insert(workspace::SPLIT_POSTERS.to_owned(), entries);
        }
    }

    for (category, dir) in &images {
        if catalog.contains_key(category) {
            continue;
        }
        if let Some(out_dir) = outputs.get(category) {
            let full = outputs_with_token(ws, &ws.outputs_root.join(out_dir), "_full")?;
            if !full.is_empty() {
                catalog.insert(category.clone(), full);
                continue;
            }
        }
        let originals: Vec<String> = files::list_images(&ws.images_root.join(dir))?
            .iter()
            .map(|p| ws.relative(p))
            .collect();
        if !originals.is_empty() {
            catalog.insert(category.clone(), originals);
        }
    }

    Ok(catalog
        .into_iter()
        .map(|(category, entries)| (category, dedupe(entries)))
        .collect())
}

/// Render the manifest file's text.
///
/// # Errors
///
/// Returns the serializer's error, which cannot occur for string maps.
pub fn render(catalog: &Catalog) -> Result<String, serde_json::Error> {
    let json = serde_json::to_string_pretty(catalog)?;
    Ok(format!("{HEADER}\n{ASSIGNMENT} = {json};\n{FOOTER}\n"))
}

/// Build the catalog and write it to the workspace's manifest path.
///
/// # Errors
///
/// See [`build`]; also fails when the manifest cannot be written.
pub fn regenerate(ws: &Workspace) -> Result<Catalog, CatalogError> {
    let catalog = build(ws)?;
    let path = &ws.manifest_path;
    let text = render(&catalog).map_err(|source| CatalogError::Json {
        path: path.clone(),
        source,
    })?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| CatalogError::io(parent, e))?;
    }
    fs::write(path, text).map_err(|e| CatalogError::io(path, e))?;
    tracing::info!(
        path = %path.display(),
        categories = catalog.len(),
        entries = catalog.values().map(Vec::len).sum::<usize>(),
        "wrote manifest"
    );
    Ok(catalog)
}

/// Extract the category map assigned to `window.imageCatalog`.
///
/// # Errors
///
/// Returns [`ManifestProblem::NoAssignment`] if there is no assignment of
/// an object literal, or [`ManifestProblem::InvalidJson`] if the object
/// is not a map of arrays.
pub fn parse(text: &str) -> Result<RawCatalog, ManifestProblem> {
    let start = text.find(ASSIGNMENT).ok_or(ManifestProblem::NoAssignment)?;
    let rest = text[start + ASSIGNMENT.len()..]
        .trim_start()
        .strip_prefix('=')
        .ok_or(ManifestProblem::NoAssignment)?
        .trim_start();
    if !rest.starts_with('{') {
        return Err(ManifestProblem::NoAssignment);
    }
    serde_json::Deserializer::from_str(rest)
        .into_iter::<RawCatalog>()
        .next()
        .ok_or(ManifestProblem::NoAssignment)?
        .map_err(ManifestProblem::InvalidJson)
}

/// Read and parse the manifest at `path`.
///
/// # Errors
///
/// Returns [`CatalogError::Manifest`] describing what went wrong.
pub fn load(path: &Path) -> Result<RawCatalog, CatalogError> {
    let problem = |problem| CatalogError::Manifest {
        path: path.to_path_buf(),
        problem,
    };
    if !path.is_file() {
        return Err(problem(ManifestProblem::Missing));
    }
    let text = fs::read_to_string(path).map_err(|e| CatalogError::io(path, e))?;
    parse(&text).map_err(problem)
}

fn entry_text(value: &Value) -> String {
    value
        .as_str()
        .map_or_else(|| value.to_string(), str::to_owned)
}

/// Entries that appear more than once in their category, per category.
/// Categories without duplicates are omitted.
#[must_use]
pub fn duplicates(raw: &RawCatalog) -> BTreeMap<String, Vec<String>> {
    raw.iter()
        .filter_map(|(category, entries)| {
            let mut seen = HashSet::new();
            let dups: Vec<String> = entries
                .iter()
                .map(entry_text)
                .filter(|e| !seen.insert(e.clone()))
                .collect();
            (!dups.is_empty()).then(|| (category.clone(), dups))
        })
        .collect()
}

/// A non-string manifest entry.
#[derive(Debug, Clone, PartialEq)]
pub struct BadEntry {
    /// Category holding it.
    pub category: String,
    /// Position within the category.
    pub index: usize,
    /// The offending value.
    pub value: Value,
}

/// Result of [`check`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CheckReport {
    /// Categories counted as posters.
    pub poster_categories: Vec<String>,
    /// Entries across poster categories.
    pub poster_entries: usize,
    /// Entries that are not strings.
    pub bad_entries: Vec<BadEntry>,
}

/// Validate entry types and count poster entries.
#[must_use]
pub fn check(raw: &RawCatalog) -> CheckReport {
    let mut report = CheckReport::default();
    for (category, entries) in raw {
        for (index, value) in entries.iter().enumerate() {
            if !value.is_string() {
                report.bad_entries.push(BadEntry {
                    category: category.clone(),
                    index,
                    value: value.clone(),
                });
            }
        }
        if !workspace::NON_POSTER_CATEGORIES.contains(&category.as_str()) {
            report.poster_categories.push(category.clone());
            report.poster_entries += entries.len();
        }
    }
    report
}
