//! Serial renaming of outputs: `<PREFIX>-<NNN><token>.<ext>`.
//!
//! Each category directory gets its own prefix and counter. Files that
//! share a base name (an output, its strip, its variants) share a serial
//! and keep their suffix token, so `SP-7_triptych.jpeg` and
//! `SP-7_triptych_strip.png` stay paired. Sidecars follow their image.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::{CatalogError, files};

/// Suffix segments that start a preserved token.
pub const TOKEN_WORDS: [&str; 4] = ["full", "triptych", "columns", "rows"];

/// Prefix found at the start of an existing name: one to four capitals
/// followed by `-`, `_` or a space.
#[must_use]
pub fn detect_prefix(stem: &str) -> Option<&str> {
    let caps = stem.bytes().take_while(u8::is_ascii_uppercase).count();
    let sep = *stem.as_bytes().get(caps)?;
    ((1..=4).contains(&caps) && matches!(sep, b'-' | b'_' | b' ')).then(|| &stem[..caps])
}

/// Prefix made from a directory name: initials of its words (up to
/// three), or its first three letters and digits, or `X`.
#[must_use]
pub fn derive_prefix(dir_name: &str) -> String {
    let initials: String = dir_name
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter_map(|w| w.chars().next())
        .map(|c| c.to_ascii_uppercase())
        .collect();
    if initials.len() >= 2 {
        return initials.chars().take(3).collect();
    }
    let letters: String = dir_name
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_uppercase())
        .take(3)
        .collect();
    if letters.is_empty() {
        "X".to_owned()
    } else {
        letters
    }
}

/// Split a stem into its base and preserved token.
///
/// The token starts at the first `_`-separated segment equal (ignoring
/// case) to one of [`TOKEN_WORDS`], pulling in a single capital letter
/// segment just before it (`_C_triptych`).
#[must_use]
pub fn split_token(stem: &str) -> (&str, &str) {
    let mut starts = Vec::new();
    let mut at = 0;
    for segment in stem.split('_') {
        starts.push((at, segment));
        at += segment.len() + 1;
    }
    let Some(k) = starts.iter().skip(1).position(|(_, s)| {
        TOKEN_WORDS.iter().any(|w| s.eq_ignore_ascii_case(w))
    }) else {
        return (stem, "");
    };
    let mut k = k + 1;
    if k >= 2 {
        let prev = starts[k - 1].1;
        if prev.len() == 1 && prev.bytes().all(|b| b.is_ascii_uppercase()) {
            k -= 1;
        }
    }
    // Token begins at the underscore before segment k.
    let cut = starts[k].0 - 1;
    (&stem[..cut], &stem[cut..])
}

/// One file move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rename {
    /// Current path.
    pub from: PathBuf,
    /// New path.
    pub to: PathBuf,
}

/// Planned renames for one category directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryPlan {
    /// Directory name.
    pub category: String,
    /// Prefix applied.
    pub prefix: String,
    /// Moves, images first then sidecars.
    pub renames: Vec<Rename>,
}

/// Plan the renames inside one category directory. Returns `None` when it
/// holds no images.
///
/// # Errors
///
/// Returns [`CatalogError::Io`] if the directory cannot be listed.
pub fn plan_category(dir: &Path) -> Result<Option<CategoryPlan>, CatalogError> {
    let images = files::list_images(dir)?;
    if images.is_empty() {
        return Ok(None);
    }
    let category = files::file_name(dir);
    let prefix = images
        .iter()
        .find_map(|p| detect_prefix(&files::stem(p)).map(str::to_owned))
        .unwrap_or_else(|| derive_prefix(&category));

    let mut serials: HashMap<String, u32> = HashMap::new();
    let mut taken = HashSet::new();
    let mut next = 1;
    let mut renames = Vec::new();
    let mut sidecars = Vec::new();

    for image in &images {
        let stem = files::stem(image);
        let (base, token) = split_token(&stem);
        let ext = image
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();

        let mut serial = *serials.entry(base.to_owned()).or_insert_with(|| {
            next += 1;
            next - 1
        });
        let mut name = format!("{prefix}-{serial:03}{token}.{ext}");
        while !taken.insert(name.to_ascii_lowercase()) {
            serial = next;
            next += 1;
            name = format!("{prefix}-{serial:03}{token}.{ext}");
        }
        let to = dir.join(&name);

        let sidecar = crate::record::sidecar_path(image);
        let new_sidecar = crate::record::sidecar_path(&to);
        if sidecar.is_file() && !sidecars.iter().any(|r: &Rename| r.from == sidecar) {
            sidecars.push(Rename {
                from: sidecar,
                to: new_sidecar,
            });
        }
        renames.push(Rename {
            from: image.clone(),
            to,
        });
    }
    renames.extend(sidecars);
    renames.retain(|r| r.from != r.to);

    Ok(Some(CategoryPlan {
        category,
        prefix,
        renames,
    }))
}

/// Plan renames for every category under `outputs_root`.
///
/// # Errors
///
/// Returns [`CatalogError::MissingDirectory`] if `outputs_root` is absent.
pub fn plan(outputs_root: &Path) -> Result<Vec<CategoryPlan>, CatalogError> {
    if !outputs_root.is_dir() {
        return Err(CatalogError::MissingDirectory(outputs_root.to_path_buf()));
    }
    let mut plans = Vec::new();
    for dir in files::list_dirs(outputs_root)? {
        if let Some(plan) = plan_category(&dir)? {
            plans.push(plan);
        }
    }
    Ok(plans)
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".renaming");
    path.with_file_name(name)
}

/// Carry out a plan. Every source is first moved to a staging name so
/// targets that are also sources never clobber each other. Returns the
/// number of files moved.
///
/// # Errors
///
/// Returns [`CatalogError::Io`] on the first failed move.
pub fn apply(plan: &CategoryPlan) -> Result<usize, CatalogError> {
    for r in &plan.renames {
        let staged = staging_path(&r.from);
        fs::rename(&r.from, &staged).map_err(|e| CatalogError::io(&r.from, e))?;
    }
    for r in &plan.renames {
        let staged = staging_path(&r.from);
        fs::rename(&staged, &r.to).map_err(|e| CatalogError::io(&r.to, e))?;
        tracing::debug!(
            from = %files::file_name(&r.from),
            to = %files::file_name(&r.to),
            "renamed"
        );
    }
    tracing::info!(
        category = %plan.category,
        prefix = %plan.prefix,
        renamed = plan.renames.len(),
        "category renamed"
    );
    Ok(plan.renames.len())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn prefix_detection() {
        assert_eq!(detect_prefix("SP-001_triptych"), Some("SP"));
        assert_eq!(detect_prefix("ANIM_poster"), Some("ANIM"));
        assert_eq!(detect_prefix("ABCDE-1"), None);
        assert_eq!(detect_prefix("Sp-1"), None);
        assert_eq!(detect_prefix("SP"), None);
    }

    #[test]
    fn prefix_from_directory() {
        assert_eq!(derive_prefix("SPLIT POSTERS"), "SP");
        assert_eq!(derive_prefix("single_sticker_art_pack"), "SSA");
        assert_eq!(derive_prefix("anime"), "ANI");
        assert_eq!(derive_prefix("--"), "X");
    }

    #[test]
    fn tokens() {
        assert_eq!(split_token("SP-001_triptych"), ("SP-001", "_triptych"));
        assert_eq!(split_token("SP-001_C_triptych"), ("SP-001", "_C_triptych"));
        assert_eq!(
            split_token("SP-001_triptych_strip"),
            ("SP-001", "_triptych_strip")
        );
        assert_eq!(
            split_token("poster_rows_rotated_columns"),
            ("poster", "_rows_rotated_columns")
        );
        assert_eq!(
            split_token("Fullmetal_art_FULL"),
            ("Fullmetal_art", "_FULL")
        );
        assert_eq!(split_token("plain"), ("plain", ""));
        assert_eq!(split_token("full"), ("full", ""));
    }

    #[test]
    fn plan_pairs_outputs_with_strips_and_sidecars() {
        let dir = tempfile::tempdir().unwrap();
        let cat = dir.path().join("SPLIT POSTERS");
        fs::create_dir(&cat).unwrap();
        for name in [
            "zeta_triptych.jpg",
            "zeta_triptych_strip.png",
            "zeta_triptych.json",
            "alpha_triptych.JPG",
        ] {
            fs::write(cat.join(name), b"x").unwrap();
        }

        let plan = plan_category(&cat).unwrap().unwrap();
        assert_eq!(plan.prefix, "SP");
        let moves: Vec<(String, String)> = plan
            .renames
            .iter()
            .map(|r| (files::file_name(&r.from), files::file_name(&r.to)))
            .collect();
        assert_eq!(
            moves,
            [
                ("alpha_triptych.JPG".into(), "SP-001_triptych.jpg".into()),
                ("zeta_triptych.jpg".into(), "SP-002_triptych.jpg".into()),
                (
                    "zeta_triptych_strip.png".into(),
                    "SP-002_triptych_strip.png".into()
                ),
                ("zeta_triptych.json".into(), "SP-002_triptych.json".into()),
            ]
        );

        assert_eq!(apply(&plan).unwrap(), 4);
        assert!(cat.join("SP-002_triptych.json").is_file());
        assert!(!cat.join("zeta_triptych.jpg").exists());
    }

    #[test]
    fn already_serial_names_are_stable() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["AB-001_full.jpg", "AB-002_full.jpg"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        let plan = plan_category(dir.path()).unwrap().unwrap();
        assert!(plan.renames.is_empty());
    }

    #[test]
    fn swapped_names_do_not_clobber() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("AB-001_full.jpg"), b"first").unwrap();
        fs::write(dir.path().join("AB-002_full.jpg"), b"second").unwrap();
        let plan = CategoryPlan {
            category: "X".into(),
            prefix: "AB".into(),
            renames: vec![
                Rename {
                    from: dir.path().join("AB-001_full.jpg"),
                    to: dir.path().join("AB-002_full.jpg"),
                },
                Rename {
                    from: dir.path().join("AB-002_full.jpg"),
                    to: dir.path().join("AB-001_full.jpg"),
                },
            ],
        };
        apply(&plan).unwrap();
        assert_eq!(
            fs::read(dir.path().join("AB-001_full.jpg")).unwrap(),
            b"second"
        );
        assert_eq!(
            fs::read(dir.path().join("AB-002_full.jpg")).unwrap(),
            b"first"
        );
    }
}
