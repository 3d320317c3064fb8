//! Batch runners that turn a directory of sources into catalog outputs.
//!
//! Every runner processes its sorted file list top to bottom. A missing
//! input directory or template aborts the batch; any other failure is
//! logged, counted and skipped.

use std::fmt;
use std::path::{Path, PathBuf};

use triptych_compose::detect::{self, DetectorKind};
use triptych_compose::place::{self, DEFAULT_RECT};
use triptych_compose::{
    ComposeConfig, Dimensions, PasteMode, PasteTarget, Rect, RgbaImage, Variant, detect_first,
};

use crate::record::{
    FullParams, FullPasteMode, FullPasteRecord, MatchRecord, PasteRecord, SliceCompositeRecord,
    SliceParams,
};
use crate::workspace::{self, Workspace};
use crate::{CatalogError, files, record};

/// Counts reported at the end of a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Items considered.
    pub total: usize,
    /// Items whose outputs were written.
    pub processed: usize,
    /// Items left alone because their output already existed.
    pub skipped: usize,
    /// Items that failed.
    pub failed: usize,
}

/// What happened to a single item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Outputs written.
    Written,
    /// Output already present.
    Skipped,
}

impl BatchSummary {
    /// Count one item, logging a failure instead of propagating it.
    pub fn record(&mut self, item: &Path, result: Result<Outcome, CatalogError>) {
        self.total += 1;
        match result {
            Ok(Outcome::Written) => self.processed += 1,
            Ok(Outcome::Skipped) => {
                self.skipped += 1;
                tracing::info!(item = %item.display(), "output exists, skipping");
            }
            Err(e) => {
                self.failed += 1;
                tracing::warn!(item = %item.display(), error = %e, "failed");
            }
        }
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Processed {} of {}", self.processed, self.total)?;
        if self.skipped > 0 {
            write!(f, ", skipped {}", self.skipped)?;
        }
        if self.failed > 0 {
            write!(f, ", failed {}", self.failed)?;
        }
        Ok(())
    }
}

/// Keep only the files named in `only` (by file name or stem, ignoring
/// case). An empty filter keeps everything.
///
/// # Errors
///
/// Returns [`CatalogError::MissingSource`] when a filter was given and
/// nothing matched it.
pub fn select(sources: Vec<PathBuf>, only: &[String]) -> Result<Vec<PathBuf>, CatalogError> {
    if only.is_empty() {
        return Ok(sources);
    }
    let matches = |path: &Path, name: &str| {
        files::file_name(path).eq_ignore_ascii_case(name)
            || files::stem(path).eq_ignore_ascii_case(name)
    };
    for name in only {
        if !sources.iter().any(|p| matches(p, name)) {
            tracing::warn!(name = %name, "no source matches");
        }
    }
    let selected: Vec<PathBuf> = sources
        .into_iter()
        .filter(|p| only.iter().any(|n| matches(p, n)))
        .collect();
    if selected.is_empty() {
        return Err(CatalogError::MissingSource(only.join(", ")));
    }
    Ok(selected)
}

/// Run `chain` on the template, logging the outcome.
fn detect_region(chain: &[DetectorKind], template: &RgbaImage) -> Option<Rect> {
    match detect_first(chain, template) {
        Some(found) => {
            tracing::info!(rect = %found.rect, method = ?found.method, "detected template region");
            Some(found.rect)
        }
        None => {
            tracing::warn!("no template region detected, using offsets");
            None
        }
    }
}

/// Slice-Rotate-Compose over a directory of posters.
#[derive(Debug, Clone)]
pub struct ComposeJob {
    /// Paths used to record sidecar entries.
    pub workspace: Workspace,
    /// Directory of source posters.
    pub src_dir: PathBuf,
    /// Directory receiving outputs, strips and sidecars.
    pub out_dir: PathBuf,
    /// Template image.
    pub template: PathBuf,
    /// Slicing and composition parameters.
    pub config: ComposeConfig,
    /// Fixed left edge; only honoured by stacked variants.
    pub x_offset: Option<u32>,
    /// Fixed top edge, when no region is detected.
    pub y_offset: Option<u32>,
    /// Detect the template's blank area and sit strips above it.
    pub auto_detect: bool,
    /// Restrict the batch to these file names or stems.
    pub only: Vec<String>,
}

impl ComposeJob {
    /// Split posters from the workspace onto the poster template.
    ///
    /// Forced vertical and horizontal runs go to their own output
    /// directories so they do not replace the catalog's triptychs.
    #[must_use]
    pub fn new(workspace: &Workspace, config: ComposeConfig) -> Self {
        let out_dir = match config.variant {
            Variant::Vertical => workspace.outputs_root.join("SPLIT_POSTERS_VERTICAL"),
            Variant::Horizontal => workspace.outputs_root.join("SPLIT_POSTERS_HORIZONTAL"),
            Variant::Auto | Variant::RotatedRows => {
                workspace.category_outputs(workspace::SPLIT_POSTERS)
            }
        };
        Self {
            src_dir: workspace.category_images(workspace::SPLIT_POSTERS),
            out_dir,
            template: workspace.poster_template.clone(),
            workspace: workspace.clone(),
            config,
            x_offset: None,
            y_offset: None,
            auto_detect: false,
            only: Vec::new(),
        }
    }

    /// Run the batch.
    ///
    /// # Errors
    ///
    /// Fails only when an input is missing or the configuration is
    /// invalid; per-item failures are counted in the summary.
    pub fn run(&self) -> Result<BatchSummary, CatalogError> {
        self.config.validate()?;
        let sources = select(files::list_images(&self.src_dir)?, &self.only)?;
        let template = files::load_template(&self.template)?;
        let region = if self.auto_detect {
            detect_region(&detect::blank_area_chain(), &template)
        } else {
            None
        };
        let target = self
            .config
            .variant
            .paste_target(region, self.x_offset, self.y_offset);
        tracing::info!(
            sources = sources.len(),
            variant = %self.config.variant,
            ?target,
            "composing"
        );

        let mut summary = BatchSummary::default();
        for source in &sources {
            summary.record(source, self.compose_one(source, &template, target));
        }
        Ok(summary)
    }

    fn compose_one(
        &self,
        source: &Path,
        template: &RgbaImage,
        target: PasteTarget,
    ) -> Result<Outcome, CatalogError> {
        let image = files::load_image(source)?;
        let result = triptych_compose::composite(&image, template, &self.config, target)?;

        let base = files::stem(source);
        let suffix = self.config.variant.suffix();
        let ext = files::output_extension(source);
        let output = self.out_dir.join(format!("{base}{suffix}.{ext}"));
        let strip = self.out_dir.join(format!("{base}{suffix}_strip.png"));
        files::save_output(result.output, &output)?;
        files::save_image(result.triptych.strip.into_image(), &strip)?;

        let (x_offset, y_offset) = match target {
            PasteTarget::Offset { x, y } => (x, y),
            _ => (None, None),
        };
        let record = SliceCompositeRecord {
            source: self.workspace.relative(source).into(),
            output: self.workspace.relative(&output).into(),
            strip: self.workspace.relative(&strip).into(),
            paste_bbox: result.bbox,
            orientation: Some(result.triptych.orientation),
            params: SliceParams {
                spacing: self.config.spacing,
                scale: self.config.scale,
                y_offset,
                x_offset,
                auto_detect: matches!(target, PasteTarget::AboveRegion(_)),
                variant: self.config.variant,
                flipped: self.config.flip,
                panels: self.config.panels,
            },
        };
        PasteRecord::from(record).write_beside(&output)?;
        Ok(Outcome::Written)
    }
}

/// Paste previously composed strips at a reference placement.
#[derive(Debug, Clone)]
pub struct MatchJob {
    /// Paths used to record sidecar entries.
    pub workspace: Workspace,
    /// Source stems whose strips are pasted.
    pub ids: Vec<String>,
    /// Output whose placement is copied.
    pub ref_id: String,
    /// Directory holding the reference output's sidecar.
    pub ref_dir: PathBuf,
    /// Explicit placement, overriding the reference sidecar.
    pub bbox: Option<Rect>,
    /// Directory holding the strips.
    pub src_dir: PathBuf,
    /// Directory receiving the outputs.
    pub out_dir: PathBuf,
    /// Template image.
    pub template: PathBuf,
}

impl MatchJob {
    /// Reference id used when none is given.
    pub const DEFAULT_REF_ID: &str = "SP-001";

    /// Match `ids` against the default reference.
    #[must_use]
    pub fn new(workspace: &Workspace, ids: Vec<String>) -> Self {
        let ref_id = Self::DEFAULT_REF_ID.to_owned();
        Self {
            ids,
            ref_dir: workspace.outputs_root.join("SPLIT_POSTERS_VERTICAL"),
            bbox: None,
            src_dir: workspace.category_outputs(workspace::SPLIT_POSTERS),
            out_dir: workspace
                .outputs_root
                .join(format!("SPLIT_POSTERS_MATCH_{ref_id}")),
            template: workspace.poster_template.clone(),
            workspace: workspace.clone(),
            ref_id,
        }
    }

    /// Output file-name token, such as `_triptych_matchSP001`.
    #[must_use]
    pub fn token(&self) -> String {
        let compact: String = self.ref_id.chars().filter(|c| *c != '-').collect();
        format!("_triptych_match{compact}")
    }

    /// Placement to paste at: the explicit bbox, or the reference sidecar's.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::MissingReference`] if the sidecar is absent.
    pub fn placement(&self) -> Result<Rect, CatalogError> {
        if let Some(bbox) = self.bbox {
            return Ok(bbox);
        }
        let sidecar = self.ref_dir.join(format!("{}_triptych.json", self.ref_id));
        record::read_paste_bbox(&sidecar)
    }

    /// The strip for `id`: the transparent strip if present, otherwise a
    /// composited output.
    #[must_use]
    pub fn find_strip(&self, id: &str) -> Option<PathBuf> {
        [
            format!("{id}_triptych_strip.png"),
            format!("{id}_triptych.png"),
            format!("{id}_triptych.jpeg"),
            format!("{id}_triptych.jpg"),
        ]
        .into_iter()
        .map(|name| self.src_dir.join(name))
        .find(|p| p.is_file())
    }

    /// Run the batch.
    ///
    /// # Errors
    ///
    /// Fails when the template or reference placement is missing.
    pub fn run(&self) -> Result<BatchSummary, CatalogError> {
        let bbox = self.placement()?;
        let template = files::load_template(&self.template)?;
        tracing::info!(%bbox, ids = self.ids.len(), "matching reference placement");

        let mut summary = BatchSummary::default();
        for id in &self.ids {
            let item = self.src_dir.join(id);
            summary.record(&item, self.match_one(id, &template, bbox));
        }
        Ok(summary)
    }

    fn match_one(
        &self,
        id: &str,
        template: &RgbaImage,
        bbox: Rect,
    ) -> Result<Outcome, CatalogError> {
        let strip_path = self
            .find_strip(id)
            .ok_or_else(|| CatalogError::MissingSource(id.to_owned()))?;
        let strip = files::load_image(&strip_path)?;
        let pasted = place::paste(template, &strip, PasteTarget::Exact(bbox), PasteMode::Alpha);

        let output = self.out_dir.join(format!("{id}{}.jpg", self.token()));
        files::save_output(pasted.image, &output)?;
        let record = MatchRecord {
            source_strip: self.workspace.relative(&strip_path).into(),
            output: self.workspace.relative(&output).into(),
            paste_bbox: pasted.bbox,
            reference: Some(self.ref_id.clone()),
        };
        PasteRecord::from(record).write_beside(&output)?;
        Ok(Outcome::Written)
    }
}

/// Paste one strip scaled to the width of `bbox` and centred vertically
/// in it, writing `output` and its sidecar.
///
/// # Errors
///
/// Returns an error if the strip or template cannot be loaded or the
/// output cannot be written.
pub fn paste_at(
    workspace: &Workspace,
    strip: &Path,
    bbox: Rect,
    template: &Path,
    output: &Path,
) -> Result<Rect, CatalogError> {
    let template = files::load_template(template)?;
    if !strip.is_file() {
        return Err(CatalogError::MissingSource(files::file_name(strip)));
    }
    let image = files::load_image(strip)?;
    let pasted = place::paste(
        &template,
        &image,
        PasteTarget::FitWidth(bbox),
        PasteMode::Alpha,
    );
    files::save_output(pasted.image, output)?;
    let record = MatchRecord {
        source_strip: workspace.relative(strip).into(),
        output: workspace.relative(output).into(),
        paste_bbox: pasted.bbox,
        reference: None,
    };
    PasteRecord::from(record).write_beside(output)?;
    Ok(pasted.bbox)
}

/// Paste whole images fitted inside a rectangle.
fn paste_full(
    workspace: &Workspace,
    source: &Path,
    template: &RgbaImage,
    template_name: &str,
    bbox: Rect,
    mode: FullPasteMode,
    output: &Path,
) -> Result<Outcome, CatalogError> {
    let image = files::load_image(source)?;
    let scale = place::fit_scale(Dimensions::of(&image), bbox);
    let pasted = place::paste(
        template,
        &image,
        PasteTarget::FitInside(bbox),
        PasteMode::Opaque,
    );
    files::save_output(pasted.image, output)?;
    let record = FullPasteRecord {
        source: workspace.relative(source).into(),
        output: workspace.relative(output).into(),
        paste_bbox: pasted.bbox,
        params: FullParams {
            scale,
            mode,
            template: template_name.to_owned(),
        },
    };
    PasteRecord::from(record).write_beside(output)?;
    Ok(Outcome::Written)
}

/// Output name of a whole-image paste.
fn full_output(out_dir: &Path, source: &Path) -> PathBuf {
    out_dir.join(format!("{}_full.jpg", files::stem(source)))
}

/// Categories pasted whole onto the poster template.
#[must_use]
pub fn is_full_paste_category(name: &str) -> bool {
    let name = workspace::normalize_category(name);
    name != workspace::SPLIT_POSTERS && !workspace::NON_POSTER_CATEGORIES.contains(&name.as_str())
}

/// Paste posters whole onto the poster template, category by category.
#[derive(Debug, Clone)]
pub struct FullJob {
    /// Paths of the checkout.
    pub workspace: Workspace,
    /// Template image.
    pub template: PathBuf,
    /// Target rectangle; defaults to the first recorded placement found
    /// under the outputs, then [`DEFAULT_RECT`].
    pub bbox: Option<Rect>,
    /// Maximum number of images per category, `None` for all.
    pub limit: Option<usize>,
    /// Overwrite outputs that already exist.
    pub force: bool,
}

impl FullJob {
    /// Images per category when no limit is given.
    pub const DEFAULT_LIMIT: usize = 5;

    /// Default job over `workspace`.
    #[must_use]
    pub fn new(workspace: &Workspace) -> Self {
        Self {
            template: workspace.poster_template.clone(),
            workspace: workspace.clone(),
            bbox: None,
            limit: Some(Self::DEFAULT_LIMIT),
            force: false,
        }
    }

    /// Target rectangle this job pastes into.
    #[must_use]
    pub fn placement(&self) -> Rect {
        self.bbox
            .or_else(|| record::find_any_paste_bbox(&self.workspace.outputs_root))
            .unwrap_or(DEFAULT_RECT)
    }

    /// Run the batch.
    ///
    /// # Errors
    ///
    /// Fails when the images root or template is missing.
    pub fn run(&self) -> Result<BatchSummary, CatalogError> {
        let images_root = &self.workspace.images_root;
        if !images_root.is_dir() {
            return Err(CatalogError::MissingDirectory(images_root.clone()));
        }
        let template = files::load_template(&self.template)?;
        let template_name = files::file_name(&self.template);
        let bbox = self.placement();
        tracing::info!(%bbox, "pasting full posters");

        let mut summary = BatchSummary::default();
        for dir in files::list_dirs(images_root)? {
            let category = files::file_name(&dir);
            if !is_full_paste_category(&category) {
                continue;
            }
            let out_dir = self.workspace.category_outputs(&category);
            let sources = files::list_images(&dir)?;
            let take = self.limit.unwrap_or(sources.len());
            tracing::info!(category = %category, count = sources.len().min(take), "category");
            for source in sources.iter().take(take) {
                let output = full_output(&out_dir, source);
                let result = if output.exists() && !self.force {
                    Ok(Outcome::Skipped)
                } else {
                    paste_full(
                        &self.workspace,
                        source,
                        &template,
                        &template_name,
                        bbox,
                        FullPasteMode::FullPaste,
                        &output,
                    )
                };
                summary.record(source, result);
            }
        }
        Ok(summary)
    }
}

/// Paste bookmark art onto the bookmark template.
#[derive(Debug, Clone)]
pub struct BookmarkJob {
    /// Paths of the checkout.
    pub workspace: Workspace,
    /// Template image.
    pub template: PathBuf,
    /// Directory of bookmark sources.
    pub src_dir: PathBuf,
    /// Directory receiving outputs.
    pub out_dir: PathBuf,
    /// Target rectangle.
    pub bbox: Rect,
}

impl BookmarkJob {
    /// Bookmarks from the workspace pasted into `bbox`.
    #[must_use]
    pub fn new(workspace: &Workspace, bbox: Rect) -> Self {
        Self {
            template: workspace.bookmark_template.clone(),
            src_dir: workspace.category_images(workspace::BOOKMARK),
            out_dir: workspace.category_outputs(workspace::BOOKMARK),
            workspace: workspace.clone(),
            bbox,
        }
    }

    /// Run the batch.
    ///
    /// # Errors
    ///
    /// Fails when the source directory or template is missing.
    pub fn run(&self) -> Result<BatchSummary, CatalogError> {
        let sources = files::list_images(&self.src_dir)?;
        let template = files::load_template(&self.template)?;
        let template_name = files::file_name(&self.template);
        tracing::info!(bbox = %self.bbox, sources = sources.len(), "pasting bookmarks");

        let mut summary = BatchSummary::default();
        for source in &sources {
            let output = full_output(&self.out_dir, source);
            let result = paste_full(
                &self.workspace,
                source,
                &template,
                &template_name,
                self.bbox,
                FullPasteMode::Bookmark,
                &output,
            );
            summary.record(source, result);
        }
        Ok(summary)
    }
}
