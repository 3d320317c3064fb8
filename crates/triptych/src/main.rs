//! triptych: command-line batches for the poster catalog.
//!
//! Slices posters into triptych strips, pastes strips and whole images
//! onto print templates, detects paste regions, and keeps the static
//! gallery manifest in step with the outputs directory.
//!
//! # Usage
//!
//! ```text
//! triptych [--root DIR] [-v] <COMMAND> [OPTIONS]
//! ```
//!
//! Logging goes to stderr and honours `RUST_LOG`; reports that are the
//! command's result go to stdout.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;
use triptych_catalog::{
    BatchSummary, BookmarkJob, CatalogError, ComposeJob, DetectChain, FullJob, ManifestProblem,
    MatchJob, Workspace, assets, backup, batch, files, manifest, record, region, rename,
    workspace,
};
use triptych_compose::{ComposeConfig, Rect, Variant};

/// Composite sliced poster art onto print templates and rebuild the
/// gallery manifest.
#[derive(Parser)]
#[command(name = "triptych", version)]
struct Cli {
    /// Checkout root holding `images/`, `outputs/`, `js/` and the templates.
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// Log geometry and per-file detail.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Slice posters into strips and paste them onto the poster template.
    Compose(ComposeArgs),
    /// Paste existing strips at the placement of a reference output.
    Match(MatchArgs),
    /// Paste one strip scaled to the width of a rectangle.
    PasteAt(PasteAtArgs),
    /// Paste whole posters of every category onto the poster template.
    Full(FullArgs),
    /// Paste bookmark art onto the bookmark template.
    Bookmarks(BookmarkArgs),
    /// Detect the paste region of a template.
    Detect(DetectArgs),
    /// Regenerate the gallery manifest.
    Manifest {
        /// Print the manifest instead of writing it.
        #[arg(long)]
        dry_run: bool,
    },
    /// Report duplicate manifest entries per category.
    Duplicates,
    /// Check manifest entry types and count poster entries.
    Check,
    /// Rename outputs to `PREFIX-NNN<token>` per category.
    Rename {
        /// List the renames without moving anything.
        #[arg(long)]
        dry_run: bool,
    },
    /// Copy the outputs directory to a timestamped backup.
    Backup,
    /// Replace the outputs directory with a backup.
    Restore {
        /// Backup to restore; defaults to the newest `outputs_backup_*`.
        #[arg(long, short)]
        backup: Option<PathBuf>,
        /// Show what would be restored without touching anything.
        #[arg(long)]
        dry_run: bool,
    },
    /// Make near-white sticker backgrounds transparent.
    StripBackground {
        /// Directory of `*_full.*` sticker outputs.
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Generate favicon and logo sizes from the site logo.
    Icons {
        /// Logo to scale; defaults to `assets/014.png`.
        #[arg(long)]
        source: Option<PathBuf>,
        /// Directory receiving the icons; defaults to `assets/`.
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
}

/// Slicing recipe selection.
#[derive(Clone, Copy, ValueEnum)]
enum VariantArg {
    /// Columns for portrait sources, rows for landscape.
    Auto,
    /// Always columns.
    Vertical,
    /// Always rows, stacked.
    Horizontal,
    /// Rows turned upright and laid out side by side.
    RotatedRows,
}

impl From<VariantArg> for Variant {
    fn from(v: VariantArg) -> Self {
        match v {
            VariantArg::Auto => Self::Auto,
            VariantArg::Vertical => Self::Vertical,
            VariantArg::Horizontal => Self::Horizontal,
            VariantArg::RotatedRows => Self::RotatedRows,
        }
    }
}

#[derive(Args)]
struct ComposeArgs {
    /// Slicing recipe.
    #[arg(long, value_enum, default_value_t = VariantArg::Auto)]
    variant: VariantArg,

    /// Strip size as a fraction of the template.
    #[arg(long, default_value_t = ComposeConfig::DEFAULT_SCALE)]
    scale: f64,

    /// Gap between cells in pixels.
    #[arg(long, default_value_t = ComposeConfig::DEFAULT_SPACING)]
    spacing: u32,

    /// Number of panels.
    #[arg(long, default_value_t = ComposeConfig::DEFAULT_PANELS)]
    panels: u32,

    /// Cap on each cell's cross-axis size.
    #[arg(long)]
    max_cross: Option<u32>,

    /// Turn sources upside down before slicing.
    #[arg(long)]
    flip: bool,

    /// Top edge of the strip when no region is detected.
    #[arg(long)]
    y_offset: Option<u32>,

    /// Left edge of stacked strips (0 centres).
    #[arg(long)]
    x_offset: Option<u32>,

    /// Detect the template's blank area and place strips above it.
    #[arg(long)]
    auto_detect: bool,

    /// Process a single source file.
    #[arg(long, conflicts_with = "ids")]
    file: Option<String>,

    /// Process only these source stems (comma separated).
    #[arg(long, value_delimiter = ',')]
    ids: Vec<String>,

    /// Source directory.
    #[arg(long)]
    src_dir: Option<PathBuf>,

    /// Output directory.
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Template image.
    #[arg(long)]
    template: Option<PathBuf>,

    /// Full compose config as a JSON string.
    ///
    /// When provided, `--variant`, `--scale`, `--spacing`, `--panels`,
    /// `--max-cross` and `--flip` are ignored.
    #[arg(long)]
    config_json: Option<String>,
}

#[derive(Args)]
struct MatchArgs {
    /// Source stems whose strips are pasted (comma separated).
    #[arg(long, value_delimiter = ',', required = true)]
    ids: Vec<String>,

    /// Output whose placement is copied.
    #[arg(long, default_value = MatchJob::DEFAULT_REF_ID)]
    ref_id: String,

    /// Directory holding the reference sidecar.
    #[arg(long)]
    ref_dir: Option<PathBuf>,

    /// Explicit placement `x,y,w,h`, overriding the reference.
    #[arg(long)]
    bbox: Option<Rect>,

    /// Directory holding the strips.
    #[arg(long)]
    src_dir: Option<PathBuf>,

    /// Output directory.
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Template image.
    #[arg(long)]
    template: Option<PathBuf>,
}

#[derive(Args)]
struct PasteAtArgs {
    /// Strip image.
    #[arg(long)]
    strip: PathBuf,

    /// Target rectangle `x,y,w,h`.
    #[arg(long)]
    bbox: Rect,

    /// Output image.
    #[arg(long)]
    output: PathBuf,

    /// Template image.
    #[arg(long)]
    template: Option<PathBuf>,
}

#[derive(Args)]
struct FullArgs {
    /// Process every image instead of the first `--limit` per category.
    #[arg(long)]
    all: bool,

    /// Images per category.
    #[arg(long, default_value_t = FullJob::DEFAULT_LIMIT)]
    limit: usize,

    /// Overwrite existing outputs.
    #[arg(long)]
    force: bool,

    /// Target rectangle `x,y,w,h`.
    #[arg(long)]
    bbox: Option<Rect>,

    /// Template image.
    #[arg(long)]
    template: Option<PathBuf>,
}

#[derive(Args)]
struct BookmarkArgs {
    /// Target rectangle `x,y,w,h`.
    #[arg(long, required_unless_present = "auto", conflicts_with = "auto")]
    bbox: Option<Rect>,

    /// Use the rectangle saved by `triptych detect`.
    #[arg(long)]
    auto: bool,

    /// Template image.
    #[arg(long)]
    template: Option<PathBuf>,
}

/// Detector chain selection.
#[derive(Clone, Copy, ValueEnum)]
enum MethodArg {
    /// Brightness thresholds, then edges.
    All,
    /// Brightness thresholds only.
    Brightness,
    /// Edge shapes only.
    Edges,
}

#[derive(Args)]
struct DetectArgs {
    /// Template image; defaults to the bookmark template.
    #[arg(long)]
    template: Option<PathBuf>,

    /// Detectors to try.
    #[arg(long, value_enum, default_value_t = MethodArg::All)]
    method: MethodArg,

    /// Where to save the detection; defaults to
    /// `outputs/BOOKMARK/detected_bbox.json`.
    #[arg(long)]
    out: Option<PathBuf>,
}

/// Build a [`ComposeConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and the
/// individual parameter flags are ignored.
fn compose_config(args: &ComposeArgs) -> Result<ComposeConfig, String> {
    if let Some(ref json) = args.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }
    Ok(ComposeConfig {
        variant: args.variant.into(),
        scale: args.scale,
        spacing: args.spacing,
        panels: args.panels,
        max_cross: args.max_cross,
        flip: args.flip,
    })
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn done(summary: BatchSummary) -> ExitCode {
    println!("Done. {summary}");
    ExitCode::SUCCESS
}

fn compose(ws: &Workspace, args: ComposeArgs) -> Result<ExitCode, CatalogError> {
    let config = match compose_config(&args) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return Ok(ExitCode::FAILURE);
        }
    };
    let mut job = ComposeJob::new(ws, config);
    job.x_offset = args.x_offset;
    job.y_offset = args.y_offset;
    job.auto_detect = args.auto_detect;
    job.only = args.file.map_or(args.ids, |f| vec![f]);
    if let Some(dir) = args.src_dir {
        job.src_dir = dir;
    }
    if let Some(dir) = args.out_dir {
        job.out_dir = dir;
    }
    if let Some(template) = args.template {
        job.template = template;
    }
    job.run().map(done)
}

fn match_strips(ws: &Workspace, args: MatchArgs) -> Result<ExitCode, CatalogError> {
    let mut job = MatchJob::new(ws, args.ids);
    job.out_dir = args
        .out_dir
        .unwrap_or_else(|| ws.outputs_root.join(format!("SPLIT_POSTERS_MATCH_{}", args.ref_id)));
    job.ref_id = args.ref_id;
    job.bbox = args.bbox;
    if let Some(dir) = args.ref_dir {
        job.ref_dir = dir;
    }
    if let Some(dir) = args.src_dir {
        job.src_dir = dir;
    }
    if let Some(template) = args.template {
        job.template = template;
    }
    job.run().map(done)
}

fn paste_at(ws: &Workspace, args: PasteAtArgs) -> Result<ExitCode, CatalogError> {
    let template = args.template.unwrap_or_else(|| ws.poster_template.clone());
    let bbox = batch::paste_at(ws, &args.strip, args.bbox, &template, &args.output)?;
    println!("Pasted at {bbox} -> {}", args.output.display());
    Ok(ExitCode::SUCCESS)
}

fn full(ws: &Workspace, args: FullArgs) -> Result<ExitCode, CatalogError> {
    let mut job = FullJob::new(ws);
    job.limit = (!args.all).then_some(args.limit);
    job.force = args.force;
    job.bbox = args.bbox;
    if let Some(template) = args.template {
        job.template = template;
    }
    job.run().map(done)
}

fn bookmarks(ws: &Workspace, args: BookmarkArgs) -> Result<ExitCode, CatalogError> {
    let bbox = match args.bbox {
        Some(bbox) => bbox,
        None => record::read_rect(&ws.detected_bbox_path())?,
    };
    let mut job = BookmarkJob::new(ws, bbox);
    if let Some(template) = args.template {
        job.template = template;
    }
    job.run().map(done)
}

fn detect(ws: &Workspace, args: DetectArgs) -> Result<ExitCode, CatalogError> {
    let template = args
        .template
        .unwrap_or_else(|| ws.bookmark_template.clone());
    let chain = match args.method {
        MethodArg::All => DetectChain::All,
        MethodArg::Brightness => DetectChain::Brightness,
        MethodArg::Edges => DetectChain::Edges,
    };
    let Some(found) = region::detect_template(&template, chain)? else {
        eprintln!("No region detected in {}", template.display());
        return Ok(ExitCode::FAILURE);
    };
    let out = args.out.unwrap_or_else(|| ws.detected_bbox_path());
    files::write_json(&found, &out)?;
    let json = serde_json::to_string_pretty(&found).map_err(|source| CatalogError::Json {
        path: out.clone(),
        source,
    })?;
    println!("{json}");
    Ok(ExitCode::SUCCESS)
}

fn write_manifest(ws: &Workspace, dry_run: bool) -> Result<ExitCode, CatalogError> {
    if dry_run {
        let catalog = manifest::build(ws)?;
        let text = manifest::render(&catalog).map_err(|source| CatalogError::Json {
            path: ws.manifest_path.clone(),
            source,
        })?;
        print!("{text}");
    } else {
        let catalog = manifest::regenerate(ws)?;
        println!("Wrote {}", ws.manifest_path.display());
        let names: Vec<&str> = catalog.keys().map(String::as_str).collect();
        println!("Categories: {}", names.join(", "));
    }
    Ok(ExitCode::SUCCESS)
}

fn report_duplicates(ws: &Workspace) -> Result<ExitCode, CatalogError> {
    let raw = manifest::load(&ws.manifest_path)?;
    let dups = manifest::duplicates(&raw);
    if dups.is_empty() {
        println!("No duplicates found in manifest.");
    }
    for (category, entries) in &dups {
        println!("Category: {category} - {} duplicate(s)", entries.len());
        for entry in entries {
            println!("   {entry}");
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn check(ws: &Workspace) -> Result<ExitCode, CatalogError> {
    let raw = manifest::load(&ws.manifest_path)?;
    let report = manifest::check(&raw);
    println!(
        "Poster categories counted: {}",
        report.poster_categories.join(", ")
    );
    println!("Total posters entries (catalog): {}", report.poster_entries);
    println!(
        "Non-string manifest entries found: {}",
        report.bad_entries.len()
    );
    for bad in report.bad_entries.iter().take(10) {
        println!(
            "  problem: {} [{}] = {}",
            bad.category, bad.index, bad.value
        );
    }
    Ok(ExitCode::SUCCESS)
}

fn rename_outputs(ws: &Workspace, dry_run: bool) -> Result<ExitCode, CatalogError> {
    let plans = rename::plan(&ws.outputs_root)?;
    for plan in &plans {
        println!(
            "{} (prefix {}): {} rename(s)",
            plan.category,
            plan.prefix,
            plan.renames.len()
        );
        if dry_run {
            for r in &plan.renames {
                println!(
                    "  {} -> {}",
                    files::file_name(&r.from),
                    files::file_name(&r.to)
                );
            }
        }
    }
    if dry_run {
        return Ok(ExitCode::SUCCESS);
    }
    let mut moved = 0;
    for plan in &plans {
        moved += rename::apply(plan)?;
    }
    println!("Renamed {moved} file(s)");
    write_manifest(ws, false)?;
    report_duplicates(ws)
}

fn restore(ws: &Workspace, from: Option<PathBuf>, dry_run: bool) -> Result<ExitCode, CatalogError> {
    let outcome = backup::restore(ws, from.as_deref(), dry_run)?;
    println!("Restore from: {}", outcome.backup.display());
    match (&outcome.snapshot, dry_run) {
        (_, true) => println!("Dry run - no changes made."),
        (Some(snapshot), false) => {
            println!("Previous outputs saved to: {}", snapshot.display());
        }
        (None, false) => println!("No existing outputs to save."),
    }
    Ok(ExitCode::SUCCESS)
}

fn run(cli: Cli) -> Result<ExitCode, CatalogError> {
    let ws = Workspace::new(cli.root);
    match cli.command {
        Command::Compose(args) => compose(&ws, args),
        Command::Match(args) => match_strips(&ws, args),
        Command::PasteAt(args) => paste_at(&ws, args),
        Command::Full(args) => full(&ws, args),
        Command::Bookmarks(args) => bookmarks(&ws, args),
        Command::Detect(args) => detect(&ws, args),
        Command::Manifest { dry_run } => write_manifest(&ws, dry_run),
        Command::Duplicates => report_duplicates(&ws),
        Command::Check => check(&ws),
        Command::Rename { dry_run } => rename_outputs(&ws, dry_run),
        Command::Backup => {
            let dest = backup::create_backup(&ws)?;
            println!("Backed up outputs to {}", dest.display());
            Ok(ExitCode::SUCCESS)
        }
        Command::Restore { backup, dry_run } => restore(&ws, backup, dry_run),
        Command::StripBackground { dir } => {
            let dir = dir.unwrap_or_else(|| ws.category_outputs(workspace::SINGLE_STICKERS));
            assets::strip_backgrounds(&dir).map(done)
        }
        Command::Icons { source, out_dir } => {
            let source = source.unwrap_or_else(|| ws.assets_dir.join(assets::LOGO_SOURCE));
            let out_dir = out_dir.unwrap_or_else(|| ws.assets_dir.clone());
            for path in assets::generate_icons(&source, &out_dir)? {
                println!("Wrote {}", path.display());
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Exit status for a fatal error: dedicated codes for an unreadable
/// manifest, 1 for everything else.
const fn exit_status(err: &CatalogError) -> u8 {
    match err {
        CatalogError::Manifest { problem, .. } => match problem {
            ManifestProblem::Missing => 2,
            ManifestProblem::NoAssignment => 3,
            ManifestProblem::InvalidJson(_) => 4,
        },
        _ => 1,
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(exit_status(&e))
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_build_default_config() {
        let cli = Cli::parse_from(["triptych", "compose"]);
        let Command::Compose(args) = cli.command else {
            unreachable!("parsed compose");
        };
        assert_eq!(compose_config(&args), Ok(ComposeConfig::default()));
    }

    #[test]
    fn config_json_overrides_flags() {
        let cli = Cli::parse_from([
            "triptych",
            "compose",
            "--spacing",
            "40",
            "--config-json",
            r#"{"variant": "rotated-rows", "spacing": 4}"#,
        ]);
        let Command::Compose(args) = cli.command else {
            unreachable!("parsed compose");
        };
        let config = compose_config(&args).unwrap_or_default();
        assert_eq!(config.variant, Variant::RotatedRows);
        assert_eq!(config.spacing, 4);
        assert!(
            (config.scale - ComposeConfig::DEFAULT_SCALE).abs() < f64::EPSILON
        );
    }

    #[test]
    fn bbox_flag_parses() {
        let cli = Cli::parse_from([
            "triptych", "paste-at", "--strip", "s.png", "--bbox", "158,357,468,149", "--output",
            "o.jpg",
        ]);
        let Command::PasteAt(args) = cli.command else {
            unreachable!("parsed paste-at");
        };
        assert_eq!(args.bbox, Rect::new(158, 357, 468, 149));
    }

    #[test]
    fn bookmarks_need_a_source_of_bbox() {
        assert!(Cli::try_parse_from(["triptych", "bookmarks"]).is_err());
        assert!(
            Cli::try_parse_from(["triptych", "bookmarks", "--auto"]).is_ok()
        );
        assert!(
            Cli::try_parse_from(["triptych", "bookmarks", "--auto", "--bbox", "1,2,3,4"]).is_err()
        );
    }

    #[test]
    fn manifest_problems_have_distinct_codes() {
        let err = |problem| CatalogError::Manifest {
            path: PathBuf::from("js/manifest.static.js"),
            problem,
        };
        assert_eq!(exit_status(&err(ManifestProblem::Missing)), 2);
        assert_eq!(exit_status(&err(ManifestProblem::NoAssignment)), 3);
        assert_eq!(
            exit_status(&CatalogError::MissingTemplate(PathBuf::from("011.jpg"))),
            1
        );
    }
}
