mod config;
mod processing;
mod stats;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use contour_frame::{Color, Expansion, StippleStats};
use log::{debug, error, info};
use rayon::prelude::*;

use crate::config::Config;
use crate::processing::Processor;
use crate::stats::ProcessingStats;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ExpansionArg {
    /// Scale the silhouette about its center
    Rescale,
    /// Grow the silhouette by Euclidean distance
    Dilate,
}

impl From<ExpansionArg> for Expansion {
    fn from(arg: ExpansionArg) -> Self {
        match arg {
            ExpansionArg::Rescale => Expansion::Rescale,
            ExpansionArg::Dilate => Expansion::Dilate,
        }
    }
}

#[derive(Parser)]
#[command(name = "contour-frame")]
#[command(about = "Draw hand-drawn dotted borders around cut-out images")]
#[command(version)]
struct Args {
    /// Input cut-out image path or directory for batch processing
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Optional mask turning an opaque photo into a cut-out (single file mode)
    #[arg(short, long)]
    mask: Option<PathBuf>,

    /// Output directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Configuration file path (.json or .toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Generate default configuration file and exit
    #[arg(long)]
    generate_config: bool,

    /// File patterns to include in batch processing (e.g., "*.png,*.jpg")
    #[arg(long)]
    include_patterns: Option<String>,

    /// File patterns to exclude from batch processing
    #[arg(long)]
    exclude_patterns: Option<String>,

    /// Number of parallel workers for batch processing
    #[arg(long)]
    workers: Option<usize>,

    /// Continue batch processing even if some files fail
    #[arg(long)]
    continue_on_error: Option<bool>,

    /// Distance between the subject and the border, in pixels
    #[arg(long)]
    gap: Option<f32>,

    /// Border thickness in pixels
    #[arg(long)]
    stroke: Option<f32>,

    /// Border color (#rgb, #rrggbb, #rrggbbaa, white or black)
    #[arg(long)]
    color: Option<Color>,

    /// Seed for a reproducible stipple pattern
    #[arg(long)]
    seed: Option<u64>,

    /// How the silhouette is grown
    #[arg(long)]
    expansion: Option<ExpansionArg>,

    /// Seconds allowed per image
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Crop the result to its visible content
    #[arg(long)]
    crop: Option<bool>,

    /// Skip saving the inner, outer and ring rasters
    #[arg(long)]
    skip_intermediates: Option<bool>,

    /// Verbose output
    #[arg(long)]
    verbose: bool,
}

fn split_patterns(patterns: &str) -> Vec<String> {
    patterns
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Case-insensitive glob match where `*` stands for any run of characters.
fn matches_pattern(filename: &str, pattern: &str) -> bool {
    let filename = filename.to_ascii_lowercase();
    let pattern = pattern.to_ascii_lowercase();
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return filename == pattern;
    }

    let (first, last) = (parts[0], parts[parts.len() - 1]);
    if filename.len() < first.len() + last.len() || !filename.starts_with(first) || !filename.ends_with(last) {
        return false;
    }
    let mut rest = &filename[first.len()..filename.len() - last.len()];
    for part in &parts[1..parts.len() - 1] {
        match rest.find(part) {
            Some(at) => rest = &rest[at + part.len()..],
            None => return false,
        }
    }
    true
}

fn matches_patterns(filename: &str, patterns: &[String]) -> bool {
    patterns.iter().any(|pattern| matches_pattern(filename, pattern))
}

fn find_input_files(input_path: &Path, include_patterns: &[String], exclude_patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    if input_path.is_file() {
        files.push(input_path.to_path_buf());
    } else if input_path.is_dir() {
        let entries = fs::read_dir(input_path).with_context(|| format!("failed to list {}", input_path.display()))?;
        for entry in entries {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            if let Some(filename) = path.file_name().and_then(|n| n.to_str()) {
                if matches_patterns(filename, include_patterns) && !matches_patterns(filename, exclude_patterns) {
                    files.push(path);
                }
            }
        }
    }

    files.sort();
    Ok(files)
}

/// `<stem>_mask.png` next to the input, when present.
fn sibling_mask(input: &Path) -> Option<PathBuf> {
    let stem = input.file_stem()?.to_str()?;
    let mask_path = input.with_file_name(format!("{}_mask.png", stem));
    mask_path.is_file().then_some(mask_path)
}

fn apply_overrides(config: &mut Config, args: Args) {
    if let Some(input) = args.input {
        config.input.input = input;
    }
    if args.mask.is_some() {
        config.input.mask = args.mask;
    }
    if let Some(output) = args.output {
        config.output.output_folder = output;
    }
    if let Some(include_patterns) = args.include_patterns {
        config.batch.include_patterns = split_patterns(&include_patterns);
    }
    if let Some(exclude_patterns) = args.exclude_patterns {
        config.batch.exclude_patterns.extend(split_patterns(&exclude_patterns));
    }
    if let Some(workers) = args.workers {
        config.batch.workers = workers;
    }
    if let Some(continue_on_error) = args.continue_on_error {
        config.batch.continue_on_error = continue_on_error;
    }
    if let Some(timeout_secs) = args.timeout_secs {
        config.batch.timeout_secs = timeout_secs;
    }
    if let Some(gap) = args.gap {
        config.border.gap_px = gap;
    }
    if let Some(stroke) = args.stroke {
        config.border.stroke_px = stroke;
    }
    if let Some(color) = args.color {
        config.border.color = color;
    }
    if args.seed.is_some() {
        config.border.seed = args.seed;
    }
    if let Some(expansion) = args.expansion {
        config.border.expansion = expansion.into();
    }
    if let Some(crop) = args.crop {
        config.output.crop = crop;
    }
    if let Some(skip_intermediates) = args.skip_intermediates {
        config.output.skip_intermediates = skip_intermediates;
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    if args.generate_config {
        let config_path = args.config.unwrap_or_else(|| PathBuf::from("contour_config.json"));
        return Config::save_default(&config_path);
    }

    let mut config = match &args.config {
        Some(config_path) => Config::load(config_path)?,
        None => Config::default(),
    };
    apply_overrides(&mut config, args);
    config.batch.exclude_patterns.push("*_mask*".to_string());

    let input_files = find_input_files(
        &config.input.input,
        &config.batch.include_patterns,
        &config.batch.exclude_patterns,
    )?;
    if input_files.is_empty() {
        bail!("no input files found matching the criteria in {}", config.input.input.display());
    }

    let batch = config.input.input.is_dir();
    info!("Found {} input files", input_files.len());
    for file in &input_files {
        debug!("  - {}", file.display());
    }

    fs::create_dir_all(&config.output.output_folder).with_context(|| {
        format!("failed to create output directory {}", config.output.output_folder.display())
    })?;

    let processor = Processor::new(&config)?;
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.batch.workers.max(1))
        .build()
        .context("failed to start worker pool")?;

    let continue_on_error = config.batch.continue_on_error;
    let abort = AtomicBool::new(false);
    let results: Vec<Option<Result<StippleStats>>> = pool.install(|| {
        input_files
            .par_iter()
            .map(|input_file| {
                if abort.load(Ordering::Relaxed) {
                    return None;
                }
                let mask = if batch { sibling_mask(input_file) } else { config.input.mask.clone() };
                let result = processor.process(input_file, mask.as_deref());
                if result.is_err() && !continue_on_error {
                    abort.store(true, Ordering::Relaxed);
                }
                Some(result)
            })
            .collect()
    });

    let mut stats = ProcessingStats::new(input_files.len());
    let mut first_error = None;
    for (input_file, result) in input_files.iter().zip(results) {
        match result {
            Some(Ok(file_stats)) => {
                stats.record(&file_stats);
                debug!("Successfully processed: {} ({} marks)", input_file.display(), file_stats.primitives);
            }
            Some(Err(e)) => {
                stats.failed += 1;
                error!("Failed to process {}: {:#}", input_file.display(), e);
                first_error.get_or_insert(e);
            }
            None => stats.skipped += 1,
        }
        if input_files.len() > 1 && log::log_enabled!(log::Level::Debug) {
            stats.print_progress();
        }
    }

    if input_files.len() > 1 {
        stats.print_summary();
    } else if stats.processed == 1 {
        println!("Successfully generated border in: {}", config.output.output_folder.display());
    }

    match first_error {
        Some(e) if !continue_on_error => Err(e),
        _ => Ok(()),
    }
}
