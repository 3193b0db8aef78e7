//! Plan which frames and context of a debugging capture to send to a model.
//!
//! Logs go to stderr (set `RUST_LOG=glimpse=debug` for per-decision detail);
//! plans go to stdout as JSON.
//!
//! # Examples
//!
//! ```sh
//! # Plan a capture for Claude with the default model-aware strategy
//! glimpse plan --frames ./capture --context context.json --profile claude
//!
//! # Greedy threshold selection, printing only the token breakdown
//! glimpse plan --frames ./capture --strategy threshold --diff-threshold 5 --table
//!
//! # Resize selected frames into ./out at the allocated quality
//! glimpse plan --frames ./capture --out-dir ./out
//!
//! # List built-in and custom profiles
//! glimpse profiles --profiles my-models.json
//! ```

use clap::{Parser, Subcommand};
use glimpse::prelude::*;
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Plan which frames and context of a debugging capture to send to a model.
#[derive(Parser)]
#[command(name = "glimpse", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Select frames and trim context for one model
    Plan(PlanArgs),
    /// List known model profiles
    Profiles {
        /// JSON file with extra profiles (an array of profile objects)
        #[arg(long)]
        profiles: Option<PathBuf>,
    },
    /// Print the JSON Schema of a profile file
    Schema,
}

#[derive(clap::Args)]
struct PlanArgs {
    // ── Inputs ─────────────────────────────────────────────────
    /// Directory of frame images, ordered by file name
    #[arg(long)]
    frames: PathBuf,

    /// JSON file with terminal and git context
    #[arg(long)]
    context: Option<PathBuf>,

    /// Capture rate used to derive frame timestamps
    #[arg(long, default_value_t = 1.0)]
    fps: f64,

    // ── Model ──────────────────────────────────────────────────
    /// Target model profile
    #[arg(long, default_value = "default")]
    profile: String,

    /// JSON file with extra profiles (an array of profile objects)
    #[arg(long)]
    profiles: Option<PathBuf>,

    // ── Selection ──────────────────────────────────────────────
    /// Frame selection strategy
    #[arg(long, value_enum, default_value_t = SelectionStrategy::ModelAware)]
    strategy: SelectionStrategy,

    /// Minimum change percentage for the threshold strategy
    #[arg(long, default_value_t = glimpse::config::DEFAULT_DIFF_THRESHOLD)]
    diff_threshold: f64,

    /// Per-channel intensity difference for a pixel to count as changed
    #[arg(long, default_value_t = glimpse::select::diff::DEFAULT_CHANNEL_THRESHOLD)]
    channel_threshold: u8,

    // ── Output ─────────────────────────────────────────────────
    /// Resize and re-encode selected frames into this directory
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Print the token breakdown table instead of the JSON plan
    #[arg(long)]
    table: bool,
}

fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let result = match cli.command {
        Command::Plan(args) => run_plan(args),
        Command::Profiles { profiles } => run_profiles(profiles.as_deref()),
        Command::Schema => print_json(&ModelProfile::file_schema()),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run_plan(args: PlanArgs) -> Result<(), String> {
    if args.fps.is_nan() || args.fps <= 0.0 {
        return Err(format!("--fps must be positive, got {}", args.fps));
    }

    let registry = load_registry(args.profiles.as_deref())?;
    let profile = registry.get_or_default(&args.profile);

    let frames = read_frames(&args.frames, args.fps)?;
    let context = match &args.context {
        Some(path) => CaptureContext::load(path)?,
        None => CaptureContext::default(),
    };

    let config = PlannerConfig::new()
        .with_strategy(args.strategy)
        .with_diff_threshold(args.diff_threshold)
        .with_channel_threshold(args.channel_threshold);
    let differ = config.perceptual_diff();
    let planner = CapturePlanner::new(profile, config);

    let plan = match &args.out_dir {
        Some(dir) => planner.plan(
            &frames,
            &context,
            &differ,
            &ResizingCodec::for_profile(dir, profile),
        ),
        None => planner.plan(
            &frames,
            &context,
            &differ,
            &PassthroughCodec::for_profile(profile),
        ),
    };

    if args.table {
        println!("{}", plan.utilization.to_table());
        for suggestion in &plan.validation.suggestions {
            println!("- {suggestion}");
        }
        Ok(())
    } else {
        print_json(&plan)
    }
}

fn run_profiles(extra: Option<&Path>) -> Result<(), String> {
    let registry = load_registry(extra)?;
    println!(
        "{:<12} {:>10} {:>8} {:>10} {:>6}",
        "NAME", "MAX TOKENS", "IMAGE", "PREFERRED", "MAX"
    );
    for name in registry.names() {
        let Some(p) = registry.get(name) else {
            continue;
        };
        println!(
            "{:<12} {:>10} {:>8} {:>10} {:>6}",
            p.name, p.max_tokens, p.image_token_estimate, p.preferred_frames, p.max_frames
        );
    }
    Ok(())
}

fn load_registry(extra: Option<&Path>) -> Result<ProfileRegistry, String> {
    let mut registry = ProfileRegistry::with_builtins();
    if let Some(path) = extra {
        registry.load_file(path)?;
    }
    Ok(registry)
}

/// Image files in `dir`, sorted by file name, timestamped at `fps`.
fn read_frames(dir: &Path, fps: f64) -> Result<Vec<Frame>, String> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| format!("failed to read frames from {}: {e}", dir.display()))?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && is_image(path))
        .collect();
    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    if paths.is_empty() {
        return Err(format!("no image files found in {}", dir.display()));
    }

    Ok(paths
        .into_iter()
        .enumerate()
        .map(|(i, path)| Frame::new(i, path, i as f64 / fps))
        .collect())
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            matches!(
                ext.to_ascii_lowercase().as_str(),
                "png" | "jpg" | "jpeg"
            )
        })
}

fn print_json(value: &impl serde::Serialize) -> Result<(), String> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| format!("failed to serialize output: {e}"))?;
    println!("{json}");
    Ok(())
}
