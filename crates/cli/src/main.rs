//! arcfoss CLI - GIS conversions with open-source tooling

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use geo::BoundingRect;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use arcfoss_algorithms::extent::{extents_to_features, get_extent};
use arcfoss_algorithms::gpx_export::to_gpx;
use arcfoss_algorithms::join::{conditional_sjoin_files, nearest_conditional_match, JoinParams};
use arcfoss_algorithms::reproject::reproject_file;
use arcfoss_core::io::DEFAULT_VECTOR_FORMAT;
use arcfoss_core::CRS;

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "arcfoss")]
#[command(author, version, about = "GIS conversions with open-source tooling", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the WGS84 extents of raster/vector datasets as polygon features
    DatasetsToExtent {
        /// Input datasets
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Output vector file
        #[arg(short, long)]
        output_file: PathBuf,
        /// Output driver name
        #[arg(long, default_value = DEFAULT_VECTOR_FORMAT)]
        output_format: String,
    },
    /// Convert a point or line vector file to GPX
    VectorToGpx {
        /// Input vector file
        input: PathBuf,
        /// Output GPX file
        output: PathBuf,
    },
    /// Join each right feature to its nearest left feature
    ConditionalSpatialJoin(JoinArgs),
    /// Keep the right features that have a nearest left feature passing the conditions
    NearestMatch(JoinArgs),
    /// Print the extent of a single dataset
    Extent {
        /// Input raster or vector file
        input: PathBuf,
        /// Report the extent in the dataset CRS instead of WGS84
        #[arg(long)]
        native_crs: bool,
    },
    /// Reproject a vector file
    Reproject {
        /// Input vector file
        input: PathBuf,
        /// Output vector file
        output: PathBuf,
        /// Target CRS (EPSG:XXXX, OGC:CRS84, PROJ string or WKT)
        #[arg(short, long)]
        to_crs: String,
        /// Output driver name
        #[arg(long, default_value = DEFAULT_VECTOR_FORMAT)]
        output_format: String,
    },
}

#[derive(Args)]
struct JoinArgs {
    /// Left vector file
    #[arg(short, long)]
    left: PathBuf,
    /// Right vector file
    #[arg(short, long)]
    right: PathBuf,
    /// Output vector file
    #[arg(short, long)]
    output_file: PathBuf,
    /// Output driver name
    #[arg(long, default_value = DEFAULT_VECTOR_FORMAT)]
    output_format: String,
    /// Name of the distance column
    #[arg(long, default_value = "distance")]
    distance_col: String,
    /// Maximum join distance, in CRS units
    #[arg(short, long)]
    max_distance: Option<f64>,
    /// Columns that must be equal on both sides (repeatable)
    #[arg(short, long)]
    join_on: Vec<String>,
}

impl JoinArgs {
    fn params(&self) -> Result<JoinParams> {
        if let Some(max) = self.max_distance {
            if max.is_nan() || max < 0.0 {
                bail!("--max-distance must be non-negative, got {}", max);
            }
        }
        Ok(JoinParams {
            distance_col: self.distance_col.clone(),
            max_distance: self.max_distance,
            join_on: self.join_on.clone(),
        })
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn done(name: &str, path: &Path, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

/// Run `work` behind a spinner, clearing it on both success and failure
fn with_spinner<T>(msg: &str, work: impl FnOnce() -> arcfoss_core::Result<T>) -> arcfoss_core::Result<T> {
    let pb = spinner(msg);
    let result = work();
    pb.finish_and_clear();
    result
}

fn run_join(args: &JoinArgs, matches_only: bool) -> Result<()> {
    let params = args.params()?;
    info!(
        "Joining {} to {} (max distance: {}, join on: {:?})",
        args.right.display(),
        args.left.display(),
        params
            .max_distance
            .map(|d| d.to_string())
            .unwrap_or_else(|| "none".to_string()),
        params.join_on
    );

    let start = Instant::now();
    if matches_only {
        with_spinner("Matching features...", || {
            nearest_conditional_match(&args.left, &args.right, &args.output_file, &args.output_format, &params)
        })
        .context("Nearest match failed")?;
        done("Matched features", &args.output_file, start.elapsed());
    } else {
        with_spinner("Joining features...", || {
            conditional_sjoin_files(&args.left, &args.right, &args.output_file, &args.output_format, &params)
        })
        .context("Conditional spatial join failed")?;
        done("Joined features", &args.output_file, start.elapsed());
    }
    Ok(())
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::DatasetsToExtent {
            inputs,
            output_file,
            output_format,
        } => {
            info!("Computing extents of {} datasets", inputs.len());
            let start = Instant::now();
            with_spinner("Reading extents...", || {
                extents_to_features(&inputs, &output_file, &output_format)
            })
            .context("Failed to write dataset extents")?;
            done("Extents", &output_file, start.elapsed());
        }

        Commands::VectorToGpx { input, output } => {
            let start = Instant::now();
            with_spinner("Converting to GPX...", || to_gpx(&input, &output))
                .with_context(|| format!("Failed to convert {} to GPX", input.display()))?;
            done("GPX", &output, start.elapsed());
        }

        Commands::ConditionalSpatialJoin(args) => run_join(&args, false)?,

        Commands::NearestMatch(args) => run_join(&args, true)?,

        Commands::Extent { input, native_crs } => {
            let extent = get_extent(&input, !native_crs)
                .with_context(|| format!("Failed to read extent of {}", input.display()))?;
            let Some(rect) = extent.bounding_rect() else {
                bail!("{} has an empty extent", input.display());
            };

            println!("File: {}", input.display());
            println!("CRS: {}", if native_crs { "native" } else { "EPSG:4326" });
            println!(
                "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                rect.min().x,
                rect.min().y,
                rect.max().x,
                rect.max().y
            );
            let ring: Vec<String> = extent
                .exterior()
                .coords()
                .map(|c| format!("{} {}", c.x, c.y))
                .collect();
            println!("POLYGON (({}))", ring.join(", "));
        }

        Commands::Reproject {
            input,
            output,
            to_crs,
            output_format,
        } => {
            let target = CRS::from_user_input(&to_crs).context("Invalid target CRS")?;
            let start = Instant::now();
            with_spinner("Reprojecting...", || {
                reproject_file(&input, &output, &target, &output_format)
            })
            .with_context(|| format!("Failed to reproject {}", input.display()))?;
            done("Reprojected", &output, start.elapsed());
        }
    }

    Ok(())
}
