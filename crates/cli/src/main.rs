//! Tidemark CLI - coastal water/land change around protected areas

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use tidemark_analysis::{
    render_table, ChangeSummary, ClassifierSettings, Config, ConfigSource, NdwiClassifier, OutputSink, Region,
    RegionLoader, SceneQuery, SceneSource, Session, StacSceneSource,
};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "tidemark")]
#[command(author, version, about = "Coastal water/land change around protected areas", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (default: ./tidemark.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify every year and write report, layers and manifest
    Run {
        /// Output directory (overrides output.dir)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Comma-separated years (overrides years)
        #[arg(long, value_delimiter = ',')]
        years: Option<Vec<i32>>,
        /// Write a classified GeoTIFF per year
        #[arg(long)]
        export_rasters: bool,
        /// Also export the clipped region as a shapefile
        #[arg(long)]
        shapefile_export: bool,
    },
    /// Load and clip the protected-area boundaries
    Region {
        /// Write the clipped region as GeoJSON to this file
        #[arg(short, long)]
        export: Option<PathBuf>,
    },
    /// List the scenes that qualify for a year
    Scenes {
        #[arg(short, long)]
        year: i32,
    },
    /// Print the effective configuration
    Config {
        /// Only validate
        #[arg(long)]
        check: bool,
    },
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("logging disabled: {e}");
    }
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg}").unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let (config, source) = Config::load(path).context("Failed to load configuration")?;
    if let ConfigSource::Default = source {
        info!("Using built-in defaults");
    }
    Ok(config)
}

fn load_region(config: &Config) -> Result<Region> {
    let bbox = config.bbox()?;
    let pb = spinner("Loading protected-area boundaries...");
    let region = RegionLoader::new(config.region.attributes.clone())
        .load(&config.region.path, &bbox)
        .with_context(|| format!("Failed to load region from {}", config.region.path.display()));
    pb.finish_and_clear();
    region
}

fn connect(config: &Config) -> Result<StacSceneSource> {
    let pb = spinner(&format!("Connecting to {}...", config.imagery.catalog));
    let source = StacSceneSource::connect(&config.imagery).context("Failed to connect to the imagery catalog");
    pb.finish_and_clear();
    source
}

fn done(name: &str, path: &Path, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);
    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        // ── Run ──────────────────────────────────────────────────────
        Commands::Run { output, years, export_rasters, shapefile_export } => {
            if let Some(dir) = output {
                config.output.dir = dir;
            }
            if let Some(years) = years {
                config.years = years;
            }
            config.output.export_rasters |= export_rasters;
            config.output.shapefile_export |= shapefile_export;
            config.validate().context("Invalid command-line overrides")?;

            let start = Instant::now();
            let source = connect(&config)?;
            let describe = source.describe();
            let classifier = NdwiClassifier::new(source, ClassifierSettings::from(&config.imagery));
            let mut session = Session::new(RegionLoader::new(config.region.attributes.clone()), classifier);

            let bbox = config.bbox()?;
            let pb = spinner("Loading protected-area boundaries...");
            let region = session
                .region(&config.region.path, &bbox)
                .with_context(|| format!("Failed to load region from {}", config.region.path.display()));
            pb.finish_and_clear();
            let region = region?;
            info!("{} protected areas inside the bounding box", region.len());

            let pb = spinner("Classifying...");
            let total = config.years.len();
            let run = session.run_with_progress(&region, &config.years, |year, i| {
                pb.set_message(format!("Classifying {} ({}/{})...", year, i + 1, total));
            });
            pb.finish_and_clear();
            let run = run.context("Classification aborted")?;

            println!("{}", render_table(&run.outcomes));
            for failed in run.failures() {
                if let Some(reason) = &failed.failure {
                    warn!("{}* reported as zero: {}", failed.year(), reason);
                }
            }
            if let Some(summary) = ChangeSummary::from_outcomes(&run.outcomes) {
                println!();
                for line in summary.describe() {
                    println!("{}", line);
                }
            }

            let sink = OutputSink::from_config(&config);
            let written = sink
                .write(&region, &run, &config, &describe)
                .with_context(|| format!("Failed to write outputs to {}", sink.dir().display()))?;
            info!("{} files written", written.len());
            done("Results", sink.dir(), start.elapsed());
        }

        // ── Region ───────────────────────────────────────────────────
        Commands::Region { export } => {
            let start = Instant::now();
            let region = load_region(&config)?;
            let fields = config.region.attributes.popup_fields();
            let (lon, lat) = region.centroid();

            println!("File: {}", region.source().display());
            println!("Protected areas: {}", region.len());
            println!("Clipped area: {:.2} ha", region.geodesic_area_ha());
            println!("Centre: ({:.6}, {:.6})", lat, lon);
            println!();
            println!("{}", fields.join(" | "));
            for row in region.rows(&fields) {
                println!("{}", row.join(" | "));
            }

            if let Some(path) = export {
                let sink = OutputSink::from_config(&config);
                sink.export_region(&region, Some(&path))
                    .with_context(|| format!("Failed to export region to {}", path.display()))?;
                done("Region", &path, start.elapsed());
            }
        }

        // ── Scenes ───────────────────────────────────────────────────
        Commands::Scenes { year } => {
            let source = connect(&config)?;
            let query = SceneQuery {
                collection: config.imagery.collection.clone(),
                bbox: config.bbox()?,
                year,
                cloud_cover_max: config.imagery.cloud_cover_max,
            };
            let pb = spinner(&format!("Searching {} scenes for {}...", query.collection, year));
            let scenes = source.scenes(&query).context("Scene search failed");
            pb.finish_and_clear();
            let scenes: Vec<_> = scenes?.into_iter().filter(|s| query.accepts(s)).collect();

            println!("{} scenes below {}% cloud in {}", scenes.len(), query.cloud_cover_max, year);
            for s in &scenes {
                println!(
                    "  {}  {}  cloud {:>5.2}%{}",
                    s.id,
                    s.datetime.as_deref().unwrap_or("-"),
                    s.cloud_cover.unwrap_or(f64::NAN),
                    if s.boa_offset.is_some() { "  (offset removed)" } else { "" }
                );
            }
        }

        // ── Config ───────────────────────────────────────────────────
        Commands::Config { check } => {
            if check {
                println!("Configuration OK");
            } else {
                print!("{}", config.to_toml_string()?);
            }
        }
    }

    Ok(())
}
