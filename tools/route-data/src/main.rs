use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use mpk_transit::catalog::RouteCatalog;
use std::path::{Path, PathBuf};
use std::time::Duration;

mod audit;
mod geocode;
mod merge;
mod scrape;

use audit::{AuditFormat, StopCoordinates, apply_coordinates, missing_stops, write_report};
use geocode::{Nominatim, RetryPolicy, geocode_missing};
use merge::{LineLists, merge_missing_lines};
use scrape::Scraper;

#[derive(Parser, Debug)]
#[command(
    name = "route-data",
    author,
    version,
    about = "Maintain the scraped routes.json catalog",
    long_about = "Builds and maintains the route catalog served by mpk-viewer-server.\n\n\
                  `scrape` builds the catalog from the wroclaw.pl timetable pages and \
                  `merge` adds lines from the processed line lists that the scraper missed. \
                  `geocode` looks up stops without coordinates on Nominatim, `audit` lists \
                  the stops still missing, and `apply` writes coordinates from a file."
)]
struct Args {
    /// Route catalog to read and rewrite
    #[arg(short, long, default_value = "data/routes.json")]
    routes: PathBuf,

    /// Verbose output (show debug messages)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a fresh catalog from the wroclaw.pl timetable pages
    Scrape {
        /// Site root holding the timetable pages
        #[arg(long, default_value = scrape::BASE_URL)]
        base_url: String,

        /// Pause between line pages, in milliseconds
        #[arg(long, default_value_t = 100)]
        delay_ms: u64,

        /// Request timeout in seconds
        #[arg(long, default_value_t = 30)]
        timeout_secs: u64,

        /// Overwrite an existing catalog
        #[arg(long)]
        force: bool,
    },
    /// Add lines listed in all_lines.txt that are missing from the catalog
    Merge {
        /// Directory holding all_lines.txt, bus_lines.txt and tram_lines.txt
        #[arg(short, long, default_value = "processed_dataset")]
        lists: PathBuf,

        /// Value of the `source` field on added lines
        #[arg(long, default_value = "processed_dataset_2022")]
        source: String,

        /// Report what would be added without writing
        #[arg(long)]
        dry_run: bool,
    },
    /// List unique (name, street) stops without coordinates
    Audit {
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: AuditFormat,
    },
    /// Apply coordinates from a JSON list of {name, street, lat, lon}
    Apply {
        /// Coordinates file, usually a filled-in `audit --format json`
        coordinates: PathBuf,
    },
    /// Look up stops without coordinates on Nominatim, saving after each hit
    Geocode {
        /// Nominatim search endpoint
        #[arg(long, default_value = geocode::NOMINATIM_URL)]
        endpoint: String,

        /// Minimum pause between requests, in milliseconds
        #[arg(long, default_value_t = 1000)]
        min_delay_ms: u64,

        /// Attempts per stop before giving up
        #[arg(long, default_value_t = 3)]
        attempts: u32,

        /// Request timeout in seconds
        #[arg(long, default_value_t = 10)]
        timeout_secs: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if args.verbose { "debug" } else { "info" }),
    )
    .format_timestamp(None)
    .init();

    match args.command {
        Command::Scrape {
            base_url,
            delay_ms,
            timeout_secs,
            force,
        } => {
            if args.routes.exists() && !force {
                bail!(
                    "{} already exists, pass --force to overwrite it",
                    args.routes.display()
                );
            }
            let scraper = Scraper::new(
                &base_url,
                Duration::from_millis(delay_ms),
                Duration::from_secs(timeout_secs),
            )?;
            let catalog = scraper.scrape().await?;
            log::info!("Scraped {} lines", catalog.len());
            if let Some(parent) = args.routes.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            save(&catalog, &args.routes)?;
        }
        Command::Merge { lists, source, dry_run } => {
            let mut catalog = load(&args.routes)?;
            let lists = LineLists::read(&lists)?;
            let added = merge_missing_lines(&mut catalog, &lists, &source);
            log::info!("Found {} missing lines", added.len());
            if dry_run || added.is_empty() {
                return Ok(());
            }
            save(&catalog, &args.routes)?;
        }
        Command::Audit { format } => {
            let catalog = load(&args.routes)?;
            let stops = missing_stops(&catalog);
            log::info!("Found {} stops without coordinates", stops.len());
            let stdout = std::io::stdout();
            write_report(&stops, format, &mut stdout.lock())?;
        }
        Command::Apply { coordinates } => {
            let mut catalog = load(&args.routes)?;
            let text = std::fs::read_to_string(&coordinates)
                .with_context(|| format!("Failed to read {}", coordinates.display()))?;
            let entries: Vec<StopCoordinates> = serde_json::from_str(&text)
                .with_context(|| format!("Invalid coordinates file {}", coordinates.display()))?;
            let (applied, updated) = apply_coordinates(&mut catalog, &entries);
            log::info!("Applied {applied}/{} entries to {updated} stops", entries.len());
            if updated > 0 {
                save(&catalog, &args.routes)?;
            }
        }
        Command::Geocode {
            endpoint,
            min_delay_ms,
            attempts,
            timeout_secs,
        } => {
            let mut catalog = load(&args.routes)?;
            let mut geocoder = Nominatim::new(
                endpoint,
                Duration::from_millis(min_delay_ms),
                Duration::from_secs(timeout_secs),
            )?;
            let retry = RetryPolicy {
                attempts,
                ..RetryPolicy::default()
            };
            let summary = geocode_missing(&mut catalog, &mut geocoder, retry, |catalog| {
                catalog
                    .save(&args.routes)
                    .with_context(|| format!("Failed to write {}", args.routes.display()))
            })
            .await?;
            log::info!(
                "Located {} stops ({} catalog entries updated), {} not found",
                summary.located,
                summary.stops_updated,
                summary.not_found
            );
        }
    }

    Ok(())
}

fn load(path: &Path) -> Result<RouteCatalog> {
    if !path.exists() {
        bail!("Route catalog not found: {}", path.display());
    }
    let catalog = RouteCatalog::load(path).with_context(|| format!("Failed to load {}", path.display()))?;
    log::info!("Loaded {} lines from {}", catalog.len(), path.display());
    Ok(catalog)
}

fn save(catalog: &RouteCatalog, path: &Path) -> Result<()> {
    catalog
        .save(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    log::info!("{} has been updated", path.display());
    Ok(())
}
