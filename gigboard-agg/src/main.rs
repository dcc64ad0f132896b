//! gigboard-agg - Live music listing aggregator
//!
//! Gathers upcoming shows from the configured venue sources, enriches every
//! performer with MusicBrainz metadata, and serves the result from a
//! disk-backed cache that is rebuilt once it is older than the freshness
//! threshold.

use anyhow::Result;
use chrono::Local;
use clap::{Parser, Subcommand};
use gigboard_common::config::{default_config_path, load_toml_config};
use gigboard_common::events::{EventBus, GigEvent};
use gigboard_common::EventRecord;
use gigboard_agg::config::AggSettings;
use gigboard_agg::services::LookupStore;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "gigboard-agg", version, about = "Aggregate upcoming live music listings")]
struct Cli {
    /// Folder holding the cached dataset and performer lookup store
    #[arg(long)]
    data_folder: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print upcoming shows, refreshing the cache when stale
    Show {
        /// Refresh even if the cache is fresh
        #[arg(long)]
        force: bool,
        /// Include performer notes
        #[arg(long)]
        notes: bool,
    },
    /// Rebuild the cached dataset now
    Refresh,
    /// Report when the cache was last built and whether it is stale
    Status,
    /// Show the lookup store entry for a performer
    Lookup {
        name: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    info!("Starting gigboard-agg v{}", env!("CARGO_PKG_VERSION"));

    let settings = AggSettings::resolve(cli.data_folder.as_deref(), cli.config.as_deref());

    match cli.command {
        Command::Show { force, notes } => {
            let manager = gigboard_agg::build_cache_manager(&settings, progress_bus())?;
            let records = manager.read(force).await?;
            print_listing(&records, notes);
        }
        Command::Refresh => {
            let manager = gigboard_agg::build_cache_manager(&settings, progress_bus())?;
            let records = manager.refresh().await?;
            println!("Refreshed {} shows", records.len());
        }
        Command::Status => {
            let manager = gigboard_agg::build_cache_manager(&settings, EventBus::default())?;
            match manager.last_updated() {
                Some(at) => println!("Last updated: {}", at.with_timezone(&Local).format("%a, %B %d %-I:%M %p")),
                None => println!("Last updated: never"),
            }
            println!("Stale: {}", if manager.is_stale() { "yes" } else { "no" });
            println!("Data folder: {}", settings.data_folder.display());
        }
        Command::Lookup { name } => {
            let paths = gigboard_agg::services::CachePaths::in_folder(&settings.data_folder);
            let store = LookupStore::load(&paths.lookup)?;
            match store.get(&name) {
                Some(entry) => println!("{}", serde_json::to_string_pretty(entry)?),
                None => println!("{} has not been looked up yet", name.trim()),
            }
        }
    }

    Ok(())
}

/// Log level: RUST_LOG, else the TOML `logging.level`, else info
fn init_tracing(cli: &Cli) {
    let configured_level = cli
        .config
        .clone()
        .or_else(default_config_path)
        .and_then(|path| load_toml_config(&path).ok())
        .map(|config| config.logging.level)
        .unwrap_or_else(|| "info".to_string());

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(configured_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Event bus with a subscriber logging refresh progress
fn progress_bus() -> EventBus {
    let event_bus = EventBus::new(256);
    let mut rx = event_bus.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            match event {
                GigEvent::SourceFetched { source, record_count, .. } => {
                    info!("Fetched {} listings from {}", record_count, source)
                }
                GigEvent::PerformerResolved { name, fetched: true, current, total, .. } => {
                    info!("Looked up {} ({}/{})", name, current, total)
                }
                GigEvent::RefreshCompleted { record_count, lookups, .. } => {
                    info!("Refresh complete: {} shows, {} new lookups", record_count, lookups)
                }
                _ => {}
            }
        }
    });
    event_bus
}

fn print_listing(records: &[EventRecord], with_notes: bool) {
    let mut current_day = None;
    for record in records {
        let start = record.start.with_timezone(&Local);
        let day = start.date_naive();
        if current_day != Some(day) {
            println!("\n{}", start.format("%a, %B %d"));
            current_day = Some(day);
        }

        let mut bill = vec![record.headliner.as_str()];
        bill.extend(record.supporting_slots().into_iter().flatten());
        let bill = bill.into_iter().filter(|n| !n.is_empty()).collect::<Vec<_>>().join(" / ");

        println!(
            "  {:>8}  {}  {}",
            start.format("%-I:%M %p").to_string(),
            record.venue,
            if bill.is_empty() { record.title.as_str() } else { bill.as_str() }
        );
        if with_notes && !record.notes.is_empty() {
            for line in record.notes.lines() {
                println!("            {}", line);
            }
        }
    }
}
