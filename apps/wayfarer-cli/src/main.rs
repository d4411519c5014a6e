mod scenario;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use wayfarer_locations::WorldManifest;

use crate::scenario::Scenario;

#[derive(Parser)]
#[command(name = "wayfarer-cli", about = "CLI tool for wayfarer worlds")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and crate info
    Info,
    /// Check a world manifest for duplicate ids and dangling exits
    Validate {
        /// Path to the world manifest (YAML)
        world: PathBuf,
    },
    /// Play a scripted route through a world and report what streamed
    Simulate {
        /// Path to the scenario (YAML)
        scenario: PathBuf,
        /// Fixed tick length in milliseconds
        #[arg(long, default_value = "50")]
        dt_ms: u64,
        /// Tick limit for each route step to settle
        #[arg(long, default_value = "100000")]
        max_ticks: usize,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            println!("wayfarer-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("events: {}", wayfarer_events::crate_info());
            println!("locations: {}", wayfarer_locations::crate_info());
            println!("session: {}", wayfarer_session::crate_info());
            println!("stream: {}", wayfarer_stream::crate_info());
        }
        Commands::Validate { world } => {
            let manifest = WorldManifest::load(&world)
                .with_context(|| format!("invalid world {}", world.display()))?;
            let fallback = manifest.fallback_defs().count();
            println!(
                "OK: {} locations ({} in scene, {} via asset fallback), start={}",
                manifest.locations.len(),
                manifest.locations.len() - fallback,
                fallback,
                manifest.start
            );
            for def in &manifest.locations {
                println!(
                    "  {} [{:?}] persistent={} exits={}",
                    def.id,
                    def.kind,
                    def.persistent,
                    def.exits.len()
                );
            }
        }
        Commands::Simulate {
            scenario: path,
            dt_ms,
            max_ticks,
            json,
        } => {
            anyhow::ensure!(dt_ms > 0, "--dt-ms must be positive");
            let loaded = Scenario::load(&path)?;
            let report = scenario::run(loaded, Duration::from_millis(dt_ms), max_ticks)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                for entry in &report.events {
                    println!("[{:>8.2}s] {}", entry.at_secs, entry.event);
                }
                println!(
                    "current={} registered=[{}] scene={} clock={:.2}s",
                    report.current.as_deref().unwrap_or("-"),
                    report.registered.join(", "),
                    report.scene,
                    report.clock_secs
                );
                println!(
                    "loads: started={} completed={} failed={} | evictions={} unloads={} cancelled={} over_capacity={}",
                    report.stats.loads_started,
                    report.stats.loads_completed,
                    report.stats.loads_failed,
                    report.stats.evictions,
                    report.stats.unloads,
                    report.stats.unloads_cancelled,
                    report.stats.capacity_exhaustions
                );
            }
        }
    }

    Ok(())
}
