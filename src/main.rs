//! CLI entry point for scale-dash
//!
//! Talks to a weight scale over its HTTP API and live WebSocket channel:
//! - `history`: render the history view and print a summary
//! - `live`: buffer live samples and print the chart series
//! - `delete`, `export`, `upload`: manage the measurement log
//! - `system`, `device-config`: inspect the device
//!
//! # Usage
//!
//! ```bash
//! scale-dash history --policy last-month
//! scale-dash --config my.toml live --count 20
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use scale_dash::config::{DashConfig, DEFAULT_CONFIG_PATH};
use scale_dash::data::RetentionPolicy;
use scale_dash::live::{LiveFeed, LiveMonitor};
use scale_dash::selection::DeleteRequest;
use scale_dash::store::{HttpStore, MeasurementStore};
use scale_dash::{logging, Dashboard};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "scale-dash")]
#[command(about = "Dashboard engine for a pet-monitoring weight scale", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the history view
    History {
        /// last-month, last-three-months or all-data
        #[arg(long, value_parser = parse_policy)]
        policy: Option<RetentionPolicy>,

        /// Read the feed from a local CSV file instead of the device
        #[arg(long)]
        feed: Option<PathBuf>,
    },

    /// Follow the live weight stream
    Live {
        /// Stop after this many samples
        #[arg(long, default_value = "100")]
        count: usize,
    },

    /// Delete measurements by timestamp
    Delete {
        #[arg(required = true)]
        timestamps: Vec<i64>,
    },

    /// Download the full feed to a CSV file
    Export { out: PathBuf },

    /// Replace the device's log with a CSV file
    Upload { file: PathBuf },

    /// Show flash usage and signal strength
    System,

    /// Show the device configuration
    DeviceConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = DashConfig::load_from(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    logging::init_from_config(&config)?;

    let store = HttpStore::new(&config.api)?;

    match cli.command {
        Commands::History { policy, feed } => {
            let policy = policy.unwrap_or(config.view.default_policy);
            show_history(&config, store, policy, feed).await
        }
        Commands::Live { count } => follow_live(&config, count).await,
        Commands::Delete { timestamps } => {
            let request = DeleteRequest::new(timestamps);
            store.delete(&request).await?;
            println!("Deleted {} measurement(s)", request.timestamps.len());
            Ok(())
        }
        Commands::Export { out } => {
            let mut dashboard = Dashboard::new(store, config.view.view_options());
            dashboard.reload().await?;
            let file =
                File::create(&out).with_context(|| format!("creating {}", out.display()))?;
            dashboard.export(BufWriter::new(file))?;
            println!(
                "Wrote {} measurement(s) to {}",
                dashboard.sequence().len(),
                out.display()
            );
            Ok(())
        }
        Commands::Upload { file } => {
            let feed = fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let mut dashboard = Dashboard::new(store, config.view.view_options());
            let count = dashboard.upload(feed).await?;
            println!("Uploaded, device now holds {count} measurement(s)");
            Ok(())
        }
        Commands::System => {
            let info = store.fetch_system_info().await?;
            if let Some(flash) = info.flash {
                println!(
                    "Flash: {} / {} bytes used (config {}, measurements {})",
                    display_opt(flash.used),
                    display_opt(flash.total),
                    display_opt(flash.config),
                    display_opt(flash.measurements)
                );
                if let Some(fraction) = flash.used_fraction() {
                    println!("Flash usage: {:.1}%", fraction * 100.0);
                }
            }
            if let Some(rssi) = info.wifi.and_then(|w| w.rssi) {
                println!("WiFi RSSI: {rssi} dBm");
            }
            Ok(())
        }
        Commands::DeviceConfig => {
            let device = store.fetch_device_config().await?;
            println!("{}", serde_json::to_string_pretty(&device)?);
            Ok(())
        }
    }
}

async fn show_history(
    config: &DashConfig,
    store: HttpStore,
    policy: RetentionPolicy,
    feed: Option<PathBuf>,
) -> Result<()> {
    let mut dashboard = Dashboard::new(store, config.view.view_options()).with_policy(policy);

    match feed {
        Some(path) => {
            let token = dashboard.begin_reload();
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            dashboard.complete_reload(token, Ok(raw))?;
        }
        None => {
            dashboard.reload().await?;
        }
    }

    let view = dashboard.view();
    println!(
        "{}: {} of {} measurement(s) in window, {} chart point(s), smoothing window {}",
        view.policy,
        view.filtered.len(),
        dashboard.sequence().len(),
        view.points.len(),
        view.overlay.window_size
    );
    for (point, smoothed) in view.points.iter().zip(&view.overlay.values) {
        let marker = if point.source.is_aggregated() { "*" } else { " " };
        println!("{marker} {:<25} {:>9.1} g  (avg {smoothed:.1})", point.label, point.value);
    }
    println!("Visits by hour:");
    for bucket in &view.histogram {
        println!("  {:02}:00 {}", bucket.hour, "#".repeat(bucket.count as usize));
    }
    Ok(())
}

async fn follow_live(config: &DashConfig, count: usize) -> Result<()> {
    let mut feed = LiveFeed::new(config.live.clone());
    let mut monitor = LiveMonitor::new(config.live.capacity);
    monitor.drive(feed.subscribe(), Some(count)).await;

    for [seconds, weight] in monitor.buffer().series() {
        println!("{seconds:>8.1} s  {weight:>9.1} g");
    }
    if monitor.rejected() > 0 {
        println!("{} message(s) could not be decoded", monitor.rejected());
    }
    Ok(())
}

fn parse_policy(s: &str) -> std::result::Result<RetentionPolicy, String> {
    s.parse().map_err(|e: scale_dash::DashError| e.to_string())
}

fn display_opt(value: Option<u64>) -> String {
    value.map_or_else(|| "?".to_string(), |v| v.to_string())
}
