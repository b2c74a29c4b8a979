mod browser;
mod campaign;
mod config;
mod db;
mod driver;
mod error;
mod notify;
mod parser;
mod relay;
mod remote;
mod scheduler;
mod session;
mod wait;

#[cfg(test)]
mod testing;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use chrono::{DateTime, Local, Utc};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::info;

use crate::browser::ChromeHost;
use crate::config::Config;
use crate::db::Store;
use crate::parser::locators::FieldTable;
use crate::relay::HttpRelay;
use crate::remote::{RemoteStore, StoredCampaign};
use crate::session::{SessionController, Status, Trigger};

#[derive(Parser)]
#[command(name = "drops_scraper", about = "Twitch drops campaign scraper and relay")]
struct Cli {
    /// JSON file replacing the built-in selector table
    #[arg(long, global = true)]
    selectors: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape on the configured interval until Ctrl-C (SIGUSR1 triggers a run)
    Run {
        /// Also scrape once right away
        #[arg(long)]
        now: bool,
    },
    /// Scrape once and relay the result
    Scrape,
    /// Show the last session
    Status,
    /// Show or change settings
    Config {
        /// Ingestion endpoint (http/https URL)
        #[arg(long)]
        endpoint: Option<String>,
        /// Minutes between scheduled runs (min 15)
        #[arg(long)]
        interval: Option<u32>,
    },
    /// Campaigns from the last successful session
    Last {
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },
    /// Most recent campaigns held by the remote store
    Recent {
        /// Max rows to fetch
        #[arg(short = 'n', long, default_value_t = remote::DEFAULT_LIMIT)]
        limit: usize,
    },
    /// Remote store freshness and totals
    Health,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run { now } => {
            let controller = Arc::new(start_controller(cli.selectors.as_deref())?);
            let (tx, rx) = mpsc::channel(1);
            forward_user_signal(tx)?;
            scheduler::run(controller, rx, now, async {
                let _ = tokio::signal::ctrl_c().await;
            })
            .await
        }
        Commands::Scrape => {
            let controller = start_controller(cli.selectors.as_deref())?;
            let report = controller.run(Trigger::OnDemand).await?;
            println!(
                "Scraped {} campaigns ({} stored by endpoint).",
                report.campaigns.len(),
                report.stored
            );
            Ok(())
        }
        Commands::Status => {
            let store = Store::open()?;
            let cfg = Config::load(&store)?;
            let s = session::ScrapeSession::load(&store)?;
            let last_run = s
                .last_run_at
                .map(|t| format_ago(t, Utc::now()))
                .unwrap_or_else(|| "Never".into());
            println!("Status:    {}", s.status.as_str());
            println!("Last run:  {}", last_run);
            println!("Campaigns: {}", s.result_count);
            println!("Runs:      {}", s.run_count);
            if s.status == Status::Error {
                println!("Error:     {}", s.last_error.as_deref().unwrap_or("-"));
            }
            println!("Endpoint:  {}", cfg.endpoint_url.as_deref().unwrap_or("(not set)"));
            println!("Interval:  {} min", cfg.interval_minutes);
            Ok(())
        }
        Commands::Config { endpoint, interval } => {
            let store = Store::open()?;
            let mut cfg = Config::load(&store)?;
            if let Some(url) = endpoint {
                cfg.set_endpoint(&url)?;
            }
            if let Some(minutes) = interval {
                cfg.set_interval(minutes)?;
            }
            cfg.save(&store)?;
            println!("Endpoint: {}", cfg.endpoint_url.as_deref().unwrap_or("(not set)"));
            println!("Interval: {} min", cfg.interval_minutes);
            Ok(())
        }
        Commands::Last { limit } => {
            let store = Store::open()?;
            let campaigns = session::last_campaigns(&store)?;
            if campaigns.is_empty() {
                println!("No campaigns yet. Run 'scrape' first.");
                return Ok(());
            }

            println!(
                "{:>3} | {:<28} | {:<20} | {:<20} | {:<8} | {:>5}",
                "#", "Campaign", "Game", "Ends", "Status", "Drops"
            );
            println!("{}", "-".repeat(98));
            for (i, c) in campaigns.iter().take(limit).enumerate() {
                println!(
                    "{:>3} | {:<28} | {:<20} | {:<20} | {:<8} | {:>5}",
                    i + 1,
                    truncate(&c.name, 28),
                    truncate(&c.game, 20),
                    truncate(&c.end_date, 20),
                    truncate(&c.status, 8),
                    c.drops.len()
                );
            }
            println!(
                "\n{} campaigns | scraped {}",
                campaigns.len(),
                campaigns[0].scraped_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
            );
            Ok(())
        }
        Commands::Recent { limit } => {
            let remote = remote_store()?;
            let rows = remote.campaigns(limit).await?;
            if rows.is_empty() {
                println!("Remote store has no campaigns.");
                return Ok(());
            }

            println!(
                "{:>3} | {:<24} | {:<28} | {:<20} | {:<20} | {:<8} | {:>5}",
                "#", "Stored", "Campaign", "Game", "Ends", "Status", "Drops"
            );
            println!("{}", "-".repeat(126));
            for (i, r) in rows.iter().enumerate() {
                println!("{}", recent_row(i + 1, r));
            }
            Ok(())
        }
        Commands::Health => {
            let remote = remote_store()?;
            let health = remote.health().await?;
            let stats = remote.stats().await?;
            println!("Healthy:      {}", if health.healthy { "yes" } else { "NO" });
            println!("Message:      {}", health.message);
            println!("Last scrape:  {}", health.last_scrape.as_deref().unwrap_or("-"));
            if let Some(h) = health.hours_since_last_scrape {
                println!("Hours since:  {:.2}", h);
            }
            println!("Campaigns:    {}", stats.total_campaigns);
            println!("Activities:   {}", stats.total_activities);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn start_controller(selectors: Option<&Path>) -> anyhow::Result<SessionController<ChromeHost>> {
    let table = match selectors {
        Some(path) => FieldTable::from_file(path)?,
        None => FieldTable::default(),
    };
    let store = Arc::new(Store::open()?);
    let relay = Arc::new(HttpRelay::new()?);
    Ok(SessionController::new(ChromeHost::new(), relay, store)?.with_table(table))
}

fn recent_row(n: usize, r: &StoredCampaign) -> String {
    let drops = r.drops_count.map(|n| n.to_string()).unwrap_or_else(|| "-".into());
    format!(
        "{:>3} | {:<24} | {:<28} | {:<20} | {:<20} | {:<8} | {:>5}",
        n,
        truncate(&r.stored_at, 24),
        truncate(&r.name, 28),
        truncate(&r.game, 20),
        truncate(&r.end_date, 20),
        truncate(&r.status, 8),
        drops
    )
}

fn remote_store() -> anyhow::Result<RemoteStore> {
    let store = Store::open()?;
    let endpoint = Config::load(&store)?
        .endpoint_url
        .context("No endpoint configured. Run 'config --endpoint <URL>' first.")?;
    RemoteStore::new(&endpoint)
}

#[cfg(unix)]
fn forward_user_signal(tx: mpsc::Sender<()>) -> anyhow::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut usr1 = signal(SignalKind::user_defined1())?;
    tokio::spawn(async move {
        while usr1.recv().await.is_some() {
            info!("SIGUSR1: on-demand scrape requested");
            if tx.send(()).await.is_err() {
                break;
            }
        }
    });
    Ok(())
}

#[cfg(not(unix))]
fn forward_user_signal(_tx: mpsc::Sender<()>) -> anyhow::Result<()> {
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

/// "Just now", "5m ago", "3h ago", "2d ago", or the local date after a week.
fn format_ago(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = now - at;
    let minutes = diff.num_minutes();
    if minutes < 1 {
        "Just now".to_string()
    } else if minutes < 60 {
        format!("{}m ago", minutes)
    } else if diff.num_hours() < 24 {
        format!("{}h ago", diff.num_hours())
    } else if diff.num_days() < 7 {
        format!("{}d ago", diff.num_days())
    } else {
        at.with_timezone(&Local).format("%Y-%m-%d").to_string()
    }
}
