//! Surface Zones - control surface zone engine
//!
//! Runs a page of control surfaces against the simulated host, driven by
//! REPL commands, with hot-reload of the page file.

use anyhow::{Context, Result};
use clap::Parser;
use std::time::{Duration, Instant};
use surface_zones::cli::{self, ReplCommand};
use surface_zones::config::{PageConfig, PageWatcher};
use surface_zones::host::SimulatedHost;
use surface_zones::page::{InputEvent, Page};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Surface Zones - bind control surface widgets to mixer actions through zones
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the page configuration file
    #[arg(short, long, default_value = "page.yaml")]
    config: String,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Tick period in milliseconds
    #[arg(long, default_value = "30")]
    tick_ms: u64,

    /// Validate the configuration, print the zone tree and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    init_logging(&args.log_level)?;

    info!("Starting Surface Zones...");
    info!("Configuration file: {}", args.config);

    if args.check {
        return check_config(&args.config).await;
    }

    let (page_watcher, initial_config) = PageWatcher::new(args.config.clone()).await?;
    info!("Configuration loaded successfully with hot-reload enabled");

    let host = SimulatedHost::from_seed(&initial_config.host);
    let page = Page::from_config(&initial_config, Box::new(host));

    run_app(page, page_watcher, Duration::from_millis(args.tick_ms.max(1)), shutdown_signal()).await?;

    info!("Surface Zones shutdown complete");
    Ok(())
}

async fn check_config(path: &str) -> Result<()> {
    let config = PageConfig::load(path)
        .await
        .with_context(|| format!("Invalid configuration: {}", path))?;

    let host = SimulatedHost::from_seed(&config.host);
    let mut page = Page::from_config(&config, Box::new(host));
    page.run_tick(Vec::new(), Instant::now());

    cli::print_tree(&page);
    println!("\n{}", serde_json::to_string_pretty(&page.snapshot())?);
    Ok(())
}

async fn run_app(
    mut page: Page,
    mut page_watcher: PageWatcher,
    tick: Duration,
    shutdown: impl std::future::Future<Output = ()>,
) -> Result<()> {
    let (repl_tx, mut repl_rx) = mpsc::channel::<ReplCommand>(64);

    // rustyline blocks; a plain thread does not hold up runtime shutdown
    std::thread::spawn(move || {
        if let Err(e) = cli::run_repl(repl_tx) {
            warn!("REPL stopped: {}", e);
        }
    });
    println!("{}", cli::HELP);

    let mut interval = tokio::time::interval(tick);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let mut pending: Vec<InputEvent> = Vec::new();

    info!("Ready: tick every {:?}", tick);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let events = std::mem::take(&mut pending);
                let count = events.len();
                let consumed = page.run_tick(events, Instant::now());
                if count > 0 {
                    debug!("Tick: {}/{} event(s) consumed", consumed, count);
                }
            }

            Some(command) = repl_rx.recv() => {
                match command {
                    ReplCommand::Input(event) => pending.push(event),
                    ReplCommand::Status => println!("{}", serde_json::to_string_pretty(&page.snapshot())?),
                    ReplCommand::Tree => cli::print_tree(&page),
                    ReplCommand::Help => println!("{}", cli::HELP),
                    ReplCommand::Quit => {
                        info!("Quit requested, stopping tick loop");
                        break;
                    }
                }
            }

            Some(new_config) = page_watcher.next_page() => {
                info!("📝 Configuration file changed, rebuilding page...");
                page.reload(&new_config);
            }

            _ = &mut shutdown => {
                info!("Shutdown signal received, stopping tick loop");
                break;
            }
        }
    }

    info!("Shutting down...");
    Ok(())
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .init();

    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C signal handler");
    info!("Shutdown signal received");
}
