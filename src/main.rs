use anyhow::Result;
use clap::Parser;
use shift_watcher::{Config, Watcher};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "shift-watcher", about = "Watches for SHiFT codes and redeems them")]
struct Cli {
    /// Run a single scan cycle and exit
    #[arg(long)]
    once: bool,

    /// Monitor the subreddit feed instead of running scan cycles
    #[arg(long)]
    reddit: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Override the scan interval in seconds
    #[arg(long)]
    interval: Option<u64>,

    /// Override the preferred platform ("xbox", "ps5", "steam", ...)
    #[arg(long)]
    platform: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let mut config = Config::from_env()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    if let Some(interval) = cli.interval {
        config.scan_interval = Duration::from_secs(interval);
    }
    if let Some(platform) = cli.platform {
        config.platform = platform;
    }
    let level = if cli.verbose {
        "debug"
    } else {
        config.log_level.as_str()
    };

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("shift_watcher={}", level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting shift-watcher");
    tracing::info!(
        rewards_url = %config.rewards_url,
        platform = %config.platform,
        scan_interval_secs = config.scan_interval.as_secs(),
        "Configuration loaded"
    );

    let mut watcher = Watcher::new(config)
        .map_err(|e| anyhow::anyhow!("Failed to start watcher: {}", e))?;

    if cli.reddit {
        watcher.run_reddit_monitor().await;
    } else {
        watcher.run(cli.once).await;
    }

    Ok(())
}
