//! Follower Tracker main entry point
//!
//! This is the command-line interface for the follower snapshot crawler.

use anyhow::Context;
use clap::Parser;
use follower_tracker::config::{load_config_with_hash, Config};
use follower_tracker::credentials::resolve_password;
use follower_tracker::crawler::run_crawl;
use follower_tracker::BlueskyClient;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Follower Tracker: snapshots a Bluesky account and its followers
///
/// Records the latest profile of every follower into a master Parquet file
/// and appends follower counts to a log Parquet file. Without a config file
/// the built-in defaults are used.
#[derive(Parser, Debug)]
#[command(name = "follower-tracker")]
#[command(version)]
#[command(about = "Snapshots a Bluesky account and its followers", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Show the effective configuration without crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the Parquet files and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    if let Some(value) = std::env::var("ELMTEST").ok().filter(|v| !v.is_empty()) {
        tracing::info!("Got ELMTEST: {}", value);
    }

    let config = load_configuration(cli.config.as_deref())?;

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_crawl(config).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("follower_tracker=info,warn"),
            1 => EnvFilter::new("follower_tracker=debug,info"),
            2 => EnvFilter::new("follower_tracker=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads the configuration file, or the built-in defaults when none is given
fn load_configuration(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        tracing::info!("No configuration file given, using built-in defaults");
        return Ok(Config::default());
    };

    tracing::info!("Loading configuration from: {}", path.display());
    let (config, hash) = load_config_with_hash(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    Ok(config)
}

/// Handles the --dry-run mode: shows what would be crawled
fn handle_dry_run(config: &Config) {
    println!("=== Follower Tracker Dry Run ===\n");

    println!("Account:");
    println!("  Root handle: {}", config.account.root_handle);
    println!("  Service: {}", config.account.service_url);
    println!("  Password env: {}", config.account.password_env);
    println!(
        "  Keyring entry: {}/{}",
        config.account.keyring_service, config.account.root_handle
    );

    println!("\nCrawler:");
    println!("  Page size: {}", config.crawler.page_size);
    println!("  Delay between pages: {}ms", config.crawler.rate_limit_delay);
    println!(
        "  Checkpoint every: {} followers",
        config.crawler.checkpoint_interval
    );

    println!("\nExempt handles ({}):", config.crawler.exemptions.len());
    for handle in &config.crawler.exemptions {
        println!("  - {}", handle);
    }

    println!("\nOutput:");
    println!("  Master: {}", config.output.master_path);
    println!("  Log: {}", config.output.log_path);

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from the Parquet files
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    use follower_tracker::output::{load_statistics, print_statistics};
    use follower_tracker::ParquetStore;

    let store = ParquetStore::from_config(&config.output);
    let stats = load_statistics(&store, &config.account.root_handle)
        .context("Failed to read the Parquet tables")?;

    print_statistics(&stats, &config.account.root_handle);
    Ok(())
}

/// Handles the main crawl operation
///
/// Credential and login failures are fatal. Once the crawl has started,
/// failures and interrupts are logged and the process exits normally.
async fn handle_crawl(config: Config) -> anyhow::Result<()> {
    let root_handle = config.account.root_handle.clone();

    let (password, source) =
        resolve_password(&config.account).context("Failed to resolve the account password")?;
    tracing::debug!("Password source: {:?}", source);

    let client = BlueskyClient::new(&config.account.service_url)?;
    client
        .login(&root_handle, &password)
        .await
        .with_context(|| format!("Failed to log in as {}", root_handle))?;

    tokio::select! {
        result = run_crawl(config, client) => match result {
            Ok(report) => tracing::info!(
                "Crawl completed: {} master rows, {} log rows",
                report.master_rows,
                report.log_rows
            ),
            Err(e) => tracing::error!("Crawl failed: {}", e),
        },
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupted by user, keeping state from the last checkpoint");
        }
    }

    Ok(())
}
