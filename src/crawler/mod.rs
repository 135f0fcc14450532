//! Crawler module for follower snapshots
//!
//! This module contains the core crawling logic, including:
//! - Profile fetching with failure classification
//! - Paginated follower listing with a fixed inter-page delay
//! - Overall crawl coordination and checkpointing

mod coordinator;
mod fetcher;

pub use coordinator::{Coordinator, CrawlReport};
pub use fetcher::{fetch_follower_handles, fetch_profile, ProfileFetch};

use crate::bluesky::SocialClient;
use crate::config::Config;
use crate::storage::ParquetStore;
use crate::TrackerError;

/// Runs a complete crawl against the configured Parquet files
///
/// This is the main entry point for a crawl. It will:
/// 1. Load the master and log tables (empty if the files are absent)
/// 2. Snapshot the root account
/// 3. Snapshot every follower, checkpointing as it goes
/// 4. Save both tables
///
/// # Arguments
///
/// * `config` - The tracker configuration
/// * `client` - An authenticated social-network client
///
/// # Example
///
/// ```no_run
/// use follower_tracker::config::Config;
/// use follower_tracker::crawler::run_crawl;
/// use follower_tracker::BlueskyClient;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Config::default();
/// let client = BlueskyClient::new(&config.account.service_url)?;
/// client.login(&config.account.root_handle, "app-password").await?;
/// let report = run_crawl(config, client).await?;
/// println!("{} log rows", report.log_rows);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl<C: SocialClient>(config: Config, client: C) -> Result<CrawlReport, TrackerError> {
    let store = ParquetStore::from_config(&config.output);
    let mut coordinator = Coordinator::new(config, client, store)?;
    coordinator.run().await
}
