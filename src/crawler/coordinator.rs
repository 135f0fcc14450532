//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the crawl loop that coordinates:
//! - Loading the persisted tables
//! - Snapshotting the root account
//! - Listing and snapshotting every follower
//! - Periodic checkpoints and the final save

use crate::bluesky::SocialClient;
use crate::config::{validate, Config};
use crate::crawler::fetcher::{fetch_follower_handles, fetch_profile, ProfileFetch};
use crate::storage::{merge_profile, LogTable, MasterTable, ProfileRecord, StorageError, TableStore};
use crate::TrackerError;
use std::time::Instant;

/// Counters describing one crawl run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlReport {
    /// Whether the root profile was fetched and merged
    pub root_merged: bool,
    /// Number of handles in the follower list
    pub followers_listed: usize,
    /// Followers skipped because they are exempt
    pub exempted: usize,
    /// Followers whose profile was fetched and merged
    pub merged: usize,
    /// Followers whose profile fetch failed
    pub fetch_failures: usize,
    /// Fetch failures caused by rate limiting (included in `fetch_failures`)
    pub rate_limited: usize,
    /// Fetched profiles rejected during merge (root included)
    pub merge_failures: usize,
    /// Checkpoints written during the follower loop
    pub checkpoints: usize,
    /// Master rows after the final save
    pub master_rows: usize,
    /// Log rows after the final save
    pub log_rows: usize,
}

/// Main crawler coordinator structure
pub struct Coordinator<C, S> {
    config: Config,
    client: C,
    store: S,
    master: MasterTable,
    log: LogTable,
}

impl<C, S> Coordinator<C, S>
where
    C: SocialClient,
    S: TableStore,
{
    /// Creates a new coordinator, validating the configuration and loading
    /// both tables from the store
    ///
    /// # Arguments
    ///
    /// * `config` - The tracker configuration
    /// * `client` - An authenticated social-network client
    /// * `store` - Where the master and log tables are persisted
    pub fn new(config: Config, client: C, store: S) -> Result<Self, TrackerError> {
        validate(&config)?;

        let master = store.load_master()?;
        let log = store.load_log()?;

        tracing::info!(
            "Loaded {} master rows and {} log rows",
            master.len(),
            log.len()
        );

        Ok(Self {
            config,
            client,
            store,
            master,
            log,
        })
    }

    /// Returns the in-memory master table
    pub fn master(&self) -> &MasterTable {
        &self.master
    }

    /// Returns the in-memory log table
    pub fn log(&self) -> &LogTable {
        &self.log
    }

    /// Runs the crawl
    ///
    /// 1. Snapshots the root account
    /// 2. Lists every follower of the root account
    /// 3. Snapshots each non-exempt follower, checkpointing every
    ///    `checkpoint_interval` list positions and at the last one
    /// 4. Saves both tables
    ///
    /// Fetch and merge failures are logged and skipped. Only storage
    /// failures end the run early.
    pub async fn run(&mut self) -> Result<CrawlReport, TrackerError> {
        let start_time = Instant::now();
        let root_handle = self.config.account.root_handle.clone();
        let mut report = CrawlReport::default();

        tracing::info!("Starting crawl for {}", root_handle);

        match fetch_profile(&self.client, &root_handle).await {
            ProfileFetch::Found(record) => {
                tracing::info!("Updating master and log for root user {}", root_handle);
                let merged = self.merge(&record, &mut report);
                report.root_merged = merged;
            }
            failure => log_fetch_failure(&root_handle, &failure),
        }

        let followers = fetch_follower_handles(
            &self.client,
            &root_handle,
            self.config.crawler.page_size,
            self.config.crawler.delay(),
        )
        .await;

        report.followers_listed = followers.len();
        let total = followers.len();
        let interval = self.config.crawler.checkpoint_interval;

        for (index, handle) in followers.iter().enumerate() {
            let position = index + 1;

            if self.config.crawler.is_exempt(handle) {
                tracing::info!("Skipping {} due to exemption", handle);
                report.exempted += 1;
            } else {
                tracing::info!("Processing follower {} ({}/{})", handle, position, total);

                match fetch_profile(&self.client, handle).await {
                    ProfileFetch::Found(record) => {
                        if self.merge(&record, &mut report) {
                            report.merged += 1;
                        }
                    }
                    failure => {
                        log_fetch_failure(handle, &failure);
                        if matches!(failure, ProfileFetch::RateLimited) {
                            report.rate_limited += 1;
                        }
                        report.fetch_failures += 1;
                    }
                }
            }

            if position % interval == 0 || position == total {
                tracing::info!("Saving state after processing {} followers", position);
                self.save()?;
                report.checkpoints += 1;
            }
        }

        tracing::info!("Final save of master and log data");
        self.save()?;

        report.master_rows = self.master.len();
        report.log_rows = self.log.len();

        tracing::info!(
            "Crawl completed in {:?}: {} followers, {} merged, {} exempt, {} fetch failures ({} rate limited), {} merge failures",
            start_time.elapsed(),
            report.followers_listed,
            report.merged,
            report.exempted,
            report.fetch_failures,
            report.rate_limited,
            report.merge_failures
        );

        if report.rate_limited > 0 {
            tracing::warn!(
                "{} profiles were skipped because of rate limiting; consider a longer delay",
                report.rate_limited
            );
        }

        Ok(report)
    }

    /// Merges a fetched profile into both tables
    ///
    /// A rejected record is logged and counted; the tables are left untouched.
    fn merge(&mut self, record: &ProfileRecord, report: &mut CrawlReport) -> bool {
        match merge_profile(record, &mut self.master, &mut self.log) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Error updating master/log for {}: {}", record.handle, e);
                report.merge_failures += 1;
                false
            }
        }
    }

    fn save(&self) -> Result<(), StorageError> {
        self.store.save_all(&self.master, &self.log)?;
        tracing::debug!(
            "Persisted {} master rows and {} log rows",
            self.master.len(),
            self.log.len()
        );
        Ok(())
    }
}

fn log_fetch_failure(handle: &str, failure: &ProfileFetch) {
    match failure {
        ProfileFetch::Found(_) => {}
        ProfileFetch::NotFound => {
            tracing::warn!("No profile found for {}, skipping", handle);
        }
        ProfileFetch::RateLimited => {
            tracing::warn!("Rate limited while fetching {}, skipping", handle);
        }
        ProfileFetch::ApiError {
            status: Some(status),
            message,
        } => {
            tracing::warn!("Error fetching profile for {} (HTTP {}): {}", handle, status, message);
        }
        ProfileFetch::ApiError {
            status: None,
            message,
        } => {
            tracing::warn!("Unreadable profile response for {}: {}", handle, message);
        }
        ProfileFetch::NetworkError(error) => {
            tracing::warn!("Network error fetching profile for {}: {}", handle, error);
        }
    }
}
