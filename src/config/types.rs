use serde::Deserialize;
use std::collections::BTreeSet;
use std::time::Duration;

/// Main configuration structure for Follower Tracker
///
/// Every section and field has a default, so an empty file (or no file at
/// all) yields the built-in configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub account: AccountConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Root account and service configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AccountConfig {
    /// Handle whose followers are tracked
    #[serde(rename = "root-handle")]
    pub root_handle: String,

    /// Base URL of the XRPC service used for login and queries
    #[serde(rename = "service-url")]
    pub service_url: String,

    /// Environment variable checked first for the account password
    #[serde(rename = "password-env")]
    pub password_env: String,

    /// Keyring service name used when the environment variable is unset
    #[serde(rename = "keyring-service")]
    pub keyring_service: String,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            root_handle: "elaval.bsky.social".to_string(),
            service_url: "https://bsky.social".to_string(),
            password_env: "BLUESKY_PASSWORD".to_string(),
            keyring_service: "bluesky".to_string(),
        }
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Number of followers requested per page
    #[serde(rename = "page-size")]
    pub page_size: u32,

    /// Delay between follower page requests (milliseconds)
    #[serde(rename = "rate-limit-delay")]
    pub rate_limit_delay: u64,

    /// Persist both tables every this many follower indices
    #[serde(rename = "checkpoint-interval")]
    pub checkpoint_interval: usize,

    /// Handles that are never fetched
    pub exemptions: BTreeSet<String>,
}

impl CrawlerConfig {
    /// Returns the inter-page delay as a Duration
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.rate_limit_delay)
    }

    /// Returns true if the handle must be skipped
    pub fn is_exempt(&self, handle: &str) -> bool {
        self.exemptions.contains(handle)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            page_size: 50,
            rate_limit_delay: 200,
            checkpoint_interval: 10,
            exemptions: BTreeSet::from(["ap.brid.gy".to_string()]),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Path to the master Parquet file (latest state per handle)
    #[serde(rename = "master-path")]
    pub master_path: String,

    /// Path to the log Parquet file (append-only follower counts)
    #[serde(rename = "log-path")]
    pub log_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            master_path: "master.parquet".to_string(),
            log_path: "followers_log.parquet".to_string(),
        }
    }
}
