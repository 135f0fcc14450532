//! Follower Tracker: a follower snapshot crawler for Bluesky
//!
//! This crate polls a root account and each of its followers, recording
//! profile snapshots into two Parquet tables: a master table holding the
//! latest state per handle and an append-only log of follower counts.

pub mod bluesky;
pub mod config;
pub mod crawler;
pub mod credentials;
pub mod output;
pub mod storage;

use thiserror::Error;

/// Main error type for Follower Tracker operations
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Password not found for {handle}: set {env_var} or store it in the keyring")]
    MissingCredentials { handle: String, env_var: String },

    #[error("Secret store error: {0}")]
    SecretStore(String),
}

/// Result type alias for Follower Tracker operations
pub type Result<T> = std::result::Result<T, TrackerError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use bluesky::{BlueskyClient, ClientError, SocialClient};
pub use config::Config;
pub use crawler::{run_crawl, Coordinator, CrawlReport, ProfileFetch};
pub use storage::{LogTable, MasterTable, ParquetStore, ProfileRecord, TableStore};
