//! Storage module for persisting profile snapshots
//!
//! This module handles both persisted tables, including:
//! - The master table (latest profile per handle, replace-on-key)
//! - The log table (append-only follower-count observations)
//! - Parquet reading/writing with fixed column schemas
//! - Merge validation for freshly fetched profiles

mod parquet_store;
mod schema;
mod tables;
mod traits;

pub use parquet_store::ParquetStore;
pub use schema::{log_schema, master_schema, LOG_COLUMNS, MASTER_COLUMNS};
pub use tables::{merge_into_log, merge_into_master, merge_profile, LogTable, MasterTable, MergeError};
pub use traits::{StorageError, StorageResult, TableStore};

use crate::bluesky::ProfileView;
use chrono::{DateTime, Utc};

/// A profile snapshot observed during one fetch
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileRecord {
    pub handle: String,
    pub display_name: String,
    pub description: String,
    pub followers_count: u64,
    pub created_at: Option<String>,
    pub observed_at: DateTime<Utc>,
}

impl ProfileRecord {
    /// Builds a record from a fetched profile
    ///
    /// The record is keyed by the handle that was requested, and absent
    /// fields fall back to empty strings and a zero follower count.
    pub fn from_view(handle: &str, view: ProfileView, observed_at: DateTime<Utc>) -> Self {
        Self {
            handle: handle.to_string(),
            display_name: view.display_name.unwrap_or_default(),
            description: view.description.unwrap_or_default(),
            followers_count: view.followers_count.unwrap_or(0),
            created_at: view.created_at.filter(|c| !c.is_empty()),
            observed_at,
        }
    }

    /// Returns the log row for this observation
    pub fn log_entry(&self) -> LogEntry {
        LogEntry {
            handle: self.handle.clone(),
            followers_count: self.followers_count,
            observed_at: self.observed_at,
        }
    }
}

/// One follower-count observation in the log table
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub handle: String,
    pub followers_count: u64,
    pub observed_at: DateTime<Utc>,
}
