//! Statistics generation from the persisted tables
//!
//! This module provides functionality for extracting and displaying
//! summary statistics from the master and log tables.

use crate::storage::{LogTable, MasterTable, TableStore};
use crate::TrackerError;
use chrono::{DateTime, Utc};
use std::collections::HashSet;

/// Number of accounts listed in the top-followers section
const TOP_ACCOUNTS: usize = 10;

/// Summary of the persisted tables
#[derive(Debug, Clone, Default)]
pub struct TableStatistics {
    /// Rows in the master table (distinct handles)
    pub master_rows: usize,

    /// Rows in the log table
    pub log_rows: usize,

    /// Distinct handles that appear in the log
    pub logged_handles: usize,

    /// Earliest and latest observation in the log
    pub first_observation: Option<DateTime<Utc>>,
    pub last_observation: Option<DateTime<Utc>>,

    /// Follower history of the root account: (first count, latest count)
    pub root_history: Option<(u64, u64)>,

    /// Accounts with the most followers, from the master table
    pub top_accounts: Vec<(String, u64)>,
}

/// Loads statistics from a table store
///
/// # Arguments
///
/// * `store` - The store holding both tables
/// * `root_handle` - Handle whose follower history is summarized
pub fn load_statistics(store: &dyn TableStore, root_handle: &str) -> Result<TableStatistics, TrackerError> {
    let master = store.load_master()?;
    let log = store.load_log()?;
    Ok(compute_statistics(&master, &log, root_handle))
}

/// Computes statistics from in-memory tables
pub fn compute_statistics(master: &MasterTable, log: &LogTable, root_handle: &str) -> TableStatistics {
    let entries = log.entries();

    let logged_handles = entries
        .iter()
        .map(|e| e.handle.as_str())
        .collect::<HashSet<_>>()
        .len();

    let first_observation = entries.iter().map(|e| e.observed_at).min();
    let last_observation = entries.iter().map(|e| e.observed_at).max();

    let mut root_entries: Vec<_> = entries.iter().filter(|e| e.handle == root_handle).collect();
    root_entries.sort_by_key(|e| e.observed_at);
    let root_history = match (root_entries.first(), root_entries.last()) {
        (Some(first), Some(last)) => Some((first.followers_count, last.followers_count)),
        _ => None,
    };

    let mut top_accounts: Vec<(String, u64)> = master
        .records()
        .into_iter()
        .map(|r| (r.handle.clone(), r.followers_count))
        .collect();
    top_accounts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    top_accounts.truncate(TOP_ACCOUNTS);

    TableStatistics {
        master_rows: master.len(),
        log_rows: log.len(),
        logged_handles,
        first_observation,
        last_observation,
        root_history,
        top_accounts,
    }
}

/// Prints statistics to stdout
pub fn print_statistics(stats: &TableStatistics, root_handle: &str) {
    println!("=== Follower Tracker Statistics ===\n");

    println!("Tables:");
    println!("  Master rows: {}", stats.master_rows);
    println!("  Log rows: {}", stats.log_rows);
    println!("  Handles in log: {}", stats.logged_handles);

    match (stats.first_observation, stats.last_observation) {
        (Some(first), Some(last)) => {
            println!("  Observed from {} to {}", first.to_rfc3339(), last.to_rfc3339());
        }
        _ => println!("  No observations yet"),
    }

    if let Some((first, latest)) = stats.root_history {
        let change = latest as i128 - first as i128;
        println!(
            "\nRoot account {}: {} followers ({:+} since first observation)",
            root_handle, latest, change
        );
    }

    if !stats.top_accounts.is_empty() {
        println!("\nTop accounts by followers:");
        for (handle, followers) in &stats.top_accounts {
            println!("  {:>8}  {}", followers, handle);
        }
    }
}
