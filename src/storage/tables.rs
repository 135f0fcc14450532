//! In-memory master and log tables
//!
//! The master table is keyed by handle. Each row carries an insertion
//! sequence number so that replacing a handle moves it to the end, which
//! keeps the on-disk row order identical to remove-then-append.

use crate::storage::{LogEntry, ProfileRecord};
use std::collections::HashMap;
use thiserror::Error;

/// Reasons a fetched profile is rejected before it reaches either table
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MergeError {
    #[error("Profile record has an empty handle")]
    EmptyHandle,

    #[error("Follower count {count} for {handle} exceeds the storable range")]
    CountOutOfRange { handle: String, count: u64 },
}

#[derive(Debug, Clone)]
struct MasterRow {
    seq: u64,
    record: ProfileRecord,
}

/// Latest known profile per handle
#[derive(Debug, Clone, Default)]
pub struct MasterTable {
    rows: HashMap<String, MasterRow>,
    next_seq: u64,
}

impl MasterTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table from rows in file order; later duplicates win
    pub fn from_records(records: impl IntoIterator<Item = ProfileRecord>) -> Self {
        let mut table = Self::new();
        for record in records {
            table.upsert(record);
        }
        table
    }

    /// Replaces any row for the record's handle and appends the record
    ///
    /// Returns the replaced record, if there was one.
    pub fn upsert(&mut self, record: ProfileRecord) -> Option<ProfileRecord> {
        let seq = self.next_seq;
        self.next_seq += 1;

        self.rows
            .insert(record.handle.clone(), MasterRow { seq, record })
            .map(|previous| previous.record)
    }

    pub fn get(&self, handle: &str) -> Option<&ProfileRecord> {
        self.rows.get(handle).map(|row| &row.record)
    }

    pub fn contains(&self, handle: &str) -> bool {
        self.rows.contains_key(handle)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns all rows in append order
    pub fn records(&self) -> Vec<&ProfileRecord> {
        let mut rows: Vec<&MasterRow> = self.rows.values().collect();
        rows.sort_by_key(|row| row.seq);
        rows.into_iter().map(|row| &row.record).collect()
    }
}

/// Append-only follower-count history
#[derive(Debug, Clone, Default)]
pub struct LogTable {
    entries: Vec<LogEntry>,
}

impl LogTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<LogEntry>) -> Self {
        Self { entries }
    }

    pub fn push(&mut self, entry: LogEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn validate_record(record: &ProfileRecord) -> Result<(), MergeError> {
    if record.handle.trim().is_empty() {
        return Err(MergeError::EmptyHandle);
    }

    if i64::try_from(record.followers_count).is_err() {
        return Err(MergeError::CountOutOfRange {
            handle: record.handle.clone(),
            count: record.followers_count,
        });
    }

    Ok(())
}

/// Replaces the master row for the record's handle (last write wins)
pub fn merge_into_master(record: &ProfileRecord, master: &mut MasterTable) -> Result<(), MergeError> {
    validate_record(record)?;
    master.upsert(record.clone());
    Ok(())
}

/// Appends the record's follower count to the log
pub fn merge_into_log(record: &ProfileRecord, log: &mut LogTable) -> Result<(), MergeError> {
    validate_record(record)?;
    log.push(record.log_entry());
    Ok(())
}

/// Merges a record into both tables, or into neither if it is rejected
pub fn merge_profile(
    record: &ProfileRecord,
    master: &mut MasterTable,
    log: &mut LogTable,
) -> Result<(), MergeError> {
    validate_record(record)?;
    master.upsert(record.clone());
    log.push(record.log_entry());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn record(handle: &str, followers: u64, minute: u32) -> ProfileRecord {
        ProfileRecord {
            handle: handle.to_string(),
            display_name: format!("{} name", handle),
            description: String::new(),
            followers_count: followers,
            created_at: None,
            observed_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, minute, 0).unwrap(),
        }
    }

    #[test]
    fn test_upsert_replaces_existing_handle() {
        let mut master = MasterTable::new();
        assert!(master.upsert(record("a.bsky.social", 1, 0)).is_none());

        let replaced = master.upsert(record("a.bsky.social", 5, 1));

        assert_eq!(replaced.map(|r| r.followers_count), Some(1));
        assert_eq!(master.len(), 1);
        assert_eq!(master.get("a.bsky.social").unwrap().followers_count, 5);
    }

    #[test]
    fn test_replaced_row_moves_to_end() {
        let mut master = MasterTable::new();
        master.upsert(record("a.bsky.social", 1, 0));
        master.upsert(record("b.bsky.social", 2, 1));
        master.upsert(record("c.bsky.social", 3, 2));
        master.upsert(record("a.bsky.social", 4, 3));

        let handles: Vec<&str> = master.records().iter().map(|r| r.handle.as_str()).collect();
        assert_eq!(handles, vec!["b.bsky.social", "c.bsky.social", "a.bsky.social"]);
    }

    #[test]
    fn test_from_records_collapses_duplicates() {
        let master = MasterTable::from_records(vec![
            record("a.bsky.social", 1, 0),
            record("a.bsky.social", 2, 1),
            record("b.bsky.social", 3, 2),
        ]);

        assert_eq!(master.len(), 2);
        assert_eq!(master.get("a.bsky.social").unwrap().followers_count, 2);
    }

    #[test]
    fn test_log_keeps_every_observation() {
        let mut log = LogTable::new();
        let first = record("a.bsky.social", 1, 0);
        let second = record("a.bsky.social", 1, 5);

        merge_into_log(&first, &mut log).unwrap();
        merge_into_log(&second, &mut log).unwrap();

        assert_eq!(log.len(), 2);
        assert_eq!(log.entries()[1].observed_at, second.observed_at);
    }

    #[test]
    fn test_merge_into_master_is_last_write_wins() {
        let mut master = MasterTable::new();
        merge_into_master(&record("a.bsky.social", 10, 0), &mut master).unwrap();
        merge_into_master(&record("a.bsky.social", 9, 1), &mut master).unwrap();

        assert_eq!(master.len(), 1);
        assert_eq!(master.get("a.bsky.social").unwrap().followers_count, 9);
    }

    #[test]
    fn test_empty_handle_rejected_by_both_tables() {
        let mut master = MasterTable::new();
        let mut log = LogTable::new();
        let bad = record("  ", 1, 0);

        assert_eq!(merge_into_master(&bad, &mut master), Err(MergeError::EmptyHandle));
        assert_eq!(merge_profile(&bad, &mut master, &mut log), Err(MergeError::EmptyHandle));
        assert!(master.is_empty());
        assert!(log.is_empty());
    }

    #[test]
    fn test_oversized_count_leaves_tables_untouched() {
        let mut master = MasterTable::new();
        let mut log = LogTable::new();
        let bad = record("a.bsky.social", u64::MAX, 0);

        let result = merge_profile(&bad, &mut master, &mut log);

        assert!(matches!(result, Err(MergeError::CountOutOfRange { .. })));
        assert!(master.is_empty());
        assert!(log.is_empty());
    }
}
