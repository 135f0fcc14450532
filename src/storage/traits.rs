//! Storage traits and error types
//!
//! This module defines the trait interface for table stores and
//! associated error types.

use crate::storage::{LogTable, MasterTable};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parquet error: {0}")]
    Parquet(#[from] ::parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow_schema::ArrowError),

    #[error("Missing column '{column}' in {file}")]
    MissingColumn { file: String, column: String },

    #[error("Unsupported type {data_type} for column '{column}'")]
    UnsupportedColumnType { column: String, data_type: String },

    #[error("Invalid value in column '{column}': {message}")]
    InvalidValue { column: String, message: String },
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for table store implementations
///
/// Loading a table that has never been saved yields an empty table.
/// Saving replaces the persisted table with the in-memory one.
pub trait TableStore {
    /// Loads the master table
    fn load_master(&self) -> StorageResult<MasterTable>;

    /// Loads the log table
    fn load_log(&self) -> StorageResult<LogTable>;

    /// Persists the master table
    fn save_master(&self, table: &MasterTable) -> StorageResult<()>;

    /// Persists the log table
    fn save_log(&self, table: &LogTable) -> StorageResult<()>;

    /// Persists both tables, master first
    fn save_all(&self, master: &MasterTable, log: &LogTable) -> StorageResult<()> {
        self.save_master(master)?;
        self.save_log(log)
    }
}
