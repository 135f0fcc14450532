//! Parquet table store
//!
//! This module provides a Parquet-file implementation of the TableStore trait.
//! Each table lives in its own file; saves go through a sibling temporary file
//! that is renamed over the target once fully written.

use crate::config::OutputConfig;
use crate::storage::schema::{decode_log, decode_master, log_batch, master_batch};
use crate::storage::traits::{StorageResult, TableStore};
use crate::storage::{LogTable, MasterTable};
use arrow_array::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

/// Parquet-backed storage for the master and log tables
#[derive(Debug, Clone)]
pub struct ParquetStore {
    master_path: PathBuf,
    log_path: PathBuf,
}

impl ParquetStore {
    /// Creates a store over the given file paths
    ///
    /// Files are not touched until the first load or save.
    pub fn new(master_path: impl Into<PathBuf>, log_path: impl Into<PathBuf>) -> Self {
        Self {
            master_path: master_path.into(),
            log_path: log_path.into(),
        }
    }

    /// Creates a store from the output section of the configuration
    pub fn from_config(config: &OutputConfig) -> Self {
        Self::new(&config.master_path, &config.log_path)
    }

    pub fn master_path(&self) -> &Path {
        &self.master_path
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }
}

impl TableStore for ParquetStore {
    fn load_master(&self) -> StorageResult<MasterTable> {
        let Some(batches) = read_batches(&self.master_path)? else {
            tracing::info!(
                "{} not found, starting with an empty master table",
                self.master_path.display()
            );
            return Ok(MasterTable::new());
        };

        let file = self.master_path.display().to_string();
        let mut records = Vec::new();
        for batch in &batches {
            records.extend(decode_master(batch, &file)?);
        }

        let table = MasterTable::from_records(records);
        tracing::debug!("Loaded {} master rows from {}", table.len(), file);
        Ok(table)
    }

    fn load_log(&self) -> StorageResult<LogTable> {
        let Some(batches) = read_batches(&self.log_path)? else {
            tracing::info!(
                "{} not found, starting with an empty log table",
                self.log_path.display()
            );
            return Ok(LogTable::new());
        };

        let file = self.log_path.display().to_string();
        let mut entries = Vec::new();
        for batch in &batches {
            entries.extend(decode_log(batch, &file)?);
        }

        tracing::debug!("Loaded {} log rows from {}", entries.len(), file);
        Ok(LogTable::from_entries(entries))
    }

    fn save_master(&self, table: &MasterTable) -> StorageResult<()> {
        write_atomic(&self.master_path, &master_batch(table)?)
    }

    fn save_log(&self, table: &LogTable) -> StorageResult<()> {
        write_atomic(&self.log_path, &log_batch(table)?)
    }
}

/// Reads every record batch of a Parquet file, or `None` if it does not exist
fn read_batches(path: &Path) -> StorageResult<Option<Vec<RecordBatch>>> {
    if !path.exists() {
        return Ok(None);
    }

    let file = File::open(path)?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;
    let batches = reader.collect::<Result<Vec<_>, _>>()?;
    Ok(Some(batches))
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Writes a batch to a temporary sibling file and renames it into place
fn write_atomic(path: &Path, batch: &RecordBatch) -> StorageResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let tmp = temp_path(path);
    let file = File::create(&tmp)?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
    writer.write(batch)?;
    writer.close()?;

    fs::rename(&tmp, path)?;
    tracing::debug!("Wrote {} rows to {}", batch.num_rows(), path.display());
    Ok(())
}
