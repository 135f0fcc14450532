//! Column schemas for the master and log tables
//!
//! This module owns the fixed column layout of both Parquet files and the
//! conversions between Arrow record batches and in-memory tables. Readers
//! look columns up by name and tolerate the integer and timestamp encodings
//! other dataframe tools produce for the same columns.

use crate::storage::traits::{StorageError, StorageResult};
use crate::storage::{LogEntry, LogTable, MasterTable, ProfileRecord};
use arrow_array::{
    Array, ArrayRef, Float64Array, Int32Array, Int64Array, LargeStringArray, RecordBatch,
    StringArray, TimestampMicrosecondArray, TimestampMillisecondArray, TimestampNanosecondArray,
    TimestampSecondArray, UInt64Array,
};
use arrow_schema::{DataType, Field, Schema, SchemaRef, TimeUnit};
use chrono::{DateTime, Utc};
use std::sync::Arc;

pub const HANDLE: &str = "handle";
pub const DISPLAY_NAME: &str = "displayName";
pub const DESCRIPTION: &str = "description";
pub const FOLLOWERS_COUNT: &str = "followers_count";
pub const CREATED_AT: &str = "created_at";
pub const TIMESTAMP: &str = "timestamp";

/// Column order of the master file
pub const MASTER_COLUMNS: [&str; 6] = [
    HANDLE,
    DISPLAY_NAME,
    DESCRIPTION,
    FOLLOWERS_COUNT,
    CREATED_AT,
    TIMESTAMP,
];

/// Column order of the log file
pub const LOG_COLUMNS: [&str; 3] = [HANDLE, FOLLOWERS_COUNT, TIMESTAMP];

fn timestamp_type() -> DataType {
    DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into()))
}

/// Arrow schema of the master file
pub fn master_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new(HANDLE, DataType::Utf8, false),
        Field::new(DISPLAY_NAME, DataType::Utf8, false),
        Field::new(DESCRIPTION, DataType::Utf8, false),
        Field::new(FOLLOWERS_COUNT, DataType::Int64, false),
        Field::new(CREATED_AT, DataType::Utf8, true),
        Field::new(TIMESTAMP, timestamp_type(), false),
    ]))
}

/// Arrow schema of the log file
pub fn log_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new(HANDLE, DataType::Utf8, false),
        Field::new(FOLLOWERS_COUNT, DataType::Int64, false),
        Field::new(TIMESTAMP, timestamp_type(), false),
    ]))
}

// ===== Encoding =====

fn encode_count(handle: &str, count: u64) -> StorageResult<i64> {
    i64::try_from(count).map_err(|_| StorageError::InvalidValue {
        column: FOLLOWERS_COUNT.to_string(),
        message: format!("{} for {} does not fit in Int64", count, handle),
    })
}

fn timestamp_array(values: Vec<i64>) -> TimestampMicrosecondArray {
    TimestampMicrosecondArray::from(values).with_timezone("UTC")
}

/// Builds the master record batch, rows in append order
pub fn master_batch(table: &MasterTable) -> StorageResult<RecordBatch> {
    let records = table.records();

    let handles = StringArray::from_iter_values(records.iter().map(|r| r.handle.as_str()));
    let names = StringArray::from_iter_values(records.iter().map(|r| r.display_name.as_str()));
    let descriptions =
        StringArray::from_iter_values(records.iter().map(|r| r.description.as_str()));
    let counts = Int64Array::from(
        records
            .iter()
            .map(|r| encode_count(&r.handle, r.followers_count))
            .collect::<StorageResult<Vec<_>>>()?,
    );
    let created = StringArray::from(
        records
            .iter()
            .map(|r| r.created_at.as_deref())
            .collect::<Vec<_>>(),
    );
    let observed = timestamp_array(
        records
            .iter()
            .map(|r| r.observed_at.timestamp_micros())
            .collect(),
    );

    let columns: Vec<ArrayRef> = vec![
        Arc::new(handles),
        Arc::new(names),
        Arc::new(descriptions),
        Arc::new(counts),
        Arc::new(created),
        Arc::new(observed),
    ];

    Ok(RecordBatch::try_new(master_schema(), columns)?)
}

/// Builds the log record batch
pub fn log_batch(table: &LogTable) -> StorageResult<RecordBatch> {
    let entries = table.entries();

    let handles = StringArray::from_iter_values(entries.iter().map(|e| e.handle.as_str()));
    let counts = Int64Array::from(
        entries
            .iter()
            .map(|e| encode_count(&e.handle, e.followers_count))
            .collect::<StorageResult<Vec<_>>>()?,
    );
    let observed = timestamp_array(
        entries
            .iter()
            .map(|e| e.observed_at.timestamp_micros())
            .collect(),
    );

    let columns: Vec<ArrayRef> = vec![Arc::new(handles), Arc::new(counts), Arc::new(observed)];

    Ok(RecordBatch::try_new(log_schema(), columns)?)
}

// ===== Decoding =====

fn required_column<'a>(batch: &'a RecordBatch, file: &str, name: &str) -> StorageResult<&'a ArrayRef> {
    batch
        .column_by_name(name)
        .ok_or_else(|| StorageError::MissingColumn {
            file: file.to_string(),
            column: name.to_string(),
        })
}

fn downcast<'a, T: 'static>(array: &'a ArrayRef, column: &str) -> StorageResult<&'a T> {
    array
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| unsupported(column, array.data_type()))
}

fn unsupported(column: &str, data_type: &DataType) -> StorageError {
    StorageError::UnsupportedColumnType {
        column: column.to_string(),
        data_type: data_type.to_string(),
    }
}

fn invalid(column: &str, message: impl Into<String>) -> StorageError {
    StorageError::InvalidValue {
        column: column.to_string(),
        message: message.into(),
    }
}

fn read_strings(array: &ArrayRef, column: &str) -> StorageResult<Vec<Option<String>>> {
    match array.data_type() {
        DataType::Utf8 => Ok(downcast::<StringArray>(array, column)?
            .iter()
            .map(|v| v.map(str::to_string))
            .collect()),
        DataType::LargeUtf8 => Ok(downcast::<LargeStringArray>(array, column)?
            .iter()
            .map(|v| v.map(str::to_string))
            .collect()),
        DataType::Null => Ok(vec![None; array.len()]),
        other => Err(unsupported(column, other)),
    }
}

fn read_counts(array: &ArrayRef, column: &str) -> StorageResult<Vec<Option<u64>>> {
    let negative = |v: i64| invalid(column, format!("negative follower count {}", v));

    match array.data_type() {
        DataType::Int64 => downcast::<Int64Array>(array, column)?
            .iter()
            .map(|v| v.map(|v| u64::try_from(v).map_err(|_| negative(v))).transpose())
            .collect(),
        DataType::Int32 => downcast::<Int32Array>(array, column)?
            .iter()
            .map(|v| {
                v.map(|v| u64::try_from(v).map_err(|_| negative(i64::from(v))))
                    .transpose()
            })
            .collect(),
        DataType::UInt64 => Ok(downcast::<UInt64Array>(array, column)?.iter().collect()),
        DataType::Float64 => downcast::<Float64Array>(array, column)?
            .iter()
            .map(|v| match v {
                Some(f) if f.is_nan() => Ok(None),
                Some(f) if f.is_finite() && f >= 0.0 => Ok(Some(f as u64)),
                Some(f) => Err(invalid(column, format!("follower count {} out of range", f))),
                None => Ok(None),
            })
            .collect(),
        DataType::Null => Ok(vec![None; array.len()]),
        other => Err(unsupported(column, other)),
    }
}

fn from_units(value: i64, per_second: i64) -> Option<DateTime<Utc>> {
    let secs = value.div_euclid(per_second);
    let nanos = value.rem_euclid(per_second) * (1_000_000_000 / per_second);
    DateTime::from_timestamp(secs, nanos as u32)
}

fn read_timestamps(array: &ArrayRef, column: &str) -> StorageResult<Vec<Option<DateTime<Utc>>>> {
    let values: Vec<Option<i64>> = match array.data_type() {
        DataType::Timestamp(TimeUnit::Second, _) => {
            downcast::<TimestampSecondArray>(array, column)?.iter().collect()
        }
        DataType::Timestamp(TimeUnit::Millisecond, _) => {
            downcast::<TimestampMillisecondArray>(array, column)?.iter().collect()
        }
        DataType::Timestamp(TimeUnit::Microsecond, _) => {
            downcast::<TimestampMicrosecondArray>(array, column)?.iter().collect()
        }
        DataType::Timestamp(TimeUnit::Nanosecond, _) => {
            downcast::<TimestampNanosecondArray>(array, column)?.iter().collect()
        }
        DataType::Null => vec![None; array.len()],
        other => return Err(unsupported(column, other)),
    };

    let per_second = match array.data_type() {
        DataType::Timestamp(TimeUnit::Second, _) => 1,
        DataType::Timestamp(TimeUnit::Millisecond, _) => 1_000,
        DataType::Timestamp(TimeUnit::Microsecond, _) => 1_000_000,
        _ => 1_000_000_000,
    };

    values
        .into_iter()
        .map(|v| {
            v.map(|v| from_units(v, per_second).ok_or_else(|| invalid(column, "timestamp out of range")))
                .transpose()
        })
        .collect()
}

fn require<T>(value: Option<T>, column: &str, row: usize) -> StorageResult<T> {
    value.ok_or_else(|| invalid(column, format!("null at row {}", row)))
}

/// Decodes master rows from one record batch
pub fn decode_master(batch: &RecordBatch, file: &str) -> StorageResult<Vec<ProfileRecord>> {
    let handles = read_strings(required_column(batch, file, HANDLE)?, HANDLE)?;
    let names = read_strings(required_column(batch, file, DISPLAY_NAME)?, DISPLAY_NAME)?;
    let descriptions = read_strings(required_column(batch, file, DESCRIPTION)?, DESCRIPTION)?;
    let counts = read_counts(required_column(batch, file, FOLLOWERS_COUNT)?, FOLLOWERS_COUNT)?;
    let created = read_strings(required_column(batch, file, CREATED_AT)?, CREATED_AT)?;
    let observed = read_timestamps(required_column(batch, file, TIMESTAMP)?, TIMESTAMP)?;

    let mut records = Vec::with_capacity(batch.num_rows());
    for row in 0..batch.num_rows() {
        records.push(ProfileRecord {
            handle: require(handles[row].clone(), HANDLE, row)?,
            display_name: names[row].clone().unwrap_or_default(),
            description: descriptions[row].clone().unwrap_or_default(),
            followers_count: counts[row].unwrap_or(0),
            created_at: created[row].clone().filter(|c| !c.is_empty()),
            observed_at: require(observed[row], TIMESTAMP, row)?,
        });
    }

    Ok(records)
}

/// Decodes log rows from one record batch
pub fn decode_log(batch: &RecordBatch, file: &str) -> StorageResult<Vec<LogEntry>> {
    let handles = read_strings(required_column(batch, file, HANDLE)?, HANDLE)?;
    let counts = read_counts(required_column(batch, file, FOLLOWERS_COUNT)?, FOLLOWERS_COUNT)?;
    let observed = read_timestamps(required_column(batch, file, TIMESTAMP)?, TIMESTAMP)?;

    let mut entries = Vec::with_capacity(batch.num_rows());
    for row in 0..batch.num_rows() {
        entries.push(LogEntry {
            handle: require(handles[row].clone(), HANDLE, row)?,
            followers_count: counts[row].unwrap_or(0),
            observed_at: require(observed[row], TIMESTAMP, row)?,
        });
    }

    Ok(entries)
}
