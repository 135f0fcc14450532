//! Output module for reporting on the persisted tables
//!
//! This module handles summarizing the master and log tables for the
//! `--stats` mode.

pub mod stats;

pub use stats::{compute_statistics, load_statistics, print_statistics, TableStatistics};
