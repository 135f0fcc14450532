//! Configuration module for Follower Tracker
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every key is optional; the defaults track the built-in root account.
//!
//! # Example
//!
//! ```no_run
//! use follower_tracker::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("tracker.toml")).unwrap();
//! println!("Tracking followers of: {}", config.account.root_handle);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{AccountConfig, Config, CrawlerConfig, OutputConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
