//! Configuration module for Netsift
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every key has a default, so an empty file yields a usable configuration.
//!
//! # Example
//!
//! ```no_run
//! use netsift::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("netsift.toml")).unwrap();
//! println!("Probing with {} workers", config.crawler.worker_count);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, ExtractionConfig, OutputConfig, SearchConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
