//! Netsift: a random-sample HTTP host scanner and keyword index
//!
//! This crate probes randomly sampled, globally routable IPv4 addresses on
//! port 80, records what it finds in SQLite, and answers keyword and domain
//! queries over the collected pages.

pub mod address;
pub mod config;
pub mod crawler;
pub mod output;
pub mod search;
pub mod state;
pub mod storage;
pub mod text;

use thiserror::Error;

/// Main error type for Netsift operations
#[derive(Debug, Error)]
pub enum SiftError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    StorageError(#[from] storage::StorageError),

    #[error("Address error: {0}")]
    Address(#[from] AddressError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage lock poisoned")]
    LockPoisoned,
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
}

/// Address and network-range errors
#[derive(Debug, Error)]
pub enum AddressError {
    #[error("Invalid network prefix '{input}': {message}")]
    InvalidNetwork { input: String, message: String },

    #[error("Only IPv4 networks are supported, got '{0}'")]
    NotIpv4(String),
}

/// Result type alias for Netsift operations
pub type Result<T> = std::result::Result<T, SiftError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for address operations
pub type AddressResult<T> = std::result::Result<T, AddressError>;

// Re-export commonly used types
pub use address::{generate_candidates, is_candidate, is_globally_routable, parse_network};
pub use config::Config;
pub use crawler::Crawler;
pub use search::SearchEngine;
pub use state::{CrawlStatus, QueueStatus};
