//! Storage module for persisting scan data
//!
//! This module handles all database operations for the scanner, including:
//! - SQLite database initialization and schema management
//! - The durable task queue with atomic batch claims
//! - Transactional host / page / keyword writes
//! - Crawl state persistence
//! - Search and statistics queries

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::SiftError;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::path::Path;
use std::time::Duration;

/// Initializes or opens a storage database
pub fn open_storage(path: &Path) -> Result<SqliteStorage, SiftError> {
    SqliteStorage::new(path)
}

/// Current time in the fixed-width format used for every stored timestamp
///
/// Microsecond precision and a `Z` suffix keep lexical order equal to
/// chronological order, which the `ORDER BY` and window queries rely on.
pub fn now_timestamp() -> String {
    format_timestamp(Utc::now())
}

/// Formats a UTC instant the way it is stored
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Timestamp for `age` before now, or None if it cannot be represented
pub fn timestamp_before(age: Duration) -> Option<String> {
    let delta = chrono::Duration::from_std(age).ok()?;
    Utc::now().checked_sub_signed(delta).map(format_timestamp)
}

/// Latest known state of one probed address
#[derive(Debug, Clone, Serialize)]
pub struct HostRecord {
    #[serde(skip)]
    pub id: i64,
    pub address: String,
    pub domain: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub status_code: Option<u16>,
    pub response_time: Option<f64>,
    pub server_info: Option<String>,
    pub content_type: Option<String>,
    pub is_active: bool,
    pub last_crawled: String,
}

/// One stored page fetch
#[derive(Debug, Clone, Serialize)]
pub struct PageRecord {
    #[serde(skip)]
    pub id: i64,
    #[serde(skip)]
    pub host_id: i64,
    pub url: String,
    pub content_fingerprint: String,
    pub title: Option<String>,
    pub meta_description: Option<String>,
    pub http_status: Option<u16>,
    pub load_time: Option<f64>,
    pub content_size: u64,
    pub last_crawled: String,
}

/// Everything the writer persists for a successful probe
#[derive(Debug, Clone)]
pub struct ProbeWrite<'a> {
    pub url: &'a str,
    pub domain: Option<&'a str>,
    pub title: Option<&'a str>,
    pub description: Option<&'a str>,
    pub status_code: u16,
    pub response_time: f64,
    pub server_info: Option<&'a str>,
    pub content_type: Option<&'a str>,
    pub content_fingerprint: &'a str,
    pub content_size: usize,
    pub keywords: &'a [(String, u32)],
}

/// A host matched by a keyword query with its relevance score
#[derive(Debug, Clone)]
pub struct ScoredHost {
    pub host: HostRecord,
    pub score: f64,
    pub page_count: u64,
}

/// Keyword popularity row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeywordStat {
    pub keyword: String,
    pub total_occurrences: u64,
    pub page_count: u64,
}

/// The singleton crawl state row
#[derive(Debug, Clone, Serialize)]
pub struct CrawlStateRecord {
    pub status: crate::state::CrawlStatus,
    pub current_network: Option<String>,
    pub total_crawled: u64,
    pub config_hash: Option<String>,
    pub start_time: Option<String>,
    pub last_update: String,
}

/// One logged search
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHistoryEntry {
    pub query: String,
    pub result_count: u64,
    pub search_time: String,
}

/// Aggregates over a window of the search log
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchStatistics {
    pub total_searches: u64,
    pub avg_results: f64,
    pub unique_queries: u64,
}
