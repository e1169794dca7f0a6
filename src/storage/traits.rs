//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::state::{CrawlStatus, QueueStatus};
use crate::storage::{
    CrawlStateRecord, HostRecord, KeywordStat, PageRecord, ProbeWrite, ScoredHost,
    SearchHistoryEntry, SearchStatistics,
};
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// This trait defines all database operations needed by the scanner and the
/// search engine. Multi-step writes must be atomic: a failure part-way leaves
/// no partial rows behind.
pub trait Storage {
    // ===== Task Queue =====

    /// Seeds addresses as pending; addresses already queued are left untouched
    ///
    /// # Returns
    ///
    /// The number of newly inserted entries
    fn enqueue(&mut self, addresses: &[Ipv4Addr]) -> StorageResult<usize>;

    /// Atomically claims up to `limit` pending entries in insertion order
    ///
    /// Claimed entries move to in-progress. Concurrent claimers never receive
    /// the same entry.
    fn claim_batch(&mut self, limit: usize) -> StorageResult<Vec<Ipv4Addr>>;

    /// Marks an in-progress entry completed. Returns false if it was not in progress.
    fn mark_completed(&mut self, address: Ipv4Addr) -> StorageResult<bool>;

    /// Marks an in-progress entry failed. Returns false if it was not in progress.
    fn mark_failed(&mut self, address: Ipv4Addr) -> StorageResult<bool>;

    /// Returns an in-progress entry to pending so it can be claimed again
    fn release(&mut self, address: Ipv4Addr) -> StorageResult<bool>;

    /// Returns in-progress entries claimed at least `older_than` ago to pending
    ///
    /// # Returns
    ///
    /// The number of entries reclaimed
    fn reclaim_stale(&mut self, older_than: Duration) -> StorageResult<usize>;

    /// Gets the queue status of a single address
    fn queue_status(&self, address: Ipv4Addr) -> StorageResult<Option<QueueStatus>>;

    /// Counts queue entries by status
    fn count_by_status(&self) -> StorageResult<HashMap<QueueStatus, u64>>;

    /// Counts all queue entries
    fn count_queue_total(&self) -> StorageResult<u64>;

    // ===== Result Writes =====

    /// Stores a successful probe in one transaction
    ///
    /// Upserts the host as active, appends a page row, bumps each keyword's
    /// occurrence count by one and links the keywords to the page, then marks
    /// the queue entry completed.
    ///
    /// # Returns
    ///
    /// The ID of the new page row
    fn record_success(&mut self, address: Ipv4Addr, probe: &ProbeWrite<'_>)
        -> StorageResult<i64>;

    /// Stores a failed probe in one transaction
    ///
    /// Upserts the host as inactive with its metadata cleared and marks the
    /// queue entry failed.
    fn record_failure(&mut self, address: Ipv4Addr) -> StorageResult<()>;

    // ===== Hosts and Pages =====

    /// Gets a host by address
    fn get_host(&self, address: &str) -> StorageResult<Option<HostRecord>>;

    /// Gets every page stored for a host, newest first
    fn get_pages_for_host(&self, host_id: i64) -> StorageResult<Vec<PageRecord>>;

    /// Gets a host's keywords ranked by summed page frequency
    fn get_host_top_keywords(&self, host_id: i64, limit: usize)
        -> StorageResult<Vec<(String, u64)>>;

    /// Gets the global occurrence count of a keyword
    fn get_keyword_occurrences(&self, keyword: &str) -> StorageResult<Option<u64>>;

    // ===== Crawl State =====

    /// Writes a fresh running crawl state for a new run
    fn begin_crawl_state(
        &mut self,
        network: &str,
        config_hash: &str,
        total_crawled: u64,
    ) -> StorageResult<()>;

    /// Updates the crawl status and, when given, the crawled total
    fn update_crawl_state(
        &mut self,
        status: CrawlStatus,
        total_crawled: Option<u64>,
    ) -> StorageResult<()>;

    /// Gets the crawl state, if any run has ever started
    fn get_crawl_state(&self) -> StorageResult<Option<CrawlStateRecord>>;

    // ===== Search =====

    /// Ranks active hosts whose pages contain any of `terms`
    ///
    /// Score is the sum over matching page keywords of
    /// `frequency * total_occurrences`. Ordered by score, then by matching
    /// page count, both descending.
    fn search_by_terms(
        &self,
        terms: &[String],
        limit: usize,
        offset: usize,
    ) -> StorageResult<Vec<ScoredHost>>;

    /// Counts the distinct active hosts matching any of `terms`
    fn count_hosts_by_terms(&self, terms: &[String]) -> StorageResult<u64>;

    /// Gets active hosts whose domain contains `fragment`, most recently crawled first
    fn search_by_domain(
        &self,
        fragment: &str,
        limit: usize,
        offset: usize,
    ) -> StorageResult<Vec<HostRecord>>;

    /// Counts active hosts whose domain contains `fragment`
    fn count_hosts_by_domain(&self, fragment: &str) -> StorageResult<u64>;

    /// Gets keywords by global occurrence count
    fn popular_keywords(&self, limit: usize) -> StorageResult<Vec<KeywordStat>>;

    /// Appends a search to the query log
    fn log_search(&mut self, query: &str, result_count: u64) -> StorageResult<()>;

    /// Gets the most recent searches, newest first
    fn recent_searches(&self, limit: usize) -> StorageResult<Vec<SearchHistoryEntry>>;

    /// Aggregates the query log from `since` onwards
    fn search_statistics_since(&self, since: &str) -> StorageResult<SearchStatistics>;

    // ===== Statistics =====

    /// Counts hosts, optionally only the active ones
    fn count_hosts(&self, active_only: bool) -> StorageResult<u64>;

    /// Counts pages
    fn count_pages(&self) -> StorageResult<u64>;

    /// Counts distinct keywords
    fn count_keywords(&self) -> StorageResult<u64>;
}
