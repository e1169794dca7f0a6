//! Statistics generation from the scan database
//!
//! This module provides functionality for extracting and displaying
//! crawl statistics from the storage layer.

use crate::state::{CrawlStatus, QueueStatus};
use crate::storage::Storage;
use crate::SiftError;
use serde::Serialize;
use std::collections::HashMap;

/// Crawl statistics summary
#[derive(Debug, Clone, Serialize)]
pub struct CrawlStatistics {
    /// Hosts whose latest probe was answered
    pub active_hosts: u64,

    /// Every host ever probed
    pub total_hosts: u64,

    /// Distinct keywords indexed
    pub total_keywords: u64,

    /// Stored page fetches
    pub total_pages: u64,

    /// Last persisted orchestrator status
    pub crawl_status: CrawlStatus,

    /// Completed queue entries as of the last batch
    pub total_crawled: u64,

    /// When the crawl state was last written
    pub last_update: Option<String>,

    /// Entries still waiting to be claimed
    pub queue_size: u64,

    /// Queue entries per status
    pub queue_by_status: HashMap<QueueStatus, u64>,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(CrawlStatistics)` - Successfully loaded statistics
/// * `Err(SiftError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> Result<CrawlStatistics, SiftError> {
    let active_hosts = storage.count_hosts(true)?;
    let total_hosts = storage.count_hosts(false)?;
    let total_keywords = storage.count_keywords()?;
    let total_pages = storage.count_pages()?;
    let queue_by_status = storage.count_by_status()?;
    let queue_size = queue_by_status
        .get(&QueueStatus::Pending)
        .copied()
        .unwrap_or(0);

    let (crawl_status, total_crawled, last_update) = match storage.get_crawl_state()? {
        Some(state) => (state.status, state.total_crawled, Some(state.last_update)),
        None => (CrawlStatus::Stopped, 0, None),
    };

    Ok(CrawlStatistics {
        active_hosts,
        total_hosts,
        total_keywords,
        total_pages,
        crawl_status,
        total_crawled,
        last_update,
        queue_size,
        queue_by_status,
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Scan Statistics ===\n");

    println!("Crawl:");
    println!("  Status: {}", stats.crawl_status);
    println!("  Total crawled: {}", stats.total_crawled);
    if let Some(last_update) = &stats.last_update {
        println!("  Last update: {}", last_update);
    }
    println!();

    println!("Index:");
    println!("  Hosts probed: {}", stats.total_hosts);
    println!("  Active hosts: {}", stats.active_hosts);
    println!("  Pages stored: {}", stats.total_pages);
    println!("  Keywords: {}", stats.total_keywords);
    println!();

    println!("Queue:");
    let total: u64 = stats.queue_by_status.values().sum();
    for status in QueueStatus::all() {
        let count = stats.queue_by_status.get(&status).copied().unwrap_or(0);
        let percentage = if total > 0 {
            (count as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", status, count, percentage);
    }
    println!();

    // Share of probed hosts that answered
    let hit_rate = if stats.total_hosts > 0 {
        (stats.active_hosts as f64 / stats.total_hosts as f64) * 100.0
    } else {
        0.0
    };
    println!("Hit rate: {:.1}%", hit_rate);
}
