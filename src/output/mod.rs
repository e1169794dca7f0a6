//! Output module for reporting on the scan database
//!
//! This module handles:
//! - Loading and printing aggregate crawl statistics
//! - Rendering search results, host details and live telemetry as text

mod report;
pub mod stats;

pub use report::{
    format_analytics, format_crawler_status, format_events, format_host_details,
    format_keywords, format_queue_stats, format_search_response,
};
pub use stats::{load_statistics, print_statistics, CrawlStatistics};
