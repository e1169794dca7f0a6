//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `QueueStatus`: Tracks each candidate address through the durable task queue
//! - `CrawlStatus`: The orchestrator's stopped / running / paused lifecycle

mod crawl_status;
mod queue_status;

// Re-export main types
pub use crawl_status::CrawlStatus;
pub use queue_status::QueueStatus;
