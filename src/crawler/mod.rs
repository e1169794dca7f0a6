//! Crawler module for probing candidate addresses
//!
//! This module contains the core scanning logic, including:
//! - HTTP probing with bounded body reads
//! - HTML extraction of title, description, domain and visible text
//! - Transactional persistence of probe outcomes
//! - The worker pool and its batch barrier
//! - Live telemetry
//! - Overall crawl orchestration

mod barrier;
mod extract;
mod fetcher;
mod orchestrator;
mod pool;
mod telemetry;
mod writer;

pub use barrier::BatchBarrier;
pub use extract::{extract_page, PageExtract};
pub use fetcher::{build_http_client, probe, ProbeResult, ProbeSettings};
pub use orchestrator::{Crawler, CrawlerStatus, QueueStats};
pub use pool::{PoolHandle, WorkItem, WorkerContext, WorkerPool};
pub use telemetry::{EventKind, EventOrder, ScanEvent, ScanningEntry, Telemetry};
pub use writer::{content_fingerprint, record};
