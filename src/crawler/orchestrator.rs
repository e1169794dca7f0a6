//! Crawl orchestration
//!
//! The `Crawler` owns the lifecycle of a scan: it seeds the task queue,
//! starts and stops the worker pool, and runs the dispatch loop that claims a
//! batch, hands it to the workers and waits for it to drain before claiming
//! the next one. Stop and pause are independent flags; pausing only holds back
//! new batches, stopping also ends the workers.

use crate::address::generate_candidates;
use crate::config::Config;
use crate::crawler::fetcher::{build_http_client, ProbeSettings};
use crate::crawler::pool::{PoolHandle, WorkerContext, WorkerPool};
use crate::crawler::telemetry::{EventOrder, ScanEvent, ScanningEntry, Telemetry};
use crate::output::{load_statistics, CrawlStatistics};
use crate::state::{CrawlStatus, QueueStatus};
use crate::storage::{SqliteStorage, Storage};
use crate::SiftError;
use ipnetwork::Ipv4Network;
use reqwest::Client;
use serde::Serialize;
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Notify;

/// How often a paused dispatch loop re-checks its flags without a wake-up
const PAUSE_POLL: Duration = Duration::from_secs(1);

/// Slack on top of one probe and one politeness delay when joining a worker
const WORKER_JOIN_MARGIN: Duration = Duration::from_secs(5);

/// Snapshot of the orchestrator for status reporting
#[derive(Debug, Clone, Serialize)]
pub struct CrawlerStatus {
    pub active: bool,
    pub paused: bool,
    pub status: CrawlStatus,
    /// Workers currently running
    pub worker_count: usize,
    /// Addresses waiting in the work channel
    pub queue_depth: usize,
}

/// Task queue summary
#[derive(Debug, Clone, Serialize)]
pub struct QueueStats {
    pub total: u64,
    pub by_status: HashMap<QueueStatus, u64>,
    pub channel_depth: usize,
}

/// Owns one scan's lifecycle
///
/// Shared behind an `Arc` by whatever drives it; `start` runs the dispatch
/// loop on the caller's task while `stop`, `pause` and `resume` are called
/// from elsewhere.
pub struct Crawler {
    config: Config,
    config_hash: String,
    storage: Arc<Mutex<SqliteStorage>>,
    client: Client,
    telemetry: Arc<Telemetry>,
    running: Arc<AtomicBool>,
    paused: AtomicBool,
    wake: Notify,
    pool: Mutex<Option<WorkerPool>>,
}

impl Crawler {
    /// Creates a crawler on the database named in the configuration
    ///
    /// # Arguments
    ///
    /// * `config` - The validated configuration
    /// * `config_hash` - Hash of the configuration file, stored with the crawl state
    pub fn new(config: Config, config_hash: String) -> Result<Self, SiftError> {
        let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
        Self::with_storage(config, config_hash, Arc::new(Mutex::new(storage)))
    }

    /// Creates a crawler on an already opened, possibly shared, store
    pub fn with_storage(
        config: Config,
        config_hash: String,
        storage: Arc<Mutex<SqliteStorage>>,
    ) -> Result<Self, SiftError> {
        let client = build_http_client(&config.crawler)?;
        let telemetry = Arc::new(Telemetry::new(config.crawler.event_capacity));

        Ok(Self {
            config,
            config_hash,
            storage,
            client,
            telemetry,
            running: Arc::new(AtomicBool::new(false)),
            paused: AtomicBool::new(false),
            wake: Notify::new(),
            pool: Mutex::new(None),
        })
    }

    /// The store this crawler writes to
    pub fn storage(&self) -> Arc<Mutex<SqliteStorage>> {
        Arc::clone(&self.storage)
    }

    pub fn telemetry(&self) -> Arc<Telemetry> {
        Arc::clone(&self.telemetry)
    }

    fn lock_storage(&self) -> Result<MutexGuard<'_, SqliteStorage>, SiftError> {
        self.storage.lock().map_err(|_| SiftError::LockPoisoned)
    }

    fn lock_pool(&self) -> MutexGuard<'_, Option<WorkerPool>> {
        self.pool
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Current lifecycle state derived from the two flags
    pub fn crawl_status(&self) -> CrawlStatus {
        if !self.is_running() {
            CrawlStatus::Stopped
        } else if self.paused.load(Ordering::SeqCst) {
            CrawlStatus::Paused
        } else {
            CrawlStatus::Running
        }
    }

    /// Starts a scan of `network` and runs it until `stop` is called
    ///
    /// Reclaims entries left in progress by an earlier run, records a fresh
    /// crawl state, seeds `max_addresses` candidates and launches the worker
    /// pool before entering the dispatch loop.
    ///
    /// # Returns
    ///
    /// `false` immediately if a scan is already running or setup fails,
    /// otherwise `true` once the scan has been stopped
    pub async fn start(&self, network: Ipv4Network, max_addresses: usize) -> bool {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::info!("Crawl already running, ignoring start");
            return false;
        }
        self.paused.store(false, Ordering::SeqCst);

        if let Err(e) = self.prepare_run(network, max_addresses) {
            tracing::error!("Failed to start crawl: {}", e);
            self.running.store(false, Ordering::SeqCst);
            return false;
        }

        let worker_count = self.config.crawler.worker_count as usize;
        let pool = WorkerPool::spawn(
            worker_count,
            self.config.crawler.batch_size as usize,
            self.worker_join_timeout(),
            self.worker_context(),
        );
        let handle = pool.handle();
        *self.lock_pool() = Some(pool);

        // stop() may have run before the pool existed, and its Stopped write
        // may have landed before begin_crawl_state
        if !self.is_running() {
            self.shutdown_pool().await;
            if let Err(e) = self.persist_state(CrawlStatus::Stopped) {
                tracing::error!("Failed to persist final crawl state: {}", e);
            }
            return true;
        }

        tracing::info!(
            "Crawl started on {} with {} workers",
            network,
            worker_count
        );
        self.dispatch_loop(network, &handle).await;
        tracing::info!("Dispatch loop finished");
        true
    }

    fn prepare_run(&self, network: Ipv4Network, max_addresses: usize) -> Result<(), SiftError> {
        let recovered = self.recover_interrupted()?;
        if recovered > 0 {
            tracing::info!("Recovered {} interrupted queue entries", recovered);
        }

        let completed = self.completed_count()?;
        self.lock_storage()?
            .begin_crawl_state(&network.to_string(), &self.config_hash, completed)?;

        let seeded = self.populate_queue(network, max_addresses)?;
        tracing::info!("Seeded {} new candidates from {}", seeded, network);
        Ok(())
    }

    /// Long enough for a worker to finish the probe it is on
    fn worker_join_timeout(&self) -> Duration {
        self.config.crawler.request_timeout()
            + self.config.crawler.politeness_delay()
            + WORKER_JOIN_MARGIN
    }

    fn worker_context(&self) -> WorkerContext {
        WorkerContext {
            client: self.client.clone(),
            settings: ProbeSettings::from_config(&self.config),
            politeness_delay: self.config.crawler.politeness_delay(),
            storage: Arc::clone(&self.storage),
            telemetry: Arc::clone(&self.telemetry),
            running: Arc::clone(&self.running),
        }
    }

    async fn dispatch_loop(&self, network: Ipv4Network, handle: &PoolHandle) {
        let batch_size = self.config.crawler.batch_size as usize;

        while self.is_running() {
            if self.paused.load(Ordering::SeqCst) {
                let _ = tokio::time::timeout(PAUSE_POLL, self.wake.notified()).await;
                continue;
            }

            let batch = match self.claim_batch(batch_size) {
                Ok(batch) => batch,
                Err(e) => {
                    tracing::error!("Failed to claim batch: {}", e);
                    self.idle(network).await;
                    continue;
                }
            };

            if batch.is_empty() {
                self.idle(network).await;
                continue;
            }

            tracing::debug!("Dispatching batch of {}", batch.len());
            let mut undelivered = Vec::new();
            for address in batch {
                if !handle.submit(address).await {
                    undelivered.push(address);
                }
            }
            self.release_all(&undelivered);

            handle.wait_for_batch().await;

            if let Err(e) = self.persist_state(self.crawl_status()) {
                tracing::error!("Failed to update crawl state: {}", e);
            }
        }
    }

    fn claim_batch(&self, batch_size: usize) -> Result<Vec<Ipv4Addr>, SiftError> {
        Ok(self.lock_storage()?.claim_batch(batch_size)?)
    }

    /// Waits out an empty queue, then sweeps stale claims and reseeds
    async fn idle(&self, network: Ipv4Network) {
        let _ = tokio::time::timeout(self.config.crawler.idle_wait(), self.wake.notified()).await;
        if !self.is_running() || self.paused.load(Ordering::SeqCst) {
            return;
        }

        let reclaim_after = self.config.crawler.reclaim_after();
        match self.lock_storage().and_then(|mut s| Ok(s.reclaim_stale(reclaim_after)?)) {
            Ok(0) => {}
            Ok(reclaimed) => tracing::info!("Reclaimed {} stale queue entries", reclaimed),
            Err(e) => tracing::error!("Failed to reclaim stale entries: {}", e),
        }

        let reseed = (self.config.crawler.max_addresses_per_run as usize / 10).max(1);
        match self.populate_queue(network, reseed) {
            Ok(seeded) => tracing::debug!("Reseeded {} candidates", seeded),
            Err(e) => tracing::error!("Failed to reseed queue: {}", e),
        }
    }

    fn release_all(&self, addresses: &[Ipv4Addr]) {
        if addresses.is_empty() {
            return;
        }
        match self.lock_storage() {
            Ok(mut storage) => {
                for address in addresses {
                    if let Err(e) = storage.release(*address) {
                        tracing::error!("Failed to release {}: {}", address, e);
                    }
                }
            }
            Err(e) => tracing::error!("Failed to release undelivered batch: {}", e),
        }
    }

    fn completed_count(&self) -> Result<u64, SiftError> {
        let counts = self.lock_storage()?.count_by_status()?;
        Ok(counts.get(&QueueStatus::Completed).copied().unwrap_or(0))
    }

    fn persist_state(&self, status: CrawlStatus) -> Result<(), SiftError> {
        let completed = self.completed_count()?;
        self.lock_storage()?
            .update_crawl_state(status, Some(completed))?;
        Ok(())
    }

    async fn shutdown_pool(&self) -> usize {
        let pool = self.lock_pool().take();
        match pool {
            Some(pool) => pool.shutdown().await,
            None => 0,
        }
    }

    /// Stops the scan and its workers
    ///
    /// Workers finish the probe they are on; addresses still waiting in the
    /// channel go back to pending. Returns `false` if nothing was running.
    pub async fn stop(&self) -> bool {
        if self
            .running
            .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }
        self.paused.store(false, Ordering::SeqCst);
        self.wake.notify_waiters();

        let stopped = self.shutdown_pool().await;
        tracing::info!("Stopped {} workers", stopped);

        if let Err(e) = self.persist_state(CrawlStatus::Stopped) {
            tracing::error!("Failed to persist final crawl state: {}", e);
        }
        true
    }

    /// Holds back new batches; workers keep running
    ///
    /// Returns `false` unless the scan is running and not already paused.
    pub fn pause(&self) -> bool {
        if !self.crawl_status().can_transition_to(CrawlStatus::Paused)
            || self
                .paused
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
        {
            return false;
        }

        tracing::info!("Crawl paused");
        if let Err(e) = self.persist_state(CrawlStatus::Paused) {
            tracing::error!("Failed to persist paused state: {}", e);
        }
        true
    }

    /// Continues dispatching after `pause`
    pub fn resume(&self) -> bool {
        if self.crawl_status() != CrawlStatus::Paused
            || self
                .paused
                .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
        {
            return false;
        }
        self.wake.notify_waiters();

        tracing::info!("Crawl resumed");
        if let Err(e) = self.persist_state(CrawlStatus::Running) {
            tracing::error!("Failed to persist running state: {}", e);
        }
        true
    }

    pub fn status(&self) -> CrawlerStatus {
        let pool = self.lock_pool();
        let (worker_count, queue_depth) = pool
            .as_ref()
            .map(|p| (p.worker_count(), p.handle().queue_depth()))
            .unwrap_or((0, 0));

        CrawlerStatus {
            active: self.is_running(),
            paused: self.paused.load(Ordering::SeqCst),
            status: self.crawl_status(),
            worker_count,
            queue_depth,
        }
    }

    /// Aggregate counts over the whole store
    pub fn stats(&self) -> Result<CrawlStatistics, SiftError> {
        let storage = self.lock_storage()?;
        load_statistics(&*storage)
    }

    pub fn currently_scanning(&self, limit: usize) -> Vec<ScanningEntry> {
        self.telemetry.currently_scanning(limit)
    }

    /// The most recent events, newest first
    pub fn recent_events(&self, limit: usize) -> Vec<ScanEvent> {
        self.telemetry.recent_events(limit, EventOrder::NewestFirst)
    }

    /// Generates `count` candidates in `network` and queues the new ones
    ///
    /// # Returns
    ///
    /// The number of addresses that were not already queued
    pub fn populate_queue(&self, network: Ipv4Network, count: usize) -> Result<usize, SiftError> {
        let candidates: Vec<Ipv4Addr> = generate_candidates(network, count).into_iter().collect();
        if candidates.is_empty() {
            return Ok(0);
        }
        Ok(self.lock_storage()?.enqueue(&candidates)?)
    }

    pub fn queue_stats(&self) -> Result<QueueStats, SiftError> {
        let (total, by_status) = {
            let storage = self.lock_storage()?;
            (storage.count_queue_total()?, storage.count_by_status()?)
        };
        let channel_depth = self
            .lock_pool()
            .as_ref()
            .map(|p| p.handle().queue_depth())
            .unwrap_or(0);

        Ok(QueueStats {
            total,
            by_status,
            channel_depth,
        })
    }

    /// Returns every in-progress entry to pending
    ///
    /// Only safe while no batch is in flight; `start` calls it before the
    /// workers exist.
    pub fn recover_interrupted(&self) -> Result<usize, SiftError> {
        Ok(self.lock_storage()?.reclaim_stale(Duration::ZERO)?)
    }
}
