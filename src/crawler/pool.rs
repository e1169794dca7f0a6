//! Fixed-size pool of probe workers
//!
//! Workers share one bounded channel. Each worker takes an address, probes
//! it, stores the outcome, counts down the batch barrier and then sleeps for
//! the politeness delay before taking the next one. A `Shutdown` item ends a
//! worker; the pool sends one per worker when it is shut down.

use crate::crawler::barrier::BatchBarrier;
use crate::crawler::fetcher::{probe, ProbeSettings};
use crate::crawler::telemetry::{EventKind, ScanEvent, Telemetry};
use crate::crawler::writer;
use crate::storage::{SqliteStorage, Storage};
use reqwest::Client;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::{self, error::SendTimeoutError};
use tokio::task::JoinHandle;

/// Longest a worker blocks on the channel before re-checking the stop flag
const RECEIVE_WAIT: Duration = Duration::from_secs(5);

/// Interval at which a blocked submit re-checks the stop flag
const SUBMIT_RETRY: Duration = Duration::from_millis(500);

/// An item on the work channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkItem {
    Probe(Ipv4Addr),
    Shutdown,
}

/// Everything a worker needs to process an address
#[derive(Clone)]
pub struct WorkerContext {
    pub client: Client,
    pub settings: ProbeSettings,
    pub politeness_delay: Duration,
    pub storage: Arc<Mutex<SqliteStorage>>,
    pub telemetry: Arc<Telemetry>,
    /// Cleared when the crawl is stopping
    pub running: Arc<AtomicBool>,
}

/// Cloneable handle used by the dispatcher to feed the pool
#[derive(Clone)]
pub struct PoolHandle {
    sender: mpsc::Sender<WorkItem>,
    barrier: Arc<BatchBarrier>,
    running: Arc<AtomicBool>,
}

impl PoolHandle {
    /// Sends one address to the workers and counts it on the barrier
    ///
    /// Blocks while the channel is full. Gives up and returns false once the
    /// crawl is stopping or every worker is gone; the address is then not
    /// counted and still belongs to the caller.
    pub async fn submit(&self, address: Ipv4Addr) -> bool {
        self.barrier.add(1);
        let mut item = WorkItem::Probe(address);

        loop {
            if !self.running.load(Ordering::SeqCst) {
                self.barrier.done();
                return false;
            }
            match self.sender.send_timeout(item, SUBMIT_RETRY).await {
                Ok(()) => return true,
                Err(SendTimeoutError::Timeout(returned)) => item = returned,
                Err(SendTimeoutError::Closed(_)) => {
                    self.barrier.done();
                    return false;
                }
            }
        }
    }

    /// Waits for every submitted address to finish
    ///
    /// Returns early, with items possibly outstanding, once the crawl is stopping.
    pub async fn wait_for_batch(&self) {
        loop {
            if tokio::time::timeout(SUBMIT_RETRY, self.barrier.wait())
                .await
                .is_ok()
            {
                return;
            }
            if !self.running.load(Ordering::SeqCst) {
                return;
            }
        }
    }

    /// Items sent but not yet taken by a worker
    pub fn queue_depth(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }

    /// Items sent in the current batch and not yet finished
    pub fn in_flight(&self) -> usize {
        self.barrier.pending()
    }
}

/// A running set of workers
pub struct WorkerPool {
    handle: PoolHandle,
    workers: Vec<JoinHandle<()>>,
    join_timeout: Duration,
}

impl WorkerPool {
    /// Spawns `worker_count` workers reading from a channel of `capacity` items
    ///
    /// `join_timeout` bounds how long `shutdown` waits for each worker; it
    /// must cover a full probe plus the politeness delay.
    pub fn spawn(
        worker_count: usize,
        capacity: usize,
        join_timeout: Duration,
        context: WorkerContext,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));
        let barrier = Arc::new(BatchBarrier::new());

        let workers = (0..worker_count)
            .map(|id| {
                tokio::spawn(run_worker(
                    id,
                    context.clone(),
                    Arc::clone(&receiver),
                    Arc::clone(&barrier),
                ))
            })
            .collect();

        tracing::debug!("Spawned {} workers", worker_count);

        Self {
            handle: PoolHandle {
                sender,
                barrier,
                running: context.running,
            },
            workers,
            join_timeout,
        }
    }

    pub fn handle(&self) -> PoolHandle {
        self.handle.clone()
    }

    /// Number of workers still running
    pub fn worker_count(&self) -> usize {
        self.workers.iter().filter(|w| !w.is_finished()).count()
    }

    /// Sends one shutdown item per worker and joins them
    ///
    /// A worker mid-probe finishes and stores that probe first. Workers that
    /// do not exit within the join timeout are aborted; an aborted probe
    /// leaves telemetry and hands its address back to pending.
    ///
    /// # Returns
    ///
    /// The number of workers that exited on their own
    pub async fn shutdown(self) -> usize {
        for _ in 0..self.workers.len() {
            if self
                .handle
                .sender
                .send_timeout(WorkItem::Shutdown, self.join_timeout)
                .await
                .is_err()
            {
                break;
            }
        }

        let mut clean = 0;
        for mut worker in self.workers {
            match tokio::time::timeout(self.join_timeout, &mut worker).await {
                Ok(_) => clean += 1,
                Err(_) => {
                    tracing::warn!(
                        "Worker did not stop within {:?}, aborting",
                        self.join_timeout
                    );
                    worker.abort();
                    // Let the aborted task drop its in-flight scan
                    let _ = worker.await;
                }
            }
        }
        clean
    }
}

async fn run_worker(
    id: usize,
    context: WorkerContext,
    receiver: Arc<tokio::sync::Mutex<mpsc::Receiver<WorkItem>>>,
    barrier: Arc<BatchBarrier>,
) {
    tracing::debug!("Worker {} started", id);

    loop {
        let received = {
            let mut receiver = receiver.lock().await;
            tokio::time::timeout(RECEIVE_WAIT, receiver.recv()).await
        };

        let address = match received {
            Ok(Some(WorkItem::Probe(address))) => address,
            Ok(Some(WorkItem::Shutdown)) | Ok(None) => break,
            Err(_) => {
                if context.running.load(Ordering::SeqCst) {
                    continue;
                }
                break;
            }
        };

        if !context.running.load(Ordering::SeqCst) {
            // Stopping: hand the address back instead of probing it
            release(&context, address);
            barrier.done();
            continue;
        }

        process_address(&context, address).await;
        barrier.done();
        tokio::time::sleep(context.politeness_delay).await;
    }

    tracing::debug!("Worker {} exiting", id);
}

/// Undoes an in-flight scan if its future is dropped before the outcome is stored
struct ScanGuard<'a> {
    context: &'a WorkerContext,
    address: Ipv4Addr,
    stored: bool,
}

impl<'a> ScanGuard<'a> {
    fn begin(context: &'a WorkerContext, address: Ipv4Addr) -> Self {
        context.telemetry.begin_scan(address);
        Self {
            context,
            address,
            stored: false,
        }
    }
}

impl Drop for ScanGuard<'_> {
    fn drop(&mut self) {
        if !self.stored {
            tracing::debug!("Scan of {} interrupted, releasing it", self.address);
            release(self.context, self.address);
        }
        self.context.telemetry.finish_scan(self.address);
    }
}

/// Probes one address, stores the outcome and reports it to telemetry
async fn process_address(context: &WorkerContext, address: Ipv4Addr) {
    let mut guard = ScanGuard::begin(context, address);

    let result = probe(&context.client, address, &context.settings).await;
    match &result {
        Some(found) => context.telemetry.record(ScanEvent::detected(
            address,
            found.status_code,
            found.server_info.clone(),
            found.response_time,
        )),
        None => context
            .telemetry
            .record(ScanEvent::new(EventKind::Failed, address)),
    }

    let stored = match context.storage.lock() {
        Ok(mut storage) => writer::record(&mut *storage, address, result.as_ref()),
        Err(_) => {
            tracing::error!("Storage lock poisoned, dropping result for {}", address);
            false
        }
    };
    // Past the writer the entry is no longer ours to release
    guard.stored = true;

    if !stored {
        context
            .telemetry
            .record(ScanEvent::error(address, "failed to store probe outcome"));
    } else if result.is_some() {
        context
            .telemetry
            .record(ScanEvent::new(EventKind::Stored, address));
    }
}

fn release(context: &WorkerContext, address: Ipv4Addr) {
    match context.storage.lock() {
        Ok(mut storage) => {
            if let Err(e) = storage.release(address) {
                tracing::error!("Failed to release {}: {}", address, e);
            }
        }
        Err(_) => tracing::error!("Storage lock poisoned, cannot release {}", address),
    }
}
