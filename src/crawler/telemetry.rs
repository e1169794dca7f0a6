//! Live scan telemetry
//!
//! Tracks which addresses are mid-probe and keeps a bounded log of recent
//! scan events. Readers get snapshots; nothing here is persisted.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::net::Ipv4Addr;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// What happened to an address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    ScanStart,
    Detected,
    Failed,
    Error,
    Stored,
}

/// One entry in the recent-event log
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanEvent {
    pub kind: EventKind,
    pub address: Ipv4Addr,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_info: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ScanEvent {
    pub fn new(kind: EventKind, address: Ipv4Addr) -> Self {
        Self {
            kind,
            address,
            status_code: None,
            server_info: None,
            response_time: None,
            message: None,
            timestamp: Utc::now(),
        }
    }

    /// A host answered
    pub fn detected(
        address: Ipv4Addr,
        status_code: u16,
        server_info: Option<String>,
        response_time: f64,
    ) -> Self {
        Self {
            status_code: Some(status_code),
            server_info,
            response_time: Some(response_time),
            ..Self::new(EventKind::Detected, address)
        }
    }

    /// Something went wrong outside the normal probe outcomes
    pub fn error(address: Ipv4Addr, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::new(EventKind::Error, address)
        }
    }
}

/// Order of events returned by `recent_events`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOrder {
    NewestFirst,
    OldestFirst,
}

/// An address currently being probed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanningEntry {
    pub address: Ipv4Addr,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug)]
struct TelemetryState {
    scanning: HashMap<Ipv4Addr, DateTime<Utc>>,
    events: VecDeque<ScanEvent>,
    capacity: usize,
}

/// In-flight set plus a fixed-capacity ring buffer of recent events
#[derive(Debug)]
pub struct Telemetry {
    state: Mutex<TelemetryState>,
}

impl Telemetry {
    /// Creates telemetry keeping at most `capacity` events (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            state: Mutex::new(TelemetryState {
                scanning: HashMap::new(),
                events: VecDeque::with_capacity(capacity),
                capacity,
            }),
        }
    }

    // Observational data only, so a poisoned lock is still usable
    fn lock(&self) -> MutexGuard<'_, TelemetryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Marks `address` as in flight and logs a scan_start event
    pub fn begin_scan(&self, address: Ipv4Addr) {
        let event = ScanEvent::new(EventKind::ScanStart, address);
        let mut state = self.lock();
        state.scanning.insert(address, event.timestamp);
        push_event(&mut state, event);
    }

    /// Removes `address` from the in-flight set
    pub fn finish_scan(&self, address: Ipv4Addr) {
        self.lock().scanning.remove(&address);
    }

    /// Appends an event, evicting the oldest when full
    pub fn record(&self, event: ScanEvent) {
        push_event(&mut self.lock(), event);
    }

    /// Addresses currently being probed, longest-running first
    pub fn currently_scanning(&self, limit: usize) -> Vec<ScanningEntry> {
        let mut entries: Vec<ScanningEntry> = self
            .lock()
            .scanning
            .iter()
            .map(|(address, started_at)| ScanningEntry {
                address: *address,
                started_at: *started_at,
            })
            .collect();
        entries.sort_by(|a, b| {
            a.started_at
                .cmp(&b.started_at)
                .then_with(|| a.address.cmp(&b.address))
        });
        entries.truncate(limit);
        entries
    }

    pub fn scanning_count(&self) -> usize {
        self.lock().scanning.len()
    }

    /// The most recent `limit` events in the requested order
    pub fn recent_events(&self, limit: usize, order: EventOrder) -> Vec<ScanEvent> {
        let state = self.lock();
        let skip = state.events.len().saturating_sub(limit);
        let mut events: Vec<ScanEvent> = state.events.iter().skip(skip).cloned().collect();
        if order == EventOrder::NewestFirst {
            events.reverse();
        }
        events
    }
}

fn push_event(state: &mut TelemetryState, event: ScanEvent) {
    while state.events.len() >= state.capacity {
        state.events.pop_front();
    }
    state.events.push_back(event);
}
