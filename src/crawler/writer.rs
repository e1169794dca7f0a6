//! Persistence of probe outcomes
//!
//! Turns a probe outcome into storage writes. Each outcome is written in a
//! single transaction by the storage layer; this module decides which write
//! to make and keeps a failed write from stranding the queue entry.

use crate::crawler::fetcher::ProbeResult;
use crate::storage::{ProbeWrite, Storage};
use sha2::{Digest, Sha256};
use std::net::Ipv4Addr;

/// Hex-encoded SHA-256 of a page body
///
/// Stable across processes and platforms, so equal bodies always share a
/// fingerprint.
pub fn content_fingerprint(body: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(body.as_bytes());
    hex::encode(hasher.finalize())
}

/// Records the outcome of probing `address`
///
/// With a result, the host is stored as active along with a new page and its
/// keywords, and the queue entry is completed. Without one, the host is
/// stored as inactive and the queue entry fails.
///
/// If the write fails nothing from it is kept; the entry is then marked
/// failed on its own so it does not stay in progress.
///
/// # Returns
///
/// `true` if the outcome was stored
pub fn record(storage: &mut dyn Storage, address: Ipv4Addr, result: Option<&ProbeResult>) -> bool {
    let outcome = match result {
        Some(result) => {
            let fingerprint = content_fingerprint(&result.body);
            let write = ProbeWrite {
                url: &result.url,
                domain: result.domain.as_deref(),
                title: result.title.as_deref(),
                description: result.description.as_deref(),
                status_code: result.status_code,
                response_time: result.response_time,
                server_info: result.server_info.as_deref(),
                content_type: result.content_type.as_deref(),
                content_fingerprint: &fingerprint,
                content_size: result.content_size,
                keywords: &result.keywords,
            };
            storage.record_success(address, &write).map(|_| ())
        }
        None => storage.record_failure(address),
    };

    match outcome {
        Ok(()) => true,
        Err(e) => {
            tracing::error!("Failed to store result for {}: {}", address, e);
            if let Err(e) = storage.mark_failed(address) {
                tracing::error!("Failed to mark {} as failed: {}", address, e);
            }
            false
        }
    }
}
