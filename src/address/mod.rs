//! Candidate address handling for Netsift
//!
//! This module provides network-prefix parsing, the global-routability filter,
//! and the random candidate generator that seeds the task queue.

mod filter;
mod generator;

use crate::{AddressError, AddressResult};
use ipnetwork::{IpNetwork, Ipv4Network};

// Re-export main functions
pub use filter::{is_candidate, is_globally_routable};
pub use generator::generate_candidates;

/// Prefix scanned when the operator does not name one
pub const DEFAULT_NETWORK: &str = "0.0.0.0/0";

/// Parses an IPv4 CIDR prefix
///
/// A bare address is accepted as a /32. IPv6 prefixes are rejected.
///
/// # Examples
///
/// ```
/// use netsift::address::parse_network;
///
/// let net = parse_network("8.8.8.0/24").unwrap();
/// assert_eq!(net.prefix(), 24);
/// assert!(parse_network("2001:db8::/32").is_err());
/// ```
pub fn parse_network(input: &str) -> AddressResult<Ipv4Network> {
    let trimmed = input.trim();
    let network: IpNetwork = trimmed
        .parse()
        .map_err(|e: ipnetwork::IpNetworkError| AddressError::InvalidNetwork {
            input: trimmed.to_string(),
            message: e.to_string(),
        })?;

    match network {
        IpNetwork::V4(v4) => Ok(v4),
        IpNetwork::V6(_) => Err(AddressError::NotIpv4(trimmed.to_string())),
    }
}
