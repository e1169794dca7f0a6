use crate::address::filter::is_candidate;
use ipnetwork::Ipv4Network;
use rand::Rng;
use std::collections::HashSet;
use std::net::Ipv4Addr;

/// Draws per requested candidate before giving up
const ATTEMPTS_PER_CANDIDATE: usize = 20;

/// Generates up to `count` unique random candidates inside `network`
///
/// Uses rejection sampling: a uniformly random address in the prefix is drawn
/// and kept only if it passes [`is_candidate`]. After `20 × count` draws the
/// partial set is returned and a warning is logged, which happens for small
/// or mostly non-routable prefixes.
///
/// # Arguments
///
/// * `network` - The prefix to sample from
/// * `count` - Desired number of candidates
///
/// # Returns
///
/// A set of at most `count` candidate addresses
pub fn generate_candidates(network: Ipv4Network, count: usize) -> HashSet<Ipv4Addr> {
    let mut candidates = HashSet::with_capacity(count);
    if count == 0 {
        return candidates;
    }

    let first = u32::from(network.network());
    let last = u32::from(network.broadcast());
    let budget = count.saturating_mul(ATTEMPTS_PER_CANDIDATE);

    let mut rng = rand::thread_rng();
    let mut attempts = 0;

    while candidates.len() < count && attempts < budget {
        attempts += 1;
        let addr = Ipv4Addr::from(rng.gen_range(first..=last));
        if is_candidate(addr) {
            candidates.insert(addr);
        }
    }

    if candidates.len() < count {
        tracing::warn!(
            "Candidate generation for {} exhausted {} attempts: found {} of {} requested",
            network,
            attempts,
            candidates.len(),
            count
        );
    }

    candidates
}
