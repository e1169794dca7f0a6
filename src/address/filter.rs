use ipnetwork::Ipv4Network;
use std::net::Ipv4Addr;
use std::sync::LazyLock;

/// Blocks that never carry public HTTP servers, as (network, prefix length)
///
/// Covers the IANA special-purpose registry entries that `Ipv4Addr` has no
/// stable predicate for, alongside the ones it does.
const NON_GLOBAL_BLOCKS: &[(Ipv4Addr, u8)] = &[
    (Ipv4Addr::new(0, 0, 0, 0), 8),       // "this network"
    (Ipv4Addr::new(10, 0, 0, 0), 8),      // private
    (Ipv4Addr::new(100, 64, 0, 0), 10),   // shared address space (CGNAT)
    (Ipv4Addr::new(127, 0, 0, 0), 8),     // loopback
    (Ipv4Addr::new(169, 254, 0, 0), 16),  // link-local
    (Ipv4Addr::new(172, 16, 0, 0), 12),   // private
    (Ipv4Addr::new(192, 0, 0, 0), 24),    // IETF protocol assignments
    (Ipv4Addr::new(192, 0, 2, 0), 24),    // TEST-NET-1
    (Ipv4Addr::new(192, 168, 0, 0), 16),  // private
    (Ipv4Addr::new(198, 18, 0, 0), 15),   // benchmarking
    (Ipv4Addr::new(198, 51, 100, 0), 24), // TEST-NET-2
    (Ipv4Addr::new(203, 0, 113, 0), 24),  // TEST-NET-3
    (Ipv4Addr::new(224, 0, 0, 0), 4),     // multicast
    (Ipv4Addr::new(240, 0, 0, 0), 4),     // reserved, includes limited broadcast
];

static NON_GLOBAL_NETWORKS: LazyLock<Vec<Ipv4Network>> = LazyLock::new(|| {
    NON_GLOBAL_BLOCKS
        .iter()
        .map(|&(network, prefix)| {
            Ipv4Network::new(network, prefix).expect("non-global block prefixes are at most 32")
        })
        .collect()
});

/// Returns true if the address is globally routable
///
/// Rejects private, loopback, link-local, multicast, documentation,
/// benchmarking, shared and reserved ranges.
///
/// # Examples
///
/// ```
/// use std::net::Ipv4Addr;
/// use netsift::address::is_globally_routable;
///
/// assert!(is_globally_routable(Ipv4Addr::new(93, 184, 216, 34)));
/// assert!(!is_globally_routable(Ipv4Addr::new(192, 168, 1, 10)));
/// ```
pub fn is_globally_routable(addr: Ipv4Addr) -> bool {
    if addr.is_private()
        || addr.is_loopback()
        || addr.is_link_local()
        || addr.is_multicast()
        || addr.is_broadcast()
        || addr.is_documentation()
        || addr.is_unspecified()
    {
        return false;
    }

    !NON_GLOBAL_NETWORKS
        .iter()
        .any(|network| network.contains(addr))
}

/// Returns true if the address should be probed
///
/// On top of routability, skips addresses ending in .0 or .255, which are
/// usually subnet or broadcast addresses.
pub fn is_candidate(addr: Ipv4Addr) -> bool {
    let last = addr.octets()[3];
    last != 0 && last != 255 && is_globally_routable(addr)
}
