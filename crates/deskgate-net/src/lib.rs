//! Local network address resolution.
//!
//! Finds the LAN-reachable IPv4 address of the host so the gateway can
//! advertise URLs that other devices on the same network can open. When no
//! usable interface exists the resolver degrades to `localhost` rather than
//! failing; same-machine access keeps working.

use std::net::{IpAddr, Ipv4Addr};

/// Address reported when no LAN-reachable interface exists.
const FALLBACK_ADDRESS: &str = "localhost";

/// Interface name prefixes for physical adapters, preferred over everything
/// else. Covers the common Linux/macOS/Windows wireless and wired names.
const PRIORITY_PREFIXES: &[&str] = &["wlan", "wlp", "wl", "en", "eth", "Wi-Fi", "Ethernet"];

/// Interface name prefixes for virtual adapters, considered last.
const VIRTUAL_PREFIXES: &[&str] = &[
    "docker", "veth", "br-", "virbr", "vbox", "vmnet", "utun", "tun", "tap", "zt", "tailscale",
];

/// A LAN-reachable address of the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkAddress {
    /// IPv4 address in dotted form, or `localhost` for the fallback.
    pub address: String,
    /// Name of the interface the address belongs to (empty for the fallback).
    pub interface: String,
    /// Whether the address is only reachable from this machine.
    pub internal: bool,
}

impl NetworkAddress {
    /// Loopback fallback used when no candidate interface exists.
    #[must_use]
    pub fn fallback() -> Self {
        Self {
            address: FALLBACK_ADDRESS.to_owned(),
            interface: String::new(),
            internal: true,
        }
    }

    /// Whether this is the loopback fallback rather than a LAN address.
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.internal
    }

    /// HTTP origin for this address at the given port.
    #[must_use]
    pub fn http_origin(&self, port: u16) -> String {
        format!("http://{}:{port}", self.address)
    }
}

/// One enumerated interface address, before selection.
#[derive(Debug, Clone)]
struct Candidate {
    name: String,
    ip: IpAddr,
    loopback: bool,
}

/// Resolve the host's LAN-reachable IPv4 address.
///
/// Enumerates all network interfaces and picks the best non-loopback IPv4
/// address: physical adapters win over virtual ones, common private LAN
/// ranges win within a tier, and discovery order breaks remaining ties.
/// Returns [`NetworkAddress::fallback`] when nothing qualifies; enumeration
/// failure degrades the same way instead of surfacing an error.
#[must_use]
pub fn resolve_local_address() -> NetworkAddress {
    let candidates = match get_if_addrs::get_if_addrs() {
        Ok(interfaces) => interfaces
            .into_iter()
            .map(|iface| {
                let ip = iface.ip();
                let loopback = iface.is_loopback();
                Candidate {
                    name: iface.name,
                    ip,
                    loopback,
                }
            })
            .collect(),
        Err(err) => {
            tracing::warn!(error = %err, "Failed to enumerate network interfaces");
            Vec::new()
        }
    };

    select_address(candidates)
}

/// Pick the best address from an enumerated candidate list.
fn select_address(candidates: Vec<Candidate>) -> NetworkAddress {
    let best = candidates
        .into_iter()
        .enumerate()
        .filter_map(|(index, candidate)| match candidate.ip {
            IpAddr::V4(addr) if !candidate.loopback && !addr.is_loopback() => {
                Some((index, candidate.name, addr))
            }
            _ => None,
        })
        .min_by_key(|(index, name, addr)| (name_rank(name), range_rank(*addr), *index));

    match best {
        Some((_, interface, addr)) => NetworkAddress {
            address: addr.to_string(),
            interface,
            internal: false,
        },
        None => NetworkAddress::fallback(),
    }
}

/// Rank an interface by name: physical adapters first, virtual adapters last.
fn name_rank(name: &str) -> u8 {
    if VIRTUAL_PREFIXES.iter().any(|prefix| name.starts_with(prefix)) {
        2
    } else if PRIORITY_PREFIXES.iter().any(|prefix| name.starts_with(prefix)) {
        0
    } else {
        1
    }
}

/// Rank an IPv4 address by range, common private LAN ranges first.
fn range_rank(addr: Ipv4Addr) -> u8 {
    let octets = addr.octets();
    if octets[0] == 192 && octets[1] == 168 {
        0
    } else if octets[0] == 10 {
        1
    } else if octets[0] == 172 && (16..=31).contains(&octets[1]) {
        2
    } else {
        3
    }
}
