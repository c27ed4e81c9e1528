//! Platform value types shared between the platform and protocol crates

use std::fmt;
use std::net::{IpAddr, Ipv6Addr};

/// Opaque handle of a platform network (Wi-Fi, cellular, VPN, ...)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Network(u64);

impl Network {
    /// Create a network handle from its raw platform identifier
    pub const fn new(handle: u64) -> Self {
        Network(handle)
    }

    /// Raw platform identifier
    pub const fn handle(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "net#{}", self.0)
    }
}

/// IP address family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AddressFamily {
    /// IPv4
    Ipv4,
    /// IPv6
    Ipv6,
}

impl AddressFamily {
    /// Family of the given address
    pub fn of(addr: &IpAddr) -> Self {
        match addr {
            IpAddr::V4(_) => AddressFamily::Ipv4,
            IpAddr::V6(_) => AddressFamily::Ipv6,
        }
    }
}

/// Addresses configured on the link backing a network
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LinkProperties {
    /// Interface name, if known
    pub interface: Option<String>,

    /// Local addresses assigned to the link
    pub addresses: Vec<IpAddr>,
}

impl LinkProperties {
    /// Create link properties from a list of addresses
    pub fn with_addresses(addresses: impl IntoIterator<Item = IpAddr>) -> Self {
        LinkProperties {
            interface: None,
            addresses: addresses.into_iter().collect(),
        }
    }

    /// Check whether the link carries the given local address
    pub fn has_address(&self, addr: &IpAddr) -> bool {
        self.addresses.contains(addr)
    }

    /// Check whether the link has a globally routable IPv6 address
    ///
    /// Loopback, unspecified, multicast, link-local (fe80::/10), unique local
    /// (fc00::/7) and IPv4-mapped addresses do not count.
    pub fn has_global_ipv6(&self) -> bool {
        self.addresses.iter().any(|addr| match addr {
            IpAddr::V6(v6) => is_global_ipv6(v6),
            IpAddr::V4(_) => false,
        })
    }
}

fn is_global_ipv6(addr: &Ipv6Addr) -> bool {
    let first = addr.segments()[0];
    !(addr.is_unspecified()
        || addr.is_loopback()
        || addr.is_multicast()
        || (first & 0xffc0) == 0xfe80
        || (first & 0xfe00) == 0xfc00
        || addr.to_ipv4_mapped().is_some())
}

/// What a network callback should track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkRequest {
    /// Events for one specific network
    Specific(Network),

    /// Events for whichever network is the system default
    Default,
}

/// Raw network notification delivered by the platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkEvent {
    /// A network became available (for default requests: became the default)
    Available(Network),

    /// The addresses of a network changed
    LinkPropertiesChanged(Network, LinkProperties),

    /// A network was lost
    Lost(Network),
}

/// Identifier of a registered network callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackId(pub u64);

/// Parameters for opening a UDP socket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocketRequest {
    /// Network the socket is bound to
    pub network: Network,

    /// Address family of the socket
    pub family: AddressFamily,

    /// Enable kernel ESP-in-UDP encapsulation on the socket
    pub udp_encap: bool,
}
