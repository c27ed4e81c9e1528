//! # ikelink Platform
//!
//! Platform abstractions consumed by the ikelink IKE connection layer.
//!
//! This crate provides:
//! - Unified error types (`PlatformError`, `PlatformResult`)
//! - Collaborator traits (`DnsResolver`, `RouteLookup`, `NetworkMonitor`,
//!   `SocketProvider`, `DatagramSocket`)
//! - Value types (`Network`, `LinkProperties`, `NetworkEvent`, ...)
//!
//! Nothing in here is global: every collaborator is an object handed to the
//! connection controller at construction time.
//!
//! # Examples
//!
//! ```
//! use ikelink_platform::{LinkProperties, Network, PlatformResult};
//!
//! fn wifi_link() -> PlatformResult<(Network, LinkProperties)> {
//!     let link = LinkProperties::with_addresses(vec!["2001:db8::20".parse().unwrap()]);
//!     Ok((Network::new(100), link))
//! }
//!
//! # fn main() -> PlatformResult<()> {
//! let (network, link) = wifi_link()?;
//! assert_eq!(network.handle(), 100);
//! assert!(link.has_global_ipv6());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod error;
pub mod traits;
pub mod types;

pub use error::{PlatformError, PlatformResult};
pub use traits::{
    DatagramSocket, DnsResolver, NetworkCallback, NetworkMonitor, PacketHandler, RouteLookup,
    SocketProvider,
};
pub use types::{
    AddressFamily, CallbackId, LinkProperties, Network, NetworkEvent, NetworkRequest,
    SocketRequest,
};

/// Platform version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
