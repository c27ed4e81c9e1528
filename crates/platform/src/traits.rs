//! Collaborator interfaces the connection layer consumes from the platform

use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use crate::types::{CallbackId, LinkProperties, Network, NetworkEvent, NetworkRequest, SocketRequest};
use crate::PlatformResult;

/// Hostname resolution bound to a network
#[async_trait::async_trait]
pub trait DnsResolver: Send + Sync {
    /// Resolve all addresses of `hostname` on `network`
    ///
    /// An empty list is a valid answer; callers decide whether to retry.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup itself fails
    async fn resolve(&self, network: Network, hostname: &str) -> PlatformResult<Vec<IpAddr>>;
}

/// Source address selection
pub trait RouteLookup: Send + Sync {
    /// Pick the local address the kernel would use to reach `remote:port` on `network`
    ///
    /// # Errors
    ///
    /// Returns an error if no route exists
    fn select_local_address(
        &self,
        network: Network,
        remote: IpAddr,
        port: u16,
    ) -> PlatformResult<IpAddr>;
}

/// Callback invoked by the platform for every network notification
pub type NetworkCallback = Box<dyn Fn(NetworkEvent) + Send + Sync>;

/// Network state and change notifications
pub trait NetworkMonitor: Send + Sync {
    /// Current system default network, if any
    fn default_network(&self) -> Option<Network>;

    /// Link properties of `network`
    ///
    /// # Errors
    ///
    /// Returns an error if the network is unknown
    fn link_properties(&self, network: Network) -> PlatformResult<LinkProperties>;

    /// Register a callback for `request`
    ///
    /// # Errors
    ///
    /// Returns an error if the platform refuses the registration
    fn register_callback(
        &self,
        request: NetworkRequest,
        callback: NetworkCallback,
    ) -> PlatformResult<CallbackId>;

    /// Unregister a callback; unknown ids are ignored
    fn unregister_callback(&self, id: CallbackId);
}

/// Handler invoked with every datagram a socket receives
pub type PacketHandler = Arc<dyn Fn(&[u8]) + Send + Sync>;

/// A bound UDP socket owned by the platform
pub trait DatagramSocket: Send + Sync {
    /// Send one datagram without blocking
    ///
    /// # Errors
    ///
    /// Returns the OS error if the datagram could not be queued
    fn send_to(&self, buf: &[u8], dest: SocketAddr) -> io::Result<usize>;

    /// Local address the socket is bound to
    ///
    /// # Errors
    ///
    /// Returns the OS error if the socket is closed
    fn local_addr(&self) -> io::Result<SocketAddr>;

    /// Close the socket and stop delivering packets
    fn close(&self);
}

/// Factory for platform UDP sockets
pub trait SocketProvider: Send + Sync {
    /// Open a socket for `request`; every received datagram is passed to `on_packet`
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot be created, configured or bound
    fn open(
        &self,
        request: SocketRequest,
        on_packet: PacketHandler,
    ) -> PlatformResult<Box<dyn DatagramSocket>>;
}
