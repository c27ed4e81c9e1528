//! IKE sockets and the reference-counted socket pool
//!
//! Sockets are pooled per `(network, kind)`. Every user holds an [`OwnerId`]
//! issued by the [`SocketFactory`]; the platform socket is closed when the
//! last owner releases it.
//!
//! Inbound datagrams are demultiplexed by the local IKE SPI:
//!
//! ```text
//! datagram ─► strip Non-ESP marker (port 4500) ─► decode IKE header
//!          ─► local SPI ─► registered controller's event channel
//! ```

use super::event::{ConnectionEvent, EventSender};
use super::lock;
use crate::ipsec::{
    ikev2::IkeHeader,
    logging,
    metrics::ConnectionMetrics,
    nat::{frame_ike, EncapDatagram, IKE_PORT, NAT_KEEPALIVE_PACKET, NAT_T_PORT},
    Error, Result,
};
use bytes::Bytes;
use ikelink_platform::{
    AddressFamily, DatagramSocket, Network, PacketHandler, SocketProvider, SocketRequest,
};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::trace;

/// Socket flavor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocketKind {
    /// IPv4, server port 500
    PlainV4,
    /// IPv6, server port 500
    PlainV6,
    /// IPv4 with ESP-in-UDP encapsulation, server port 4500
    EncapV4,
    /// IPv6 talking to server port 4500 (no encapsulation)
    EncapV6WithPort,
}

impl SocketKind {
    /// Kind for a remote family and port choice
    pub fn select(is_ipv4: bool, use_encap_port: bool) -> Self {
        match (is_ipv4, use_encap_port) {
            (true, false) => SocketKind::PlainV4,
            (true, true) => SocketKind::EncapV4,
            (false, false) => SocketKind::PlainV6,
            (false, true) => SocketKind::EncapV6WithPort,
        }
    }

    /// Address family of the socket
    pub fn family(self) -> AddressFamily {
        match self {
            SocketKind::PlainV4 | SocketKind::EncapV4 => AddressFamily::Ipv4,
            SocketKind::PlainV6 | SocketKind::EncapV6WithPort => AddressFamily::Ipv6,
        }
    }

    /// Whether the server is reached on port 4500
    pub fn uses_encap_port(self) -> bool {
        matches!(self, SocketKind::EncapV4 | SocketKind::EncapV6WithPort)
    }

    /// Server port implied by the kind
    pub fn remote_port(self) -> u16 {
        if self.uses_encap_port() {
            NAT_T_PORT
        } else {
            IKE_PORT
        }
    }

    /// Only IPv4 encapsulation sockets carry NAT-T keepalives
    pub fn supports_keepalive(self) -> bool {
        matches!(self, SocketKind::EncapV4)
    }

    /// Short name for logs
    pub fn as_str(self) -> &'static str {
        match self {
            SocketKind::PlainV4 => "PlainV4",
            SocketKind::PlainV6 => "PlainV6",
            SocketKind::EncapV4 => "EncapV4",
            SocketKind::EncapV6WithPort => "EncapV6WithPort",
        }
    }
}

impl fmt::Display for SocketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a socket user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OwnerId(u64);

type SpiRoutes = Mutex<HashMap<u64, EventSender>>;

/// Split a received datagram into IKE header and IKE message
///
/// Returns `Ok(None)` for ESP packets and NAT keepalives arriving on an
/// encapsulation-port socket; those are not for the IKE session.
///
/// # Errors
///
/// Returns an error if the datagram is too short or the header is invalid
pub fn demultiplex(kind: SocketKind, datagram: &[u8]) -> Result<Option<(IkeHeader, &[u8])>> {
    let message = if kind.uses_encap_port() {
        match EncapDatagram::classify(datagram)? {
            EncapDatagram::Ike(message) => message,
            EncapDatagram::Esp(_) | EncapDatagram::Keepalive => return Ok(None),
        }
    } else {
        datagram
    };

    let header = IkeHeader::from_bytes(message)?;
    Ok(Some((header, message)))
}

fn dispatch(kind: SocketKind, routes: &SpiRoutes, metrics: &ConnectionMetrics, datagram: &[u8]) {
    let (header, message) = match demultiplex(kind, datagram) {
        Ok(Some(parsed)) => parsed,
        Ok(None) => {
            trace!(len = datagram.len(), "Non-IKE datagram ignored");
            return;
        }
        Err(e) => {
            metrics.record_packet_dropped();
            logging::log_packet_dropped(&e.to_string(), datagram.len());
            return;
        }
    };

    let spi = header.local_spi();
    let sender = lock(routes).get(&spi).cloned();
    let Some(sender) = sender else {
        metrics.record_packet_dropped();
        logging::log_packet_dropped("unknown SPI", datagram.len());
        return;
    };

    logging::log_packet_demuxed(spi, message.len());
    let event = ConnectionEvent::PacketReceived {
        header,
        packet: Bytes::copy_from_slice(message),
    };
    if sender.send(event).is_err() {
        metrics.record_packet_dropped();
        logging::log_packet_dropped("controller gone", datagram.len());
    }
}

/// A pooled UDP socket used by one or more IKE sessions
pub struct IkeSocket {
    kind: SocketKind,
    network: Network,
    inner: Box<dyn DatagramSocket>,
    routes: Arc<SpiRoutes>,
}

impl IkeSocket {
    /// Socket flavor
    pub fn kind(&self) -> SocketKind {
        self.kind
    }

    /// Network the socket is bound to
    pub fn network(&self) -> Network {
        self.network
    }

    /// Local address of the underlying socket
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.inner.local_addr()?)
    }

    /// Send an IKE message, adding the Non-ESP marker on port 4500
    pub fn send_ike(&self, message: &[u8], dest: SocketAddr) -> Result<()> {
        if self.kind.uses_encap_port() {
            self.inner
                .send_to(&frame_ike(message), dest)?;
        } else {
            self.inner.send_to(message, dest)?;
        }
        Ok(())
    }

    /// Send one NAT-keepalive octet
    pub fn send_keepalive(&self, dest: SocketAddr) -> Result<()> {
        self.inner.send_to(&NAT_KEEPALIVE_PACKET, dest)?;
        Ok(())
    }

    /// Route inbound packets for `spi` to `events`
    pub fn register_spi(&self, spi: u64, events: EventSender) {
        lock(&self.routes).insert(spi, events);
    }

    /// Stop routing inbound packets for `spi`
    pub fn unregister_spi(&self, spi: u64) {
        lock(&self.routes).remove(&spi);
    }

    /// Whether inbound packets for `spi` are routed
    pub fn is_registered(&self, spi: u64) -> bool {
        lock(&self.routes).contains_key(&spi)
    }
}

impl fmt::Debug for IkeSocket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IkeSocket")
            .field("kind", &self.kind)
            .field("network", &self.network)
            .finish_non_exhaustive()
    }
}

struct PooledSocket {
    socket: Arc<IkeSocket>,
    owners: HashSet<OwnerId>,
}

/// Opens, shares and closes IKE sockets
pub struct SocketFactory {
    provider: Arc<dyn SocketProvider>,
    pool: Mutex<HashMap<(Network, SocketKind), PooledSocket>>,
    next_owner: AtomicU64,
    metrics: ConnectionMetrics,
}

impl SocketFactory {
    /// Create a factory over a platform socket provider
    pub fn new(provider: Arc<dyn SocketProvider>) -> Self {
        SocketFactory {
            provider,
            pool: Mutex::new(HashMap::new()),
            next_owner: AtomicU64::new(1),
            metrics: ConnectionMetrics::new(),
        }
    }

    /// Metrics shared by every socket of this factory
    pub fn metrics(&self) -> &ConnectionMetrics {
        &self.metrics
    }

    /// Issue a new owner identity
    pub fn new_owner(&self) -> OwnerId {
        OwnerId(self.next_owner.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the `(network, kind)` socket for `owner`, opening it if needed
    ///
    /// # Errors
    ///
    /// Returns [`Error::SocketOpen`] if the platform cannot open the socket
    pub fn open(&self, network: Network, kind: SocketKind, owner: OwnerId) -> Result<Arc<IkeSocket>> {
        let mut pool = lock(&self.pool);
        if let Some(pooled) = pool.get_mut(&(network, kind)) {
            pooled.owners.insert(owner);
            return Ok(pooled.socket.clone());
        }

        let routes: Arc<SpiRoutes> = Arc::new(Mutex::new(HashMap::new()));
        let handler: PacketHandler = {
            let routes = routes.clone();
            let metrics = self.metrics.clone();
            Arc::new(move |datagram: &[u8]| dispatch(kind, &routes, &metrics, datagram))
        };

        let request = SocketRequest {
            network,
            family: kind.family(),
            udp_encap: kind == SocketKind::EncapV4,
        };
        let inner = self
            .provider
            .open(request, handler)
            .map_err(|e| Error::SocketOpen(format!("{} on {}: {}", kind, network, e)))?;

        let socket = Arc::new(IkeSocket {
            kind,
            network,
            inner,
            routes,
        });
        logging::log_socket_opened(network, kind.as_str(), socket.local_addr().ok());
        self.metrics.record_socket_opened();

        pool.insert(
            (network, kind),
            PooledSocket {
                socket: socket.clone(),
                owners: HashSet::from([owner]),
            },
        );
        Ok(socket)
    }

    /// Drop `owner`'s reference; returns true if the socket was closed
    pub fn release(&self, socket: &Arc<IkeSocket>, owner: OwnerId) -> bool {
        let mut pool = lock(&self.pool);
        let key = (socket.network, socket.kind);
        let Some(pooled) = pool.get_mut(&key) else {
            return false;
        };
        if !Arc::ptr_eq(&pooled.socket, socket) || !pooled.owners.remove(&owner) {
            return false;
        }
        if !pooled.owners.is_empty() {
            return false;
        }

        if let Some(pooled) = pool.remove(&key) {
            pooled.socket.inner.close();
            self.metrics.record_socket_closed();
            logging::log_socket_closed(socket.network, socket.kind.as_str());
        }
        true
    }

    /// Number of open platform sockets
    pub fn open_socket_count(&self) -> usize {
        lock(&self.pool).len()
    }

    /// Number of owners of the `(network, kind)` socket
    pub fn owner_count(&self, network: Network, kind: SocketKind) -> usize {
        lock(&self.pool)
            .get(&(network, kind))
            .map_or(0, |pooled| pooled.owners.len())
    }
}
