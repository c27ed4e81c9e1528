//! Host implementations of the platform interfaces
//!
//! - [`SystemDnsResolver`]: tokio `lookup_host`
//! - [`SystemRouteLookup`]: connected UDP probe, the kernel picks the source address
//! - [`SystemSocketProvider`]: tokio `UdpSocket` with one receive task per socket
//! - [`ManualNetworkMonitor`]: in-process network state driven by the embedder
//!
//! A plain host has a single routing namespace, so the `Network` argument
//! only matters to [`ManualNetworkMonitor`].

use super::controller::ConnectionDependencies;
use super::lock;
use super::socket::SocketFactory;
use ikelink_platform::{
    AddressFamily, CallbackId, DatagramSocket, DnsResolver, LinkProperties, Network,
    NetworkCallback, NetworkEvent, NetworkMonitor, NetworkRequest, PacketHandler, PlatformError,
    PlatformResult, RouteLookup, SocketProvider, SocketRequest,
};
use std::collections::HashMap;
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::UdpSocket;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Network handle used for the host's only network
pub const HOST_NETWORK: Network = Network::new(0);

const MAX_DATAGRAM_SIZE: usize = 65535;

fn unspecified(family: AddressFamily) -> IpAddr {
    match family {
        AddressFamily::Ipv4 => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        AddressFamily::Ipv6 => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
    }
}

/// DNS through the host resolver
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemDnsResolver;

#[async_trait::async_trait]
impl DnsResolver for SystemDnsResolver {
    async fn resolve(&self, _network: Network, hostname: &str) -> PlatformResult<Vec<IpAddr>> {
        let addrs = tokio::net::lookup_host((hostname, 0))
            .await
            .map_err(|e| PlatformError::Dns(format!("{}: {}", hostname, e)))?;
        Ok(addrs.map(|addr| addr.ip()).collect())
    }
}

/// Source address selection through the host routing table
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRouteLookup;

impl RouteLookup for SystemRouteLookup {
    fn select_local_address(
        &self,
        _network: Network,
        remote: IpAddr,
        port: u16,
    ) -> PlatformResult<IpAddr> {
        // Connecting a UDP socket sends nothing; it only resolves the route
        let probe = std::net::UdpSocket::bind(SocketAddr::new(
            unspecified(AddressFamily::of(&remote)),
            0,
        ))?;
        probe
            .connect(SocketAddr::new(remote, port))
            .map_err(|e| PlatformError::NoRoute(format!("{}:{}: {}", remote, port, e)))?;
        Ok(probe.local_addr()?.ip())
    }
}

/// UDP sockets on the host stack
///
/// Sockets bind an ephemeral port. NAT-T framing is done in user space, so
/// `udp_encap` needs no kernel support here.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemSocketProvider;

impl SocketProvider for SystemSocketProvider {
    fn open(
        &self,
        request: SocketRequest,
        on_packet: PacketHandler,
    ) -> PlatformResult<Box<dyn DatagramSocket>> {
        let runtime = Handle::try_current()
            .map_err(|_| PlatformError::Socket("no tokio runtime".into()))?;

        let std_socket =
            std::net::UdpSocket::bind(SocketAddr::new(unspecified(request.family), 0))?;
        std_socket.set_nonblocking(true)?;
        let sender = std_socket.try_clone()?;
        let socket = {
            let _guard = runtime.enter();
            Arc::new(UdpSocket::from_std(std_socket)?)
        };

        let receiver = {
            let socket = socket.clone();
            runtime.spawn(async move {
                let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
                loop {
                    match socket.recv_from(&mut buf).await {
                        Ok((len, _from)) => on_packet(&buf[..len]),
                        // ICMP errors from earlier sends surface here
                        Err(e)
                            if matches!(
                                e.kind(),
                                io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionRefused
                            ) =>
                        {
                            debug!(error = %e, "UDP receive error ignored");
                        }
                        Err(e) => {
                            warn!(error = %e, "UDP receive loop stopped");
                            break;
                        }
                    }
                }
            })
        };

        debug!(network = %request.network, family = ?request.family, "System UDP socket opened");
        Ok(Box::new(SystemSocket {
            sender,
            socket,
            receiver,
        }))
    }
}

struct SystemSocket {
    // Non-blocking handle for sends; tokio readiness is only known after a driver turn
    sender: std::net::UdpSocket,
    socket: Arc<UdpSocket>,
    receiver: JoinHandle<()>,
}

impl DatagramSocket for SystemSocket {
    fn send_to(&self, buf: &[u8], dest: SocketAddr) -> io::Result<usize> {
        self.sender.send_to(buf, dest)
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        self.sender.local_addr()
    }

    fn close(&self) {
        self.receiver.abort();
    }
}

impl Drop for SystemSocket {
    fn drop(&mut self) {
        self.receiver.abort();
    }
}

type SharedCallback = Arc<dyn Fn(NetworkEvent) + Send + Sync>;

#[derive(Default)]
struct MonitorState {
    default_network: Option<Network>,
    links: HashMap<Network, LinkProperties>,
    callbacks: HashMap<u64, (NetworkRequest, SharedCallback)>,
}

/// Network monitor whose state is pushed in by the embedder
///
/// Callbacks run synchronously inside [`push`](ManualNetworkMonitor::push).
#[derive(Default)]
pub struct ManualNetworkMonitor {
    state: Mutex<MonitorState>,
    next_id: AtomicU64,
}

impl ManualNetworkMonitor {
    /// Create a monitor with no networks
    pub fn new() -> Self {
        Self::default()
    }

    /// Monitor with [`HOST_NETWORK`] as default, its addresses probed from the routing table
    pub fn host() -> Self {
        let routes = SystemRouteLookup;
        let probes: [IpAddr; 2] = [
            IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)),
            IpAddr::V6(Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1)),
        ];
        let addresses = probes
            .iter()
            .filter_map(|remote| routes.select_local_address(HOST_NETWORK, *remote, 500).ok());

        let monitor = Self::new();
        monitor.add_network(HOST_NETWORK, LinkProperties::with_addresses(addresses));
        monitor.set_default_network(Some(HOST_NETWORK));
        monitor
    }

    /// Make a network known without notifying anyone
    pub fn add_network(&self, network: Network, link: LinkProperties) {
        lock(&self.state).links.insert(network, link);
    }

    /// Change the default network without notifying anyone
    pub fn set_default_network(&self, network: Option<Network>) {
        lock(&self.state).default_network = network;
    }

    /// Number of registered callbacks
    pub fn callback_count(&self) -> usize {
        lock(&self.state).callbacks.len()
    }

    /// Apply a platform event and deliver it to matching callbacks
    ///
    /// `Available` makes the network the default, `LinkPropertiesChanged`
    /// replaces its addresses and `Lost` forgets it.
    pub fn push(&self, event: NetworkEvent) {
        let targets: Vec<SharedCallback> = {
            let mut state = lock(&self.state);
            let (network, for_default) = match &event {
                NetworkEvent::Available(network) => {
                    state.links.entry(*network).or_default();
                    state.default_network = Some(*network);
                    (*network, true)
                }
                NetworkEvent::LinkPropertiesChanged(network, link) => {
                    state.links.insert(*network, link.clone());
                    (*network, state.default_network == Some(*network))
                }
                NetworkEvent::Lost(network) => {
                    state.links.remove(network);
                    let was_default = state.default_network == Some(*network);
                    if was_default {
                        state.default_network = None;
                    }
                    (*network, was_default)
                }
            };

            state
                .callbacks
                .values()
                .filter(|(request, _)| match request {
                    NetworkRequest::Specific(tracked) => *tracked == network,
                    NetworkRequest::Default => for_default,
                })
                .map(|(_, callback)| callback.clone())
                .collect()
        };

        for callback in targets {
            callback(event.clone());
        }
    }
}

impl NetworkMonitor for ManualNetworkMonitor {
    fn default_network(&self) -> Option<Network> {
        lock(&self.state).default_network
    }

    fn link_properties(&self, network: Network) -> PlatformResult<LinkProperties> {
        lock(&self.state)
            .links
            .get(&network)
            .cloned()
            .ok_or_else(|| PlatformError::NetworkUnavailable(network.to_string()))
    }

    fn register_callback(
        &self,
        request: NetworkRequest,
        callback: NetworkCallback,
    ) -> PlatformResult<CallbackId> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.state)
            .callbacks
            .insert(id, (request, Arc::from(callback)));
        Ok(CallbackId(id))
    }

    fn unregister_callback(&self, id: CallbackId) {
        lock(&self.state).callbacks.remove(&id.0);
    }
}

impl ConnectionDependencies {
    /// Host defaults: system DNS, routing and UDP sockets on [`HOST_NETWORK`]
    pub fn system() -> Self {
        Self::system_with_monitor(Arc::new(ManualNetworkMonitor::host()))
    }

    /// Host DNS, routing and sockets with an embedder-driven network monitor
    pub fn system_with_monitor(networks: Arc<ManualNetworkMonitor>) -> Self {
        ConnectionDependencies {
            resolver: Arc::new(SystemDnsResolver),
            routes: Arc::new(SystemRouteLookup),
            networks,
            sockets: Arc::new(SocketFactory::new(Arc::new(SystemSocketProvider))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    const WIFI: Network = Network::new(1);
    const CELL: Network = Network::new(2);

    #[test]
    fn test_manual_monitor_state() {
        let monitor = ManualNetworkMonitor::new();
        assert_eq!(monitor.default_network(), None);
        assert!(monitor.link_properties(WIFI).is_err());

        monitor.push(NetworkEvent::Available(WIFI));
        assert_eq!(monitor.default_network(), Some(WIFI));
        assert!(monitor.link_properties(WIFI).unwrap().addresses.is_empty());

        let link = LinkProperties::with_addresses(["2001:db8::2".parse().unwrap()]);
        monitor.push(NetworkEvent::LinkPropertiesChanged(WIFI, link.clone()));
        assert_eq!(monitor.link_properties(WIFI).unwrap(), link);

        monitor.push(NetworkEvent::Lost(WIFI));
        assert_eq!(monitor.default_network(), None);
    }

    #[test]
    fn test_manual_monitor_delivery() {
        let monitor = ManualNetworkMonitor::new();
        monitor.add_network(WIFI, LinkProperties::default());
        monitor.set_default_network(Some(WIFI));

        let specific = Arc::new(AtomicUsize::new(0));
        let default = Arc::new(AtomicUsize::new(0));
        {
            let specific = specific.clone();
            monitor
                .register_callback(
                    NetworkRequest::Specific(CELL),
                    Box::new(move |_| {
                        specific.fetch_add(1, Ordering::SeqCst);
                    }),
                )
                .unwrap();
        }
        let id = {
            let default = default.clone();
            monitor
                .register_callback(
                    NetworkRequest::Default,
                    Box::new(move |_| {
                        default.fetch_add(1, Ordering::SeqCst);
                    }),
                )
                .unwrap()
        };

        // CELL becomes default: both hear about it
        monitor.push(NetworkEvent::Available(CELL));
        assert_eq!(specific.load(Ordering::SeqCst), 1);
        assert_eq!(default.load(Ordering::SeqCst), 1);

        // WIFI is no longer default
        monitor.push(NetworkEvent::Lost(WIFI));
        assert_eq!(default.load(Ordering::SeqCst), 1);

        monitor.unregister_callback(id);
        monitor.push(NetworkEvent::Lost(CELL));
        assert_eq!(specific.load(Ordering::SeqCst), 2);
        assert_eq!(default.load(Ordering::SeqCst), 1);
        assert_eq!(monitor.callback_count(), 1);
    }

    #[test]
    fn test_route_lookup_loopback() {
        let local = SystemRouteLookup
            .select_local_address(HOST_NETWORK, "127.0.0.1".parse().unwrap(), 500)
            .unwrap();
        assert!(local.is_loopback());
    }

    #[tokio::test]
    async fn test_system_dns_resolves_literal() {
        let addrs = SystemDnsResolver
            .resolve(HOST_NETWORK, "127.0.0.1")
            .await
            .unwrap();
        assert_eq!(addrs, vec!["127.0.0.1".parse::<IpAddr>().unwrap()]);
    }

    #[tokio::test]
    async fn test_system_socket_round_trip() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let handler: PacketHandler = {
            let received = received.clone();
            Arc::new(move |data: &[u8]| lock(&received).push(data.to_vec()))
        };
        let socket = SystemSocketProvider
            .open(
                SocketRequest {
                    network: HOST_NETWORK,
                    family: AddressFamily::Ipv4,
                    udp_encap: false,
                },
                handler,
            )
            .unwrap();
        let port = socket.local_addr().unwrap().port();

        let peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        peer.send_to(b"hello", ("127.0.0.1", port)).await.unwrap();

        let mut buf = [0u8; 16];
        socket
            .send_to(b"world", peer.local_addr().unwrap())
            .unwrap();
        let (len, _) = peer.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..len], b"world");

        for _ in 0..100 {
            if !lock(&received).is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(lock(&received).as_slice(), &[b"hello".to_vec()]);
        socket.close();
    }

    #[test]
    fn test_socket_provider_outside_runtime() {
        let result = SystemSocketProvider.open(
            SocketRequest {
                network: HOST_NETWORK,
                family: AddressFamily::Ipv4,
                udp_encap: false,
            },
            Arc::new(|_: &[u8]| {}),
        );
        assert!(matches!(result, Err(PlatformError::Socket(_))));
    }
}
