//! Scripted platform collaborators for unit tests

use super::controller::{ConnectionDependencies, IkeConnectionCallback};
use super::lock;
use super::socket::SocketFactory;
use super::system::ManualNetworkMonitor;
use crate::ipsec::ikev2::{ExchangeType, IkeFlags, IkeHeader, IKE_HEADER_SIZE};
use crate::ipsec::Error;
use bytes::Bytes;
use ikelink_platform::{
    AddressFamily, CallbackId, DatagramSocket, DnsResolver, LinkProperties, Network,
    NetworkCallback, NetworkMonitor, NetworkRequest, PacketHandler, PlatformError,
    PlatformResult, RouteLookup, SocketProvider, SocketRequest,
};
use std::collections::{HashMap, VecDeque};
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Build a bare 28-byte IKE_SA_INIT message
pub(crate) fn ike_packet(spi_i: u64, spi_r: u64, flags: u8) -> Vec<u8> {
    IkeHeader {
        initiator_spi: spi_i,
        responder_spi: spi_r,
        next_payload: 0,
        exchange_type: ExchangeType::IkeSaInit,
        flags: IkeFlags::new(flags),
        message_id: 0,
        length: IKE_HEADER_SIZE as u32,
    }
    .to_bytes()
    .to_vec()
}

/// DNS answering from a script, then with a fixed answer
pub(crate) struct ScriptedResolver {
    script: Mutex<VecDeque<PlatformResult<Vec<IpAddr>>>>,
    answer: Mutex<Vec<IpAddr>>,
    calls: AtomicUsize,
}

impl ScriptedResolver {
    pub(crate) fn answering(answer: Vec<IpAddr>) -> Self {
        ScriptedResolver {
            script: Mutex::new(VecDeque::new()),
            answer: Mutex::new(answer),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn push(&self, result: PlatformResult<Vec<IpAddr>>) {
        lock(&self.script).push_back(result);
    }

    pub(crate) fn set_answer(&self, answer: Vec<IpAddr>) {
        *lock(&self.answer) = answer;
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl DnsResolver for ScriptedResolver {
    async fn resolve(&self, _network: Network, _hostname: &str) -> PlatformResult<Vec<IpAddr>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let scripted = lock(&self.script).pop_front();
        match scripted {
            Some(result) => result,
            None => Ok(lock(&self.answer).clone()),
        }
    }
}

/// Route table keyed by network and family
pub(crate) struct StaticRoutes {
    routes: Mutex<HashMap<(Network, AddressFamily), IpAddr>>,
    overrides: Mutex<HashMap<Network, IpAddr>>,
    calls: AtomicUsize,
}

impl StaticRoutes {
    pub(crate) fn new() -> Self {
        StaticRoutes {
            routes: Mutex::new(HashMap::new()),
            overrides: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn set(&self, network: Network, local: IpAddr) {
        lock(&self.routes).insert((network, AddressFamily::of(&local)), local);
    }

    pub(crate) fn remove(&self, network: Network, family: AddressFamily) {
        lock(&self.routes).remove(&(network, family));
    }

    /// Answer `local` for every remote on `network`, whatever its family
    pub(crate) fn set_override(&self, network: Network, local: IpAddr) {
        lock(&self.overrides).insert(network, local);
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RouteLookup for StaticRoutes {
    fn select_local_address(
        &self,
        network: Network,
        remote: IpAddr,
        _port: u16,
    ) -> PlatformResult<IpAddr> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(local) = lock(&self.overrides).get(&network) {
            return Ok(*local);
        }
        lock(&self.routes)
            .get(&(network, AddressFamily::of(&remote)))
            .copied()
            .ok_or_else(|| PlatformError::NoRoute(remote.to_string()))
    }
}

/// Record of one socket opened through [`MockSocketProvider`]
pub(crate) struct MockSocketRecord {
    pub(crate) request: SocketRequest,
    sent: Mutex<Vec<(Vec<u8>, SocketAddr)>>,
    closed: AtomicBool,
    send_failing: AtomicBool,
    handler: PacketHandler,
}

impl MockSocketRecord {
    pub(crate) fn sent(&self) -> Vec<(Vec<u8>, SocketAddr)> {
        lock(&self.sent).clone()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub(crate) fn set_send_failing(&self, failing: bool) {
        self.send_failing.store(failing, Ordering::SeqCst);
    }

    /// Hand a datagram to the socket's receive handler
    pub(crate) fn deliver(&self, datagram: &[u8]) {
        (self.handler)(datagram);
    }
}

struct MockSocket(Arc<MockSocketRecord>);

impl DatagramSocket for MockSocket {
    fn send_to(&self, buf: &[u8], dest: SocketAddr) -> io::Result<usize> {
        if self.0.send_failing.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::Other, "network unreachable"));
        }
        lock(&self.0.sent).push((buf.to_vec(), dest));
        Ok(buf.len())
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        Ok(match self.0.request.family {
            AddressFamily::Ipv4 => "0.0.0.0:41000".parse().expect("valid literal"),
            AddressFamily::Ipv6 => "[::]:41000".parse().expect("valid literal"),
        })
    }

    fn close(&self) {
        self.0.closed.store(true, Ordering::SeqCst);
    }
}

/// Socket provider that records every socket it opens
pub(crate) struct MockSocketProvider {
    sockets: Mutex<Vec<Arc<MockSocketRecord>>>,
    fail_next: AtomicBool,
}

impl MockSocketProvider {
    pub(crate) fn new() -> Self {
        MockSocketProvider {
            sockets: Mutex::new(Vec::new()),
            fail_next: AtomicBool::new(false),
        }
    }

    pub(crate) fn fail_next_open(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// Sockets opened so far
    pub(crate) fn opened(&self) -> usize {
        lock(&self.sockets).len()
    }

    /// Sockets opened and not yet closed
    pub(crate) fn open_now(&self) -> usize {
        lock(&self.sockets).iter().filter(|s| !s.is_closed()).count()
    }

    pub(crate) fn socket(&self, index: usize) -> Arc<MockSocketRecord> {
        lock(&self.sockets)[index].clone()
    }

    pub(crate) fn last(&self) -> Arc<MockSocketRecord> {
        let sockets = lock(&self.sockets);
        sockets[sockets.len() - 1].clone()
    }
}

impl SocketProvider for MockSocketProvider {
    fn open(
        &self,
        request: SocketRequest,
        on_packet: PacketHandler,
    ) -> PlatformResult<Box<dyn DatagramSocket>> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(PlatformError::Socket("too many open files".into()));
        }
        let record = Arc::new(MockSocketRecord {
            request,
            sent: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
            send_failing: AtomicBool::new(false),
            handler: on_packet,
        });
        lock(&self.sockets).push(record.clone());
        Ok(Box::new(MockSocket(record)))
    }
}

/// Monitor that answers queries but refuses every callback registration
pub(crate) struct RefusingMonitor(pub(crate) Arc<ManualNetworkMonitor>);

impl NetworkMonitor for RefusingMonitor {
    fn default_network(&self) -> Option<Network> {
        self.0.default_network()
    }

    fn link_properties(&self, network: Network) -> PlatformResult<LinkProperties> {
        self.0.link_properties(network)
    }

    fn register_callback(
        &self,
        _request: NetworkRequest,
        _callback: NetworkCallback,
    ) -> PlatformResult<CallbackId> {
        Err(PlatformError::NotSupported("network callbacks".into()))
    }

    fn unregister_callback(&self, id: CallbackId) {
        self.0.unregister_callback(id);
    }
}

/// What the controller reported to its session
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Reported {
    Updated,
    Died(Network),
    Packet(IkeHeader, Bytes),
    Error(Error),
}

/// Callback that records every notification
#[derive(Clone, Default)]
pub(crate) struct RecordingCallback {
    reported: Arc<Mutex<Vec<Reported>>>,
}

impl RecordingCallback {
    pub(crate) fn reported(&self) -> Vec<Reported> {
        lock(&self.reported).clone()
    }

    pub(crate) fn errors(&self) -> Vec<Error> {
        self.reported()
            .into_iter()
            .filter_map(|r| match r {
                Reported::Error(e) => Some(e),
                _ => None,
            })
            .collect()
    }
}

impl IkeConnectionCallback for RecordingCallback {
    fn on_underlying_network_updated(&mut self) {
        lock(&self.reported).push(Reported::Updated);
    }

    fn on_underlying_network_died(&mut self, network: Network) {
        lock(&self.reported).push(Reported::Died(network));
    }

    fn on_ike_packet_received(&mut self, header: IkeHeader, packet: Bytes) {
        lock(&self.reported).push(Reported::Packet(header, packet));
    }

    fn on_error(&mut self, error: Error) {
        lock(&self.reported).push(Reported::Error(error));
    }
}

/// Two networks, scripted DNS, static routes and recording sockets
pub(crate) struct Harness {
    pub(crate) dns: Arc<ScriptedResolver>,
    pub(crate) routes: Arc<StaticRoutes>,
    pub(crate) monitor: Arc<ManualNetworkMonitor>,
    pub(crate) provider: Arc<MockSocketProvider>,
    pub(crate) sockets: Arc<SocketFactory>,
    pub(crate) callback: RecordingCallback,
}

pub(crate) const WIFI: Network = Network::new(100);
pub(crate) const CELL: Network = Network::new(200);

pub(crate) fn addr(s: &str) -> IpAddr {
    s.parse().expect("valid address literal")
}

impl Harness {
    /// WIFI is default with 192.168.1.2 only; CELL has 10.1.1.1 and 2001:db8:c::1
    pub(crate) fn new(answer: Vec<IpAddr>) -> Self {
        let monitor = Arc::new(ManualNetworkMonitor::new());
        monitor.add_network(WIFI, LinkProperties::with_addresses([addr("192.168.1.2")]));
        monitor.add_network(
            CELL,
            LinkProperties::with_addresses([addr("10.1.1.1"), addr("2001:db8:c::1")]),
        );
        monitor.set_default_network(Some(WIFI));

        let routes = Arc::new(StaticRoutes::new());
        routes.set(WIFI, addr("192.168.1.2"));
        routes.set(CELL, addr("10.1.1.1"));
        routes.set(CELL, addr("2001:db8:c::1"));

        let provider = Arc::new(MockSocketProvider::new());
        Harness {
            dns: Arc::new(ScriptedResolver::answering(answer)),
            routes,
            monitor,
            sockets: Arc::new(SocketFactory::new(provider.clone())),
            provider,
            callback: RecordingCallback::default(),
        }
    }

    pub(crate) fn deps(&self) -> ConnectionDependencies {
        ConnectionDependencies {
            resolver: self.dns.clone(),
            routes: self.routes.clone(),
            networks: self.monitor.clone(),
            sockets: self.sockets.clone(),
        }
    }
}
