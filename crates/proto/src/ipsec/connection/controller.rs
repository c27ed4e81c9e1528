//! IKE connection controller
//!
//! Owns the network path of one IKE session and keeps it alive across NAT
//! detection results and network changes.
//!
//! # State Machine
//!
//! ```text
//! Uninitialized ──set_up()──► Active ──tear_down()──► TornDown
//!       │                                                ▲
//!       └──────────── set_up() failed (rolled back) ─────┘
//! ```
//!
//! # Migration
//!
//! ```text
//! NetworkUpdated(net)
//!   ├─ mobility disabled ──► on_underlying_network_died
//!   └─ mobility enabled
//!        ├─ net changed ──► resolve server again
//!        ├─ pick remote, kind (port 4500 once NAT-T is known), local
//!        ├─ same (net, local, remote) ──► nothing
//!        ├─ net or family changed ──► switch socket
//!        ├─ otherwise ──► move addresses, restart keepalive
//!        └─ on_underlying_network_updated
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use ikelink_proto::ipsec::connection::{
//!     ConnectionDependencies, IkeConnectionCallback, IkeConnectionController,
//! };
//! use ikelink_proto::ipsec::{ikev2::IkeHeader, ConnectionConfig, Error};
//! use ikelink_platform::Network;
//!
//! struct Session;
//!
//! impl IkeConnectionCallback for Session {
//!     fn on_underlying_network_updated(&mut self) {}
//!     fn on_underlying_network_died(&mut self, _network: Network) {}
//!     fn on_ike_packet_received(&mut self, _header: IkeHeader, _packet: bytes::Bytes) {}
//!     fn on_error(&mut self, _error: Error) {}
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConnectionConfig::builder()
//!         .with_server_hostname("vpn.example.com")
//!         .build()?;
//!
//!     let mut controller = IkeConnectionController::new(
//!         config,
//!         ConnectionDependencies::system(),
//!         Box::new(Session),
//!     )?;
//!     controller.set_up().await?;
//!     controller.register_ike_spi(0x0102030405060708)?;
//!
//!     while let Some(event) = controller.next_event().await {
//!         controller.handle_event(event).await;
//!     }
//!     Ok(())
//! }
//! ```

use super::event::{ConnectionEvent, EventReceiver, EventSender};
use super::keepalive::{KeepaliveHandle, KeepaliveManager};
use super::local_address::LocalAddressSelector;
use super::resolver::{AddressResolver, ResolvedAddresses};
use super::socket::{IkeSocket, OwnerId, SocketFactory, SocketKind};
use super::watcher::{NetworkWatcher, WatchMode};
use crate::ipsec::{
    config::ConnectionConfig,
    ikev2::IkeHeader,
    logging,
    metrics::ConnectionMetrics,
    nat::{NatDetection, NatTraversalStatus},
    Error, Result,
};
use bytes::Bytes;
use ikelink_platform::{DnsResolver, Network, NetworkMonitor, RouteLookup};
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Notifications from the controller to its IKE session
///
/// Called on the task that drives the controller, never concurrently.
pub trait IkeConnectionCallback: Send {
    /// The session now runs on a different path
    fn on_underlying_network_updated(&mut self);

    /// The network died and the session cannot follow
    fn on_underlying_network_died(&mut self, network: Network);

    /// An IKE message arrived for one of the registered SPIs
    fn on_ike_packet_received(&mut self, header: IkeHeader, packet: Bytes);

    /// A runtime operation (migration, MOBIKE NAT switch) failed
    fn on_error(&mut self, error: Error);
}

/// Platform collaborators of a controller
#[derive(Clone)]
pub struct ConnectionDependencies {
    /// DNS
    pub resolver: Arc<dyn DnsResolver>,
    /// Source address selection
    pub routes: Arc<dyn RouteLookup>,
    /// Network state and notifications
    pub networks: Arc<dyn NetworkMonitor>,
    /// Socket pool, may be shared between controllers
    pub sockets: Arc<SocketFactory>,
}

/// Local and remote address an SA last used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressPair {
    /// Local address
    pub local: IpAddr,
    /// Remote address
    pub remote: IpAddr,
}

/// Snapshot of the active path for the protocol layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionInfo {
    /// Network in use
    pub network: Network,
    /// Local address
    pub local_address: IpAddr,
    /// Local UDP port, 0 if unknown
    pub local_port: u16,
    /// Server address
    pub remote_address: IpAddr,
    /// Server port (500 or 4500)
    pub remote_port: u16,
    /// Socket flavor
    pub socket_kind: SocketKind,
}

impl ConnectionInfo {
    /// NAT detection hashes for this path
    pub fn nat_detection(&self, spi_i: u64, spi_r: u64) -> NatDetection {
        NatDetection::new(
            spi_i,
            spi_r,
            self.local_address,
            self.local_port,
            self.remote_address,
            self.remote_port,
        )
    }
}

/// Controller lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    /// Created, `set_up` not called yet
    Uninitialized,
    /// Path established
    Active,
    /// Resources released; terminal
    TornDown,
}

struct ActivePath {
    network: Network,
    local: IpAddr,
    remote: IpAddr,
    socket: Arc<IkeSocket>,
    keepalive: Option<KeepaliveHandle>,
}

/// Maintains the network path of one IKE session
pub struct IkeConnectionController {
    config: ConnectionConfig,
    deps: ConnectionDependencies,
    resolver: AddressResolver,
    local_addresses: LocalAddressSelector,
    keepalives: KeepaliveManager,
    watcher: NetworkWatcher,
    callback: Box<dyn IkeConnectionCallback>,
    events_tx: EventSender,
    events_rx: EventReceiver,
    owner: OwnerId,
    state: ControllerState,
    path: Option<ActivePath>,
    addresses: ResolvedAddresses,
    registered: HashMap<u64, AddressPair>,
    nat_status: NatTraversalStatus,
    mobility_enabled: bool,
    metrics: ConnectionMetrics,
}

fn not_active(state: ControllerState) -> Error {
    Error::IllegalState(format!("connection is {:?}", state))
}

impl IkeConnectionController {
    /// Create a controller; nothing is acquired until [`set_up`](Self::set_up)
    ///
    /// Metrics are shared with the socket factory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] for an invalid configuration
    pub fn new(
        config: ConnectionConfig,
        deps: ConnectionDependencies,
        callback: Box<dyn IkeConnectionCallback>,
    ) -> Result<Self> {
        config.validate()?;

        let metrics = deps.sockets.metrics().clone();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Ok(IkeConnectionController {
            resolver: AddressResolver::new(deps.resolver.clone(), metrics.clone()),
            local_addresses: LocalAddressSelector::new(deps.routes.clone()),
            keepalives: KeepaliveManager::new(config.keepalive.clone(), metrics.clone()),
            watcher: NetworkWatcher::new(deps.networks.clone()),
            owner: deps.sockets.new_owner(),
            mobility_enabled: config.mobility_enabled,
            config,
            deps,
            callback,
            events_tx,
            events_rx,
            state: ControllerState::Uninitialized,
            path: None,
            addresses: ResolvedAddresses::default(),
            registered: HashMap::new(),
            nat_status: NatTraversalStatus::default(),
            metrics,
        })
    }

    /// Resolve the server, open the socket and start watching the network
    ///
    /// On failure everything acquired so far is released and the controller
    /// is torn down.
    ///
    /// # Errors
    ///
    /// - [`Error::IllegalState`] if called twice
    /// - [`Error::NoActiveNetwork`] without a configured or default network
    /// - [`Error::Resolution`] if DNS returned nothing
    /// - [`Error::NoUsableRemoteAddress`] if no server address is reachable
    /// - [`Error::NoUsableLocalAddress`] if there is no route to the server
    /// - [`Error::SocketOpen`] if the socket cannot be opened
    pub async fn set_up(&mut self) -> Result<()> {
        if self.state != ControllerState::Uninitialized {
            return Err(Error::IllegalState(format!(
                "set_up called while {:?}",
                self.state
            )));
        }

        match self.try_set_up().await {
            Ok(()) => {
                self.state = ControllerState::Active;
                if let Some(path) = &self.path {
                    logging::log_connection_setup(
                        &self.config.server_hostname,
                        path.network,
                        path.local,
                        path.remote,
                        path.socket.kind().as_str(),
                    );
                }
                Ok(())
            }
            Err(e) => {
                logging::log_setup_failed(&self.config.server_hostname, &e.to_string());
                self.release_resources();
                self.state = ControllerState::TornDown;
                Err(e)
            }
        }
    }

    async fn try_set_up(&mut self) -> Result<()> {
        let network = self
            .config
            .network
            .or_else(|| self.deps.networks.default_network())
            .ok_or(Error::NoActiveNetwork)?;

        self.addresses = self
            .resolver
            .resolve(network, &self.config.server_hostname)
            .await?;
        let remote = self.select_remote(network)?;
        let kind = SocketKind::select(remote.is_ipv4(), self.config.force_encap_port);
        let local = self
            .local_addresses
            .select(network, remote, kind.remote_port())?;

        let socket = self.deps.sockets.open(network, kind, self.owner)?;
        self.path = Some(ActivePath {
            network,
            local,
            remote,
            socket,
            keepalive: None,
        });
        self.start_keepalive_if_needed()?;

        let mode = self.watch_mode();
        self.watcher
            .watch(mode, network, local, self.events_tx.clone())?;
        Ok(())
    }

    fn watch_mode(&self) -> WatchMode {
        if self.config.uses_caller_configured_network() {
            WatchMode::SpecificNetwork
        } else {
            WatchMode::DefaultNetwork
        }
    }

    /// Release every resource; safe to call any number of times
    pub fn tear_down(&mut self) {
        if self.state == ControllerState::TornDown {
            return;
        }
        let network = self.network();
        let spi_count = self.registered.len();

        self.release_resources();
        self.registered.clear();
        self.state = ControllerState::TornDown;
        logging::log_connection_teardown(network, spi_count);
    }

    fn release_resources(&mut self) {
        if let Some(mut path) = self.path.take() {
            if let Some(keepalive) = path.keepalive.take() {
                keepalive.stop();
            }
            for spi in self.registered.keys() {
                path.socket.unregister_spi(*spi);
            }
            self.deps.sockets.release(&path.socket, self.owner);
        }
        self.watcher.cancel();
    }

    fn active_path(&self) -> Result<&ActivePath> {
        match (&self.state, &self.path) {
            (ControllerState::Active, Some(path)) => Ok(path),
            _ => Err(not_active(self.state)),
        }
    }

    /// IPv6 only when the server has one and the network has global IPv6
    fn select_remote(&self, network: Network) -> Result<IpAddr> {
        if let Some(v6) = self.addresses.ipv6.first() {
            let has_global_ipv6 = self
                .deps
                .networks
                .link_properties(network)
                .map(|link| link.has_global_ipv6())
                .unwrap_or(false);
            if has_global_ipv6 {
                return Ok(IpAddr::V6(*v6));
            }
        }
        if let Some(v4) = self.addresses.ipv4.first() {
            return Ok(IpAddr::V4(*v4));
        }
        Err(Error::NoUsableRemoteAddress(format!(
            "{} on {}",
            self.config.server_hostname, network
        )))
    }

    fn start_keepalive_if_needed(&mut self) -> Result<()> {
        let Some(path) = self.path.as_mut() else {
            return Ok(());
        };
        if path.socket.kind().supports_keepalive() && path.keepalive.is_none() {
            path.keepalive = Some(self.keepalives.start(
                path.local,
                path.remote,
                path.socket.clone(),
                path.network,
            )?);
        }
        Ok(())
    }

    /// Move every registered SA to the `(network, kind)` socket
    fn switch_socket(
        &mut self,
        network: Network,
        kind: SocketKind,
        local: IpAddr,
        remote: IpAddr,
    ) -> Result<()> {
        let state = self.state;
        let path = self.path.as_mut().ok_or_else(|| not_active(state))?;
        if path.socket.network() == network && path.socket.kind() == kind {
            return Ok(());
        }

        let old_kind = path.socket.kind();
        let had_keepalive = match path.keepalive.take() {
            Some(keepalive) => {
                keepalive.stop();
                true
            }
            None => false,
        };

        let socket = match self.deps.sockets.open(network, kind, self.owner) {
            Ok(socket) => socket,
            Err(e) => {
                if had_keepalive {
                    match self.keepalives.start(
                        path.local,
                        path.remote,
                        path.socket.clone(),
                        path.network,
                    ) {
                        Ok(keepalive) => path.keepalive = Some(keepalive),
                        Err(ke) => warn!(error = %ke, "Failed to restart NAT-T keepalive"),
                    }
                }
                return Err(e);
            }
        };

        // New socket first so no inbound packet finds neither
        for spi in self.registered.keys() {
            socket.register_spi(*spi, self.events_tx.clone());
        }
        for spi in self.registered.keys() {
            path.socket.unregister_spi(*spi);
        }

        let old_socket = std::mem::replace(&mut path.socket, socket);
        self.deps.sockets.release(&old_socket, self.owner);
        path.network = network;
        path.local = local;
        path.remote = remote;

        self.metrics.record_socket_switch();
        logging::log_socket_switch(
            old_kind.as_str(),
            kind.as_str(),
            network,
            self.registered.len(),
        );

        self.start_keepalive_if_needed()
    }

    /// Same socket, new addresses
    fn move_addresses(&mut self, local: IpAddr, remote: IpAddr) -> Result<()> {
        let state = self.state;
        let path = self.path.as_mut().ok_or_else(|| not_active(state))?;
        path.local = local;
        path.remote = remote;

        if let Some(keepalive) = path.keepalive.take() {
            keepalive.stop();
            self.start_keepalive_if_needed()?;
        }
        Ok(())
    }

    fn update_watch(&mut self, mode: WatchMode, network: Network, local: IpAddr) -> Result<()> {
        let reregister = self.watcher.mode() != Some(mode)
            || (mode == WatchMode::SpecificNetwork
                && self.watcher.tracked_network() != Some(network));

        if reregister {
            self.watcher
                .watch(mode, network, local, self.events_tx.clone())?;
        } else {
            self.watcher.set_tracked(network, local);
        }
        Ok(())
    }

    /// Move the session to `network` and watch it in `mode`; returns false
    /// if nothing changed
    async fn migrate(&mut self, network: Network, mode: WatchMode) -> Result<bool> {
        let (old_network, old_local, old_remote, old_kind) = {
            let path = self.active_path()?;
            (path.network, path.local, path.remote, path.socket.kind())
        };

        let network_changed = network != old_network;
        if network_changed {
            self.addresses = self
                .resolver
                .resolve(network, &self.config.server_hostname)
                .await?;
        }

        let remote = self.select_remote(network)?;
        let use_encap_port =
            self.config.force_encap_port || self.nat_status.is_nat_t_supported();
        let kind = SocketKind::select(remote.is_ipv4(), use_encap_port);
        let local = self
            .local_addresses
            .select(network, remote, kind.remote_port())?;

        if !network_changed && local == old_local && remote == old_remote {
            debug!(network = %network, "Network update leaves path unchanged");
            return Ok(false);
        }

        if network_changed || kind.family() != old_kind.family() {
            self.switch_socket(network, kind, local, remote)?;
        } else {
            self.move_addresses(local, remote)?;
        }

        for pair in self.registered.values_mut() {
            *pair = AddressPair { local, remote };
        }
        self.update_watch(mode, network, local)?;

        logging::log_network_migration(old_network, network, local, remote);
        Ok(true)
    }

    async fn on_network_updated(&mut self, network: Network) {
        if !self.mobility_enabled {
            let current = self.network().unwrap_or(network);
            self.report_network_died(current);
            return;
        }

        let mode = self.watch_mode();
        match self.migrate(network, mode).await {
            Ok(true) => {
                self.metrics.record_migration(true);
                self.callback.on_underlying_network_updated();
            }
            Ok(false) => {}
            Err(e) => {
                self.metrics.record_migration(false);
                logging::log_migration_failed(network, &e.to_string());
                self.callback.on_error(e);
            }
        }
    }

    fn report_network_died(&mut self, network: Network) {
        self.metrics.record_network_death();
        logging::log_network_died(network, self.mobility_enabled);
        self.callback.on_underlying_network_died(network);
    }

    /// Wait for the next event; `None` once torn down
    pub async fn next_event(&mut self) -> Option<ConnectionEvent> {
        if self.state == ControllerState::TornDown {
            return None;
        }
        self.events_rx.recv().await
    }

    /// React to one event
    ///
    /// Errors are reported through [`IkeConnectionCallback::on_error`]. Events
    /// of a cancelled watch registration and events after teardown are
    /// ignored.
    pub async fn handle_event(&mut self, event: ConnectionEvent) {
        if self.state != ControllerState::Active {
            debug!(state = ?self.state, "Event ignored");
            return;
        }
        if let Some(generation) = event.generation() {
            if generation != self.watcher.generation() {
                debug!(
                    generation = generation,
                    current = self.watcher.generation(),
                    "Stale network event ignored"
                );
                return;
            }
        }

        match event {
            ConnectionEvent::PacketReceived { header, packet } => {
                if !self.registered.contains_key(&header.local_spi()) {
                    self.metrics.record_packet_dropped();
                    logging::log_packet_dropped("SPI no longer registered", packet.len());
                    return;
                }
                self.metrics.record_packet_received();
                self.callback.on_ike_packet_received(header, packet);
            }
            ConnectionEvent::NetworkUpdated { network, .. } => {
                self.on_network_updated(network).await;
            }
            ConnectionEvent::NetworkLost { network, .. } => {
                self.report_network_died(network);
            }
        }
    }

    /// Handle every queued event without waiting; returns how many ran
    pub async fn process_pending_events(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_event(event).await;
            handled += 1;
        }
        handled
    }

    /// Result of the IKE_SA_INIT NAT detection payloads
    ///
    /// With a NAT on the path the session moves to an IPv4 encapsulation
    /// socket and `local_spi` is registered there.
    ///
    /// # Errors
    ///
    /// - [`Error::UnsupportedOperation`] if NAT was detected on an IPv6 path;
    ///   the path is left unchanged
    /// - [`Error::SocketOpen`] if the encapsulation socket cannot be opened
    pub fn handle_nat_detection_in_ike_init(&mut self, detected: bool, local_spi: u64) -> Result<()> {
        logging::log_nat_detection(local_spi, detected);
        self.apply_nat_detection(detected)?;
        if detected && !self.registered.contains_key(&local_spi) {
            self.register_ike_spi(local_spi)?;
        }
        Ok(())
    }

    /// Result of a MOBIKE NAT detection; failures go to `on_error`
    pub fn handle_nat_detection_in_mobike(&mut self, detected: bool) {
        logging::log_nat_detection(0, detected);
        if let Err(e) = self.apply_nat_detection(detected) {
            self.callback.on_error(e);
        }
    }

    fn apply_nat_detection(&mut self, detected: bool) -> Result<()> {
        let (network, local, remote) = {
            let path = self.active_path()?;
            (path.network, path.local, path.remote)
        };

        if !detected {
            self.nat_status = NatTraversalStatus::NotDetected;
            return Ok(());
        }

        self.nat_status = NatTraversalStatus::Detected;
        self.metrics.record_nat_detected();
        if remote.is_ipv6() {
            return Err(Error::UnsupportedOperation(
                "NAT traversal over IPv6".into(),
            ));
        }
        self.switch_socket(network, SocketKind::EncapV4, local, remote)
    }

    /// The peer sent no NAT detection payloads; later migrations stay on port 500
    pub fn mark_nat_unsupported(&mut self) {
        self.nat_status = NatTraversalStatus::Unsupported;
    }

    #[cfg(test)]
    pub(crate) fn reset_nat_status_for_testing(&mut self) {
        self.nat_status = NatTraversalStatus::NotChecked;
    }

    /// Turn on migration after MOBIKE was negotiated
    pub fn enable_mobility(&mut self) {
        self.mobility_enabled = true;
    }

    /// Whether network changes trigger migration
    pub fn is_mobility_enabled(&self) -> bool {
        self.mobility_enabled
    }

    /// Pin the session to `network` and migrate there
    ///
    /// The configured network and the watch only change once the migration
    /// succeeded; a failed call leaves the old path fully watched.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IllegalState`] if not active or mobility is disabled,
    /// or the error of the failed migration step.
    pub async fn set_network(&mut self, network: Network) -> Result<()> {
        self.active_path()?;
        if !self.mobility_enabled {
            return Err(Error::IllegalState(
                "set_network requires mobility".into(),
            ));
        }

        match self.migrate(network, WatchMode::SpecificNetwork).await {
            Ok(true) => {
                self.config.network = Some(network);
                self.metrics.record_migration(true);
                self.callback.on_underlying_network_updated();
                Ok(())
            }
            Ok(false) => {
                let local = self.active_path()?.local;
                self.update_watch(WatchMode::SpecificNetwork, network, local)?;
                self.config.network = Some(network);
                Ok(())
            }
            Err(e) => {
                self.metrics.record_migration(false);
                logging::log_migration_failed(network, &e.to_string());
                Err(e)
            }
        }
    }

    /// Route inbound packets for `spi` to this controller
    ///
    /// # Errors
    ///
    /// Returns [`Error::IllegalState`] if not active
    pub fn register_ike_spi(&mut self, spi: u64) -> Result<()> {
        let (socket, pair) = {
            let path = self.active_path()?;
            (
                path.socket.clone(),
                AddressPair {
                    local: path.local,
                    remote: path.remote,
                },
            )
        };
        socket.register_spi(spi, self.events_tx.clone());
        self.registered.insert(spi, pair);
        logging::log_spi_registered(spi);
        Ok(())
    }

    /// Stop routing packets for `spi`
    pub fn unregister_ike_spi(&mut self, spi: u64) {
        if self.registered.remove(&spi).is_some() {
            if let Some(path) = &self.path {
                path.socket.unregister_spi(spi);
            }
            logging::log_spi_unregistered(spi);
        }
    }

    /// Registered SPIs in ascending order
    pub fn registered_spis(&self) -> Vec<u64> {
        let mut spis: Vec<u64> = self.registered.keys().copied().collect();
        spis.sort_unstable();
        spis
    }

    /// Addresses the SA with `spi` uses
    pub fn sa_addresses(&self, spi: u64) -> Option<AddressPair> {
        self.registered.get(&spi).copied()
    }

    /// Send an IKE message to the server; failures are logged only
    pub fn send_packet(&self, packet: &[u8]) {
        let Some(path) = &self.path else {
            warn!(len = packet.len(), "IKE packet dropped without an active path");
            return;
        };
        let dest = SocketAddr::new(path.remote, path.socket.kind().remote_port());
        match path.socket.send_ike(packet, dest) {
            Ok(()) => self.metrics.record_packet_sent(),
            Err(e) => logging::log_send_failed(dest, &e.to_string()),
        }
    }

    /// Addresses and ports of the active path
    ///
    /// # Errors
    ///
    /// Returns [`Error::IllegalState`] if not active
    pub fn build_connection_info(&self) -> Result<ConnectionInfo> {
        let path = self.active_path()?;
        let kind = path.socket.kind();
        Ok(ConnectionInfo {
            network: path.network,
            local_address: path.local,
            local_port: path.socket.local_addr().map_or(0, |addr| addr.port()),
            remote_address: path.remote,
            remote_port: kind.remote_port(),
            socket_kind: kind,
        })
    }

    /// Current NAT traversal status
    pub fn nat_status(&self) -> NatTraversalStatus {
        self.nat_status
    }

    /// Lifecycle state
    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Whether the path is established
    pub fn is_active(&self) -> bool {
        self.state == ControllerState::Active
    }

    /// Network in use
    pub fn network(&self) -> Option<Network> {
        self.path.as_ref().map(|p| p.network)
    }

    /// Local address in use
    pub fn local_address(&self) -> Option<IpAddr> {
        self.path.as_ref().map(|p| p.local)
    }

    /// Server address in use
    pub fn remote_address(&self) -> Option<IpAddr> {
        self.path.as_ref().map(|p| p.remote)
    }

    /// Server port in use
    pub fn remote_port(&self) -> Option<u16> {
        self.socket_kind().map(SocketKind::remote_port)
    }

    /// Socket flavor in use
    pub fn socket_kind(&self) -> Option<SocketKind> {
        self.path.as_ref().map(|p| p.socket.kind())
    }

    /// Whether a NAT-T keepalive is running
    pub fn has_keepalive(&self) -> bool {
        self.path
            .as_ref()
            .and_then(|p| p.keepalive.as_ref())
            .is_some_and(KeepaliveHandle::is_running)
    }

    /// Server addresses from the last resolution
    pub fn resolved_addresses(&self) -> &ResolvedAddresses {
        &self.addresses
    }

    /// Current configuration
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Connection metrics
    pub fn metrics(&self) -> &ConnectionMetrics {
        &self.metrics
    }
}

impl Drop for IkeConnectionController {
    fn drop(&mut self) {
        self.tear_down();
    }
}
