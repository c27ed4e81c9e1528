//! Structured logging for IKE connection management
//!
//! Provides structured, contextual logging using the `tracing` framework.
//! All log messages include relevant context fields for debugging and monitoring.
//!
//! # Log Levels
//!
//! - **TRACE**: Per-packet demultiplexing
//! - **DEBUG**: Socket and keepalive lifecycle
//! - **INFO**: Setup, teardown, migrations, NAT detection
//! - **WARN**: Retryable errors, dropped input
//! - **ERROR**: Failed setup or migration
//!
//! # Example
//!
//! ```no_run
//! use ikelink_proto::ipsec::logging;
//!
//! // Initialize tracing subscriber (in tests or applications)
//! tracing_subscriber::fmt()
//!     .with_env_filter("ikelink_proto::ipsec=debug")
//!     .init();
//!
//! logging::log_dns_attempt_failed("vpn.example.com", 1, "no addresses");
//! ```

use ikelink_platform::Network;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

fn spi_hex(spi: u64) -> String {
    hex::encode(spi.to_be_bytes())
}

/// Log a completed connection setup
///
/// # Arguments
///
/// * `hostname` - Server hostname as configured
/// * `network` - Network the session runs on
/// * `local` - Selected local address
/// * `remote` - Selected remote address
/// * `socket_kind` - Socket flavor in use
pub fn log_connection_setup(
    hostname: &str,
    network: Network,
    local: IpAddr,
    remote: IpAddr,
    socket_kind: &str,
) {
    info!(
        server = hostname,
        network = %network,
        local = %local,
        remote = %remote,
        socket_kind = socket_kind,
        "IKE connection set up"
    );
}

/// Log a failed connection setup
pub fn log_setup_failed(hostname: &str, error: &str) {
    error!(server = hostname, error = error, "IKE connection setup failed");
}

/// Log connection teardown
pub fn log_connection_teardown(network: Option<Network>, registered_spis: usize) {
    info!(
        network = ?network.map(|n| n.to_string()),
        registered_spis = registered_spis,
        "IKE connection torn down"
    );
}

/// Log one failed DNS attempt
///
/// # Arguments
///
/// * `hostname` - Hostname being resolved
/// * `attempt` - Attempt number (1-based)
/// * `reason` - Lookup error or "no addresses"
pub fn log_dns_attempt_failed(hostname: &str, attempt: u32, reason: &str) {
    warn!(
        server = hostname,
        attempt = attempt,
        reason = reason,
        "DNS resolution attempt failed"
    );
}

/// Log a successful DNS resolution
pub fn log_dns_resolved(hostname: &str, ipv4_count: usize, ipv6_count: usize) {
    debug!(
        server = hostname,
        ipv4 = ipv4_count,
        ipv6 = ipv6_count,
        "Server addresses resolved"
    );
}

/// Log an underlying socket opened by the factory
pub fn log_socket_opened(network: Network, socket_kind: &str, local: Option<SocketAddr>) {
    debug!(
        network = %network,
        socket_kind = socket_kind,
        local = ?local,
        "IKE socket opened"
    );
}

/// Log an underlying socket closed after its last owner released it
pub fn log_socket_closed(network: Network, socket_kind: &str) {
    debug!(network = %network, socket_kind = socket_kind, "IKE socket closed");
}

/// Log a socket switch
///
/// # Arguments
///
/// * `from` - Previous socket kind
/// * `to` - New socket kind
/// * `network` - Network of the new socket
/// * `spi_count` - Number of SPIs moved to the new socket
pub fn log_socket_switch(from: &str, to: &str, network: Network, spi_count: usize) {
    info!(
        socket_from = from,
        socket_to = to,
        network = %network,
        spi_count = spi_count,
        "IKE socket switched"
    );
}

/// Log a completed network migration
pub fn log_network_migration(
    old_network: Network,
    new_network: Network,
    local: IpAddr,
    remote: IpAddr,
) {
    info!(
        network_from = %old_network,
        network_to = %new_network,
        local = %local,
        remote = %remote,
        "IKE connection migrated"
    );
}

/// Log an abandoned migration
pub fn log_migration_failed(network: Network, error: &str) {
    error!(network = %network, error = error, "IKE connection migration failed");
}

/// Log that the underlying network died
pub fn log_network_died(network: Network, mobility_enabled: bool) {
    warn!(
        network = %network,
        mobility_enabled = mobility_enabled,
        "Underlying network died"
    );
}

/// Log a NAT detection result
///
/// # Arguments
///
/// * `spi` - Local SPI of the IKE SA that ran detection (0 for MOBIKE)
/// * `detected` - Whether a translator was found
pub fn log_nat_detection(spi: u64, detected: bool) {
    info!(
        ike_spi = %spi_hex(spi),
        nat_detected = detected,
        "NAT detection result"
    );
}

/// Log keepalive start
pub fn log_keepalive_started(local: IpAddr, remote: IpAddr, interval: Duration) {
    debug!(
        local = %local,
        remote = %remote,
        interval_secs = interval.as_secs(),
        "NAT-T keepalive started"
    );
}

/// Log keepalive stop
pub fn log_keepalive_stopped(remote: IpAddr) {
    debug!(remote = %remote, "NAT-T keepalive stopped");
}

/// Log a failed keepalive send
pub fn log_keepalive_send_failed(remote: IpAddr, error: &str) {
    warn!(remote = %remote, error = error, "NAT-T keepalive send failed");
}

/// Log an SA identifier registered with the connection
pub fn log_spi_registered(spi: u64) {
    debug!(ike_spi = %spi_hex(spi), "IKE SPI registered");
}

/// Log an SA identifier removed from the connection
pub fn log_spi_unregistered(spi: u64) {
    debug!(ike_spi = %spi_hex(spi), "IKE SPI unregistered");
}

/// Log an inbound IKE packet routed to its session
pub fn log_packet_demuxed(spi: u64, len: usize) {
    trace!(ike_spi = %spi_hex(spi), len = len, "IKE packet demultiplexed");
}

/// Log an inbound datagram dropped
///
/// # Arguments
///
/// * `reason` - Why the datagram was dropped
/// * `len` - Datagram length in bytes
pub fn log_packet_dropped(reason: &str, len: usize) {
    warn!(reason = reason, len = len, "Inbound datagram dropped");
}

/// Log an outbound packet that could not be sent
pub fn log_send_failed(dest: SocketAddr, error: &str) {
    warn!(dest = %dest, error = error, "IKE packet send failed");
}
