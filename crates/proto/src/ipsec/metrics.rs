//! Metrics for IKE connection management
//!
//! Counters and gauges for the sockets, keepalives, DNS lookups and
//! migrations performed by the connection layer. All metrics use atomic
//! operations so clones can be shared with keepalive tasks and the socket
//! factory.
//!
//! # Example
//!
//! ```
//! use ikelink_proto::ipsec::metrics::ConnectionMetrics;
//!
//! let metrics = ConnectionMetrics::new();
//!
//! metrics.record_socket_opened();
//! metrics.record_keepalive_started();
//!
//! let snapshot = metrics.snapshot();
//! assert_eq!(snapshot.sockets_open, 1);
//! assert_eq!(snapshot.keepalives_active, 1);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Connection metrics for monitoring
#[derive(Debug, Clone)]
pub struct ConnectionMetrics {
    /// Underlying sockets opened
    pub sockets_opened: Arc<AtomicU64>,

    /// Underlying sockets closed
    pub sockets_closed: Arc<AtomicU64>,

    /// Currently open underlying sockets
    pub sockets_open: Arc<AtomicU64>,

    /// Socket switches performed
    pub socket_switches: Arc<AtomicU64>,

    /// Keepalives started
    pub keepalives_started: Arc<AtomicU64>,

    /// Keepalives stopped
    pub keepalives_stopped: Arc<AtomicU64>,

    /// Currently running keepalives
    pub keepalives_active: Arc<AtomicU64>,

    /// Keepalive packets sent
    pub keepalive_packets_sent: Arc<AtomicU64>,

    /// Keepalive send failures
    pub keepalive_send_failures: Arc<AtomicU64>,

    /// DNS resolutions started
    pub dns_resolutions: Arc<AtomicU64>,

    /// DNS resolutions that ran out of attempts
    pub dns_failures: Arc<AtomicU64>,

    /// Completed network migrations
    pub migrations_completed: Arc<AtomicU64>,

    /// Failed network migrations
    pub migrations_failed: Arc<AtomicU64>,

    /// Network-died notifications
    pub network_deaths: Arc<AtomicU64>,

    /// NAT detected by IKE_SA_INIT or MOBIKE
    pub nat_detected: Arc<AtomicU64>,

    /// IKE packets sent
    pub packets_sent: Arc<AtomicU64>,

    /// IKE packets delivered to the session
    pub packets_received: Arc<AtomicU64>,

    /// Inbound datagrams dropped during demultiplexing
    pub packets_dropped: Arc<AtomicU64>,
}

impl ConnectionMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self {
            sockets_opened: Arc::new(AtomicU64::new(0)),
            sockets_closed: Arc::new(AtomicU64::new(0)),
            sockets_open: Arc::new(AtomicU64::new(0)),
            socket_switches: Arc::new(AtomicU64::new(0)),
            keepalives_started: Arc::new(AtomicU64::new(0)),
            keepalives_stopped: Arc::new(AtomicU64::new(0)),
            keepalives_active: Arc::new(AtomicU64::new(0)),
            keepalive_packets_sent: Arc::new(AtomicU64::new(0)),
            keepalive_send_failures: Arc::new(AtomicU64::new(0)),
            dns_resolutions: Arc::new(AtomicU64::new(0)),
            dns_failures: Arc::new(AtomicU64::new(0)),
            migrations_completed: Arc::new(AtomicU64::new(0)),
            migrations_failed: Arc::new(AtomicU64::new(0)),
            network_deaths: Arc::new(AtomicU64::new(0)),
            nat_detected: Arc::new(AtomicU64::new(0)),
            packets_sent: Arc::new(AtomicU64::new(0)),
            packets_received: Arc::new(AtomicU64::new(0)),
            packets_dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Record an underlying socket opened
    pub fn record_socket_opened(&self) {
        self.sockets_opened.fetch_add(1, Ordering::Relaxed);
        self.sockets_open.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an underlying socket closed
    pub fn record_socket_closed(&self) {
        self.sockets_closed.fetch_add(1, Ordering::Relaxed);
        self.sockets_open.fetch_sub(1, Ordering::Relaxed);
    }

    /// Record a socket switch
    pub fn record_socket_switch(&self) {
        self.socket_switches.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a keepalive started
    pub fn record_keepalive_started(&self) {
        self.keepalives_started.fetch_add(1, Ordering::Relaxed);
        self.keepalives_active.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a keepalive stopped
    pub fn record_keepalive_stopped(&self) {
        self.keepalives_stopped.fetch_add(1, Ordering::Relaxed);
        self.keepalives_active.fetch_sub(1, Ordering::Relaxed);
    }

    /// Record a keepalive send attempt
    pub fn record_keepalive_sent(&self, success: bool) {
        if success {
            self.keepalive_packets_sent.fetch_add(1, Ordering::Relaxed);
        } else {
            self.keepalive_send_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a DNS resolution
    ///
    /// # Arguments
    ///
    /// * `success` - Whether any address was returned within the retry budget
    pub fn record_dns_resolution(&self, success: bool) {
        self.dns_resolutions.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.dns_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a migration outcome
    pub fn record_migration(&self, success: bool) {
        if success {
            self.migrations_completed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.migrations_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a network-died notification
    pub fn record_network_death(&self) {
        self.network_deaths.fetch_add(1, Ordering::Relaxed);
    }

    /// Record NAT detected on the path
    pub fn record_nat_detected(&self) {
        self.nat_detected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an IKE packet sent
    pub fn record_packet_sent(&self) {
        self.packets_sent.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an IKE packet delivered to the session
    pub fn record_packet_received(&self) {
        self.packets_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an inbound datagram dropped
    pub fn record_packet_dropped(&self) {
        self.packets_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    ///
    /// Values may be slightly inconsistent across metrics due to concurrent updates.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            sockets_opened: self.sockets_opened.load(Ordering::Relaxed),
            sockets_closed: self.sockets_closed.load(Ordering::Relaxed),
            sockets_open: self.sockets_open.load(Ordering::Relaxed),
            socket_switches: self.socket_switches.load(Ordering::Relaxed),
            keepalives_started: self.keepalives_started.load(Ordering::Relaxed),
            keepalives_stopped: self.keepalives_stopped.load(Ordering::Relaxed),
            keepalives_active: self.keepalives_active.load(Ordering::Relaxed),
            keepalive_packets_sent: self.keepalive_packets_sent.load(Ordering::Relaxed),
            keepalive_send_failures: self.keepalive_send_failures.load(Ordering::Relaxed),
            dns_resolutions: self.dns_resolutions.load(Ordering::Relaxed),
            dns_failures: self.dns_failures.load(Ordering::Relaxed),
            migrations_completed: self.migrations_completed.load(Ordering::Relaxed),
            migrations_failed: self.migrations_failed.load(Ordering::Relaxed),
            network_deaths: self.network_deaths.load(Ordering::Relaxed),
            nat_detected: self.nat_detected.load(Ordering::Relaxed),
            packets_sent: self.packets_sent.load(Ordering::Relaxed),
            packets_received: self.packets_received.load(Ordering::Relaxed),
            packets_dropped: self.packets_dropped.load(Ordering::Relaxed),
        }
    }
}

impl Default for ConnectionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time snapshot of all connection metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Underlying sockets opened
    pub sockets_opened: u64,
    /// Underlying sockets closed
    pub sockets_closed: u64,
    /// Currently open underlying sockets
    pub sockets_open: u64,
    /// Socket switches performed
    pub socket_switches: u64,
    /// Keepalives started
    pub keepalives_started: u64,
    /// Keepalives stopped
    pub keepalives_stopped: u64,
    /// Currently running keepalives
    pub keepalives_active: u64,
    /// Keepalive packets sent
    pub keepalive_packets_sent: u64,
    /// Keepalive send failures
    pub keepalive_send_failures: u64,
    /// DNS resolutions started
    pub dns_resolutions: u64,
    /// DNS resolutions that ran out of attempts
    pub dns_failures: u64,
    /// Completed migrations
    pub migrations_completed: u64,
    /// Failed migrations
    pub migrations_failed: u64,
    /// Network-died notifications
    pub network_deaths: u64,
    /// NAT detections
    pub nat_detected: u64,
    /// IKE packets sent
    pub packets_sent: u64,
    /// IKE packets delivered
    pub packets_received: u64,
    /// Inbound datagrams dropped
    pub packets_dropped: u64,
}

impl MetricsSnapshot {
    /// Fraction of migrations that succeeded (1.0 when none were attempted)
    pub fn migration_success_rate(&self) -> f64 {
        let total = self.migrations_completed + self.migrations_failed;
        if total == 0 {
            return 1.0;
        }
        self.migrations_completed as f64 / total as f64
    }
}
