//! NAT-T Keepalive
//!
//! Keeps the NAT mapping of an IPv4 encapsulation socket alive as described
//! in RFC 3948 Section 2.3.
//!
//! # Overview
//!
//! While the session runs behind a NAT on port 4500, a one-octet `0xFF`
//! datagram is sent to the server every `interval`. The payload carries no
//! information; it only refreshes the translator's UDP binding.
//!
//! # Example Flow
//!
//! ```text
//! Time:  0s       20s      40s      60s
//!        |--------|--------|--------|
//!        start    0xFF     0xFF     0xFF ─► remote:4500
//!
//! Config: interval=20s
//! ```
//!
//! # References
//!
//! - [RFC 3948](https://datatracker.ietf.org/doc/html/rfc3948) - UDP Encapsulation of IPsec ESP Packets

use super::socket::IkeSocket;
use crate::ipsec::{logging, metrics::ConnectionMetrics, nat::NAT_T_PORT, Error, Result};
use ikelink_platform::Network;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// Default keepalive interval (20 seconds)
pub const DEFAULT_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(20);

/// Shortest accepted keepalive interval (10 seconds)
pub const MIN_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(10);

/// Longest accepted keepalive interval (1 hour)
pub const MAX_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(3600);

/// Keepalive Configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeepaliveConfig {
    /// Time between keepalive packets
    ///
    /// Must be shorter than the UDP binding timeout of the NAT on the path.
    pub interval: Duration,
}

impl Default for KeepaliveConfig {
    fn default() -> Self {
        KeepaliveConfig {
            interval: DEFAULT_KEEPALIVE_INTERVAL,
        }
    }
}

impl KeepaliveConfig {
    /// Create new keepalive configuration
    pub fn new(interval: Duration) -> Self {
        KeepaliveConfig { interval }
    }
}

/// Starts keepalive senders
pub struct KeepaliveManager {
    config: KeepaliveConfig,
    metrics: ConnectionMetrics,
}

impl KeepaliveManager {
    /// Create new keepalive manager
    pub fn new(config: KeepaliveConfig, metrics: ConnectionMetrics) -> Self {
        KeepaliveManager { config, metrics }
    }

    /// Configured interval
    pub fn interval(&self) -> Duration {
        self.config.interval
    }

    /// Start sending keepalives from `socket` to `remote:4500`
    ///
    /// The first keepalive goes out one interval after start.
    ///
    /// # Errors
    ///
    /// Returns an error if `socket` is not an IPv4 encapsulation socket or if
    /// called outside a tokio runtime.
    pub fn start(
        &self,
        local: IpAddr,
        remote: IpAddr,
        socket: Arc<IkeSocket>,
        network: Network,
    ) -> Result<KeepaliveHandle> {
        if !socket.kind().supports_keepalive() {
            return Err(Error::UnsupportedOperation(format!(
                "keepalive on {} socket",
                socket.kind()
            )));
        }
        let runtime = Handle::try_current()
            .map_err(|_| Error::IllegalState("keepalive requires a tokio runtime".into()))?;

        let stopped = Arc::new(AtomicBool::new(false));
        let interval = self.config.interval;
        let dest = SocketAddr::new(remote, NAT_T_PORT);

        let task = {
            let stopped = stopped.clone();
            let metrics = self.metrics.clone();
            runtime.spawn(async move {
                let mut ticker = time::interval_at(Instant::now() + interval, interval);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    ticker.tick().await;
                    // Stopped between fire and send
                    if stopped.load(Ordering::Acquire) {
                        break;
                    }
                    match socket.send_keepalive(dest) {
                        Ok(()) => metrics.record_keepalive_sent(true),
                        Err(e) => {
                            metrics.record_keepalive_sent(false);
                            logging::log_keepalive_send_failed(remote, &e.to_string());
                        }
                    }
                }
            })
        };

        self.metrics.record_keepalive_started();
        logging::log_keepalive_started(local, remote, interval);

        Ok(KeepaliveHandle {
            local,
            remote,
            network,
            stopped,
            task,
            metrics: self.metrics.clone(),
        })
    }
}

/// A running keepalive; stopped on [`stop`](KeepaliveHandle::stop) or drop
#[derive(Debug)]
pub struct KeepaliveHandle {
    local: IpAddr,
    remote: IpAddr,
    network: Network,
    stopped: Arc<AtomicBool>,
    task: JoinHandle<()>,
    metrics: ConnectionMetrics,
}

impl KeepaliveHandle {
    /// Stop sending; later calls do nothing
    pub fn stop(&self) {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return;
        }
        self.task.abort();
        self.metrics.record_keepalive_stopped();
        logging::log_keepalive_stopped(self.remote);
    }

    /// Whether the keepalive is still sending
    pub fn is_running(&self) -> bool {
        !self.stopped.load(Ordering::Acquire)
    }

    /// Local address the keepalive was started for
    pub fn local(&self) -> IpAddr {
        self.local
    }

    /// Remote address the keepalive targets
    pub fn remote(&self) -> IpAddr {
        self.remote
    }

    /// Network of the keepalive socket
    pub fn network(&self) -> Network {
        self.network
    }
}

impl Drop for KeepaliveHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
