//! Connection Configuration
//!
//! Provides the configuration structure and builder for
//! [`IkeConnectionController`](crate::ipsec::connection::IkeConnectionController).

use super::{
    connection::keepalive::{KeepaliveConfig, MAX_KEEPALIVE_INTERVAL, MIN_KEEPALIVE_INTERVAL},
    Error, Result,
};
use ikelink_platform::Network;
use std::time::Duration;

/// Configuration of one IKE session's network path
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Server hostname or IP literal (e.g. "vpn.example.com")
    pub server_hostname: String,

    /// Network chosen by the caller; `None` follows the system default network
    pub network: Option<Network>,

    /// Always talk to the server on port 4500
    pub force_encap_port: bool,

    /// NAT-T keepalive configuration
    pub keepalive: KeepaliveConfig,

    /// Migrate automatically when the underlying network changes (MOBIKE)
    pub mobility_enabled: bool,
}

impl ConnectionConfig {
    /// Create builder for connection configuration
    pub fn builder() -> ConnectionBuilder {
        ConnectionBuilder::new()
    }

    /// Whether the caller pinned the session to a specific network
    pub fn uses_caller_configured_network(&self) -> bool {
        self.network.is_some()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.server_hostname.trim().is_empty() {
            return Err(Error::InvalidParameter(
                "server_hostname cannot be empty".into(),
            ));
        }
        let interval = self.keepalive.interval;
        if interval < MIN_KEEPALIVE_INTERVAL || interval > MAX_KEEPALIVE_INTERVAL {
            return Err(Error::InvalidParameter(format!(
                "keepalive interval {}s outside [{}s, {}s]",
                interval.as_secs(),
                MIN_KEEPALIVE_INTERVAL.as_secs(),
                MAX_KEEPALIVE_INTERVAL.as_secs()
            )));
        }
        Ok(())
    }
}

/// Builder for ConnectionConfig
#[derive(Default)]
pub struct ConnectionBuilder {
    server_hostname: Option<String>,
    network: Option<Network>,
    force_encap_port: bool,
    keepalive_interval: Option<Duration>,
    mobility_enabled: bool,
}

impl ConnectionBuilder {
    /// Create new connection builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set server hostname
    pub fn with_server_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.server_hostname = Some(hostname.into());
        self
    }

    /// Pin the session to a caller-configured network
    pub fn with_network(mut self, network: Network) -> Self {
        self.network = Some(network);
        self
    }

    /// Force port 4500 from the first packet
    pub fn with_force_encap_port(mut self, force: bool) -> Self {
        self.force_encap_port = force;
        self
    }

    /// Set NAT-T keepalive interval
    pub fn with_keepalive_interval(mut self, interval: Duration) -> Self {
        self.keepalive_interval = Some(interval);
        self
    }

    /// Set NAT-T keepalive interval in whole seconds
    pub fn with_keepalive_interval_secs(self, seconds: u64) -> Self {
        self.with_keepalive_interval(Duration::from_secs(seconds))
    }

    /// Enable mobility from the start
    pub fn with_mobility(mut self, enabled: bool) -> Self {
        self.mobility_enabled = enabled;
        self
    }

    /// Build ConnectionConfig with validation
    pub fn build(self) -> Result<ConnectionConfig> {
        let keepalive = match self.keepalive_interval {
            Some(interval) => KeepaliveConfig::new(interval),
            None => KeepaliveConfig::default(),
        };

        let config = ConnectionConfig {
            server_hostname: self
                .server_hostname
                .ok_or_else(|| Error::InvalidParameter("server_hostname is required".into()))?,
            network: self.network,
            force_encap_port: self.force_encap_port,
            keepalive,
            mobility_enabled: self.mobility_enabled,
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipsec::connection::keepalive::DEFAULT_KEEPALIVE_INTERVAL;

    #[test]
    fn test_connection_config_builder() {
        let config = ConnectionConfig::builder()
            .with_server_hostname("vpn.example.com")
            .build()
            .expect("Failed to build connection config");

        assert_eq!(config.server_hostname, "vpn.example.com");
        assert!(!config.uses_caller_configured_network());
        assert!(!config.force_encap_port);
        assert!(!config.mobility_enabled);
        assert_eq!(config.keepalive.interval, DEFAULT_KEEPALIVE_INTERVAL);
    }

    #[test]
    fn test_caller_configured_network() {
        let config = ConnectionConfig::builder()
            .with_server_hostname("vpn.example.com")
            .with_network(Network::new(42))
            .with_force_encap_port(true)
            .with_mobility(true)
            .with_keepalive_interval_secs(30)
            .build()
            .expect("Failed to build connection config");

        assert!(config.uses_caller_configured_network());
        assert_eq!(config.network, Some(Network::new(42)));
        assert!(config.force_encap_port);
        assert!(config.mobility_enabled);
        assert_eq!(config.keepalive.interval, Duration::from_secs(30));
    }

    #[test]
    fn test_config_validation() {
        // Missing hostname
        let result = ConnectionConfig::builder().build();
        assert!(matches!(result, Err(Error::InvalidParameter(_))));

        // Blank hostname
        let result = ConnectionConfig::builder()
            .with_server_hostname("  ")
            .build();
        assert!(result.is_err());

        // Keepalive too frequent
        let result = ConnectionConfig::builder()
            .with_server_hostname("vpn.example.com")
            .with_keepalive_interval_secs(5)
            .build();
        assert!(result.is_err());

        // Keepalive too rare
        let result = ConnectionConfig::builder()
            .with_server_hostname("vpn.example.com")
            .with_keepalive_interval_secs(7200)
            .build();
        assert!(result.is_err());
    }
}
