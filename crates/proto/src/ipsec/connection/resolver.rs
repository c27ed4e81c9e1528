//! Server address resolution with bounded retry

use crate::ipsec::{logging, metrics::ConnectionMetrics, Error, Result};
use ikelink_platform::{DnsResolver, Network};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::Arc;

/// Number of DNS attempts before resolution fails
pub const MAX_DNS_RESOLUTION_ATTEMPTS: u32 = 3;

/// Server addresses split by family, in resolver order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedAddresses {
    /// IPv4 addresses
    pub ipv4: Vec<Ipv4Addr>,
    /// IPv6 addresses
    pub ipv6: Vec<Ipv6Addr>,
}

impl ResolvedAddresses {
    /// Split addresses by family, dropping duplicates
    pub fn from_addrs(addrs: impl IntoIterator<Item = IpAddr>) -> Self {
        let mut resolved = ResolvedAddresses::default();
        for addr in addrs {
            match addr {
                IpAddr::V4(v4) if !resolved.ipv4.contains(&v4) => resolved.ipv4.push(v4),
                IpAddr::V6(v6) if !resolved.ipv6.contains(&v6) => resolved.ipv6.push(v6),
                _ => {}
            }
        }
        resolved
    }

    /// No address of either family
    pub fn is_empty(&self) -> bool {
        self.ipv4.is_empty() && self.ipv6.is_empty()
    }
}

/// Resolves the server hostname on a given network
pub struct AddressResolver {
    dns: Arc<dyn DnsResolver>,
    metrics: ConnectionMetrics,
}

impl AddressResolver {
    /// Create a resolver over a platform DNS implementation
    pub fn new(dns: Arc<dyn DnsResolver>, metrics: ConnectionMetrics) -> Self {
        AddressResolver { dns, metrics }
    }

    /// Resolve `hostname` on `network`
    ///
    /// IP literals are returned without a lookup. A lookup error counts as an
    /// attempt that returned nothing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Resolution`] when all [`MAX_DNS_RESOLUTION_ATTEMPTS`]
    /// attempts came back empty.
    pub async fn resolve(&self, network: Network, hostname: &str) -> Result<ResolvedAddresses> {
        if let Ok(literal) = hostname.parse::<IpAddr>() {
            return Ok(ResolvedAddresses::from_addrs([literal]));
        }

        for attempt in 1..=MAX_DNS_RESOLUTION_ATTEMPTS {
            match self.dns.resolve(network, hostname).await {
                Ok(addrs) if !addrs.is_empty() => {
                    let resolved = ResolvedAddresses::from_addrs(addrs);
                    logging::log_dns_resolved(hostname, resolved.ipv4.len(), resolved.ipv6.len());
                    self.metrics.record_dns_resolution(true);
                    return Ok(resolved);
                }
                Ok(_) => logging::log_dns_attempt_failed(hostname, attempt, "no addresses"),
                Err(e) => logging::log_dns_attempt_failed(hostname, attempt, &e.to_string()),
            }
        }

        self.metrics.record_dns_resolution(false);
        Err(Error::Resolution {
            hostname: hostname.to_string(),
            attempts: MAX_DNS_RESOLUTION_ATTEMPTS,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipsec::connection::testing::ScriptedResolver;
    use ikelink_platform::PlatformError;

    const NET: Network = Network::new(1);

    #[test]
    fn test_from_addrs_splits_and_dedups() {
        let addrs: Vec<IpAddr> = vec![
            "10.0.0.5".parse().unwrap(),
            "2001:db8::1".parse().unwrap(),
            "10.0.0.5".parse().unwrap(),
            "10.0.0.6".parse().unwrap(),
        ];
        let resolved = ResolvedAddresses::from_addrs(addrs);

        assert_eq!(resolved.ipv4, vec![Ipv4Addr::new(10, 0, 0, 5), Ipv4Addr::new(10, 0, 0, 6)]);
        assert_eq!(resolved.ipv6.len(), 1);
        assert!(!resolved.is_empty());
    }

    #[tokio::test]
    async fn test_resolve_first_attempt() {
        let dns = Arc::new(ScriptedResolver::answering(vec!["10.0.0.5".parse().unwrap()]));
        let resolver = AddressResolver::new(dns.clone(), ConnectionMetrics::new());

        let resolved = resolver.resolve(NET, "vpn.example.com").await.unwrap();
        assert_eq!(resolved.ipv4, vec![Ipv4Addr::new(10, 0, 0, 5)]);
        assert_eq!(dns.calls(), 1);
    }

    #[tokio::test]
    async fn test_resolve_retries_after_empty_and_error() {
        let dns = Arc::new(ScriptedResolver::answering(vec!["2001:db8::1".parse().unwrap()]));
        dns.push(Ok(vec![]));
        dns.push(Err(PlatformError::Dns("timeout".into())));
        let resolver = AddressResolver::new(dns.clone(), ConnectionMetrics::new());

        let resolved = resolver.resolve(NET, "vpn.example.com").await.unwrap();
        assert_eq!(resolved.ipv6.len(), 1);
        assert_eq!(dns.calls(), 3);
    }

    #[tokio::test]
    async fn test_resolve_gives_up_after_three_empty_answers() {
        let dns = Arc::new(ScriptedResolver::answering(vec![]));
        let metrics = ConnectionMetrics::new();
        let resolver = AddressResolver::new(dns.clone(), metrics.clone());

        let err = resolver.resolve(NET, "vpn.example.com").await.unwrap_err();
        assert_eq!(
            err,
            Error::Resolution {
                hostname: "vpn.example.com".into(),
                attempts: MAX_DNS_RESOLUTION_ATTEMPTS
            }
        );
        assert_eq!(dns.calls(), 3);
        assert_eq!(metrics.snapshot().dns_failures, 1);
    }

    #[tokio::test]
    async fn test_ip_literal_skips_dns() {
        let dns = Arc::new(ScriptedResolver::answering(vec![]));
        let resolver = AddressResolver::new(dns.clone(), ConnectionMetrics::new());

        let resolved = resolver.resolve(NET, "192.0.2.7").await.unwrap();
        assert_eq!(resolved.ipv4, vec![Ipv4Addr::new(192, 0, 2, 7)]);
        assert_eq!(dns.calls(), 0);
    }
}
