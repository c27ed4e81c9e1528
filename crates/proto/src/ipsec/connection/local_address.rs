//! Local address selection

use crate::ipsec::{Error, Result};
use ikelink_platform::{AddressFamily, Network, RouteLookup};
use std::net::IpAddr;
use std::sync::Arc;

/// Picks the local address used to reach the server
///
/// Never caches: every call asks the platform again.
pub struct LocalAddressSelector {
    routes: Arc<dyn RouteLookup>,
}

impl LocalAddressSelector {
    /// Create a selector over a platform route lookup
    pub fn new(routes: Arc<dyn RouteLookup>) -> Self {
        LocalAddressSelector { routes }
    }

    /// Local address for `remote:port` on `network`
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoUsableLocalAddress`] if there is no route or the
    /// platform answers with an address of the wrong family.
    pub fn select(&self, network: Network, remote: IpAddr, port: u16) -> Result<IpAddr> {
        let local = self
            .routes
            .select_local_address(network, remote, port)
            .map_err(|e| {
                Error::NoUsableLocalAddress(format!("{}:{} on {}: {}", remote, port, network, e))
            })?;

        if AddressFamily::of(&local) != AddressFamily::of(&remote) {
            return Err(Error::NoUsableLocalAddress(format!(
                "{} does not match family of {}",
                local, remote
            )));
        }

        Ok(local)
    }
}
