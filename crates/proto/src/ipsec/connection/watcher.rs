//! Network change watcher
//!
//! Translates raw platform notifications into [`ConnectionEvent`]s for the
//! controller. It filters and forwards; deciding whether to migrate is the
//! controller's job.
//!
//! | Mode     | Platform event                          | Forwarded as     |
//! |----------|-----------------------------------------|------------------|
//! | specific | `Lost(tracked)`                         | `NetworkLost`    |
//! | specific | link change dropping the local address  | `NetworkUpdated` |
//! | default  | `Available(other)`                      | `NetworkUpdated` |
//! | default  | link change dropping the local address  | `NetworkUpdated` |
//! | default  | `Lost(tracked)`                         | `NetworkLost`    |

use super::event::{ConnectionEvent, EventSender};
use super::lock;
use crate::ipsec::Result;
use ikelink_platform::{CallbackId, Network, NetworkEvent, NetworkMonitor, NetworkRequest};
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// What the watcher follows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchMode {
    /// The caller-configured network
    SpecificNetwork,
    /// Whichever network is the system default
    DefaultNetwork,
}

#[derive(Debug, Clone, Copy)]
struct Tracked {
    mode: WatchMode,
    network: Network,
    local: IpAddr,
    generation: u64,
}

impl Tracked {
    fn filter(&self, event: &NetworkEvent) -> Option<ConnectionEvent> {
        let generation = self.generation;
        match (self.mode, event) {
            (_, NetworkEvent::Lost(network)) if *network == self.network => {
                Some(ConnectionEvent::NetworkLost {
                    generation,
                    network: *network,
                })
            }
            (_, NetworkEvent::LinkPropertiesChanged(network, link))
                if *network == self.network && !link.has_address(&self.local) =>
            {
                Some(ConnectionEvent::NetworkUpdated {
                    generation,
                    network: *network,
                })
            }
            (WatchMode::DefaultNetwork, NetworkEvent::Available(network))
                if *network != self.network =>
            {
                Some(ConnectionEvent::NetworkUpdated {
                    generation,
                    network: *network,
                })
            }
            _ => None,
        }
    }
}

/// Holds the controller's single network-change registration
pub struct NetworkWatcher {
    monitor: Arc<dyn NetworkMonitor>,
    registration: Option<CallbackId>,
    tracked: Arc<Mutex<Option<Tracked>>>,
    generation: u64,
}

impl NetworkWatcher {
    /// Create an idle watcher
    pub fn new(monitor: Arc<dyn NetworkMonitor>) -> Self {
        NetworkWatcher {
            monitor,
            registration: None,
            tracked: Arc::new(Mutex::new(None)),
            generation: 0,
        }
    }

    /// Register for `mode`, cancelling any previous registration first
    ///
    /// Returns the generation stamped on the new registration's events.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform refuses the registration
    pub fn watch(
        &mut self,
        mode: WatchMode,
        network: Network,
        local: IpAddr,
        events: EventSender,
    ) -> Result<u64> {
        self.cancel();

        self.generation += 1;
        let tracked = Arc::new(Mutex::new(Some(Tracked {
            mode,
            network,
            local,
            generation: self.generation,
        })));

        let request = match mode {
            WatchMode::SpecificNetwork => NetworkRequest::Specific(network),
            WatchMode::DefaultNetwork => NetworkRequest::Default,
        };
        let callback = {
            let tracked = tracked.clone();
            Box::new(move |event: NetworkEvent| {
                let forwarded = lock(&tracked).as_ref().and_then(|t| t.filter(&event));
                if let Some(forwarded) = forwarded {
                    // Receiver gone means the controller is being dropped
                    let _ = events.send(forwarded);
                }
            })
        };

        let id = self.monitor.register_callback(request, callback)?;
        debug!(mode = ?mode, network = %network, generation = self.generation, "Network watch registered");
        self.registration = Some(id);
        self.tracked = tracked;
        Ok(self.generation)
    }

    /// Follow `network` and `local` after a migration without re-registering
    pub fn set_tracked(&mut self, network: Network, local: IpAddr) {
        if let Some(tracked) = lock(&self.tracked).as_mut() {
            tracked.network = network;
            tracked.local = local;
        }
    }

    /// Unregister; no events of the current generation follow
    pub fn cancel(&mut self) {
        if let Some(id) = self.registration.take() {
            *lock(&self.tracked) = None;
            self.monitor.unregister_callback(id);
            debug!(generation = self.generation, "Network watch cancelled");
        }
    }

    /// Generation of the current registration
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Current mode, `None` when not registered
    pub fn mode(&self) -> Option<WatchMode> {
        lock(&self.tracked).map(|t| t.mode)
    }

    /// Network currently followed
    pub fn tracked_network(&self) -> Option<Network> {
        lock(&self.tracked).map(|t| t.network)
    }

    /// Whether a registration is active
    pub fn is_registered(&self) -> bool {
        self.registration.is_some()
    }
}

impl Drop for NetworkWatcher {
    fn drop(&mut self) {
        self.cancel();
    }
}
