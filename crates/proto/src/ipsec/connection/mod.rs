//! IKE session connection management
//!
//! Maintains the live network path of one IKE session: server address
//! resolution, local address selection, the UDP socket (plain or NAT-T
//! encapsulated), NAT-T keepalives and migration across networks (MOBIKE,
//! RFC 4555).
//!
//! # Architecture
//!
//! ```text
//!                 IkeConnectionController
//!        ┌──────────┬────────┴───────┬─────────────┐
//!  AddressResolver  LocalAddress   SocketFactory  NetworkWatcher
//!   (DnsResolver)   Selector        │   (pool)    (NetworkMonitor)
//!                  (RouteLookup)   IkeSocket ── KeepaliveManager
//!                                  (SocketProvider)
//! ```
//!
//! Platform callbacks never touch controller state. Socket receive handlers
//! and network callbacks push [`ConnectionEvent`]s onto the controller's
//! channel; the task that owns the controller drains it with
//! [`IkeConnectionController::next_event`] and
//! [`IkeConnectionController::handle_event`].

pub mod controller;
pub mod event;
pub mod keepalive;
pub mod local_address;
pub mod resolver;
pub mod socket;
pub mod system;
pub mod watcher;

#[cfg(test)]
pub(crate) mod testing;

pub use controller::{
    AddressPair, ConnectionDependencies, ConnectionInfo, ControllerState, IkeConnectionCallback,
    IkeConnectionController,
};
pub use event::ConnectionEvent;
pub use keepalive::{KeepaliveConfig, KeepaliveHandle, KeepaliveManager};
pub use local_address::LocalAddressSelector;
pub use resolver::{AddressResolver, ResolvedAddresses, MAX_DNS_RESOLUTION_ATTEMPTS};
pub use socket::{demultiplex, IkeSocket, OwnerId, SocketFactory, SocketKind};
pub use system::{ManualNetworkMonitor, SystemDnsResolver, SystemRouteLookup, SystemSocketProvider};
pub use watcher::{NetworkWatcher, WatchMode};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a mutex, recovering the data if a panicking thread poisoned it
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
