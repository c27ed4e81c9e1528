//! IKE session connection layer
//!
//! This module keeps the UDP path of an IKEv2 session alive underneath the
//! protocol state machine:
//!
//! - **Address selection** - server resolution with retries, IPv6 preference
//!   when the network has global IPv6, local address lookup
//! - **NAT-T** (NAT Traversal) - RFC 3948 encapsulation socket and keepalives
//! - **MOBIKE** - RFC 4555 migration when the underlying network changes
//!
//! # Architecture
//!
//! ```text
//! IKE session (protocol state machine, out of scope)
//!   │  register_ike_spi / send_packet / NAT detection results
//!   ▼
//! IkeConnectionController
//!   ├── AddressResolver + LocalAddressSelector
//!   ├── SocketFactory (pooled per network and socket kind)
//!   ├── KeepaliveManager (IPv4 NAT-T only)
//!   └── NetworkWatcher
//!        ↓
//! Platform (ikelink-platform traits)
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use ikelink_proto::ipsec::{
//!     connection::{ConnectionDependencies, IkeConnectionCallback, IkeConnectionController},
//!     ikev2::IkeHeader,
//!     ConnectionConfig, Error,
//! };
//! use ikelink_platform::Network;
//!
//! struct Session;
//!
//! impl IkeConnectionCallback for Session {
//!     fn on_underlying_network_updated(&mut self) {
//!         println!("path changed, send MOBIKE UPDATE_SA_ADDRESSES");
//!     }
//!     fn on_underlying_network_died(&mut self, network: Network) {
//!         println!("{} is gone", network);
//!     }
//!     fn on_ike_packet_received(&mut self, header: IkeHeader, _packet: bytes::Bytes) {
//!         println!("message {} received", header.message_id);
//!     }
//!     fn on_error(&mut self, error: Error) {
//!         eprintln!("connection error: {}", error);
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConnectionConfig::builder()
//!         .with_server_hostname("vpn.example.com")
//!         .with_keepalive_interval_secs(20)
//!         .build()?;
//!
//!     let mut controller = IkeConnectionController::new(
//!         config,
//!         ConnectionDependencies::system(),
//!         Box::new(Session),
//!     )?;
//!     controller.set_up().await?;
//!
//!     let info = controller.build_connection_info()?;
//!     println!("talking to {}:{}", info.remote_address, info.remote_port);
//!
//!     controller.tear_down();
//!     Ok(())
//! }
//! ```
//!
//! # References
//!
//! - [RFC 7296](https://datatracker.ietf.org/doc/html/rfc7296) - IKEv2 Protocol
//! - [RFC 3948](https://datatracker.ietf.org/doc/html/rfc3948) - NAT Traversal
//! - [RFC 4555](https://datatracker.ietf.org/doc/html/rfc4555) - MOBIKE

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod connection;
pub mod error;
pub mod ikev2;
pub mod logging;
pub mod metrics;
pub mod nat;

// Re-export commonly used types
pub use config::{ConnectionBuilder, ConnectionConfig};
pub use connection::{
    ConnectionDependencies, ConnectionInfo, IkeConnectionCallback, IkeConnectionController,
    SocketKind,
};
pub use error::{Error, Result};
pub use metrics::{ConnectionMetrics, MetricsSnapshot};
pub use nat::NatTraversalStatus;
