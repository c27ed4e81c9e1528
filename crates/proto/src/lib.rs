//! Connection layer for IKEv2 sessions.
//!
//! This crate keeps the network path of an IKE session alive:
//!
//! - **Server addressing** - DNS with retries and IPv4/IPv6 selection
//! - **NAT-T** - switching to the UDP 4500 encapsulation socket and keepalives
//! - **Mobility** - migrating the session when the underlying network changes
//!
//! # Features
//!
//! - `ipsec` (default) - IKE connection controller
//!
//! # Example
//!
//! ```rust
//! use ikelink_proto::ipsec::connection::{demultiplex, SocketKind};
//! use ikelink_proto::ipsec::nat::NAT_KEEPALIVE_PACKET;
//!
//! // A keepalive arriving on the NAT-T port never reaches the IKE layer
//! let parsed = demultiplex(SocketKind::EncapV4, &NAT_KEEPALIVE_PACKET).unwrap();
//! assert!(parsed.is_none());
//! ```
//!
//! # References
//!
//! - [RFC 7296](https://datatracker.ietf.org/doc/html/rfc7296) - IKEv2 Protocol
//! - [RFC 3948](https://datatracker.ietf.org/doc/html/rfc3948) - UDP Encapsulation of IPsec ESP Packets
//! - [RFC 4555](https://datatracker.ietf.org/doc/html/rfc4555) - IKEv2 Mobility and Multihoming Protocol (MOBIKE)

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

#[cfg(feature = "ipsec")]
pub mod ipsec;
