//! NAT Traversal (NAT-T) Support
//!
//! Constants, NAT detection hashing and UDP encapsulation framing as defined
//! in RFC 3948 and RFC 7296 Section 2.23.
//!
//! # Overview
//!
//! The connection controller starts on UDP port 500. When the IKE_SA_INIT
//! NAT detection payloads show a translator on the path, it floats to port
//! 4500 on an encapsulation socket and keeps the NAT mapping alive with
//! one-octet keepalives.
//!
//! # NAT Detection Algorithm
//!
//! ```text
//! HASH = SHA-1(SPIi | SPIr | IP | Port)
//!
//! Each peer sends:
//! - NAT_DETECTION_SOURCE_IP: SHA-1(SPIi | SPIr | Local_IP | Local_Port)
//! - NAT_DETECTION_DESTINATION_IP: SHA-1(SPIi | SPIr | Remote_IP | Remote_Port)
//! ```
//!
//! # Port 4500 Framing
//!
//! ```text
//! IKE message:     | Non-ESP Marker (0x00000000) | IKE Message |
//! ESP packet:      | ESP Packet (starts with non-zero SPI)     |
//! NAT keepalive:   | 0xFF |
//! ```
//!
//! # References
//!
//! - [RFC 3948](https://datatracker.ietf.org/doc/html/rfc3948) - UDP Encapsulation
//! - [RFC 7296 Section 2.23](https://datatracker.ietf.org/doc/html/rfc7296#section-2.23) - NAT Detection

use crate::ipsec::{Error, Result};
use sha1::{Digest, Sha1};
use std::net::IpAddr;

/// Default IKE port (UDP 500)
pub const IKE_PORT: u16 = 500;

/// NAT-T port (UDP 4500)
pub const NAT_T_PORT: u16 = 4500;

/// Non-ESP marker (4 bytes of zeros)
///
/// Prepended to IKE messages when using port 4500 to distinguish
/// them from ESP packets (which start with a non-zero SPI).
pub const NON_ESP_MARKER: [u8; 4] = [0, 0, 0, 0];

/// NAT-keepalive packet (RFC 3948 Section 2.3)
pub const NAT_KEEPALIVE_PACKET: [u8; 1] = [0xFF];

/// NAT traversal status of a connection
///
/// Once `Unsupported` or `Detected` is recorded it governs the port and
/// socket kind chosen for every later migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NatTraversalStatus {
    /// NAT detection has not run yet
    #[default]
    NotChecked,

    /// The peer did not send NAT detection payloads
    Unsupported,

    /// NAT detection ran and found no translator
    NotDetected,

    /// A translator sits on the path
    Detected,
}

impl NatTraversalStatus {
    /// Whether NAT detection ran and the peer takes part in NAT-T (port 4500)
    ///
    /// `NotChecked` is not support: until IKE_SA_INIT answers, port 500 is used.
    pub fn is_nat_t_supported(self) -> bool {
        matches!(
            self,
            NatTraversalStatus::NotDetected | NatTraversalStatus::Detected
        )
    }
}

/// Length of a NAT detection hash (SHA-1)
pub const NAT_DETECTION_HASH_LEN: usize = 20;

/// SHA-1(SPIi | SPIr | IP | Port) carried in NAT_DETECTION_*_IP notifies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NatDetectionHash(pub [u8; NAT_DETECTION_HASH_LEN]);

impl NatDetectionHash {
    /// Hash one endpoint of the IKE SA identified by `spi_i`/`spi_r`
    pub fn compute(spi_i: u64, spi_r: u64, ip: IpAddr, port: u16) -> Self {
        let mut hasher = Sha1::new()
            .chain_update(spi_i.to_be_bytes())
            .chain_update(spi_r.to_be_bytes());
        match ip {
            IpAddr::V4(v4) => hasher.update(v4.octets()),
            IpAddr::V6(v6) => hasher.update(v6.octets()),
        }
        hasher.update(port.to_be_bytes());

        let mut hash = [0u8; NAT_DETECTION_HASH_LEN];
        hash.copy_from_slice(&hasher.finalize());
        NatDetectionHash(hash)
    }

    /// Raw hash bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl TryFrom<&[u8]> for NatDetectionHash {
    type Error = Error;

    fn try_from(data: &[u8]) -> Result<Self> {
        let hash = <[u8; NAT_DETECTION_HASH_LEN]>::try_from(data).map_err(|_| {
            Error::InvalidLength {
                expected: NAT_DETECTION_HASH_LEN,
                actual: data.len(),
            }
        })?;
        Ok(NatDetectionHash(hash))
    }
}

/// Which side of the path sits behind a translator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NatDetectionOutcome {
    /// The peer saw a different source address than ours
    pub local_behind_nat: bool,
    /// None of the peer's source hashes matches the address we sent to
    pub peer_behind_nat: bool,
}

impl NatDetectionOutcome {
    /// Any translator on the path; this is what the controller acts on
    pub fn is_nat_present(&self) -> bool {
        self.local_behind_nat || self.peer_behind_nat
    }
}

/// NAT detection hashes of one path
///
/// Built from [`ConnectionInfo`](crate::ipsec::connection::ConnectionInfo)
/// once the responder SPI is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NatDetection {
    source: NatDetectionHash,
    destination: NatDetectionHash,
}

impl NatDetection {
    /// Hash both endpoints of the path
    pub fn new(
        spi_i: u64,
        spi_r: u64,
        local_ip: IpAddr,
        local_port: u16,
        remote_ip: IpAddr,
        remote_port: u16,
    ) -> Self {
        NatDetection {
            source: NatDetectionHash::compute(spi_i, spi_r, local_ip, local_port),
            destination: NatDetectionHash::compute(spi_i, spi_r, remote_ip, remote_port),
        }
    }

    /// Payload for our NAT_DETECTION_SOURCE_IP
    pub fn source(&self) -> &NatDetectionHash {
        &self.source
    }

    /// Payload for our NAT_DETECTION_DESTINATION_IP
    pub fn destination(&self) -> &NatDetectionHash {
        &self.destination
    }

    /// Compare against what the peer sent
    ///
    /// A multihomed peer may send several source hashes; one match is enough.
    pub fn evaluate(
        &self,
        peer_sources: &[NatDetectionHash],
        peer_destination: &NatDetectionHash,
    ) -> NatDetectionOutcome {
        NatDetectionOutcome {
            local_behind_nat: *peer_destination != self.source,
            peer_behind_nat: !peer_sources.contains(&self.destination),
        }
    }
}

/// A datagram received on port 4500
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncapDatagram<'a> {
    /// IKE message with the Non-ESP marker removed
    Ike(&'a [u8]),
    /// ESP packet, starting with its SPI
    Esp(&'a [u8]),
    /// One-octet NAT keepalive
    Keepalive,
}

impl<'a> EncapDatagram<'a> {
    /// Classify a port 4500 datagram
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidLength`] for datagrams shorter than the marker
    /// that are not keepalives.
    pub fn classify(data: &'a [u8]) -> Result<Self> {
        match data {
            [0xFF] => Ok(EncapDatagram::Keepalive),
            [0, 0, 0, 0, message @ ..] => Ok(EncapDatagram::Ike(message)),
            [_, _, _, _, ..] => Ok(EncapDatagram::Esp(data)),
            _ => Err(Error::InvalidLength {
                expected: NON_ESP_MARKER.len(),
                actual: data.len(),
            }),
        }
    }
}

/// Prefix an IKE message with the Non-ESP marker for port 4500
pub fn frame_ike(message: &[u8]) -> Vec<u8> {
    let mut framed = Vec::with_capacity(NON_ESP_MARKER.len() + message.len());
    framed.extend_from_slice(&NON_ESP_MARKER);
    framed.extend_from_slice(message);
    framed
}
