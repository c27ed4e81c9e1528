//! Events delivered to the connection controller's sequencing context

use crate::ipsec::ikev2::IkeHeader;
use bytes::Bytes;
use ikelink_platform::Network;
use tokio::sync::mpsc;

/// Something the controller must react to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// An IKE message arrived for a registered SPI
    PacketReceived {
        /// Decoded header
        header: IkeHeader,
        /// IKE message without any Non-ESP marker
        packet: Bytes,
    },

    /// The tracked network changed in a way that may require migration
    NetworkUpdated {
        /// Watch registration that produced the event
        generation: u64,
        /// Network the session should run on now
        network: Network,
    },

    /// The tracked network is gone
    NetworkLost {
        /// Watch registration that produced the event
        generation: u64,
        /// Network that was lost
        network: Network,
    },
}

impl ConnectionEvent {
    /// Watch generation for network events, `None` for packets
    pub fn generation(&self) -> Option<u64> {
        match self {
            ConnectionEvent::PacketReceived { .. } => None,
            ConnectionEvent::NetworkUpdated { generation, .. }
            | ConnectionEvent::NetworkLost { generation, .. } => Some(*generation),
        }
    }
}

/// Sending half of the controller's event channel
pub type EventSender = mpsc::UnboundedSender<ConnectionEvent>;

/// Receiving half of the controller's event channel
pub type EventReceiver = mpsc::UnboundedReceiver<ConnectionEvent>;
