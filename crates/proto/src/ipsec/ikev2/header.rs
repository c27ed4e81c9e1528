//! IKE message header decoding for inbound demultiplexing

use crate::ipsec::{Error, Result};
use std::fmt;

/// IKE version 2 (major version = 2, minor version = 0)
pub const IKE_VERSION: u8 = 0x20;

/// Maximum IKE message size (64KB - 1)
pub const MAX_IKE_MESSAGE_SIZE: u32 = 65535;

/// IKE header size (28 bytes)
pub const IKE_HEADER_SIZE: usize = 28;

/// Exchange Types (RFC 7296 Section 3.1, RFC 4555 uses INFORMATIONAL)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ExchangeType {
    /// IKE_SA_INIT exchange (34)
    IkeSaInit = 34,
    /// IKE_AUTH exchange (35)
    IkeAuth = 35,
    /// CREATE_CHILD_SA exchange (36)
    CreateChildSa = 36,
    /// INFORMATIONAL exchange (37)
    Informational = 37,
}

impl ExchangeType {
    /// Convert from u8
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            34 => Some(ExchangeType::IkeSaInit),
            35 => Some(ExchangeType::IkeAuth),
            36 => Some(ExchangeType::CreateChildSa),
            37 => Some(ExchangeType::Informational),
            _ => None,
        }
    }
}

/// IKE message flags (bits 3-5 of the flags octet)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IkeFlags(u8);

impl IkeFlags {
    /// Response flag (bit 5)
    pub const RESPONSE: u8 = 0x20;
    /// Initiator flag (bit 3)
    pub const INITIATOR: u8 = 0x08;

    /// Create flags from the raw octet
    pub fn new(value: u8) -> Self {
        IkeFlags(value & 0x38)
    }

    /// Message was sent by the original initiator of the IKE SA
    pub fn is_initiator(self) -> bool {
        (self.0 & Self::INITIATOR) != 0
    }

    /// Message is a response
    pub fn is_response(self) -> bool {
        (self.0 & Self::RESPONSE) != 0
    }

    /// Raw value
    pub fn value(self) -> u8 {
        self.0
    }
}

/// Decoded IKE header handed to the session together with the raw packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IkeHeader {
    /// Initiator's SPI
    pub initiator_spi: u64,

    /// Responder's SPI (zero in the IKE_SA_INIT request)
    pub responder_spi: u64,

    /// Raw next payload type
    pub next_payload: u8,

    /// Exchange type
    pub exchange_type: ExchangeType,

    /// Message flags
    pub flags: IkeFlags,

    /// Message ID
    pub message_id: u32,

    /// Total message length in bytes (including header)
    pub length: u32,
}

impl IkeHeader {
    /// Decode the header at the start of `data`
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Buffer is too short (< 28 bytes)
    /// - Protocol version is not 0x20
    /// - Exchange type is unknown
    /// - Length field is out of range
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < IKE_HEADER_SIZE {
            return Err(Error::BufferTooShort {
                required: IKE_HEADER_SIZE,
                available: data.len(),
            });
        }

        let initiator_spi = u64::from_be_bytes(read_array(&data[0..8]));
        let responder_spi = u64::from_be_bytes(read_array(&data[8..16]));

        let version = data[17];
        if version != IKE_VERSION {
            return Err(Error::UnsupportedVersion(version));
        }

        let exchange_type =
            ExchangeType::from_u8(data[18]).ok_or(Error::UnsupportedExchangeType(data[18]))?;

        let message_id = u32::from_be_bytes(read_array(&data[20..24]));
        let length = u32::from_be_bytes(read_array(&data[24..28]));

        if length > MAX_IKE_MESSAGE_SIZE {
            return Err(Error::MessageTooLarge(length));
        }

        if length < IKE_HEADER_SIZE as u32 {
            return Err(Error::InvalidLength {
                expected: IKE_HEADER_SIZE,
                actual: length as usize,
            });
        }

        Ok(IkeHeader {
            initiator_spi,
            responder_spi,
            next_payload: data[16],
            exchange_type,
            flags: IkeFlags::new(data[19]),
            message_id,
            length,
        })
    }

    /// SPI that this side allocated for the IKE SA
    ///
    /// A message from the initiator is addressed to the responder, whose own
    /// SPI is the responder SPI, and the other way round.
    pub fn local_spi(&self) -> u64 {
        if self.flags.is_initiator() {
            self.responder_spi
        } else {
            self.initiator_spi
        }
    }

    /// Encode the header (used by tests and benchmarks to build packets)
    pub fn to_bytes(&self) -> [u8; IKE_HEADER_SIZE] {
        let mut bytes = [0u8; IKE_HEADER_SIZE];
        bytes[0..8].copy_from_slice(&self.initiator_spi.to_be_bytes());
        bytes[8..16].copy_from_slice(&self.responder_spi.to_be_bytes());
        bytes[16] = self.next_payload;
        bytes[17] = IKE_VERSION;
        bytes[18] = self.exchange_type as u8;
        bytes[19] = self.flags.value();
        bytes[20..24].copy_from_slice(&self.message_id.to_be_bytes());
        bytes[24..28].copy_from_slice(&self.length.to_be_bytes());
        bytes
    }
}

impl fmt::Display for IkeHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} spi_i={:016x} spi_r={:016x} msg_id={} {}",
            self.exchange_type,
            self.initiator_spi,
            self.responder_spi,
            self.message_id,
            if self.flags.is_response() { "response" } else { "request" }
        )
    }
}

fn read_array<const N: usize>(slice: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(slice);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_header(spi_i: u64, spi_r: u64, flags: u8) -> Vec<u8> {
        let mut data = vec![0u8; 28];
        data[0..8].copy_from_slice(&spi_i.to_be_bytes());
        data[8..16].copy_from_slice(&spi_r.to_be_bytes());
        data[16] = 33; // SA
        data[17] = 0x20;
        data[18] = 34; // IKE_SA_INIT
        data[19] = flags;
        data[20..24].copy_from_slice(&7u32.to_be_bytes());
        data[24..28].copy_from_slice(&28u32.to_be_bytes());
        data
    }

    #[test]
    fn test_header_parse() {
        let data = raw_header(0x0102030405060708, 0x1112131415161718, IkeFlags::INITIATOR);
        let header = IkeHeader::from_bytes(&data).unwrap();

        assert_eq!(header.initiator_spi, 0x0102030405060708);
        assert_eq!(header.responder_spi, 0x1112131415161718);
        assert_eq!(header.next_payload, 33);
        assert_eq!(header.exchange_type, ExchangeType::IkeSaInit);
        assert!(header.flags.is_initiator());
        assert!(!header.flags.is_response());
        assert_eq!(header.message_id, 7);
        assert_eq!(header.to_bytes().to_vec(), data);
    }

    #[test]
    fn test_local_spi_from_initiator() {
        // We are the responder: our SPI is the responder SPI
        let data = raw_header(0xAAAA, 0xBBBB, IkeFlags::INITIATOR);
        let header = IkeHeader::from_bytes(&data).unwrap();
        assert_eq!(header.local_spi(), 0xBBBB);
    }

    #[test]
    fn test_local_spi_from_responder() {
        let data = raw_header(0xAAAA, 0xBBBB, IkeFlags::RESPONSE);
        let header = IkeHeader::from_bytes(&data).unwrap();
        assert_eq!(header.local_spi(), 0xAAAA);
    }

    #[test]
    fn test_buffer_too_short() {
        let result = IkeHeader::from_bytes(&[0u8; 27]);
        assert!(matches!(result, Err(Error::BufferTooShort { .. })));
    }

    #[test]
    fn test_invalid_version() {
        let mut data = raw_header(1, 2, 0);
        data[17] = 0x10;
        assert!(matches!(
            IkeHeader::from_bytes(&data),
            Err(Error::UnsupportedVersion(0x10))
        ));
    }

    #[test]
    fn test_unknown_exchange_type() {
        let mut data = raw_header(1, 2, 0);
        data[18] = 99;
        assert!(matches!(
            IkeHeader::from_bytes(&data),
            Err(Error::UnsupportedExchangeType(99))
        ));
    }

    #[test]
    fn test_length_bounds() {
        let mut data = raw_header(1, 2, 0);
        data[24..28].copy_from_slice(&70000u32.to_be_bytes());
        assert!(matches!(
            IkeHeader::from_bytes(&data),
            Err(Error::MessageTooLarge(70000))
        ));

        data[24..28].copy_from_slice(&20u32.to_be_bytes());
        assert!(matches!(
            IkeHeader::from_bytes(&data),
            Err(Error::InvalidLength { .. })
        ));
    }
}
