//! Error types for IKE connection operations
//!
//! This module defines a unified error type for the connection layer,
//! covering address resolution, socket management, NAT traversal and
//! mobility.

use ikelink_platform::PlatformError;
use std::fmt;

/// Result type for IPSec operations
pub type Result<T> = std::result::Result<T, Error>;

/// IKE connection errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// DNS resolution returned no address within the retry budget
    Resolution {
        /// Hostname that was looked up
        hostname: String,
        /// Number of attempts made
        attempts: u32,
    },

    /// Neither address family has a usable remote address
    NoUsableRemoteAddress(String),

    /// The platform could not produce a local address for the remote
    NoUsableLocalAddress(String),

    /// Socket could not be opened
    SocketOpen(String),

    /// Operation not supported by this design (e.g. IPv6 NAT-T)
    UnsupportedOperation(String),

    /// Operation not allowed in the current state
    IllegalState(String),

    /// No network to run the session on
    NoActiveNetwork,

    /// Invalid configuration parameter
    InvalidParameter(String),

    /// Invalid IKE message format
    InvalidMessage(String),

    /// Unsupported protocol version
    UnsupportedVersion(u8),

    /// Unsupported exchange type
    UnsupportedExchangeType(u8),

    /// Message too large
    MessageTooLarge(u32),

    /// Invalid packet length
    InvalidLength {
        /// Expected length
        expected: usize,
        /// Actual length
        actual: usize,
    },

    /// Buffer too short for operation
    BufferTooShort {
        /// Required length
        required: usize,
        /// Available length
        available: usize,
    },

    /// I/O error
    Io(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Resolution { hostname, attempts } => {
                write!(
                    f,
                    "Failed to resolve {} after {} attempts",
                    hostname, attempts
                )
            }
            Error::NoUsableRemoteAddress(msg) => {
                write!(f, "No usable remote address: {}", msg)
            }
            Error::NoUsableLocalAddress(msg) => {
                write!(f, "No usable local address: {}", msg)
            }
            Error::SocketOpen(msg) => write!(f, "Failed to open socket: {}", msg),
            Error::UnsupportedOperation(msg) => write!(f, "Unsupported operation: {}", msg),
            Error::IllegalState(msg) => write!(f, "Illegal state: {}", msg),
            Error::NoActiveNetwork => write!(f, "No active network available"),
            Error::InvalidParameter(msg) => write!(f, "Invalid parameter: {}", msg),
            Error::InvalidMessage(msg) => write!(f, "Invalid IKE message: {}", msg),
            Error::UnsupportedVersion(v) => {
                write!(f, "Unsupported IKE version: 0x{:02x}", v)
            }
            Error::UnsupportedExchangeType(t) => {
                write!(f, "Unsupported exchange type: {}", t)
            }
            Error::MessageTooLarge(size) => {
                write!(f, "IKE message too large: {} bytes", size)
            }
            Error::InvalidLength { expected, actual } => {
                write!(
                    f,
                    "Invalid length: expected {}, got {}",
                    expected, actual
                )
            }
            Error::BufferTooShort {
                required,
                available,
            } => {
                write!(
                    f,
                    "Buffer too short: need {} bytes, have {}",
                    required, available
                )
            }
            Error::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<PlatformError> for Error {
    fn from(err: PlatformError) -> Self {
        match err {
            PlatformError::NoRoute(msg) => Error::NoUsableLocalAddress(msg),
            PlatformError::Socket(msg) => Error::SocketOpen(msg),
            PlatformError::NetworkUnavailable(_) => Error::NoActiveNetwork,
            PlatformError::NotSupported(msg) => Error::UnsupportedOperation(msg),
            other => Error::Io(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Resolution {
            hostname: "vpn.example.com".to_string(),
            attempts: 3,
        };
        assert_eq!(
            err.to_string(),
            "Failed to resolve vpn.example.com after 3 attempts"
        );

        let err = Error::UnsupportedVersion(0x10);
        assert_eq!(err.to_string(), "Unsupported IKE version: 0x10");

        let err = Error::InvalidLength {
            expected: 10,
            actual: 5,
        };
        assert_eq!(err.to_string(), "Invalid length: expected 10, got 5");
    }

    #[test]
    fn test_error_clone() {
        let err1 = Error::UnsupportedOperation("IPv6 NAT-T".into());
        let err2 = err1.clone();
        assert_eq!(err1, err2);
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::AddrInUse, "address in use");
        let err: Error = io_err.into();
        match err {
            Error::Io(msg) => assert!(msg.contains("address in use")),
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_platform_error_conversion() {
        let err: Error = PlatformError::NoRoute("10.0.0.5".into()).into();
        assert_eq!(err, Error::NoUsableLocalAddress("10.0.0.5".into()));

        let err: Error = PlatformError::Socket("EMFILE".into()).into();
        assert_eq!(err, Error::SocketOpen("EMFILE".into()));

        let err: Error = PlatformError::Dns("timeout".into()).into();
        assert!(matches!(err, Error::Io(_)));
    }
}
