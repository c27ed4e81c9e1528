//! Error types for platform operations

use std::fmt;

/// Unified error type for all platform collaborators
#[derive(Debug)]
pub enum PlatformError {
    /// I/O error from the operating system
    Io(std::io::Error),

    /// Name resolution failed
    Dns(String),

    /// No route to the requested destination
    NoRoute(String),

    /// The referenced network is unknown or gone
    NetworkUnavailable(String),

    /// Socket could not be created or configured
    Socket(String),

    /// Not supported on this platform
    NotSupported(String),

    /// Other error
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for PlatformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlatformError::Io(e) => write!(f, "IO error: {}", e),
            PlatformError::Dns(msg) => write!(f, "DNS error: {}", msg),
            PlatformError::NoRoute(msg) => write!(f, "No route: {}", msg),
            PlatformError::NetworkUnavailable(msg) => write!(f, "Network unavailable: {}", msg),
            PlatformError::Socket(msg) => write!(f, "Socket error: {}", msg),
            PlatformError::NotSupported(msg) => write!(f, "Not supported: {}", msg),
            PlatformError::Other(e) => write!(f, "Error: {}", e),
        }
    }
}

impl std::error::Error for PlatformError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PlatformError::Io(e) => Some(e),
            PlatformError::Other(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PlatformError {
    fn from(err: std::io::Error) -> Self {
        PlatformError::Io(err)
    }
}

/// Result type for platform operations
pub type PlatformResult<T> = Result<T, PlatformError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PlatformError::Dns("vpn.example.com: no answer".to_string());
        assert_eq!(err.to_string(), "DNS error: vpn.example.com: no answer");

        let err = PlatformError::NoRoute("2001:db8::1".to_string());
        assert_eq!(err.to_string(), "No route: 2001:db8::1");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::AddrInUse, "port busy");
        let err: PlatformError = io_err.into();
        assert!(matches!(err, PlatformError::Io(_)));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_result_type() {
        fn example() -> PlatformResult<u16> {
            Ok(4500)
        }

        assert_eq!(example().unwrap(), 4500);
    }
}
