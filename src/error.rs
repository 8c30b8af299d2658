//! Error types for camwire-client.

use std::fmt;

use thiserror::Error;

/// Coarse category of a transport construction or connect failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Socket or secure context could not be created.
    CreateFailed,
    /// Stream connection could not be opened.
    ConnectFailed,
    /// Local bind failed.
    BindFailed,
    /// Listen failed.
    ListenFailed,
    /// Host name did not resolve to a usable address.
    HostLookupFailed,
    /// Secure transport library bootstrap failed.
    PlatformInitFailed,
}

/// Which layer a transport failure originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorLocation {
    /// Plain TCP stream.
    StreamProtocol,
    /// TLS layer.
    SecureTransport,
    /// Connectionless socket.
    DatagramProtocol,
}

impl fmt::Display for ErrorLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorLocation::StreamProtocol => f.write_str("tcp"),
            ErrorLocation::SecureTransport => f.write_str("tls"),
            ErrorLocation::DatagramProtocol => f.write_str("udp"),
        }
    }
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            TransportErrorKind::CreateFailed => "cannot create socket",
            TransportErrorKind::ConnectFailed => "cannot connect socket",
            TransportErrorKind::BindFailed => "cannot bind socket",
            TransportErrorKind::ListenFailed => "socket failed to listen",
            TransportErrorKind::HostLookupFailed => "cannot resolve host",
            TransportErrorKind::PlatformInitFailed => "cannot initialize transport library",
        };
        f.write_str(msg)
    }
}

fn location_suffix(location: &Option<ErrorLocation>) -> String {
    match location {
        Some(loc) => format!(" ({})", loc),
        None => String::new(),
    }
}

/// Main error type for all camwire operations.
#[derive(Debug, Error)]
pub enum CamwireError {
    /// Transport construction or connect failure.
    #[error("{kind}{}: {detail}", location_suffix(.location))]
    Transport {
        kind: TransportErrorKind,
        location: Option<ErrorLocation>,
        detail: String,
    },

    /// I/O error on an established connection.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Secure handshake failed and the session is configured to fail closed.
    #[error("TLS handshake failed: {0}")]
    TlsHandshake(String),

    /// A receive did not complete within its timeout.
    #[error("Receive timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Peer closed the stream.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Operation requires a connected transport.
    #[error("Not connected")]
    NotConnected,

    /// Access credential does not fit the login field.
    #[error("Access code is {len} bytes, maximum is {max}")]
    CredentialTooLong { len: usize, max: usize },

    /// Client identifier does not fit the login field.
    #[error("Client identifier is {len} bytes, maximum is {max}")]
    IdentifierTooLong { len: usize, max: usize },

    /// Length-prefixed header declared more than the configured cap.
    #[error("Payload size {len} exceeds maximum {max}")]
    PayloadTooLarge { len: u32, max: u32 },

    /// Writing to the output sink failed.
    #[error("Sink write failed: {0}")]
    Sink(#[source] std::io::Error),

    /// Invalid configuration.
    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),
}

impl CamwireError {
    /// Build a transport error with a location tag.
    pub fn transport(
        kind: TransportErrorKind,
        location: ErrorLocation,
        detail: impl fmt::Display,
    ) -> Self {
        CamwireError::Transport {
            kind,
            location: Some(location),
            detail: detail.to_string(),
        }
    }

    /// Build a transport error without a location tag.
    pub fn transport_untagged(kind: TransportErrorKind, detail: impl fmt::Display) -> Self {
        CamwireError::Transport {
            kind,
            location: None,
            detail: detail.to_string(),
        }
    }

    /// Category of a transport failure, if this is one.
    pub fn transport_kind(&self) -> Option<TransportErrorKind> {
        match self {
            CamwireError::Transport { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

/// Result type alias using CamwireError.
pub type Result<T> = std::result::Result<T, CamwireError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_message_with_location() {
        let err = CamwireError::transport(
            TransportErrorKind::ConnectFailed,
            ErrorLocation::StreamProtocol,
            "connection refused",
        );
        assert_eq!(
            err.to_string(),
            "cannot connect socket (tcp): connection refused"
        );
        assert_eq!(err.transport_kind(), Some(TransportErrorKind::ConnectFailed));
    }

    #[test]
    fn test_transport_error_message_without_location() {
        let err =
            CamwireError::transport_untagged(TransportErrorKind::HostLookupFailed, "no.such.host");
        assert_eq!(err.to_string(), "cannot resolve host: no.such.host");
    }

    #[test]
    fn test_non_transport_error_has_no_kind() {
        assert!(CamwireError::ConnectionClosed.transport_kind().is_none());
    }
}
