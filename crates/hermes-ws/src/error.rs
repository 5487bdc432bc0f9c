//! Error types for WebSocket operations.

use std::fmt;
use thiserror::Error;

/// Result type for WebSocket operations.
pub type WsResult<T> = Result<T, WsError>;

/// Errors that can occur during WebSocket operations.
///
/// Connection errors are terminal for the connection that raised them and
/// never affect other connections on the same route.
#[derive(Debug, Error)]
pub enum WsError {
    /// The upgrade request failed validation and was rejected.
    ///
    /// The client gets an HTTP error response; the connection never enters
    /// the registry.
    #[error("handshake rejected: {reason}")]
    HandshakeRejected {
        /// Why the handshake was rejected.
        reason: String,
    },

    /// The WebSocket connection was closed.
    #[error("connection closed: {reason}")]
    ConnectionClosed {
        /// Optional close code from the peer.
        code: Option<u16>,
        /// Reason for closing.
        reason: String,
    },

    /// Failed to send a frame.
    #[error("failed to send frame: {0}")]
    SendFailed(String),

    /// A send did not finish within the route's send timeout.
    #[error("send timed out for connection {connection_id}")]
    SendTimedOut {
        /// The connection that stalled.
        connection_id: String,
    },

    /// Failed to receive a frame.
    #[error("failed to receive frame: {0}")]
    ReceiveFailed(String),

    /// No frame arrived within the route's receive timeout.
    #[error("receive timed out for connection {connection_id}")]
    ReceiveTimedOut {
        /// The connection that went silent.
        connection_id: String,
    },

    /// The frame payload could not be decoded.
    #[error("failed to decode frame: {0}")]
    DecodeFailed(String),

    /// The frame payload could not be encoded.
    #[error("failed to encode frame: {0}")]
    EncodeFailed(String),

    /// Connection not found in the registry.
    #[error("connection not found: {connection_id}")]
    ConnectionNotFound {
        /// The ID that had no registry entry.
        connection_id: String,
    },

    /// Completing the HTTP upgrade failed.
    #[error("upgrade failed: {0}")]
    UpgradeFailed(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Tungstenite error.
    #[error("tungstenite error: {0}")]
    Tungstenite(#[from] tungstenite::Error),
}

impl WsError {
    /// Create a new handshake rejected error.
    pub fn handshake_rejected(reason: impl Into<String>) -> Self {
        Self::HandshakeRejected {
            reason: reason.into(),
        }
    }

    /// Create a new connection closed error.
    pub fn connection_closed(code: Option<u16>, reason: impl Into<String>) -> Self {
        Self::ConnectionClosed {
            code,
            reason: reason.into(),
        }
    }

    /// Create a new send failed error.
    pub fn send_failed(reason: impl Into<String>) -> Self {
        Self::SendFailed(reason.into())
    }

    /// Create a new send timed out error.
    pub fn send_timed_out(connection_id: impl ToString) -> Self {
        Self::SendTimedOut {
            connection_id: connection_id.to_string(),
        }
    }

    /// Create a new receive failed error.
    pub fn receive_failed(reason: impl Into<String>) -> Self {
        Self::ReceiveFailed(reason.into())
    }

    /// Create a new receive timed out error.
    pub fn receive_timed_out(connection_id: impl ToString) -> Self {
        Self::ReceiveTimedOut {
            connection_id: connection_id.to_string(),
        }
    }

    /// Create a new connection not found error.
    pub fn connection_not_found(connection_id: impl ToString) -> Self {
        Self::ConnectionNotFound {
            connection_id: connection_id.to_string(),
        }
    }

    /// Create a new upgrade failed error.
    pub fn upgrade_failed(reason: impl Into<String>) -> Self {
        Self::UpgradeFailed(reason.into())
    }

    /// Get the close code if this is a connection closed error.
    pub fn close_code(&self) -> Option<u16> {
        match self {
            Self::ConnectionClosed { code, .. } => *code,
            _ => None,
        }
    }

    /// Check if this error ends the connection that raised it.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::HandshakeRejected { .. }
                | Self::ConnectionClosed { .. }
                | Self::ReceiveTimedOut { .. }
                | Self::UpgradeFailed(_)
                | Self::Io(_)
                | Self::Tungstenite(_)
        )
    }
}

/// Close code for WebSocket connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum CloseCode {
    /// Normal closure (1000).
    Normal = 1000,
    /// Going away (1001).
    GoingAway = 1001,
    /// Protocol error (1002).
    Protocol = 1002,
    /// Unsupported data (1003).
    Unsupported = 1003,
    /// No status received (1005).
    NoStatus = 1005,
    /// Abnormal closure (1006).
    Abnormal = 1006,
    /// Invalid payload data (1007).
    InvalidPayload = 1007,
    /// Policy violation (1008).
    PolicyViolation = 1008,
    /// Message too big (1009).
    MessageTooBig = 1009,
    /// Extension required (1010).
    ExtensionRequired = 1010,
    /// Internal error (1011).
    InternalError = 1011,
    /// Service restart (1012).
    ServiceRestart = 1012,
    /// Try again later (1013).
    TryAgainLater = 1013,
    /// Bad gateway (1014).
    BadGateway = 1014,
    /// TLS handshake failure (1015).
    TlsHandshake = 1015,
}

impl CloseCode {
    /// Convert from a u16 code.
    pub fn from_u16(code: u16) -> Option<Self> {
        match code {
            1000 => Some(Self::Normal),
            1001 => Some(Self::GoingAway),
            1002 => Some(Self::Protocol),
            1003 => Some(Self::Unsupported),
            1005 => Some(Self::NoStatus),
            1006 => Some(Self::Abnormal),
            1007 => Some(Self::InvalidPayload),
            1008 => Some(Self::PolicyViolation),
            1009 => Some(Self::MessageTooBig),
            1010 => Some(Self::ExtensionRequired),
            1011 => Some(Self::InternalError),
            1012 => Some(Self::ServiceRestart),
            1013 => Some(Self::TryAgainLater),
            1014 => Some(Self::BadGateway),
            1015 => Some(Self::TlsHandshake),
            _ => None,
        }
    }

    /// Get the u16 value of this close code.
    pub fn as_u16(self) -> u16 {
        self as u16
    }
}

impl fmt::Display for CloseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Normal => "Normal",
            Self::GoingAway => "GoingAway",
            Self::Protocol => "Protocol",
            Self::Unsupported => "Unsupported",
            Self::NoStatus => "NoStatus",
            Self::Abnormal => "Abnormal",
            Self::InvalidPayload => "InvalidPayload",
            Self::PolicyViolation => "PolicyViolation",
            Self::MessageTooBig => "MessageTooBig",
            Self::ExtensionRequired => "ExtensionRequired",
            Self::InternalError => "InternalError",
            Self::ServiceRestart => "ServiceRestart",
            Self::TryAgainLater => "TryAgainLater",
            Self::BadGateway => "BadGateway",
            Self::TlsHandshake => "TlsHandshake",
        };
        write!(f, "{} ({})", name, self.as_u16())
    }
}
