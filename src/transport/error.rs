//! Transport error types

use thiserror::Error;

/// Backend call failure with classification
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Network, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Timeout, message)
    }

    pub fn server_error(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::ServerError, message)
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Rejected, message)
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Decode, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Unknown, message)
    }

    /// Classify a non-success HTTP status
    pub fn from_status(status: u16, body: &str) -> Self {
        match status {
            400..=499 => Self::rejected(format!("Backend rejected request ({status}): {body}")),
            500..=599 => Self::server_error(format!("Server error ({status}): {body}")),
            _ => Self::unknown(format!("HTTP {status}: {body}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Connection refused, reset, DNS
    Network,
    /// Deadline elapsed before a reply
    Timeout,
    /// 5xx
    ServerError,
    /// 4xx
    Rejected,
    /// Reply arrived but was not the expected JSON
    Decode,
    Unknown,
}
