//! Error types for transport operations.

use std::fmt;

/// Errors from transport capabilities.
///
/// Outbound send failures are logged and swallowed by callers per send; a
/// failed send never aborts the remainder of a turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// An outbound send was rejected or never acknowledged.
    SendFailed { reason: String },
    /// Media could not be fetched for the referenced message.
    FetchFailed { reason: String },
    /// Attachment bytes were present but not decodable.
    InvalidMedia { reason: String },
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SendFailed { reason } => write!(f, "outbound send failed: {reason}"),
            Self::FetchFailed { reason } => write!(f, "media fetch failed: {reason}"),
            Self::InvalidMedia { reason } => write!(f, "invalid media payload: {reason}"),
        }
    }
}

impl std::error::Error for TransportError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_failed_display() {
        let err = TransportError::SendFailed {
            reason: "gateway returned 503".to_string(),
        };
        assert!(err.to_string().contains("503"));
    }
}
