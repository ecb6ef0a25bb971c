//! Error types for the AI crate.
//!
//! `ProviderError` is the only error class that triggers provider fallback;
//! tool failures travel as structured result values and never reach this
//! module.

use std::fmt;

/// Errors from chat-provider calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Provider is unreachable or answering with server errors.
    Unavailable { provider: String, reason: String },
    /// Request failed before or during transport.
    RequestFailed { reason: String },
    /// Response arrived but could not be interpreted.
    ResponseParseFailed { reason: String },
    /// Timeout waiting for a response.
    Timeout,
    /// Rate limit exceeded.
    RateLimited { retry_after_secs: Option<u64> },
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable { provider, reason } => {
                write!(f, "provider '{provider}' unavailable: {reason}")
            }
            Self::RequestFailed { reason } => {
                write!(f, "provider request failed: {reason}")
            }
            Self::ResponseParseFailed { reason } => {
                write!(f, "failed to parse provider response: {reason}")
            }
            Self::Timeout => write!(f, "provider request timed out"),
            Self::RateLimited { retry_after_secs } => {
                if let Some(secs) = retry_after_secs {
                    write!(f, "rate limited, retry after {secs}s")
                } else {
                    write!(f, "rate limited")
                }
            }
        }
    }
}

impl std::error::Error for ProviderError {}

/// Errors from a full orchestration run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Every configured provider failed for this turn.
    AllProvidersFailed,
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllProvidersFailed => write!(f, "all providers failed for this turn"),
        }
    }
}

impl std::error::Error for EngineError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_display() {
        let err = ProviderError::Unavailable {
            provider: "gemini".to_string(),
            reason: "connection refused".to_string(),
        };
        assert!(err.to_string().contains("gemini"));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn rate_limited_display_with_retry() {
        let err = ProviderError::RateLimited {
            retry_after_secs: Some(7),
        };
        assert!(err.to_string().contains("7s"));
    }
}
