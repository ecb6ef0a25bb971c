//! Error types for the recap crate.

use std::fmt;

/// Errors from the statistics collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatsError {
    /// The stats backend could not be read.
    Unavailable { reason: String },
}

impl fmt::Display for StatsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable { reason } => write!(f, "stats unavailable: {reason}"),
        }
    }
}

impl std::error::Error for StatsError {}
