//! Error types for the dispatch crate.

use std::fmt;

/// Errors from the document text extraction collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    /// The document format is not supported.
    Unsupported { mime_type: String },
    /// Extraction ran but failed.
    Failed { reason: String },
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsupported { mime_type } => {
                write!(f, "unsupported document type: {mime_type}")
            }
            Self::Failed { reason } => write!(f, "text extraction failed: {reason}"),
        }
    }
}

impl std::error::Error for ExtractError {}
