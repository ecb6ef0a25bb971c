//! Error types for tool execution.
//!
//! A `ToolError` never escapes the registry boundary: `ToolRegistry::execute`
//! converts every failure into a structured `ToolResult` so the orchestration
//! loop only ever sees values.

use std::fmt;

/// Errors raised inside a tool body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    /// A required argument was absent.
    MissingArgument { name: &'static str },
    /// An argument was present but unusable.
    InvalidArgument { name: &'static str, reason: String },
    /// The tool needs input media and none was resolvable.
    MediaRequired,
    /// The execution context lacks a required field.
    MissingContext { what: &'static str },
    /// A filesystem operation failed.
    Io { reason: String },
    /// An outbound HTTP call failed.
    Http { reason: String },
    /// A subprocess exited unsuccessfully.
    Subprocess { program: String, reason: String },
    /// A remote API answered with an error payload.
    Api { reason: String },
    /// A storage collaborator failed.
    Store { reason: String },
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingArgument { name } => write!(f, "missing required argument '{name}'"),
            Self::InvalidArgument { name, reason } => {
                write!(f, "invalid argument '{name}': {reason}")
            }
            Self::MediaRequired => write!(f, "no media found to work on"),
            Self::MissingContext { what } => write!(f, "execution context missing {what}"),
            Self::Io { reason } => write!(f, "i/o failed: {reason}"),
            Self::Http { reason } => write!(f, "http request failed: {reason}"),
            Self::Subprocess { program, reason } => {
                write!(f, "{program} failed: {reason}")
            }
            Self::Api { reason } => write!(f, "api error: {reason}"),
            Self::Store { reason } => write!(f, "storage failed: {reason}"),
        }
    }
}

impl std::error::Error for ToolError {}

impl From<std::io::Error> for ToolError {
    fn from(e: std::io::Error) -> Self {
        Self::Io {
            reason: e.to_string(),
        }
    }
}

impl From<reqwest::Error> for ToolError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http {
            reason: e.to_string(),
        }
    }
}
