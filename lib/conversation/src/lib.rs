//! Conversation state for the copper-sparrow assistant.
//!
//! This crate provides the bounded per-conversation transcript store that
//! backs every model call. It knows nothing about tools or providers.

pub mod context;

pub use context::{ContextStore, SpeakerRole, TRUNCATION_MARKER, Turn, TurnRole};
