//! AI primitives for the copper-sparrow assistant.
//!
//! This crate provides:
//!
//! - **Chat providers**: a provider abstraction plus the two concrete
//!   clients (nested-declaration dialect and flat function-call dialect)
//! - **Analyzer**: the free-text secondary-model call used by the document
//!   flow and the recap narrator
//! - **Orchestration Engine**: the multi-round tool-calling loop with
//!   provider fallback

pub mod engine;
pub mod error;
pub mod gemini;
pub mod groq;
pub mod provider;

pub use engine::{Engine, FALLBACK_REPLY, InboundMedia, UNAVAILABLE_REPLY, UserContent};
pub use error::{EngineError, ProviderError};
pub use gemini::GeminiProvider;
pub use groq::GroqProvider;
pub use provider::{Analyzer, ChatProvider, ChatTurn, InlineMedia, ToolCallRequest, TranscriptEntry};
