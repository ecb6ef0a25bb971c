//! Chat-provider abstraction.
//!
//! A provider takes a role-tagged transcript plus a tool schema in its own
//! dialect and answers with text, structured tool-call requests, or both.

use crate::error::ProviderError;
use async_trait::async_trait;
use copper_sparrow_conversation::{Turn, TurnRole};
use copper_sparrow_tools::SchemaDialect;
use serde_json::Value as JsonValue;

/// Inline media carried with a user entry, for providers that accept it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineMedia {
    /// MIME type of the payload.
    pub mime_type: String,
    /// Base64-encoded bytes.
    pub data_b64: String,
}

/// One structured tool-call request returned by a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCallRequest {
    /// Provider-assigned call id, when the dialect has one.
    pub id: Option<String>,
    /// The tool to invoke.
    pub name: String,
    /// Arguments for the tool.
    pub arguments: JsonValue,
}

/// One entry of the working transcript sent to a provider.
#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptEntry {
    /// Something the user said, with optional inline media.
    User {
        text: String,
        media: Option<InlineMedia>,
    },
    /// A plain assistant reply.
    Assistant { text: String },
    /// An assistant turn that requested tool calls.
    ToolCallRound {
        text: Option<String>,
        calls: Vec<ToolCallRequest>,
    },
    /// The result of one tool call, keyed by tool name.
    ToolResponse {
        call_id: Option<String>,
        name: String,
        payload: JsonValue,
    },
}

impl From<&Turn> for TranscriptEntry {
    fn from(turn: &Turn) -> Self {
        match turn.role {
            TurnRole::User => Self::User {
                text: turn.text.clone(),
                media: None,
            },
            TurnRole::Assistant => Self::Assistant {
                text: turn.text.clone(),
            },
        }
    }
}

/// One provider response: text and/or tool-call requests.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatTurn {
    /// The generated text, when any.
    pub text: Option<String>,
    /// Tool calls requested for this round, in provider order.
    pub tool_calls: Vec<ToolCallRequest>,
}

impl ChatTurn {
    /// Creates a plain text turn.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            tool_calls: Vec::new(),
        }
    }

    /// Creates a tool-calling turn.
    #[must_use]
    pub fn tool_calls(calls: Vec<ToolCallRequest>) -> Self {
        Self {
            text: None,
            tool_calls: calls,
        }
    }

    /// True when the provider requested tool calls.
    #[must_use]
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// A language-model chat provider.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Provider name, for logs.
    fn name(&self) -> &str;

    /// The tool-schema dialect this provider consumes.
    fn dialect(&self) -> SchemaDialect;

    /// Sends the transcript and returns the provider's next turn.
    ///
    /// # Errors
    ///
    /// Returns a `ProviderError` on transport, auth, rate-limit, or parse
    /// failure. The caller treats any error as grounds for fallback.
    async fn chat(
        &self,
        system: Option<&str>,
        transcript: &[TranscriptEntry],
        tools: Option<&JsonValue>,
    ) -> Result<ChatTurn, ProviderError>;
}

/// Free-text analysis over a secondary model.
///
/// Infallible by contract: implementations answer a degraded fixed string
/// when the underlying call fails, so callers never deal with errors.
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Answers `query` against `context`.
    async fn analyze(&self, context: &str, query: &str) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn stored_turns_map_to_plain_entries() {
        let turn = Turn {
            role: TurnRole::User,
            text: "hello".to_string(),
            timestamp: Utc::now(),
        };
        assert_eq!(
            TranscriptEntry::from(&turn),
            TranscriptEntry::User {
                text: "hello".to_string(),
                media: None
            }
        );

        let turn = Turn {
            role: TurnRole::Assistant,
            text: "hi".to_string(),
            timestamp: Utc::now(),
        };
        assert!(matches!(TranscriptEntry::from(&turn), TranscriptEntry::Assistant { .. }));
    }

    #[test]
    fn chat_turn_helpers() {
        assert!(!ChatTurn::text("done").has_tool_calls());
        let turn = ChatTurn::tool_calls(vec![ToolCallRequest {
            id: None,
            name: "web_search".to_string(),
            arguments: serde_json::json!({"query": "rust"}),
        }]);
        assert!(turn.has_tool_calls());
    }
}
