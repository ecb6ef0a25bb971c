//! Secondary chat provider speaking the flat function-call dialect.
//!
//! Tool schemas go out as `{"type": "function", ...}` envelopes with
//! lowercase type tags; tool calls come back under `message.tool_calls`
//! with JSON-encoded argument strings. This dialect has no inline-media
//! channel, so user media is dropped from the transcript.
//!
//! The same client backs the `Analyzer` capability: a single free-text
//! call against the fast model that degrades to a fixed string instead of
//! failing.

use crate::error::ProviderError;
use crate::provider::{Analyzer, ChatProvider, ChatTurn, ToolCallRequest, TranscriptEntry};
use async_trait::async_trait;
use copper_sparrow_tools::SchemaDialect;
use serde_json::{Value as JsonValue, json};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Fixed reply when the analysis call itself fails.
pub const DEGRADED_ANALYSIS: &str =
    "The secondary model could not process this request right now.";

/// Analysis context beyond this many characters is clipped.
const ANALYSIS_CONTEXT_LIMIT: usize = 25_000;

const ANALYSIS_SYSTEM_PROMPT: &str =
    "You are a document analysis assistant. Read the provided context and \
     answer the user's query from it, clearly and concisely. When asked to \
     summarize, use bullet points.";

/// Client for the function-call-dialect provider.
pub struct GroqProvider {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    fast_model: String,
}

impl GroqProvider {
    /// Creates a client with a main model and a fast model for analysis.
    #[must_use]
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        fast_model: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: model.into(),
            fast_model: fast_model.into(),
        }
    }

    /// Overrides the API base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn encode_entry(entry: &TranscriptEntry) -> JsonValue {
        match entry {
            TranscriptEntry::User { text, .. } => {
                json!({ "role": "user", "content": text })
            }
            TranscriptEntry::Assistant { text } => {
                json!({ "role": "assistant", "content": text })
            }
            TranscriptEntry::ToolCallRound { text, calls } => {
                let tool_calls: Vec<JsonValue> = calls
                    .iter()
                    .map(|call| {
                        json!({
                            "id": call.id.clone().unwrap_or_else(|| call.name.clone()),
                            "type": "function",
                            "function": {
                                "name": call.name,
                                "arguments": call.arguments.to_string(),
                            },
                        })
                    })
                    .collect();
                json!({
                    "role": "assistant",
                    "content": text.clone().unwrap_or_default(),
                    "tool_calls": tool_calls,
                })
            }
            TranscriptEntry::ToolResponse { call_id, name, payload } => {
                json!({
                    "role": "tool",
                    "tool_call_id": call_id.clone().unwrap_or_else(|| name.clone()),
                    "content": payload.to_string(),
                })
            }
        }
    }

    fn request_body(
        &self,
        system: Option<&str>,
        transcript: &[TranscriptEntry],
        tools: Option<&JsonValue>,
    ) -> JsonValue {
        let mut messages = Vec::new();
        if let Some(system) = system {
            messages.push(json!({ "role": "system", "content": system }));
        }
        messages.extend(transcript.iter().map(Self::encode_entry));

        let mut body = json!({ "model": self.model, "messages": messages });
        if let Some(tools) = tools {
            body["tools"] = tools.clone();
            body["tool_choice"] = json!("auto");
        }
        body
    }

    fn parse_response(body: &JsonValue) -> Result<ChatTurn, ProviderError> {
        let message = body
            .pointer("/choices/0/message")
            .ok_or_else(|| ProviderError::ResponseParseFailed {
                reason: "response carries no message".to_string(),
            })?;

        let text = message
            .get("content")
            .and_then(JsonValue::as_str)
            .filter(|t| !t.is_empty())
            .map(str::to_string);

        let mut tool_calls = Vec::new();
        if let Some(calls) = message.get("tool_calls").and_then(JsonValue::as_array) {
            for call in calls {
                let name = call
                    .pointer("/function/name")
                    .and_then(JsonValue::as_str)
                    .ok_or_else(|| ProviderError::ResponseParseFailed {
                        reason: "tool call has no function name".to_string(),
                    })?;
                let raw_args = call
                    .pointer("/function/arguments")
                    .and_then(JsonValue::as_str)
                    .unwrap_or("{}");
                let arguments: JsonValue = serde_json::from_str(raw_args).map_err(|e| {
                    ProviderError::ResponseParseFailed {
                        reason: format!("tool call arguments are not valid JSON: {e}"),
                    }
                })?;
                tool_calls.push(ToolCallRequest {
                    id: call.get("id").and_then(JsonValue::as_str).map(str::to_string),
                    name: name.to_string(),
                    arguments,
                });
            }
        }

        Ok(ChatTurn { text, tool_calls })
    }

    fn map_status(&self, status: reqwest::StatusCode) -> ProviderError {
        if status.as_u16() == 429 {
            ProviderError::RateLimited {
                retry_after_secs: None,
            }
        } else if status.is_server_error() {
            ProviderError::Unavailable {
                provider: "groq".to_string(),
                reason: format!("status {status}"),
            }
        } else {
            ProviderError::RequestFailed {
                reason: format!("status {status}"),
            }
        }
    }

    async fn completion(&self, body: JsonValue) -> Result<JsonValue, ProviderError> {
        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout
                } else {
                    ProviderError::RequestFailed {
                        reason: e.to_string(),
                    }
                }
            })?;

        if !response.status().is_success() {
            return Err(self.map_status(response.status()));
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::ResponseParseFailed {
                reason: e.to_string(),
            })
    }
}

#[async_trait]
impl ChatProvider for GroqProvider {
    fn name(&self) -> &str {
        "groq"
    }

    fn dialect(&self) -> SchemaDialect {
        SchemaDialect::FunctionCall
    }

    async fn chat(
        &self,
        system: Option<&str>,
        transcript: &[TranscriptEntry],
        tools: Option<&JsonValue>,
    ) -> Result<ChatTurn, ProviderError> {
        let body = self.request_body(system, transcript, tools);
        let response = self.completion(body).await?;
        Self::parse_response(&response)
    }
}

#[async_trait]
impl Analyzer for GroqProvider {
    async fn analyze(&self, context: &str, query: &str) -> String {
        let safe_context: String = context.chars().take(ANALYSIS_CONTEXT_LIMIT).collect();
        let body = json!({
            "model": self.fast_model,
            "messages": [
                { "role": "system", "content": ANALYSIS_SYSTEM_PROMPT },
                {
                    "role": "user",
                    "content": format!("CONTEXT:\n{safe_context}\n\nQUERY:\n{query}"),
                },
            ],
            "temperature": 0.5,
            "max_tokens": 4096,
        });

        match self.completion(body).await {
            Ok(response) => response
                .pointer("/choices/0/message/content")
                .and_then(JsonValue::as_str)
                .filter(|t| !t.is_empty())
                .map_or_else(|| DEGRADED_ANALYSIS.to_string(), str::to_string),
            Err(e) => {
                tracing::warn!(error = %e, "analysis call failed, answering degraded text");
                DEGRADED_ANALYSIS.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::InlineMedia;

    fn provider() -> GroqProvider {
        GroqProvider::new("key", "llama-3.3-70b-versatile", "llama-3.1-8b-instant")
    }

    #[test]
    fn request_body_flattens_roles_and_drops_media() {
        let transcript = vec![TranscriptEntry::User {
            text: "describe this".to_string(),
            media: Some(InlineMedia {
                mime_type: "image/png".to_string(),
                data_b64: "aGk=".to_string(),
            }),
        }];
        let body = provider().request_body(Some("be brief"), &transcript, None);

        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "describe this");
        assert!(body["messages"][1].get("inline_data").is_none());
    }

    #[test]
    fn tool_rounds_carry_stringified_arguments() {
        let transcript = vec![
            TranscriptEntry::ToolCallRound {
                text: None,
                calls: vec![ToolCallRequest {
                    id: Some("call_1".to_string()),
                    name: "web_search".to_string(),
                    arguments: json!({"query": "rust"}),
                }],
            },
            TranscriptEntry::ToolResponse {
                call_id: Some("call_1".to_string()),
                name: "web_search".to_string(),
                payload: json!({"success": true}),
            },
        ];
        let body = provider().request_body(None, &transcript, None);

        let call = &body["messages"][0]["tool_calls"][0];
        assert_eq!(call["id"], "call_1");
        assert_eq!(call["function"]["arguments"], "{\"query\":\"rust\"}");
        assert_eq!(body["messages"][1]["role"], "tool");
        assert_eq!(body["messages"][1]["tool_call_id"], "call_1");
    }

    #[test]
    fn tools_are_attached_with_auto_choice() {
        let schema = json!([{"type": "function"}]);
        let body = provider().request_body(None, &[], Some(&schema));
        assert_eq!(body["tools"], schema);
        assert_eq!(body["tool_choice"], "auto");
    }

    #[test]
    fn parse_response_with_text() {
        let body = json!({
            "choices": [{ "message": { "content": "hello" } }]
        });
        let turn = GroqProvider::parse_response(&body).expect("parse");
        assert_eq!(turn.text.as_deref(), Some("hello"));
    }

    #[test]
    fn parse_response_with_tool_calls() {
        let body = json!({
            "choices": [{ "message": {
                "content": null,
                "tool_calls": [{
                    "id": "call_9",
                    "type": "function",
                    "function": { "name": "manage_reminder", "arguments": "{\"action\":\"list\"}" }
                }]
            } }]
        });
        let turn = GroqProvider::parse_response(&body).expect("parse");
        assert_eq!(turn.tool_calls[0].id.as_deref(), Some("call_9"));
        assert_eq!(turn.tool_calls[0].arguments["action"], "list");
    }

    #[test]
    fn malformed_tool_arguments_fail_parsing() {
        let body = json!({
            "choices": [{ "message": {
                "tool_calls": [{
                    "id": "call_9",
                    "function": { "name": "x", "arguments": "{not json" }
                }]
            } }]
        });
        assert!(matches!(
            GroqProvider::parse_response(&body),
            Err(ProviderError::ResponseParseFailed { .. })
        ));
    }
}
