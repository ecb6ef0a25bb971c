//! Primary chat provider speaking the nested-declaration dialect.
//!
//! Tool schemas go out as `function_declarations` with uppercase type tags;
//! tool calls come back as `functionCall` parts and results go back in as
//! `functionResponse` parts. User media rides along as inline data.

use crate::error::ProviderError;
use crate::provider::{ChatProvider, ChatTurn, ToolCallRequest, TranscriptEntry};
use async_trait::async_trait;
use copper_sparrow_tools::SchemaDialect;
use serde_json::{Value as JsonValue, json};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Client for the declaration-dialect provider.
pub struct GeminiProvider {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiProvider {
    /// Creates a client for the given API key and model.
    #[must_use]
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: model.into(),
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
            TranscriptEntry::User { text, media } => {
                let mut parts = Vec::new();
                if !text.is_empty() {
                    parts.push(json!({ "text": text }));
                }
                if let Some(media) = media {
                    parts.push(json!({
                        "inline_data": {
                            "mime_type": media.mime_type,
                            "data": media.data_b64,
                        }
                    }));
                }
                if parts.is_empty() {
                    parts.push(json!({ "text": "" }));
                }
                json!({ "role": "user", "parts": parts })
            }
            TranscriptEntry::Assistant { text } => {
                json!({ "role": "model", "parts": [{ "text": text }] })
            }
            TranscriptEntry::ToolCallRound { text, calls } => {
                let mut parts = Vec::new();
                if let Some(text) = text {
                    if !text.is_empty() {
                        parts.push(json!({ "text": text }));
                    }
                }
                for call in calls {
                    parts.push(json!({
                        "functionCall": { "name": call.name, "args": call.arguments }
                    }));
                }
                json!({ "role": "model", "parts": parts })
            }
            TranscriptEntry::ToolResponse { name, payload, .. } => {
                json!({
                    "role": "user",
                    "parts": [{
                        "functionResponse": {
                            "name": name,
                            "response": { "content": payload },
                        }
                    }]
                })
            }
        }
    }

    fn request_body(
        system: Option<&str>,
        transcript: &[TranscriptEntry],
        tools: Option<&JsonValue>,
    ) -> JsonValue {
        let contents: Vec<JsonValue> = transcript.iter().map(Self::encode_entry).collect();
        let mut body = json!({ "contents": contents });
        if let Some(system) = system {
            body["system_instruction"] = json!({ "parts": [{ "text": system }] });
        }
        if let Some(tools) = tools {
            body["tools"] = json!([tools]);
        }
        body
    }

    fn parse_response(body: &JsonValue) -> Result<ChatTurn, ProviderError> {
        let parts = body
            .pointer("/candidates/0/content/parts")
            .and_then(JsonValue::as_array)
            .ok_or_else(|| ProviderError::ResponseParseFailed {
                reason: "response carries no candidate parts".to_string(),
            })?;

        let mut text_pieces = Vec::new();
        let mut tool_calls = Vec::new();
        for part in parts {
            if let Some(text) = part.get("text").and_then(JsonValue::as_str) {
                text_pieces.push(text);
            }
            if let Some(call) = part.get("functionCall") {
                let name = call
                    .get("name")
                    .and_then(JsonValue::as_str)
                    .ok_or_else(|| ProviderError::ResponseParseFailed {
                        reason: "functionCall part has no name".to_string(),
                    })?;
                tool_calls.push(ToolCallRequest {
                    id: None,
                    name: name.to_string(),
                    arguments: call.get("args").cloned().unwrap_or_else(|| json!({})),
                });
            }
        }

        let text = if text_pieces.is_empty() {
            None
        } else {
            Some(text_pieces.join(""))
        };
        Ok(ChatTurn { text, tool_calls })
    }

    fn map_status(&self, status: reqwest::StatusCode) -> ProviderError {
        if status.as_u16() == 429 {
            ProviderError::RateLimited {
                retry_after_secs: None,
            }
        } else if status.is_server_error() {
            ProviderError::Unavailable {
                provider: "gemini".to_string(),
                reason: format!("status {status}"),
            }
        } else {
            ProviderError::RequestFailed {
                reason: format!("status {status}"),
            }
        }
    }
}

#[async_trait]
impl ChatProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn dialect(&self) -> SchemaDialect {
        SchemaDialect::Declaration
    }

    async fn chat(
        &self,
        system: Option<&str>,
        transcript: &[TranscriptEntry],
        tools: Option<&JsonValue>,
    ) -> Result<ChatTurn, ProviderError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let body = Self::request_body(system, transcript, tools);

        let response = self
            .http
            .post(url)
            .query(&[("key", self.api_key.as_str())])
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

        let body: JsonValue = response
            .json()
            .await
            .map_err(|e| ProviderError::ResponseParseFailed {
                reason: e.to_string(),
            })?;
        Self::parse_response(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::InlineMedia;

    #[test]
    fn request_body_encodes_roles_and_media() {
        let transcript = vec![
            TranscriptEntry::User {
                text: "what is this?".to_string(),
                media: Some(InlineMedia {
                    mime_type: "image/jpeg".to_string(),
                    data_b64: "aGk=".to_string(),
                }),
            },
            TranscriptEntry::Assistant {
                text: "a sparrow".to_string(),
            },
        ];
        let body = GeminiProvider::request_body(Some("be brief"), &transcript, None);

        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][1]["inline_data"]["mime_type"], "image/jpeg");
        assert_eq!(body["contents"][1]["role"], "model");
        assert_eq!(body["system_instruction"]["parts"][0]["text"], "be brief");
    }

    #[test]
    fn request_body_wraps_tool_schema() {
        let schema = json!({"function_declarations": []});
        let body = GeminiProvider::request_body(None, &[], Some(&schema));
        assert_eq!(body["tools"][0], schema);
    }

    #[test]
    fn tool_rounds_and_responses_are_encoded() {
        let transcript = vec![
            TranscriptEntry::ToolCallRound {
                text: None,
                calls: vec![ToolCallRequest {
                    id: None,
                    name: "web_search".to_string(),
                    arguments: json!({"query": "rust"}),
                }],
            },
            TranscriptEntry::ToolResponse {
                call_id: None,
                name: "web_search".to_string(),
                payload: json!({"success": true, "result": "..."}),
            },
        ];
        let body = GeminiProvider::request_body(None, &transcript, None);

        assert_eq!(body["contents"][0]["parts"][0]["functionCall"]["name"], "web_search");
        assert_eq!(
            body["contents"][1]["parts"][0]["functionResponse"]["response"]["content"]["success"],
            true
        );
    }

    #[test]
    fn parse_response_with_text() {
        let body = json!({
            "candidates": [{ "content": { "parts": [{ "text": "hello" }] } }]
        });
        let turn = GeminiProvider::parse_response(&body).expect("parse");
        assert_eq!(turn.text.as_deref(), Some("hello"));
        assert!(!turn.has_tool_calls());
    }

    #[test]
    fn parse_response_with_function_calls() {
        let body = json!({
            "candidates": [{ "content": { "parts": [
                { "functionCall": { "name": "sticker_maker", "args": { "target": "auto" } } }
            ] } }]
        });
        let turn = GeminiProvider::parse_response(&body).expect("parse");
        assert!(turn.text.is_none());
        assert_eq!(turn.tool_calls[0].name, "sticker_maker");
        assert_eq!(turn.tool_calls[0].arguments["target"], "auto");
    }

    #[test]
    fn parse_response_without_candidates_fails() {
        let body = json!({ "candidates": [] });
        assert!(matches!(
            GeminiProvider::parse_response(&body),
            Err(ProviderError::ResponseParseFailed { .. })
        ));
    }
}
