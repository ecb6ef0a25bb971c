//! HTTP adapter for the messaging transport gateway.
//!
//! The gateway process owns the actual messaging session; this adapter
//! speaks a small JSON API against it and implements the transport
//! capabilities the core depends on. Outbound file media is inlined as
//! base64.

use crate::config::GatewayConfig;
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use copper_sparrow_core::ConversationId;
use copper_sparrow_transport::{
    FetchedMedia, MediaFetcher, MediaSource, MessageRef, MessageSender, PresenceState,
    TransportError,
};
use serde_json::{Value as JsonValue, json};
use std::path::PathBuf;
use std::time::Duration;
use ulid::Ulid;

/// HTTP client for the transport gateway.
pub struct HttpGateway {
    http: reqwest::Client,
    base_url: String,
    api_token: Option<String>,
    scratch_dir: PathBuf,
}

impl HttpGateway {
    /// Creates the adapter from gateway settings.
    #[must_use]
    pub fn new(config: &GatewayConfig, scratch_dir: PathBuf) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
            scratch_dir,
        }
    }

    async fn post(&self, path: &str, body: JsonValue) -> Result<(), TransportError> {
        let mut request = self.http.post(format!("{}{path}", self.base_url)).json(&body);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| TransportError::SendFailed {
            reason: e.to_string(),
        })?;
        if !response.status().is_success() {
            return Err(TransportError::SendFailed {
                reason: format!("gateway returned {}", response.status()),
            });
        }
        Ok(())
    }

    async fn media_field(&self, source: &MediaSource) -> Result<JsonValue, TransportError> {
        match source {
            MediaSource::Url(url) => Ok(json!({ "url": url })),
            MediaSource::Path(path) => {
                let bytes = tokio::fs::read(path).await.map_err(|e| TransportError::SendFailed {
                    reason: format!("could not read {}: {e}", path.display()),
                })?;
                Ok(json!({ "data_b64": BASE64.encode(bytes) }))
            }
        }
    }
}

#[async_trait]
impl MessageSender for HttpGateway {
    async fn send_text(&self, to: &ConversationId, text: &str) -> Result<(), TransportError> {
        self.post("/send/text", json!({ "to": to, "text": text })).await
    }

    async fn send_image(
        &self,
        to: &ConversationId,
        image: &MediaSource,
        caption: Option<&str>,
    ) -> Result<(), TransportError> {
        let mut body = json!({ "to": to, "caption": caption });
        merge(&mut body, self.media_field(image).await?);
        self.post("/send/image", body).await
    }

    async fn send_document(
        &self,
        to: &ConversationId,
        document: &MediaSource,
        file_name: &str,
        mime_type: &str,
    ) -> Result<(), TransportError> {
        let mut body = json!({ "to": to, "file_name": file_name, "mime_type": mime_type });
        merge(&mut body, self.media_field(document).await?);
        self.post("/send/document", body).await
    }

    async fn send_sticker(
        &self,
        to: &ConversationId,
        sticker: &MediaSource,
    ) -> Result<(), TransportError> {
        let mut body = json!({ "to": to });
        merge(&mut body, self.media_field(sticker).await?);
        self.post("/send/sticker", body).await
    }

    async fn send_presence(
        &self,
        to: &ConversationId,
        state: PresenceState,
    ) -> Result<(), TransportError> {
        self.post("/presence", json!({ "to": to, "state": state })).await
    }
}

#[async_trait]
impl MediaFetcher for HttpGateway {
    async fn fetch_media(
        &self,
        _conversation: &ConversationId,
        message: &MessageRef,
    ) -> Result<Option<FetchedMedia>, TransportError> {
        let mut request = self
            .http
            .get(format!("{}/media/{}", self.base_url, message.as_str()));
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| TransportError::FetchFailed {
            reason: e.to_string(),
        })?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(TransportError::FetchFailed {
                reason: format!("gateway returned {}", response.status()),
            });
        }

        let mime_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = response.bytes().await.map_err(|e| TransportError::FetchFailed {
            reason: e.to_string(),
        })?;

        tokio::fs::create_dir_all(&self.scratch_dir)
            .await
            .map_err(|e| TransportError::FetchFailed {
                reason: e.to_string(),
            })?;
        let extension = mime_type.split('/').nth(1).unwrap_or("bin");
        let path = self
            .scratch_dir
            .join(format!("fetch_{}.{extension}", Ulid::new()));
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| TransportError::FetchFailed {
                reason: e.to_string(),
            })?;

        Ok(Some(FetchedMedia { path, mime_type }))
    }
}

fn merge(target: &mut JsonValue, extra: JsonValue) {
    if let (Some(target), Some(extra)) = (target.as_object_mut(), extra.as_object()) {
        for (key, value) in extra {
            target.insert(key.clone(), value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway() -> HttpGateway {
        HttpGateway::new(
            &GatewayConfig {
                base_url: "http://gateway.local/".to_string(),
                api_token: None,
            },
            PathBuf::from("/tmp"),
        )
    }

    #[test]
    fn base_url_is_normalized() {
        assert_eq!(gateway().base_url, "http://gateway.local");
    }

    #[tokio::test]
    async fn url_media_is_passed_through() {
        let field = gateway()
            .media_field(&MediaSource::Url("https://img/x.png".to_string()))
            .await
            .expect("url field");
        assert_eq!(field["url"], "https://img/x.png");
    }

    #[tokio::test]
    async fn path_media_is_inlined_as_base64() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("out.webp");
        std::fs::write(&path, b"webp-bytes").expect("write");

        let field = gateway()
            .media_field(&MediaSource::Path(path))
            .await
            .expect("file field");
        assert_eq!(field["data_b64"], BASE64.encode(b"webp-bytes"));
    }

    #[test]
    fn merge_combines_objects() {
        let mut body = json!({"to": "c1"});
        merge(&mut body, json!({"url": "https://x"}));
        assert_eq!(body["to"], "c1");
        assert_eq!(body["url"], "https://x");
    }
}
