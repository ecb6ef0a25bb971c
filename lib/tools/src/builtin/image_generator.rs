//! Image generation over an OpenAI-compatible images API.
//!
//! Models are tried in configuration order; the first success wins. When the
//! triggering message carried an image, it is passed along as a reference
//! for image-to-image generation.

use super::require_str;
use crate::error::ToolError;
use crate::registry::{Tool, ToolContext, ToolResult};
use crate::schema::ParamSchema;
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::{Value as JsonValue, json};
use std::time::Duration;

/// Generates an image from a text prompt.
pub struct ImageGenerator {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    models: Vec<String>,
}

impl ImageGenerator {
    /// Creates the tool with API settings and an ordered model list.
    #[must_use]
    pub fn new(api_key: String, base_url: String, models: Vec<String>) -> Self {
        Self {
            // Image generation can be slow.
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
            api_key,
            base_url,
            models,
        }
    }

    async fn reference_image(ctx: &ToolContext) -> Option<String> {
        let path = ctx.input_file.as_ref()?;
        let mime = ctx.mime_type.as_deref()?;
        if !mime.starts_with("image/") {
            return None;
        }
        match tokio::fs::read(path).await {
            Ok(bytes) => Some(BASE64.encode(bytes)),
            Err(e) => {
                tracing::warn!(error = %e, "could not read reference image, generating without it");
                None
            }
        }
    }

    async fn try_model(
        &self,
        model: &str,
        prompt: &str,
        reference: Option<&str>,
    ) -> Result<String, ToolError> {
        let mut payload = json!({ "model": model, "prompt": prompt });
        if let Some(image) = reference {
            payload["images"] = json!([image]);
        }

        let response = self
            .http
            .post(format!("{}/images/generations", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ToolError::Api {
                reason: format!("model {model} returned {}", response.status()),
            });
        }

        let body: JsonValue = response.json().await?;
        body.pointer("/data/0/url")
            .and_then(JsonValue::as_str)
            .map(str::to_string)
            .ok_or(ToolError::Api {
                reason: format!("model {model} returned no image url"),
            })
    }
}

#[async_trait]
impl Tool for ImageGenerator {
    fn name(&self) -> &'static str {
        "image_generator"
    }

    fn description(&self) -> &str {
        "Generates an image from a text prompt. When the user's message \
         contains an image, it is used as a reference."
    }

    fn parameters(&self) -> ParamSchema {
        ParamSchema::object()
            .property(
                "prompt",
                ParamSchema::string().describe("Description of the image to generate"),
            )
            .require("prompt")
    }

    async fn run(&self, args: JsonValue, ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let prompt = require_str(&args, "prompt")?;
        let reference = Self::reference_image(ctx).await;

        for model in &self.models {
            match self.try_model(model, prompt, reference.as_deref()).await {
                Ok(url) => {
                    return Ok(ToolResult::success(json!({
                        "image_url": url,
                        "model_used": model,
                    })));
                }
                Err(e) => {
                    tracing::warn!(model, error = %e, "image model failed, trying next");
                }
            }
        }

        Ok(ToolResult::failure(
            "All image generation models failed. Please try again later.",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool() -> ImageGenerator {
        ImageGenerator::new(
            "key".to_string(),
            "https://example.invalid".to_string(),
            vec!["model-a".to_string()],
        )
    }

    #[tokio::test]
    async fn missing_prompt_is_rejected() {
        let err = tool()
            .run(json!({}), &ToolContext::default())
            .await
            .unwrap_err();
        assert_eq!(err, ToolError::MissingArgument { name: "prompt" });
    }

    #[tokio::test]
    async fn non_image_media_is_not_a_reference() {
        let ctx = ToolContext::default().with_media("/tmp/in.mp4".into(), "video/mp4");
        assert!(ImageGenerator::reference_image(&ctx).await.is_none());
    }

    #[tokio::test]
    async fn all_models_failing_yields_failed_result() {
        // Unresolvable host: every model errors, the tool reports a failure
        // value instead of raising.
        let result = tool()
            .run(json!({"prompt": "a sparrow"}), &ToolContext::default())
            .await
            .expect("failure is a value");
        assert!(!result.success);
        assert!(result.error.as_deref().unwrap_or("").contains("failed"));
    }
}
