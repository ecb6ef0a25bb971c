//! Web search over the programmable search JSON API.

use super::require_str;
use crate::error::ToolError;
use crate::registry::{Tool, ToolContext, ToolResult};
use crate::schema::ParamSchema;
use async_trait::async_trait;
use serde_json::{Value as JsonValue, json};
use std::time::Duration;

const SEARCH_ENDPOINT: &str = "https://www.googleapis.com/customsearch/v1";
const MAX_RESULTS: usize = 5;

/// Searches the web and formats the top results for the model.
pub struct WebSearch {
    http: reqwest::Client,
    api_key: String,
    engine_id: String,
}

impl WebSearch {
    /// Creates the tool with API credentials.
    #[must_use]
    pub fn new(api_key: String, engine_id: String) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(20))
                .build()
                .unwrap_or_default(),
            api_key,
            engine_id,
        }
    }

    fn format_results(items: &[JsonValue]) -> String {
        items
            .iter()
            .take(MAX_RESULTS)
            .filter_map(|item| {
                let title = item.get("title")?.as_str()?;
                let link = item.get("link")?.as_str()?;
                let snippet = item.get("snippet").and_then(JsonValue::as_str).unwrap_or("");
                Some(format!("Title: {title}\nLink: {link}\nSnippet: {snippet}"))
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[async_trait]
impl Tool for WebSearch {
    fn name(&self) -> &'static str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Searches the web for current information and returns the top results \
         with titles, links, and snippets."
    }

    fn parameters(&self) -> ParamSchema {
        ParamSchema::object()
            .property("query", ParamSchema::string().describe("The search query"))
            .require("query")
    }

    async fn run(&self, args: JsonValue, _ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let query = require_str(&args, "query")?;

        let response = self
            .http
            .get(SEARCH_ENDPOINT)
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.engine_id.as_str()),
                ("q", query),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ToolError::Api {
                reason: format!("search API returned {}", response.status()),
            });
        }

        let body: JsonValue = response.json().await?;
        let formatted = body
            .get("items")
            .and_then(JsonValue::as_array)
            .map(|items| Self::format_results(items))
            .unwrap_or_default();

        let result = if formatted.is_empty() {
            "No results found.".to_string()
        } else {
            formatted
        };
        Ok(ToolResult::success(json!({ "result": result })))
    }
}
