//! The builtin tool set.
//!
//! Tools are assembled once at startup from configuration. A tool whose
//! prerequisites are missing (an unset API key, for instance) is skipped
//! with a warning; startup never fails over an unavailable tool.

mod file_converter;
mod file_generator;
mod image_generator;
mod manage_reminder;
mod sticker_maker;
mod web_search;

pub use file_converter::FileConverter;
pub use file_generator::FileGenerator;
pub use image_generator::ImageGenerator;
pub use manage_reminder::ManageReminder;
pub use sticker_maker::StickerMaker;
pub use web_search::WebSearch;

use crate::error::ToolError;
use crate::registry::ToolRegistry;
use crate::reminder::ReminderStore;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use ulid::Ulid;

/// Configuration for the builtin tool set.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolsConfig {
    /// Directory for temporary tool input/output files.
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,

    /// Path of the ffmpeg binary.
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: String,

    /// Path of the libreoffice binary.
    #[serde(default = "default_libreoffice_path")]
    pub libreoffice_path: String,

    /// Web search credentials; the tool is skipped when unset.
    #[serde(default)]
    pub search: Option<SearchConfig>,

    /// Image generation credentials; the tool is skipped when unset.
    #[serde(default)]
    pub image: Option<ImageGenConfig>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            scratch_dir: default_scratch_dir(),
            ffmpeg_path: default_ffmpeg_path(),
            libreoffice_path: default_libreoffice_path(),
            search: None,
            image: None,
        }
    }
}

/// Web search API credentials.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    /// API key.
    pub api_key: String,
    /// Custom search engine identifier.
    pub engine_id: String,
}

/// Image generation API settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ImageGenConfig {
    /// API key.
    pub api_key: String,
    /// API base URL.
    #[serde(default = "default_image_base_url")]
    pub base_url: String,
    /// Models to try, in order. The first one that succeeds wins.
    #[serde(default = "default_image_models")]
    pub models: Vec<String>,
}

fn default_scratch_dir() -> PathBuf {
    PathBuf::from("./scratch")
}

fn default_ffmpeg_path() -> String {
    "ffmpeg".to_string()
}

fn default_libreoffice_path() -> String {
    "libreoffice".to_string()
}

fn default_image_base_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_image_models() -> Vec<String> {
    vec![
        "black-forest-labs/flux.2-klein-4b".to_string(),
        "bytedance-seed/seedream-4.5".to_string(),
        "black-forest-labs/flux.2-max".to_string(),
    ]
}

/// Builds the registry of builtin tools from configuration.
///
/// Tools whose prerequisites are not configured are skipped with a warning.
#[must_use]
pub fn builtin_tools(config: &ToolsConfig, reminders: Arc<dyn ReminderStore>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    match &config.search {
        Some(search) => registry.register(Box::new(WebSearch::new(
            search.api_key.clone(),
            search.engine_id.clone(),
        ))),
        None => tracing::warn!(tool = "web_search", "search API not configured, tool skipped"),
    }

    match &config.image {
        Some(image) => registry.register(Box::new(ImageGenerator::new(
            image.api_key.clone(),
            image.base_url.clone(),
            image.models.clone(),
        ))),
        None => tracing::warn!(
            tool = "image_generator",
            "image API not configured, tool skipped"
        ),
    }

    registry.register(Box::new(StickerMaker::new(
        config.ffmpeg_path.clone(),
        config.scratch_dir.clone(),
    )));
    registry.register(Box::new(FileConverter::new(
        config.ffmpeg_path.clone(),
        config.libreoffice_path.clone(),
        config.scratch_dir.clone(),
    )));
    registry.register(Box::new(FileGenerator::new(
        config.libreoffice_path.clone(),
        config.scratch_dir.clone(),
    )));
    registry.register(Box::new(ManageReminder::new(reminders)));

    registry
}

/// Extracts a required string argument.
pub(crate) fn require_str<'a>(args: &'a JsonValue, name: &'static str) -> Result<&'a str, ToolError> {
    args.get(name)
        .and_then(JsonValue::as_str)
        .filter(|s| !s.trim().is_empty())
        .ok_or(ToolError::MissingArgument { name })
}

/// Extracts an optional string argument.
pub(crate) fn optional_str<'a>(args: &'a JsonValue, name: &str) -> Option<&'a str> {
    args.get(name).and_then(JsonValue::as_str).filter(|s| !s.trim().is_empty())
}

/// Produces a unique scratch file path with the given prefix and extension.
pub(crate) fn scratch_file(dir: &Path, prefix: &str, extension: &str) -> PathBuf {
    dir.join(format!("{prefix}_{}.{extension}", Ulid::new()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reminder::{Reminder, ReminderError};
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use copper_sparrow_core::{ConversationId, ReminderId};

    struct NullReminderStore;

    #[async_trait]
    impl ReminderStore for NullReminderStore {
        async fn add(&self, reminder: Reminder) -> Result<ReminderId, ReminderError> {
            Ok(reminder.id)
        }

        async fn pending_for(
            &self,
            _conversation: &ConversationId,
        ) -> Result<Vec<Reminder>, ReminderError> {
            Ok(Vec::new())
        }

        async fn due(&self, _now: DateTime<Utc>) -> Result<Vec<Reminder>, ReminderError> {
            Ok(Vec::new())
        }

        async fn mark_sent(&self, _id: ReminderId) -> Result<(), ReminderError> {
            Ok(())
        }
    }

    #[test]
    fn unconfigured_apis_are_skipped_with_warning() {
        let registry = builtin_tools(&ToolsConfig::default(), Arc::new(NullReminderStore));
        let names = registry.names();
        assert!(!names.contains(&"web_search"));
        assert!(!names.contains(&"image_generator"));
        assert!(names.contains(&"sticker_maker"));
        assert!(names.contains(&"file_converter"));
        assert!(names.contains(&"file_generator"));
        assert!(names.contains(&"manage_reminder"));
    }

    #[test]
    fn configured_apis_register_their_tools() {
        let config = ToolsConfig {
            search: Some(SearchConfig {
                api_key: "k".to_string(),
                engine_id: "cx".to_string(),
            }),
            image: Some(ImageGenConfig {
                api_key: "k".to_string(),
                base_url: default_image_base_url(),
                models: default_image_models(),
            }),
            ..ToolsConfig::default()
        };
        let registry = builtin_tools(&config, Arc::new(NullReminderStore));
        assert_eq!(registry.len(), 6);
    }

    #[test]
    fn require_str_rejects_blank_values() {
        let args = serde_json::json!({"query": "  "});
        assert!(require_str(&args, "query").is_err());
        let args = serde_json::json!({"query": "rust"});
        assert_eq!(require_str(&args, "query").expect("present"), "rust");
    }

    #[test]
    fn scratch_file_paths_are_unique() {
        let dir = Path::new("/tmp");
        let a = scratch_file(dir, "sticker", "webp");
        let b = scratch_file(dir, "sticker", "webp");
        assert_ne!(a, b);
        assert!(a.to_string_lossy().ends_with(".webp"));
    }
}
