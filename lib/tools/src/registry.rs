//! Tool registry.
//!
//! The registry is a compiled list of tool values assembled once at startup;
//! there is no runtime string-keyed loading. Execution never raises: tool
//! failures come back as structured results for the model to react to.

use crate::error::ToolError;
use crate::schema::{SchemaDialect, ToolDescriptor};
use async_trait::async_trait;
use copper_sparrow_core::ConversationId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue, json};
use std::path::PathBuf;

/// Execution context resolved by the orchestration loop for one tool call.
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    /// The conversation the call belongs to.
    pub conversation: Option<ConversationId>,
    /// Local path of the input media, when the triggering message had any.
    pub input_file: Option<PathBuf>,
    /// MIME type of the input media.
    pub mime_type: Option<String>,
}

impl ToolContext {
    /// Creates a context for a conversation with no media.
    #[must_use]
    pub fn for_conversation(conversation: ConversationId) -> Self {
        Self {
            conversation: Some(conversation),
            ..Self::default()
        }
    }

    /// Attaches input media.
    #[must_use]
    pub fn with_media(mut self, path: PathBuf, mime_type: impl Into<String>) -> Self {
        self.input_file = Some(path);
        self.mime_type = Some(mime_type.into());
        self
    }

    /// True when input media is available.
    #[must_use]
    pub fn has_media(&self) -> bool {
        self.input_file.is_some()
    }
}

/// Structured result of one tool invocation.
///
/// `data` carries tool-specific payload fields (`image_url`, `file_path`,
/// `sticker_path`, `reminders`, ...). Failures are values, never errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Whether the invocation succeeded.
    pub success: bool,
    /// Error message, when it did not.
    pub error: Option<String>,
    /// Tool-specific payload.
    pub data: JsonValue,
}

impl ToolResult {
    /// Creates a successful result with a payload object.
    #[must_use]
    pub fn success(data: JsonValue) -> Self {
        Self {
            success: true,
            error: None,
            data,
        }
    }

    /// Creates a failed result.
    #[must_use]
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            data: JsonValue::Null,
        }
    }

    /// Looks up a payload field.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&JsonValue> {
        self.data.get(name)
    }

    /// Looks up a string payload field.
    #[must_use]
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(JsonValue::as_str)
    }

    /// Flattens the result into the single object fed back to the model.
    #[must_use]
    pub fn to_payload(&self) -> JsonValue {
        let mut map = Map::new();
        map.insert("success".to_string(), json!(self.success));
        if let Some(error) = &self.error {
            map.insert("error".to_string(), json!(error));
        }
        if let Some(fields) = self.data.as_object() {
            for (key, value) in fields {
                map.insert(key.clone(), value.clone());
            }
        }
        JsonValue::Object(map)
    }
}

/// One tool: a descriptor plus its execution capability.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique tool name.
    fn name(&self) -> &'static str;

    /// Human-readable description shown to the model.
    fn description(&self) -> &str;

    /// Canonical parameter schema.
    fn parameters(&self) -> crate::schema::ParamSchema;

    /// Whether this tool operates on input media.
    fn needs_media(&self) -> bool {
        false
    }

    /// Executes the tool.
    ///
    /// # Errors
    ///
    /// Returns an error for any failure; the registry converts it into a
    /// failed `ToolResult` before it reaches the orchestration loop.
    async fn run(&self, args: JsonValue, ctx: &ToolContext) -> Result<ToolResult, ToolError>;
}

/// Side-effect categories that trigger an immediate outbound send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideEffect {
    /// Generated image, sent with a caption.
    Image,
    /// Rendered sticker.
    Sticker,
    /// Generated or converted file, sent as a document.
    Document,
}

/// Maps a tool name to its side-effect category, if it has one.
#[must_use]
pub fn side_effect_for(name: &str) -> Option<SideEffect> {
    match name {
        "image_generator" => Some(SideEffect::Image),
        "sticker_maker" => Some(SideEffect::Sticker),
        "file_generator" | "file_converter" => Some(SideEffect::Document),
        _ => None,
    }
}

/// Compiled set of tools available during conversation.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool. A duplicate name replaces the earlier entry with a
    /// warning.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        if let Some(pos) = self.tools.iter().position(|t| t.name() == tool.name()) {
            tracing::warn!(tool = tool.name(), "duplicate tool registration, replacing");
            self.tools[pos] = tool;
        } else {
            self.tools.push(tool);
        }
    }

    /// Looks up a tool by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.iter().find(|t| t.name() == name).map(Box::as_ref)
    }

    /// Returns the registered tool names, in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    /// Returns canonical descriptors for every registered tool.
    #[must_use]
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools
            .iter()
            .map(|t| ToolDescriptor::new(t.name(), t.description(), t.parameters()))
            .collect()
    }

    /// Returns the number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// True when no tools are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Renders the registered tools in the requested provider dialect.
    ///
    /// Returns `None` when the registry is empty so callers can omit the
    /// tools field entirely.
    #[must_use]
    pub fn schema_for(&self, dialect: SchemaDialect) -> Option<JsonValue> {
        if self.tools.is_empty() {
            return None;
        }
        let descriptors = self.descriptors();
        Some(match dialect {
            SchemaDialect::Declaration => json!({
                "function_declarations": descriptors
                    .iter()
                    .map(ToolDescriptor::declaration_json)
                    .collect::<Vec<_>>(),
            }),
            SchemaDialect::FunctionCall => JsonValue::Array(
                descriptors
                    .iter()
                    .map(ToolDescriptor::function_call_json)
                    .collect(),
            ),
        })
    }

    /// Executes a tool by name.
    ///
    /// An unknown name or a tool-internal failure comes back as a failed
    /// `ToolResult`; this method never returns an error.
    pub async fn execute(&self, name: &str, args: JsonValue, ctx: &ToolContext) -> ToolResult {
        let Some(tool) = self.get(name) else {
            tracing::warn!(tool = name, "execution requested for unknown tool");
            return ToolResult::failure(format!("tool '{name}' not found"));
        };

        tracing::info!(tool = name, args = %args, "tool execution started");
        let result = match tool.run(args, ctx).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(tool = name, error = %e, "tool execution failed");
                ToolResult::failure(e.to_string())
            }
        };
        tracing::info!(tool = name, success = result.success, "tool execution finished");
        result
    }
}
