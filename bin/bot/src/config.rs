//! Centralized service configuration.
//!
//! Strongly-typed configuration loaded via the `config` crate from
//! environment variables with `__` as the nesting separator, e.g.
//! `AI__GEMINI__API_KEY` or `GATEWAY__BASE_URL`.

use copper_sparrow_tools::ToolsConfig;
use serde::Deserialize;

/// Top-level service configuration.
#[derive(Debug, Deserialize)]
pub struct BotConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Conversation context limits.
    #[serde(default)]
    pub context: ContextConfig,

    /// Messaging gateway settings.
    pub gateway: GatewayConfig,

    /// Model provider settings.
    pub ai: AiConfig,

    /// Builtin tool settings.
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Reminder delivery settings.
    #[serde(default)]
    pub reminders: RemindersConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Port for the health and webhook endpoints.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Conversation context limits.
#[derive(Debug, Clone, Deserialize)]
pub struct ContextConfig {
    /// Turns retained per conversation.
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,

    /// Characters stored per turn.
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

/// Messaging gateway settings.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Base URL of the transport gateway.
    pub base_url: String,

    /// Bearer token for gateway calls, when the gateway requires one.
    #[serde(default)]
    pub api_token: Option<String>,
}

/// Model provider settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    /// Primary provider (declaration dialect).
    pub gemini: GeminiConfig,

    /// Secondary provider (function-call dialect) and analysis model.
    pub groq: GroqConfig,

    /// Optional persona prompt sent with every engine call.
    #[serde(default)]
    pub system_prompt: Option<String>,
}

/// Primary provider settings.
#[derive(Debug, Clone, Deserialize)]
pub struct GeminiConfig {
    /// API key.
    pub api_key: String,

    /// Model identifier.
    #[serde(default = "default_gemini_model")]
    pub model: String,
}

/// Secondary provider settings.
#[derive(Debug, Clone, Deserialize)]
pub struct GroqConfig {
    /// API key.
    pub api_key: String,

    /// Main chat model.
    #[serde(default = "default_groq_model")]
    pub model: String,

    /// Fast model for document analysis and recap narration.
    #[serde(default = "default_groq_fast_model")]
    pub fast_model: String,
}

/// Reminder delivery settings.
#[derive(Debug, Clone, Deserialize)]
pub struct RemindersConfig {
    /// Seconds between due-reminder checks.
    #[serde(default = "default_reminder_poll_seconds")]
    pub poll_interval_seconds: u64,
}

fn default_port() -> u16 {
    7860
}

fn default_max_turns() -> usize {
    10
}

fn default_max_chars() -> usize {
    1000
}

fn default_gemini_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_groq_model() -> String {
    "llama-3.3-70b-versatile".to_string()
}

fn default_groq_fast_model() -> String {
    "llama-3.1-8b-instant".to_string()
}

fn default_reminder_poll_seconds() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            max_chars: default_max_chars(),
        }
    }
}

impl Default for RemindersConfig {
    fn default() -> Self {
        Self {
            poll_interval_seconds: default_reminder_poll_seconds(),
        }
    }
}

impl BotConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}
