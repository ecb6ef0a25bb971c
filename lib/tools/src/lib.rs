//! Tool capabilities for the copper-sparrow assistant.
//!
//! This crate provides:
//!
//! - **Schema model**: canonical parameter schemas and the two provider
//!   dialect renderings
//! - **Tool Registry**: the compiled set of tools available to a model
//! - **Builtin tools**: web search, image generation, sticker rendering,
//!   file conversion/generation, and reminder management

pub mod builtin;
pub mod error;
pub mod registry;
pub mod reminder;
pub mod schema;

pub use builtin::{ToolsConfig, builtin_tools};
pub use error::ToolError;
pub use registry::{SideEffect, Tool, ToolContext, ToolRegistry, ToolResult, side_effect_for};
pub use reminder::{Reminder, ReminderError, ReminderStatus, ReminderStore};
pub use schema::{ParamSchema, ParamType, SchemaDialect, ToolDescriptor};
