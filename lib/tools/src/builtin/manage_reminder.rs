//! Reminder management over the `ReminderStore` collaborator.

use super::require_str;
use crate::error::ToolError;
use crate::registry::{Tool, ToolContext, ToolResult};
use crate::reminder::{Reminder, ReminderError, ReminderStore};
use crate::schema::ParamSchema;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Value as JsonValue, json};
use std::sync::Arc;

/// Adds and lists reminders for the current conversation.
pub struct ManageReminder {
    store: Arc<dyn ReminderStore>,
}

impl ManageReminder {
    /// Creates the tool over a reminder store.
    #[must_use]
    pub fn new(store: Arc<dyn ReminderStore>) -> Self {
        Self { store }
    }
}

impl From<ReminderError> for ToolError {
    fn from(e: ReminderError) -> Self {
        Self::Store {
            reason: e.to_string(),
        }
    }
}

#[async_trait]
impl Tool for ManageReminder {
    fn name(&self) -> &'static str {
        "manage_reminder"
    }

    fn description(&self) -> &str {
        "Adds a reminder at a specific time, or lists the pending reminders \
         for this conversation."
    }

    fn parameters(&self) -> ParamSchema {
        ParamSchema::object()
            .property(
                "action",
                ParamSchema::string()
                    .describe("What to do")
                    .one_of(&["add", "list"]),
            )
            .property(
                "task",
                ParamSchema::string().describe("What to remind about (for add)"),
            )
            .property(
                "scheduled_time",
                ParamSchema::string().describe("Delivery time, RFC 3339 (for add)"),
            )
            .require("action")
    }

    async fn run(&self, args: JsonValue, ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let conversation = ctx
            .conversation
            .clone()
            .ok_or(ToolError::MissingContext {
                what: "conversation id",
            })?;
        let action = require_str(&args, "action")?;

        match action {
            "add" => {
                let task = require_str(&args, "task")?;
                let raw_time = require_str(&args, "scheduled_time")?;
                let scheduled_for: DateTime<Utc> = DateTime::parse_from_rfc3339(raw_time)
                    .map_err(|e| ToolError::InvalidArgument {
                        name: "scheduled_time",
                        reason: e.to_string(),
                    })?
                    .with_timezone(&Utc);

                let reminder = Reminder::new(conversation, task, scheduled_for);
                let message = format!(
                    "Reminder registered for {}: \"{}\"",
                    reminder.scheduled_for.to_rfc3339(),
                    reminder.task
                );
                self.store.add(reminder).await?;
                Ok(ToolResult::success(json!({ "message": message })))
            }
            "list" => {
                let reminders = self.store.pending_for(&conversation).await?;
                let reminders = serde_json::to_value(&reminders).unwrap_or(JsonValue::Null);
                Ok(ToolResult::success(json!({ "reminders": reminders })))
            }
            other => Ok(ToolResult::failure(format!("action '{other}' not supported"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reminder::ReminderStatus;
    use copper_sparrow_core::{ConversationId, ReminderId};
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryStore {
        reminders: Mutex<Vec<Reminder>>,
    }

    #[async_trait]
    impl ReminderStore for MemoryStore {
        async fn add(&self, reminder: Reminder) -> Result<ReminderId, ReminderError> {
            let id = reminder.id;
            self.reminders.lock().expect("lock").push(reminder);
            Ok(id)
        }

        async fn pending_for(
            &self,
            conversation: &ConversationId,
        ) -> Result<Vec<Reminder>, ReminderError> {
            Ok(self
                .reminders
                .lock()
                .expect("lock")
                .iter()
                .filter(|r| &r.conversation == conversation && r.status == ReminderStatus::Pending)
                .cloned()
                .collect())
        }

        async fn due(&self, _now: DateTime<Utc>) -> Result<Vec<Reminder>, ReminderError> {
            Ok(Vec::new())
        }

        async fn mark_sent(&self, _id: ReminderId) -> Result<(), ReminderError> {
            Ok(())
        }
    }

    fn ctx() -> ToolContext {
        ToolContext::for_conversation(ConversationId::new("c1"))
    }

    #[tokio::test]
    async fn add_then_list_roundtrip() {
        let store = Arc::new(MemoryStore::default());
        let tool = ManageReminder::new(store.clone());

        let result = tool
            .run(
                json!({
                    "action": "add",
                    "task": "water the plants",
                    "scheduled_time": "2026-09-01T08:00:00Z"
                }),
                &ctx(),
            )
            .await
            .expect("add");
        assert!(result.success);
        assert!(result.str_field("message").expect("message").contains("water the plants"));

        let result = tool.run(json!({"action": "list"}), &ctx()).await.expect("list");
        assert!(result.success);
        assert_eq!(result.field("reminders").and_then(|r| r.as_array()).map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn missing_conversation_context_is_rejected() {
        let tool = ManageReminder::new(Arc::new(MemoryStore::default()));
        let err = tool
            .run(json!({"action": "list"}), &ToolContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::MissingContext { .. }));
    }

    #[tokio::test]
    async fn bad_time_is_rejected() {
        let tool = ManageReminder::new(Arc::new(MemoryStore::default()));
        let err = tool
            .run(
                json!({"action": "add", "task": "x", "scheduled_time": "tomorrow-ish"}),
                &ctx(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgument { name: "scheduled_time", .. }));
    }

    #[tokio::test]
    async fn unsupported_action_is_a_failed_result() {
        let tool = ManageReminder::new(Arc::new(MemoryStore::default()));
        let result = tool
            .run(json!({"action": "delete"}), &ctx())
            .await
            .expect("value");
        assert!(!result.success);
    }
}
