//! Reminder types and the storage capability used by the reminder tool.
//!
//! Persistence itself belongs to a collaborator; the tool only talks to the
//! `ReminderStore` contract. Delivery is handled by a background task owned
//! by the binary.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use copper_sparrow_core::{ConversationId, ReminderId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderStatus {
    /// Waiting for its scheduled time.
    Pending,
    /// Delivered to the conversation.
    Sent,
}

/// One scheduled reminder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reminder {
    /// Unique identifier.
    pub id: ReminderId,
    /// The conversation to deliver into.
    pub conversation: ConversationId,
    /// What to remind about.
    pub task: String,
    /// When to deliver.
    pub scheduled_for: DateTime<Utc>,
    /// Lifecycle state.
    pub status: ReminderStatus,
}

impl Reminder {
    /// Creates a pending reminder.
    #[must_use]
    pub fn new(conversation: ConversationId, task: impl Into<String>, scheduled_for: DateTime<Utc>) -> Self {
        Self {
            id: ReminderId::new(),
            conversation,
            task: task.into(),
            scheduled_for,
            status: ReminderStatus::Pending,
        }
    }
}

/// Errors from the reminder storage collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReminderError {
    /// Storage operation failed.
    StoreFailed { reason: String },
}

impl fmt::Display for ReminderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StoreFailed { reason } => write!(f, "reminder store failed: {reason}"),
        }
    }
}

impl std::error::Error for ReminderError {}

/// Storage contract for reminders.
#[async_trait]
pub trait ReminderStore: Send + Sync {
    /// Persists a new reminder.
    async fn add(&self, reminder: Reminder) -> Result<ReminderId, ReminderError>;

    /// Lists pending reminders for one conversation.
    async fn pending_for(&self, conversation: &ConversationId) -> Result<Vec<Reminder>, ReminderError>;

    /// Returns pending reminders due at or before `now`.
    async fn due(&self, now: DateTime<Utc>) -> Result<Vec<Reminder>, ReminderError>;

    /// Marks a reminder as delivered.
    async fn mark_sent(&self, id: ReminderId) -> Result<(), ReminderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_reminder_is_pending() {
        let reminder = Reminder::new(ConversationId::new("c1"), "water the plants", Utc::now());
        assert_eq!(reminder.status, ReminderStatus::Pending);
        assert_eq!(reminder.task, "water the plants");
    }

    #[test]
    fn reminder_serde_roundtrip() {
        let reminder = Reminder::new(ConversationId::new("c1"), "stretch", Utc::now());
        let json = serde_json::to_string(&reminder).expect("serialize");
        let parsed: Reminder = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(reminder.id, parsed.id);
        assert_eq!(parsed.status, ReminderStatus::Pending);
    }
}
