//! In-memory reminder store and the periodic delivery task.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use copper_sparrow_conversation::{ContextStore, SpeakerRole};
use copper_sparrow_core::{ConversationId, ReminderId};
use copper_sparrow_tools::{Reminder, ReminderError, ReminderStatus, ReminderStore};
use copper_sparrow_transport::MessageSender;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Process-local reminder store.
#[derive(Debug, Default)]
pub struct InMemoryReminderStore {
    reminders: Mutex<Vec<Reminder>>,
}

impl InMemoryReminderStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Reminder>> {
        self.reminders
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl ReminderStore for InMemoryReminderStore {
    async fn add(&self, reminder: Reminder) -> Result<ReminderId, ReminderError> {
        let id = reminder.id;
        self.lock().push(reminder);
        Ok(id)
    }

    async fn pending_for(
        &self,
        conversation: &ConversationId,
    ) -> Result<Vec<Reminder>, ReminderError> {
        Ok(self
            .lock()
            .iter()
            .filter(|r| &r.conversation == conversation && r.status == ReminderStatus::Pending)
            .cloned()
            .collect())
    }

    async fn due(&self, now: DateTime<Utc>) -> Result<Vec<Reminder>, ReminderError> {
        Ok(self
            .lock()
            .iter()
            .filter(|r| r.status == ReminderStatus::Pending && r.scheduled_for <= now)
            .cloned()
            .collect())
    }

    async fn mark_sent(&self, id: ReminderId) -> Result<(), ReminderError> {
        let mut reminders = self.lock();
        let reminder = reminders
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| ReminderError::StoreFailed {
                reason: format!("unknown reminder {id}"),
            })?;
        reminder.status = ReminderStatus::Sent;
        Ok(())
    }
}

/// Spawns the periodic task that delivers due reminders.
///
/// Each delivery sends the reminder text and drops a system notice into the
/// conversation context so the model knows it happened.
pub fn spawn_reminder_delivery(
    store: Arc<InMemoryReminderStore>,
    sender: Arc<dyn MessageSender>,
    context: Arc<ContextStore>,
    poll_interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(poll_interval);
        loop {
            interval.tick().await;
            let due = match store.due(Utc::now()).await {
                Ok(due) => due,
                Err(e) => {
                    tracing::warn!(error = %e, "could not read due reminders");
                    continue;
                }
            };

            for reminder in due {
                let text = format!("Reminder: {}", reminder.task);
                match sender.send_text(&reminder.conversation, &text).await {
                    Ok(()) => {
                        context.append(
                            &reminder.conversation,
                            &format!("Reminder \"{}\" was just delivered.", reminder.task),
                            SpeakerRole::System,
                        );
                        if let Err(e) = store.mark_sent(reminder.id).await {
                            tracing::warn!(error = %e, "could not mark reminder sent");
                        }
                    }
                    Err(e) => {
                        // Left pending; the next tick retries.
                        tracing::warn!(reminder = %reminder.id, error = %e, "reminder delivery failed");
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn conversation() -> ConversationId {
        ConversationId::new("c1")
    }

    #[tokio::test]
    async fn due_returns_only_elapsed_pending_reminders() {
        let store = InMemoryReminderStore::new();
        let past = Utc.with_ymd_and_hms(2026, 1, 1, 8, 0, 0).single().expect("valid");
        let future = Utc.with_ymd_and_hms(2030, 1, 1, 8, 0, 0).single().expect("valid");

        let elapsed = Reminder::new(conversation(), "stretch", past);
        let elapsed_id = elapsed.id;
        store.add(elapsed).await.expect("add");
        store
            .add(Reminder::new(conversation(), "future thing", future))
            .await
            .expect("add");

        let due = store.due(Utc::now()).await.expect("due");
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].task, "stretch");

        store.mark_sent(elapsed_id).await.expect("mark");
        assert!(store.due(Utc::now()).await.expect("due").is_empty());
        assert!(store.pending_for(&conversation()).await.expect("pending").len() == 1);
    }

    #[tokio::test]
    async fn mark_sent_of_unknown_reminder_fails() {
        let store = InMemoryReminderStore::new();
        assert!(store.mark_sent(ReminderId::new()).await.is_err());
    }
}
