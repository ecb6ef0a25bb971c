//! The guided recap stepper.
//!
//! A session walks a fixed three-step script: opening hook, raw numbers,
//! peak-hour and topic commentary ending in a question. Each fragment is
//! produced by the narrative collaborator under a prompt scoped strictly to
//! the current step. After the third fragment the session is deleted, no
//! matter what the narrator produced.

use crate::error::StatsError;
use crate::stats::{PeriodStats, StatsSource};
use chrono::{DateTime, Datelike, Utc};
use copper_sparrow_ai::Analyzer;
use copper_sparrow_core::ConversationId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Minimum prior-period message count required to start a recap.
pub const MIN_MESSAGES_FOR_RECAP: u32 = 5;

const FINAL_STEP: u8 = 3;

/// The flavor of recap being narrated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecapKind {
    /// Recap of the previous calendar month.
    Monthly,
}

impl RecapKind {
    fn label(self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
        }
    }
}

#[derive(Debug)]
struct RecapSession {
    step: u8,
    kind: RecapKind,
    month_name: &'static str,
    stats: PeriodStats,
}

/// Drives recap sessions, at most one per conversation.
pub struct RecapManager {
    sessions: Mutex<HashMap<ConversationId, RecapSession>>,
    stats: Arc<dyn StatsSource>,
    narrator: Arc<dyn Analyzer>,
}

impl RecapManager {
    /// Creates a manager over the stats and narrative collaborators.
    #[must_use]
    pub fn new(stats: Arc<dyn StatsSource>, narrator: Arc<dyn Analyzer>) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            stats,
            narrator,
        }
    }

    /// True when a recap session owns this conversation's turns.
    #[must_use]
    pub fn is_active(&self, conversation: &ConversationId) -> bool {
        self.lock().contains_key(conversation)
    }

    /// Starts a recap for the period before `now`.
    ///
    /// Returns the first narrative fragment, or `None` when the prior
    /// period has too little activity (no session is created then).
    ///
    /// # Errors
    ///
    /// Returns an error when the stats backend cannot be read.
    pub async fn initiate(
        &self,
        conversation: &ConversationId,
        kind: RecapKind,
        now: DateTime<Utc>,
    ) -> Result<Option<String>, StatsError> {
        let (year, month) = previous_month(now);
        let Some(stats) = self.stats.period_stats(conversation, year, month).await? else {
            return Ok(None);
        };
        if stats.total_messages < MIN_MESSAGES_FOR_RECAP {
            tracing::debug!(
                conversation = %conversation,
                total = stats.total_messages,
                "not enough activity for a recap"
            );
            return Ok(None);
        }

        self.lock().insert(
            conversation.clone(),
            RecapSession {
                step: 0,
                kind,
                month_name: month_name(month),
                stats,
            },
        );

        Ok(self.advance(conversation, "").await)
    }

    /// Advances the session and returns the next narrative fragment.
    ///
    /// Returns `None` when no session exists. The reply content does not
    /// alter the scripted sequence; only the step counter does. After the
    /// third fragment the session is removed.
    pub async fn advance(&self, conversation: &ConversationId, _user_reply: &str) -> Option<String> {
        let (step, prompt, context) = {
            let mut sessions = self.lock();
            let session = sessions.get_mut(conversation)?;
            session.step += 1;

            let Some(prompt) = step_prompt(session) else {
                // Steps past the script are unreachable by construction;
                // drop the stale session if one ever shows up.
                sessions.remove(conversation);
                return None;
            };
            let context = serde_json::to_string(&session.stats).unwrap_or_default();
            (session.step, prompt, context)
        };

        let fragment = self.narrator.analyze(&context, &prompt).await;

        if step >= FINAL_STEP {
            self.lock().remove(conversation);
        }
        Some(fragment)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<ConversationId, RecapSession>> {
        self.sessions
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Builds the narrative prompt for the session's current step.
fn step_prompt(session: &RecapSession) -> Option<String> {
    let preamble = format!(
        "You are giving the user a {kind} recap of your conversations. \
         Use a warm, casual, slightly poetic voice and keep it personal. \
         Do not reveal everything at once: write ONLY the part for step {step}.",
        kind = session.kind.label(),
        step = session.step,
    );

    let body = match session.step {
        1 => format!(
            "Open with a memorable hook about the journey through {month}. \
             Mention that we have been through a lot together.",
            month = session.month_name,
        ),
        2 => format!(
            "Share the numbers: we talked on {days} different days, \
             {total} messages in total. Add a playful comment about those figures.",
            days = session.stats.active_days.len(),
            total = session.stats.total_messages,
        ),
        3 => {
            let peak = session.stats.peak_hour().unwrap_or(0);
            format!(
                "Talk about our usual peak around {peak}:00. Reflect on the \
                 habits suggested by these topics: {topics}. Close by asking \
                 the user what they think of those habits.",
                topics = session.stats.topic_samples.join(", "),
            )
        }
        _ => return None,
    };

    Some(format!("{preamble}\n\n{body}"))
}

/// The calendar month before `now`.
fn previous_month(now: DateTime<Utc>) -> (i32, u32) {
    if now.month() == 1 {
        (now.year() - 1, 12)
    } else {
        (now.year(), now.month() - 1)
    }
}

fn month_name(month: u32) -> &'static str {
    match month {
        1 => "January",
        2 => "February",
        3 => "March",
        4 => "April",
        5 => "May",
        6 => "June",
        7 => "July",
        8 => "August",
        9 => "September",
        10 => "October",
        11 => "November",
        _ => "December",
    }
}
