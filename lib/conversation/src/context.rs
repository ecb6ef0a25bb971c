//! Bounded per-conversation transcript store.
//!
//! Each conversation keeps a short rolling window of turns to bound prompt
//! size. Entries are created lazily on first append, evicted oldest-first
//! once the window is full, cleared wholesale on an explicit reset, and are
//! never persisted across restarts.

use chrono::{DateTime, Utc};
use copper_sparrow_core::ConversationId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

/// Marker appended to transcript text that was clipped to the length limit.
pub const TRUNCATION_MARKER: &str = "… (truncated to save context)";

/// Default maximum number of turns retained per conversation.
const DEFAULT_MAX_TURNS: usize = 10;

/// Default maximum characters stored per turn.
const DEFAULT_MAX_CHARS: usize = 1000;

/// Role attached to a stored turn. Only these two ever reach a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    /// Something the user said.
    User,
    /// Something the assistant replied.
    Assistant,
}

/// Logical role supplied by callers when appending.
///
/// `System` entries (internal notices surfaced to the model) are stored as
/// user turns with a visible prefix, keeping the stored transcript
/// two-role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeakerRole {
    /// The human participant.
    User,
    /// The assistant.
    Assistant,
    /// An internal notice; mapped onto the user role with a prefix.
    System,
}

/// One role-tagged entry in a conversation transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    /// Who spoke.
    pub role: TurnRole,
    /// What was said, clipped to the store's character limit.
    pub text: String,
    /// When the turn was recorded.
    pub timestamp: DateTime<Utc>,
}

/// Process-wide transcript store, partitioned by conversation id.
///
/// Eviction is strictly FIFO over turns, regardless of role, so a
/// user/assistant pair can be split by eviction once the window is full.
/// That quirk is intentional and relied upon by the prompt-size bound.
#[derive(Debug)]
pub struct ContextStore {
    history: Mutex<HashMap<ConversationId, Vec<Turn>>>,
    max_turns: usize,
    max_chars: usize,
}

impl Default for ContextStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextStore {
    /// Creates a store with the default limits (10 turns, 1000 chars).
    #[must_use]
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_MAX_TURNS, DEFAULT_MAX_CHARS)
    }

    /// Creates a store with explicit turn and character limits.
    #[must_use]
    pub fn with_limits(max_turns: usize, max_chars: usize) -> Self {
        Self {
            history: Mutex::new(HashMap::new()),
            max_turns,
            max_chars,
        }
    }

    /// Appends a turn to a conversation, creating the entry lazily.
    ///
    /// Text longer than the character limit is clipped and marked; a
    /// `System` speaker is stored as a prefixed user turn. The oldest turn
    /// is evicted once the window exceeds the turn limit.
    pub fn append(&self, id: &ConversationId, text: &str, role: SpeakerRole) {
        let (role, text) = match role {
            SpeakerRole::User => (TurnRole::User, self.clip(text)),
            SpeakerRole::Assistant => (TurnRole::Assistant, self.clip(text)),
            SpeakerRole::System => (TurnRole::User, self.clip(&format!("[system] {text}"))),
        };

        let turn = Turn {
            role,
            text,
            timestamp: Utc::now(),
        };

        let mut history = self.lock();
        let turns = history.entry(id.clone()).or_default();
        turns.push(turn);
        if turns.len() > self.max_turns {
            turns.remove(0);
        }
    }

    /// Returns the stored turns for a conversation, oldest first.
    ///
    /// A conversation with no history yields an empty vector, never an
    /// error.
    #[must_use]
    pub fn get(&self, id: &ConversationId) -> Vec<Turn> {
        self.lock().get(id).cloned().unwrap_or_default()
    }

    /// Removes all history for a conversation.
    pub fn clear(&self, id: &ConversationId) {
        self.lock().remove(id);
    }

    /// Returns the number of stored turns for a conversation.
    #[must_use]
    pub fn len(&self, id: &ConversationId) -> usize {
        self.lock().get(id).map_or(0, Vec::len)
    }

    /// True when the conversation has no stored turns.
    #[must_use]
    pub fn is_empty(&self, id: &ConversationId) -> bool {
        self.len(id) == 0
    }

    fn clip(&self, text: &str) -> String {
        if text.chars().count() <= self.max_chars {
            return text.to_string();
        }
        let mut clipped: String = text.chars().take(self.max_chars).collect();
        clipped.push_str(TRUNCATION_MARKER);
        clipped
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<ConversationId, Vec<Turn>>> {
        self.history.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
