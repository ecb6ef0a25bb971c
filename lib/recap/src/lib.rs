//! Guided recap dialogue for the copper-sparrow assistant.
//!
//! A recap is a fixed three-step scripted narrative over the prior
//! period's activity statistics. While a recap session is active it owns
//! every inbound utterance for its conversation.

pub mod error;
pub mod stats;
pub mod stepper;

pub use error::StatsError;
pub use stats::{ActivitySink, PeriodStats, StatsSource};
pub use stepper::{MIN_MESSAGES_FOR_RECAP, RecapKind, RecapManager};
