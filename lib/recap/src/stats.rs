//! Activity statistics interfaces.
//!
//! Aggregation and persistence belong to a collaborator; the recap stepper
//! only reads one period snapshot through `StatsSource`. `ActivitySink` is
//! the matching write side used by the dispatcher to record inbound
//! messages.

use crate::error::StatsError;
use async_trait::async_trait;
use copper_sparrow_core::ConversationId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Aggregated activity for one conversation over one calendar month.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PeriodStats {
    /// Total inbound messages in the period.
    pub total_messages: u32,
    /// Days of the month with at least one message ("01".."31").
    pub active_days: Vec<String>,
    /// Message count per hour of day (0..24).
    pub hourly_activity: BTreeMap<u8, u32>,
    /// Short text samples for topic commentary.
    pub topic_samples: Vec<String>,
}

impl PeriodStats {
    /// The hour bucket with the most activity.
    ///
    /// Ties resolve to the earliest hour. `None` when no activity was
    /// recorded.
    #[must_use]
    pub fn peak_hour(&self) -> Option<u8> {
        self.hourly_activity
            .iter()
            .fold(None, |best: Option<(u8, u32)>, (&hour, &count)| match best {
                Some((_, best_count)) if best_count >= count => best,
                _ => Some((hour, count)),
            })
            .map(|(hour, _)| hour)
    }
}

/// Read side of the statistics collaborator.
#[async_trait]
pub trait StatsSource: Send + Sync {
    /// Returns the aggregate for one conversation and calendar month, or
    /// `None` when nothing was recorded.
    ///
    /// # Errors
    ///
    /// Returns an error when the stats backend cannot be read.
    async fn period_stats(
        &self,
        conversation: &ConversationId,
        year: i32,
        month: u32,
    ) -> Result<Option<PeriodStats>, StatsError>;
}

/// Write side: records one inbound user message.
pub trait ActivitySink: Send + Sync {
    /// Records a message for the current period.
    fn record(&self, conversation: &ConversationId, text: &str);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peak_hour_picks_the_maximal_bucket() {
        let mut stats = PeriodStats::default();
        stats.hourly_activity.insert(9, 4);
        stats.hourly_activity.insert(21, 17);
        stats.hourly_activity.insert(23, 2);
        assert_eq!(stats.peak_hour(), Some(21));
    }

    #[test]
    fn peak_hour_tie_resolves_to_earliest() {
        let mut stats = PeriodStats::default();
        stats.hourly_activity.insert(8, 5);
        stats.hourly_activity.insert(20, 5);
        assert_eq!(stats.peak_hour(), Some(8));
    }

    #[test]
    fn peak_hour_of_empty_stats_is_none() {
        assert_eq!(PeriodStats::default().peak_hour(), None);
    }

    #[test]
    fn stats_serde_roundtrip() {
        let mut stats = PeriodStats {
            total_messages: 42,
            active_days: vec!["03".to_string(), "07".to_string()],
            ..PeriodStats::default()
        };
        stats.hourly_activity.insert(21, 17);

        let json = serde_json::to_string(&stats).expect("serialize");
        let parsed: PeriodStats = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed.total_messages, 42);
        assert_eq!(parsed.peak_hour(), Some(21));
    }
}
