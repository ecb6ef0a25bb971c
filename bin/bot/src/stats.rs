//! In-memory activity log.
//!
//! Backs both sides of the stats contract: the dispatcher records inbound
//! messages through `ActivitySink`, the recap stepper reads monthly
//! aggregates through `StatsSource`. Nothing is persisted across restarts.

use async_trait::async_trait;
use chrono::{Datelike, Timelike, Utc};
use copper_sparrow_core::ConversationId;
use copper_sparrow_recap::{ActivitySink, PeriodStats, StatsError, StatsSource};
use std::collections::HashMap;
use std::sync::Mutex;

/// Texts shorter than this are not worth sampling as topics.
const MIN_SAMPLE_CHARS: usize = 10;
/// At most this many topic samples per month.
const MAX_SAMPLES: usize = 30;
/// Sample chars kept per topic entry.
const SAMPLE_LENGTH: usize = 100;
/// Every Nth eligible message becomes a topic sample.
const SAMPLE_STRIDE: u32 = 3;

type MonthKey = (ConversationId, i32, u32);

/// Process-local activity aggregates, partitioned by conversation and month.
#[derive(Debug, Default)]
pub struct ActivityLog {
    months: Mutex<HashMap<MonthKey, PeriodStats>>,
}

impl ActivityLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<MonthKey, PeriodStats>> {
        self.months.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl ActivitySink for ActivityLog {
    fn record(&self, conversation: &ConversationId, text: &str) {
        let now = Utc::now();
        let key = (conversation.clone(), now.year(), now.month());

        let mut months = self.lock();
        let stats = months.entry(key).or_default();
        stats.total_messages += 1;

        let day = format!("{:02}", now.day());
        if !stats.active_days.contains(&day) {
            stats.active_days.push(day);
        }

        let hour = u8::try_from(now.hour()).unwrap_or(0);
        *stats.hourly_activity.entry(hour).or_insert(0) += 1;

        if text.chars().count() > MIN_SAMPLE_CHARS
            && stats.topic_samples.len() < MAX_SAMPLES
            && stats.total_messages % SAMPLE_STRIDE == 0
        {
            stats
                .topic_samples
                .push(text.chars().take(SAMPLE_LENGTH).collect());
        }
    }
}

#[async_trait]
impl StatsSource for ActivityLog {
    async fn period_stats(
        &self,
        conversation: &ConversationId,
        year: i32,
        month: u32,
    ) -> Result<Option<PeriodStats>, StatsError> {
        Ok(self
            .lock()
            .get(&(conversation.clone(), year, month))
            .cloned())
    }
}
