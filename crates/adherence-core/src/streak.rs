//! Streak computation over irregular completion timestamps.
//!
//! A streak is the number of consecutive calendar days that contain at least
//! one completion. Timestamps are normalized to the caller's local calendar
//! date, deduplicated, and walked newest-first:
//! - a gap of exactly one day extends the running streak
//! - any other gap resets it to 1
//!
//! Input is taken as-is. Unsorted, duplicated or future-dated timestamps are
//! tolerated since upstream data entry is imprecise.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::time_window::{days_between, is_consecutive_day, local_date, utc_offset};

/// A single completion of a tracked behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionEvent {
    /// Identifier of the tracked behavior (habit, check-in, journal...)
    pub behavior_id: String,
    /// When the completion was recorded
    pub timestamp: DateTime<Utc>,
}

impl CompletionEvent {
    pub fn new(behavior_id: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            behavior_id: behavior_id.into(),
            timestamp,
        }
    }
}

/// Streak metrics for one tracked behavior.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakResult {
    /// Run of consecutive days ending at the most recent completion
    pub current_streak: u32,
    /// Longest run of consecutive days anywhere in the history
    pub longest_streak: u32,
    /// Local calendar date of the most recent completion
    pub last_event_date: Option<NaiveDate>,
    /// Most recent completion is today or yesterday
    pub is_active: bool,
}

/// Computes [`StreakResult`]s from completion timestamps.
#[derive(Debug, Clone, Copy)]
pub struct StreakCalculator {
    /// Local clock used to decide calendar-day boundaries
    offset: FixedOffset,
}

impl Default for StreakCalculator {
    fn default() -> Self {
        Self {
            offset: utc_offset(),
        }
    }
}

impl StreakCalculator {
    /// Create a calculator using UTC day boundaries
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a calculator using the given local offset for day boundaries
    pub fn with_offset(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Compute the streak for a single behavior.
    ///
    /// # Arguments
    /// * `events` - Completion timestamps, in any order
    /// * `now` - Evaluation instant, used only for `is_active`
    pub fn compute_streak<I>(&self, events: I, now: DateTime<Utc>) -> StreakResult
    where
        I: IntoIterator<Item = DateTime<Utc>>,
    {
        let mut future_dated = 0usize;
        let mut dates: Vec<NaiveDate> = events
            .into_iter()
            .inspect(|ts| {
                if *ts > now {
                    future_dated += 1;
                }
            })
            .map(|ts| local_date(ts, self.offset))
            .collect();

        if future_dated > 0 {
            tracing::warn!(
                "Streak input contains {} future-dated event(s); accepting as-is",
                future_dated
            );
        }

        dates.sort_unstable_by(|a, b| b.cmp(a));
        dates.dedup();

        let Some(&last_event_date) = dates.first() else {
            return StreakResult::default();
        };

        let mut current_streak: Option<u32> = None;
        let mut running: u32 = 1;
        let mut longest_streak: u32 = 1;

        for pair in dates.windows(2) {
            let (newer, older) = (pair[0], pair[1]);
            if is_consecutive_day(older, newer) {
                running += 1;
            } else {
                current_streak.get_or_insert(running);
                running = 1;
            }
            longest_streak = longest_streak.max(running);
        }

        let current_streak = current_streak.unwrap_or(running);
        let since_last = days_between(last_event_date, local_date(now, self.offset));
        let is_active = (0..=1).contains(&since_last);

        tracing::debug!(
            "Streak over {} distinct day(s): current={}, longest={}, active={}",
            dates.len(),
            current_streak,
            longest_streak,
            is_active
        );

        StreakResult {
            current_streak,
            longest_streak,
            last_event_date: Some(last_event_date),
            is_active,
        }
    }

    /// Compute streaks for every behavior present in a mixed event store.
    pub fn compute_streaks_by_behavior(
        &self,
        events: &[CompletionEvent],
        now: DateTime<Utc>,
    ) -> BTreeMap<String, StreakResult> {
        let mut grouped: BTreeMap<&str, Vec<DateTime<Utc>>> = BTreeMap::new();
        for event in events {
            grouped
                .entry(event.behavior_id.as_str())
                .or_default()
                .push(event.timestamp);
        }

        grouped
            .into_iter()
            .map(|(behavior_id, timestamps)| {
                (behavior_id.to_string(), self.compute_streak(timestamps, now))
            })
            .collect()
    }
}
