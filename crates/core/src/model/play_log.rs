use std::collections::BTreeMap;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

/// Length of the trailing statistics window, in calendar days.
pub const STATS_WINDOW_DAYS: u64 = 7;

/// Number of completed word cycles on one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayLogEntry {
    pub date: NaiveDate,
    pub count: u32,
}

impl PlayLogEntry {
    #[must_use]
    pub fn new(date: NaiveDate, count: u32) -> Self {
        Self { date, count }
    }
}

/// Returns the first day of the inclusive window `[today - 6 ..= today]`.
#[must_use]
pub fn window_start(today: NaiveDate) -> NaiveDate {
    today
        .checked_sub_days(Days::new(STATS_WINDOW_DAYS - 1))
        .unwrap_or(NaiveDate::MIN)
}

/// Spreads sparse entries over the seven days ending `today`, oldest first.
///
/// Days without an entry report zero; entries outside the window are ignored.
#[must_use]
pub fn fill_window(today: NaiveDate, entries: &[PlayLogEntry]) -> Vec<PlayLogEntry> {
    let start = window_start(today);
    start
        .iter_days()
        .take_while(|day| *day <= today)
        .map(|day| {
            let count = entries
                .iter()
                .filter(|e| e.date == day)
                .map(|e| e.count)
                .sum();
            PlayLogEntry::new(day, count)
        })
        .collect()
}

/// In-memory per-day play counter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayHistory {
    days: BTreeMap<NaiveDate, u32>,
}

impl PlayHistory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_entries(entries: impl IntoIterator<Item = PlayLogEntry>) -> Self {
        let mut days = BTreeMap::new();
        for entry in entries {
            *days.entry(entry.date).or_insert(0) += entry.count;
        }
        Self { days }
    }

    /// Counts one completed cycle for `today` and returns the new count for that day.
    pub fn record_cycle(&mut self, today: NaiveDate) -> u32 {
        let count = self.days.entry(today).or_insert(0);
        *count = count.saturating_add(1);
        *count
    }

    #[must_use]
    pub fn count_for(&self, day: NaiveDate) -> u32 {
        self.days.get(&day).copied().unwrap_or(0)
    }

    /// Sum of all recorded cycles.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.days.values().map(|c| u64::from(*c)).sum()
    }

    /// Entries with `from <= date <= to`, in date order.
    #[must_use]
    pub fn entries_between(&self, from: NaiveDate, to: NaiveDate) -> Vec<PlayLogEntry> {
        if from > to {
            return Vec::new();
        }
        self.days
            .range(from..=to)
            .map(|(date, count)| PlayLogEntry::new(*date, *count))
            .collect()
    }

    #[must_use]
    pub fn last_7_days(&self, today: NaiveDate) -> Vec<PlayLogEntry> {
        fill_window(today, &self.entries_between(window_start(today), today))
    }
}
