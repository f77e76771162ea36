//! Aggregates over the observable record set.
//!
//! Pure data for hosts that chart or tabulate history: overall totals and
//! per-day buckets. Formatting and layout stay with the host.

use std::collections::BTreeMap;

use chrono::{Datelike, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::record::LogRecord;

/// Day totals under this are light.
pub const LIGHT_LIMIT_MS: u64 = 60_000;
/// Day totals under this (and at least light) are moderate.
pub const MODERATE_LIMIT_MS: u64 = 300_000;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total_count: usize,
    pub total_ms: u64,
    pub longest_ms: u64,
    /// Integer mean, rounded down. Zero when there are no records.
    pub average_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intensity {
    Light,
    Moderate,
    Heavy,
}

impl Intensity {
    pub fn for_total(total_ms: u64) -> Self {
        if total_ms < LIGHT_LIMIT_MS {
            Intensity::Light
        } else if total_ms < MODERATE_LIMIT_MS {
            Intensity::Moderate
        } else {
            Intensity::Heavy
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayTotal {
    pub date: NaiveDate,
    pub count: usize,
    pub total_ms: u64,
    pub intensity: Intensity,
}

pub fn summarize(records: &[LogRecord]) -> Summary {
    let total_count = records.len();
    let total_ms = records
        .iter()
        .fold(0u64, |acc, r| acc.saturating_add(r.duration_ms));
    let longest_ms = records.iter().map(|r| r.duration_ms).max().unwrap_or(0);
    let average_ms = if total_count == 0 {
        0
    } else {
        total_ms / total_count as u64
    };
    Summary {
        total_count,
        total_ms,
        longest_ms,
        average_ms,
    }
}

/// Per-day totals, oldest day first. Days are calendar days at `offset`.
pub fn daily_totals(records: &[LogRecord], offset: FixedOffset) -> Vec<DayTotal> {
    let mut days: BTreeMap<NaiveDate, (usize, u64)> = BTreeMap::new();
    for record in records {
        let date = record.occurred_at.with_timezone(&offset).date_naive();
        let day = days.entry(date).or_insert((0, 0));
        day.0 += 1;
        day.1 = day.1.saturating_add(record.duration_ms);
    }
    days.into_iter()
        .map(|(date, (count, total_ms))| DayTotal {
            date,
            count,
            total_ms,
            intensity: Intensity::for_total(total_ms),
        })
        .collect()
}

/// Days of one month that have records.
pub fn month_totals(
    records: &[LogRecord],
    offset: FixedOffset,
    year: i32,
    month: u32,
) -> Vec<DayTotal> {
    daily_totals(records, offset)
        .into_iter()
        .filter(|d| d.date.year() == year && d.date.month() == month)
        .collect()
}
