//! Log record model and the validator every store read passes through.
//!
//! Stores hand back loosely-typed JSON. Nothing reaches the observable record
//! set without going through [`validate`]: items without a usable timestamp
//! are dropped, durations are coerced to non-negative whole milliseconds.

use std::collections::HashSet;

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// One logged resistance-duration event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    pub id: String,
    pub duration_ms: u64,
    pub occurred_at: DateTime<Utc>,
}

impl LogRecord {
    /// Stored shape of the record, as written into either store.
    pub fn to_raw(&self) -> Value {
        json!({
            "id": self.id,
            "durationMs": self.duration_ms,
            "occurredAt": self.occurred_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        })
    }
}

/// Validate one raw store item.
///
/// Returns `None` when the item is not an object or carries no parseable
/// timestamp. A missing or non-numeric duration becomes 0.
pub fn validate(raw: &Value) -> Option<LogRecord> {
    let obj = raw.as_object()?;
    let occurred_at = field(obj, "occurredAt", "date").and_then(parse_timestamp)?;
    let duration_ms = field(obj, "durationMs", "duration")
        .map(coerce_duration)
        .unwrap_or(0);
    let id = match obj.get("id") {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => format!("ts-{}", occurred_at.timestamp_millis()),
    };

    Some(LogRecord {
        id,
        duration_ms,
        occurred_at,
    })
}

/// Validate a whole store payload into the observable shape: invalid items
/// dropped, ids unique (first occurrence wins), newest first.
pub fn validate_all<'a, I>(items: I) -> Vec<LogRecord>
where
    I: IntoIterator<Item = &'a Value>,
{
    let mut seen = HashSet::new();
    let mut records: Vec<LogRecord> = items
        .into_iter()
        .filter_map(validate)
        .filter(|r| seen.insert(r.id.clone()))
        .collect();
    sort_newest_first(&mut records);
    records
}

/// Sort by `occurred_at` descending. Stable, so equal timestamps keep store order.
pub fn sort_newest_first(records: &mut [LogRecord]) {
    records.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));
}

fn field<'a>(obj: &'a Map<String, Value>, key: &str, legacy: &str) -> Option<&'a Value> {
    obj.get(key)
        .filter(|v| !v.is_null())
        .or_else(|| obj.get(legacy).filter(|v| !v.is_null()))
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => {
            let ms = n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite())
                    .map(|f| f.trunc() as i64)
            })?;
            Utc.timestamp_millis_opt(ms).single()
        }
        // Store-native timestamp: { seconds, nanoseconds }
        Value::Object(ts) => {
            let secs = ts.get("seconds")?.as_i64()?;
            let nanos = ts
                .get("nanoseconds")
                .and_then(Value::as_u64)
                .unwrap_or(0);
            let nanos = u32::try_from(nanos).ok().filter(|n| *n < 1_000_000_000)?;
            Utc.timestamp_opt(secs, nanos).single()
        }
        _ => None,
    }
}

fn coerce_duration(value: &Value) -> u64 {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match n {
        Some(f) if f.is_finite() && f > 0.0 => f.trunc() as u64,
        _ => 0,
    }
}
