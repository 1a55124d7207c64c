//! Job parameter decoding
//! Date ranges, tab lists and checkbox lists read out of parameter blocks

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde_json::Value;
use shared::ParamBlock;

use crate::error::{Result, ScrapeError};

pub const START_DATE: &str = "start_date";
pub const END_DATE: &str = "end_date";
pub const START_DATE_OFFSET: &str = "start_date_offset";
pub const END_DATE_OFFSET: &str = "end_date_offset";
pub const NOW: &str = "NOW";

/// Absolute dates are pinned to this UTC hour so a day never straddles midnight.
pub const ANCHOR_HOUR: u32 = 6;

fn invalid(id: &str, value: &Value, reason: &str) -> ScrapeError {
    ScrapeError::InvalidValue {
        id: id.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Last value for `key` across all blocks.
pub fn last_value<'a>(blocks: &'a [ParamBlock], key: &str) -> Option<&'a Value> {
    blocks.iter().rev().find_map(|b| b.get(key))
}

pub fn string_param(blocks: &[ParamBlock], key: &str) -> Result<Option<String>> {
    match last_value(blocks, key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(invalid(key, other, "expected a string")),
    }
}

pub fn int_param(blocks: &[ParamBlock], key: &str) -> Result<Option<i64>> {
    match last_value(blocks, key) {
        None => Ok(None),
        Some(v) => as_int(key, v).map(Some),
    }
}

fn as_int(key: &str, value: &Value) -> Result<i64> {
    match value {
        Value::Number(n) => n.as_i64().ok_or_else(|| invalid(key, value, "expected a whole number")),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| invalid(key, value, "expected a whole number")),
        _ => Err(invalid(key, value, "expected a whole number")),
    }
}

/// Values for `key` from every block, in order. A scalar counts as a one-item list.
pub fn string_list(blocks: &[ParamBlock], key: &str) -> Result<Vec<String>> {
    let mut out = Vec::new();
    for value in blocks.iter().filter_map(|b| b.get(key)) {
        match value {
            Value::Array(items) => {
                for item in items {
                    match item {
                        Value::String(s) => out.push(s.clone()),
                        Value::Number(n) => out.push(n.to_string()),
                        other => return Err(invalid(key, other, "expected a string")),
                    }
                }
            }
            Value::String(s) => out.push(s.clone()),
            Value::Number(n) => out.push(n.to_string()),
            other => return Err(invalid(key, other, "expected a list")),
        }
    }
    Ok(out)
}

pub fn int_list(blocks: &[ParamBlock], key: &str) -> Result<Vec<i64>> {
    let mut out = Vec::new();
    for value in blocks.iter().filter_map(|b| b.get(key)) {
        match value {
            Value::Array(items) => {
                for item in items {
                    out.push(as_int(key, item)?);
                }
            }
            other => out.push(as_int(key, other)?),
        }
    }
    Ok(out)
}

/// Inclusive range of days to collect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    /// Start defaults to `now`, end defaults to the start. Absolute dates
    /// (`YYYY-MM-DD`) win over day offsets relative to `now`. `NOW` on either
    /// date key collapses the range to `now`.
    pub fn from_blocks(blocks: &[ParamBlock], now: DateTime<Utc>) -> Result<Self> {
        let is_now = |key: &str| {
            last_value(blocks, key)
                .and_then(Value::as_str)
                .is_some_and(|s| s.trim().eq_ignore_ascii_case(NOW))
        };
        if is_now(START_DATE) || is_now(END_DATE) {
            return Ok(Self { start: now, end: now });
        }

        let start = resolve(blocks, START_DATE, START_DATE_OFFSET, now)?.unwrap_or(now);
        let end = resolve(blocks, END_DATE, END_DATE_OFFSET, now)?.unwrap_or(start);
        Ok(Self { start, end })
    }

    /// One instant per day, 24 hours apart, from start through end.
    /// Empty when end precedes start.
    pub fn days(&self) -> Vec<DateTime<Utc>> {
        let mut out = Vec::new();
        let mut at = self.start;
        while at <= self.end {
            out.push(at);
            at += Duration::hours(24);
        }
        out
    }
}

fn resolve(
    blocks: &[ParamBlock],
    date_key: &str,
    offset_key: &str,
    now: DateTime<Utc>,
) -> Result<Option<DateTime<Utc>>> {
    if let Some(value) = last_value(blocks, date_key) {
        return parse_anchored(date_key, value).map(Some);
    }
    match int_param(blocks, offset_key)? {
        None => Ok(None),
        Some(days) => Duration::try_days(days)
            .and_then(|d| now.checked_add_signed(d))
            .map(Some)
            .ok_or_else(|| invalid(offset_key, &Value::from(days), "offset out of range")),
    }
}

fn parse_anchored(key: &str, value: &Value) -> Result<DateTime<Utc>> {
    let text = value.as_str().ok_or_else(|| invalid(key, value, "expected YYYY-MM-DD"))?;
    let date = NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
        .map_err(|_| invalid(key, value, "expected YYYY-MM-DD"))?;
    date.and_hms_opt(ANCHOR_HOUR, 0, 0)
        .map(|dt| dt.and_utc())
        .ok_or_else(|| invalid(key, value, "unrepresentable time"))
}
