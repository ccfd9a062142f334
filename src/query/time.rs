//! Window bound expressions accepted by the HTTP API and the CLI
//!
//! - RFC 3339 (`2024-01-15T10:30:00Z`, any offset)
//! - Nanoseconds since the epoch (`1705314600000000000`)
//! - `now` or `now-<n><unit>` with unit `s`, `m`, `h`, `d` or `w`

use crate::query::error::{QueryError, QueryResult};
use chrono::{DateTime, Duration, Utc};

/// Parse a bound expression relative to `now`
pub fn parse_time_expr(s: &str, now: DateTime<Utc>) -> QueryResult<DateTime<Utc>> {
    let s = s.trim();

    if let Ok(ns) = s.parse::<i64>() {
        return Ok(DateTime::from_timestamp_nanos(ns));
    }

    if s.starts_with("now") {
        return parse_relative_time(s, now);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    Err(QueryError::InvalidTimeRange(format!(
        "Cannot parse timestamp: {}",
        s
    )))
}

fn parse_relative_time(s: &str, now: DateTime<Utc>) -> QueryResult<DateTime<Utc>> {
    if s == "now" {
        return Ok(now);
    }

    let re = regex::Regex::new(r"^now-(\d+)([smhdw])$")
        .map_err(|e| QueryError::InvalidTimeRange(format!("Regex error: {}", e)))?;

    let caps = re.captures(s).ok_or_else(|| {
        QueryError::InvalidTimeRange(format!("Cannot parse relative time: {}", s))
    })?;

    let amount: i64 = caps[1].parse().map_err(|_| {
        QueryError::InvalidTimeRange("Invalid number in time expression".to_string())
    })?;

    let offset = match &caps[2] {
        "s" => Duration::try_seconds(amount),
        "m" => Duration::try_minutes(amount),
        "h" => Duration::try_hours(amount),
        "d" => Duration::try_days(amount),
        "w" => Duration::try_weeks(amount),
        unit => {
            return Err(QueryError::InvalidTimeRange(format!(
                "Invalid time unit: {}",
                unit
            )))
        }
    };

    offset
        .and_then(|d| now.checked_sub_signed(d))
        .ok_or_else(|| QueryError::InvalidTimeRange(format!("Relative time out of range: {}", s)))
}
