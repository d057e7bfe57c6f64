use crate::error::{Result, ThermoError};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use std::time::Duration;

/// 解析时间戳：epoch 秒（可带小数）或 ISO-8601
///
/// 无时区的 ISO 时间按 UTC 处理。无法解析时返回 `InvalidTimestamp`。
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ThermoError::InvalidTimestamp("empty timestamp".to_string()));
    }

    if looks_numeric(raw) {
        return parse_epoch_seconds(raw);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }

    Err(ThermoError::InvalidTimestamp(format!(
        "unrecognised timestamp: {}",
        raw
    )))
}

fn looks_numeric(raw: &str) -> bool {
    let digits = raw.strip_prefix('-').unwrap_or(raw);
    !digits.is_empty()
        && digits.chars().all(|c| c.is_ascii_digit() || c == '.')
        && digits.chars().filter(|c| *c == '.').count() <= 1
}

fn parse_epoch_seconds(raw: &str) -> Result<DateTime<Utc>> {
    let invalid = || ThermoError::InvalidTimestamp(format!("invalid epoch seconds: {}", raw));

    let secs: f64 = raw.parse().map_err(|_| invalid())?;
    if !secs.is_finite() {
        return Err(invalid());
    }

    let whole = secs.floor();
    let nanos = ((secs - whole) * 1e9).round() as u32;
    Utc.timestamp_opt(whole as i64, nanos.min(999_999_999))
        .single()
        .ok_or_else(invalid)
}

/// `|now - timestamp| <= window`，窗口两端均包含
pub fn check_freshness(
    timestamp: DateTime<Utc>,
    now: DateTime<Utc>,
    window: Duration,
) -> Result<()> {
    let skew_ms = now
        .signed_duration_since(timestamp)
        .num_milliseconds()
        .unsigned_abs();

    if u128::from(skew_ms) > window.as_millis() {
        return Err(ThermoError::StaleOrFutureTimestamp {
            skew_secs: now.signed_duration_since(timestamp).num_seconds(),
            window_secs: window.as_secs(),
        });
    }

    Ok(())
}

/// Signing timestamps are RFC 3339 in UTC with millisecond precision.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}
