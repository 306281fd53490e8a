//! Timestamp normalization.

use chrono::{DateTime, Local, NaiveDateTime};

/// Display format used for every stored timestamp.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Current local time in [`TIMESTAMP_FORMAT`].
pub fn now_timestamp() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Normalize a source timestamp into [`TIMESTAMP_FORMAT`].
///
/// Accepts ISO-8601 with a zone (`Z` or an offset, wall-clock time kept as
/// written), Unix seconds, and values that are already normalized.
pub fn try_normalize(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.format(TIMESTAMP_FORMAT).to_string());
    }

    if raw.bytes().all(|b| b.is_ascii_digit()) {
        let secs: i64 = raw.parse().ok()?;
        let dt = DateTime::from_timestamp(secs, 0)?;
        return Some(dt.with_timezone(&Local).format(TIMESTAMP_FORMAT).to_string());
    }

    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .ok()
        .map(|dt| dt.format(TIMESTAMP_FORMAT).to_string())
}

/// Normalize a post creation time, keeping the raw value when it cannot be parsed.
pub fn normalize_post_date(raw: &str) -> String {
    match try_normalize(raw) {
        Some(normalized) => normalized,
        None => {
            if !raw.is_empty() {
                log::warn!("Could not normalize post date '{}', keeping raw value", raw);
            }
            raw.to_string()
        }
    }
}
