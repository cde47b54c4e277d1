use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};

/// Arbitrary anchor date for time-of-day values; only the time part is meaningful.
pub fn base_date() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1901, 2, 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

/// Turns seconds since midnight into a time of day on the anchor date.
/// Non-finite or out-of-range input maps to the anchor itself.
pub fn parse_interval(seconds: f64) -> NaiveDateTime {
    let base = base_date();
    if !seconds.is_finite() {
        return base;
    }
    Duration::try_milliseconds((seconds * 1000.0).round() as i64)
        .and_then(|offset| base.checked_add_signed(offset))
        .unwrap_or(base)
}

/// Inverse of [`parse_interval`] for whole seconds.
pub fn seconds_since_midnight(value: NaiveDateTime) -> u32 {
    value.time().num_seconds_from_midnight()
}

/// `HH:MM:SS` label for an axis tick or tooltip.
pub fn format_interval(seconds: f64) -> String {
    parse_interval(seconds).format("%H:%M:%S").to_string()
}
