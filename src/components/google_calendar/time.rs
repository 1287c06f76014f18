use super::models::GoogleEventTime;
use crate::error::{google_calendar_error, AppResult};
use chrono::{DateTime, FixedOffset, Locale, NaiveDate, NaiveDateTime, TimeZone};
use chrono_tz::Tz;

/// Format used for every timestamp shown to people
pub const DISPLAY_FORMAT: &str = "%A %d.%m.%Y %H:%M:%S";

/// Parse an RFC 3339 timestamp as returned by the API and stored in snapshots
pub fn parse_timestamp(value: &str) -> AppResult<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(value.trim())
        .map_err(|e| google_calendar_error(&format!("Failed to parse datetime '{}': {}", value, e)))
}

/// Resolve a start/end object, all-day events begin at local midnight
pub fn parse_event_time(time: &GoogleEventTime, tz: &Tz) -> AppResult<DateTime<FixedOffset>> {
    if let Some(date_time) = &time.date_time {
        parse_timestamp(date_time)
    } else if let Some(date) = &time.date {
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|e| google_calendar_error(&format!("Failed to parse date: {}", e)))?;
        let midnight = date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| google_calendar_error("Failed to create datetime"))?;
        local_to_fixed(&midnight, tz)
    } else {
        Err(google_calendar_error("Event time has neither dateTime nor date"))
    }
}

/// Attach the configured timezone to a wall-clock time
pub fn local_to_fixed(naive: &NaiveDateTime, tz: &Tz) -> AppResult<DateTime<FixedOffset>> {
    match tz.from_local_datetime(naive) {
        chrono::LocalResult::Single(dt) => Ok(dt.fixed_offset()),
        // Autumn DST overlap, take the first occurrence
        chrono::LocalResult::Ambiguous(earliest, _) => Ok(earliest.fixed_offset()),
        chrono::LocalResult::None => Err(google_calendar_error(&format!(
            "Invalid local time {} in {}",
            naive, tz
        ))),
    }
}

/// Map a configured language code to the chrono locale used for weekday names
pub fn display_locale(code: &str) -> Locale {
    match code {
        "cs" | "cs_CZ" | "cs-CZ" => Locale::cs_CZ,
        "fi" | "fi_FI" => Locale::fi_FI,
        "de" | "de_DE" => Locale::de_DE,
        _ => Locale::en_US,
    }
}

/// Human readable timestamp, never parsed back
pub fn format_display(dt: &DateTime<FixedOffset>, tz: &Tz, locale: &str) -> String {
    dt.with_timezone(tz)
        .format_localized(DISPLAY_FORMAT, display_locale(locale))
        .to_string()
}

/// Render a duration as `H:MM:SS`
pub fn format_duration(duration: chrono::Duration) -> String {
    let total = duration.num_seconds();
    let sign = if total < 0 { "-" } else { "" };
    let total = total.abs();
    format!(
        "{}{}:{:02}:{:02}",
        sign,
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}
