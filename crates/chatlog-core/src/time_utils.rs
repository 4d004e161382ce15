use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use chrono_tz::Tz;
use tracing::warn;

use crate::error::{ArchiveError, Result};

// ── System timezone detection ─────────────────────────────────────────────────

/// Detect the IANA timezone name of the running system.
///
/// Falls back to `"UTC"` if detection fails.
pub fn get_system_timezone() -> String {
    iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string())
}

// ── Export timestamps ─────────────────────────────────────────────────────────

/// Timestamp layouts with an explicit offset, as written by the exporter.
const OFFSET_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%:z"];

/// Layouts without an offset; these are read as UTC.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
];

/// Parse a message timestamp from a `messages.csv` / `messages.json` row.
///
/// Accepts the space-separated form the CSV export uses
/// (`2021-03-04 05:06:07.123000+00:00`), RFC 3339, and offset-less variants
/// which are taken to be UTC.
pub fn parse_export_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return Err(ArchiveError::MalformedInput(
            "empty message timestamp".to_string(),
        ));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Ok(dt.with_timezone(&Utc));
        }
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(naive.and_utc());
        }
    }

    Err(ArchiveError::MalformedInput(format!(
        "invalid message timestamp \"{}\"",
        raw
    )))
}

// ── Granularity ───────────────────────────────────────────────────────────────

/// Bucket size for time-series views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Granularity {
    Day,
    Month,
    Year,
}

impl Granularity {
    /// `strftime` pattern that produces the bucket key.
    pub fn key_format(self) -> &'static str {
        match self {
            Granularity::Day => "%Y-%m-%d",
            Granularity::Month => "%Y-%m",
            Granularity::Year => "%Y",
        }
    }
}

impl FromStr for Granularity {
    type Err = ArchiveError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "day" | "daily" => Ok(Granularity::Day),
            "month" | "monthly" => Ok(Granularity::Month),
            "year" | "yearly" => Ok(Granularity::Year),
            other => Err(ArchiveError::Config(format!(
                "unknown granularity \"{}\"",
                other
            ))),
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Granularity::Day => "day",
            Granularity::Month => "month",
            Granularity::Year => "year",
        };
        f.write_str(s)
    }
}

// ── TimezoneHandler ───────────────────────────────────────────────────────────

/// Converts UTC message timestamps into a display timezone.
#[derive(Debug, Clone, Copy)]
pub struct TimezoneHandler {
    tz: Tz,
}

impl TimezoneHandler {
    /// Create a handler for the given IANA timezone name.
    ///
    /// If `tz_name` is not a recognised IANA timezone, falls back to UTC
    /// and logs a warning.
    pub fn new(tz_name: &str) -> Self {
        let tz = tz_name.parse::<Tz>().unwrap_or_else(|_| {
            warn!(
                "TimezoneHandler: unrecognised timezone \"{}\", falling back to UTC",
                tz_name
            );
            Tz::UTC
        });
        Self { tz }
    }

    /// Validate that `tz_name` is a recognised IANA timezone identifier.
    pub fn validate_timezone(tz_name: &str) -> bool {
        tz_name.parse::<Tz>().is_ok()
    }

    /// Convert a UTC timestamp into the handler's timezone.
    pub fn to_local(&self, dt: DateTime<Utc>) -> DateTime<Tz> {
        dt.with_timezone(&self.tz)
    }

    /// Bucket key for `dt` at `granularity`, computed in local time.
    pub fn period_key(&self, dt: DateTime<Utc>, granularity: Granularity) -> String {
        self.to_local(dt)
            .format(granularity.key_format())
            .to_string()
    }

    /// `YYYY-MM-DD HH:MM:SS` in local time, for report lines.
    pub fn format_display(&self, dt: DateTime<Utc>) -> String {
        self.to_local(dt).format("%Y-%m-%d %H:%M:%S").to_string()
    }

    /// Expose the configured timezone.
    pub fn tz(&self) -> Tz {
        self.tz
    }
}

impl Default for TimezoneHandler {
    fn default() -> Self {
        Self { tz: Tz::UTC }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone as _, Timelike};

    // ── parse_export_timestamp ───────────────────────────────────────────────

    #[test]
    fn test_parse_csv_timestamp_with_fraction() {
        let dt = parse_export_timestamp("2021-03-04 05:06:07.123000+00:00").unwrap();
        let expected =
            Utc.with_ymd_and_hms(2021, 3, 4, 5, 6, 7).unwrap() + chrono::Duration::milliseconds(123);
        assert_eq!(dt, expected);
    }

    #[test]
    fn test_parse_csv_timestamp_without_fraction() {
        let dt = parse_export_timestamp("2021-03-04 05:06:07+02:00").unwrap();
        assert_eq!(dt.hour(), 3);
    }

    #[test]
    fn test_parse_rfc3339_timestamp() {
        let dt = parse_export_timestamp("2024-01-15T10:30:00Z").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap());
    }

    #[test]
    fn test_parse_naive_timestamp_is_utc() {
        let dt = parse_export_timestamp("2024-01-15 10:30:00").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap());
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert!(matches!(
            parse_export_timestamp("not-a-date"),
            Err(ArchiveError::MalformedInput(_))
        ));
        assert!(parse_export_timestamp("   ").is_err());
    }

    // ── Granularity ──────────────────────────────────────────────────────────

    #[test]
    fn test_granularity_from_str() {
        assert_eq!("year".parse::<Granularity>().unwrap(), Granularity::Year);
        assert_eq!("Monthly".parse::<Granularity>().unwrap(), Granularity::Month);
        assert_eq!("day".parse::<Granularity>().unwrap(), Granularity::Day);
        assert!("week".parse::<Granularity>().is_err());
    }

    // ── TimezoneHandler ──────────────────────────────────────────────────────

    #[test]
    fn test_validate_timezone() {
        assert!(TimezoneHandler::validate_timezone("Europe/London"));
        assert!(TimezoneHandler::validate_timezone("UTC"));
        assert!(!TimezoneHandler::validate_timezone("Mars/Olympus"));
    }

    #[test]
    fn test_new_invalid_timezone_falls_back_to_utc() {
        let handler = TimezoneHandler::new("Invalid/Timezone");
        assert_eq!(handler.tz(), Tz::UTC);
    }

    #[test]
    fn test_period_key_uses_local_time() {
        // 03:00 UTC on Jan 1st is still Dec 31st in New York.
        let handler = TimezoneHandler::new("America/New_York");
        let dt = Utc.with_ymd_and_hms(2022, 1, 1, 3, 0, 0).unwrap();
        assert_eq!(handler.period_key(dt, Granularity::Year), "2021");
        assert_eq!(handler.period_key(dt, Granularity::Month), "2021-12");
        assert_eq!(handler.period_key(dt, Granularity::Day), "2021-12-31");
    }

    #[test]
    fn test_format_display() {
        let handler = TimezoneHandler::default();
        let dt = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 5).unwrap();
        assert_eq!(handler.format_display(dt), "2024-06-01 12:00:05");
    }

    #[test]
    fn test_get_system_timezone_returns_nonempty_string() {
        assert!(!get_system_timezone().is_empty());
    }
}
