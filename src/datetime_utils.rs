use chrono::{DateTime, SecondsFormat, Utc};

/// Date/time formats used for report files and metadata
pub mod formats {
    /// Format for filenames with separator: "20240120_153000"
    pub const FILENAME_WITH_SEPARATOR: &str = "%Y%m%d_%H%M%S";
}

/// Get current UTC timestamp
pub fn now_utc() -> DateTime<Utc> {
    Utc::now()
}

/// Format a datetime for use in filenames with separator
pub fn format_for_filename(datetime: &DateTime<Utc>) -> String {
    datetime
        .format(formats::FILENAME_WITH_SEPARATOR)
        .to_string()
}

/// Format a datetime as RFC3339 with second precision, e.g. "2024-01-20T15:30:00Z"
pub fn format_rfc3339(datetime: &DateTime<Utc>) -> String {
    datetime.to_rfc3339_opts(SecondsFormat::Secs, true)
}
