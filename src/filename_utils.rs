use crate::datetime_utils::format_for_filename;
use chrono::{DateTime, Utc};
use sanitize_filename::sanitize;
use std::path::{Path, PathBuf};

/// Utility functions for generating consistent report filenames
///
/// Generate a filename for a normalized report
/// Format: twitter_username_YYYYMMDD_HHMMSS.json
pub fn report_filename(username: &str, scraped_at: &DateTime<Utc>) -> String {
    let timestamp = format_for_filename(scraped_at);
    format!("twitter_{username}_{timestamp}.json")
}

/// Generate a filename for a raw dataset dump
/// Format: twitter_username_YYYYMMDD_HHMMSS_raw.json
pub fn raw_dump_filename(username: &str, scraped_at: &DateTime<Utc>) -> String {
    let timestamp = format_for_filename(scraped_at);
    format!("twitter_{username}_{timestamp}_raw.json")
}

/// Sanitize and create full file path
pub fn sanitized_file_path(output_dir: &Path, filename: &str) -> PathBuf {
    let sanitized_filename = sanitize(filename);
    output_dir.join(sanitized_filename)
}
