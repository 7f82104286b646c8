use crate::datetime_utils::format_rfc3339;
use crate::error_utils::{parse_json_with_context, serialize_to_json_with_context};
use crate::filename_utils::{raw_dump_filename, report_filename, sanitized_file_path};
use crate::normalize::{NormalizedItems, Profile, Tweet};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Name of the reports directory inside the shared directory
pub const REPORTS_DIR_NAME: &str = "reports";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub scraped_at: String,
    pub username: String,
    pub tweets_requested: u32,
    pub tweets_found: usize,
}

/// The normalized result of one scrape, as written to disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub profile: Option<Profile>,
    pub tweets: Vec<Tweet>,
}

impl Report {
    /// Build a report; `tweets_found` always matches the tweets it carries
    pub fn new(
        username: &str,
        tweets_requested: u32,
        normalized: NormalizedItems,
        scraped_at: &DateTime<Utc>,
    ) -> Self {
        Self {
            metadata: ReportMetadata {
                scraped_at: format_rfc3339(scraped_at),
                username: username.to_string(),
                tweets_requested,
                tweets_found: normalized.tweets.len(),
            },
            profile: normalized.profile,
            tweets: normalized.tweets,
        }
    }
}

/// The unprocessed dataset, kept for debugging actor output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDump {
    pub items: Vec<Value>,
    pub dataset_id: String,
}

/// Reports directory under the shared directory
pub fn reports_dir(shared_dir: &Path) -> PathBuf {
    shared_dir.join(REPORTS_DIR_NAME)
}

/// Create a directory (and parents); an existing directory is fine
pub fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory {path}", path = dir.display()))
}

/// Write pretty JSON so that readers see either the complete file or nothing.
/// The data goes to a hidden sibling first and is renamed into place.
pub fn write_json_atomically<T: Serialize>(data: &T, path: &Path, data_desc: &str) -> Result<()> {
    let json = serialize_to_json_with_context(data, data_desc)?;

    let file_name = path
        .file_name()
        .with_context(|| format!("Invalid output path {path}", path = path.display()))?
        .to_string_lossy();
    let tmp_path = path.with_file_name(format!(".{file_name}.tmp"));

    fs::write(&tmp_path, json).with_context(|| {
        format!(
            "Failed to write {data_desc} to {path}",
            path = tmp_path.display()
        )
    })?;

    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e).with_context(|| {
            format!(
                "Failed to move {data_desc} into place at {path}",
                path = path.display()
            )
        });
    }

    debug!("Wrote {data_desc} to {path}", path = path.display());
    Ok(())
}

/// Saves a report into `reports_dir`, returning the full path of the new file
pub fn save_report(report: &Report, reports_dir: &Path, scraped_at: &DateTime<Utc>) -> Result<PathBuf> {
    ensure_dir(reports_dir)?;

    let filename = report_filename(&report.metadata.username, scraped_at);
    let file_path = sanitized_file_path(reports_dir, &filename);

    write_json_atomically(report, &file_path, "report")?;
    info!("Saved report to {path}", path = file_path.display());

    Ok(file_path)
}

/// Saves the raw dataset items into `reports_dir`
pub fn save_raw_dump(
    dump: &RawDump,
    username: &str,
    reports_dir: &Path,
    scraped_at: &DateTime<Utc>,
) -> Result<PathBuf> {
    ensure_dir(reports_dir)?;

    let filename = raw_dump_filename(username, scraped_at);
    let file_path = sanitized_file_path(reports_dir, &filename);

    write_json_atomically(dump, &file_path, "raw dataset dump")?;
    info!("Saved raw dataset dump to {path}", path = file_path.display());

    Ok(file_path)
}

/// Load a report from a JSON file
pub fn load_report(path: &Path) -> Result<Report> {
    let json_content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read report {path}", path = path.display()))?;
    parse_json_with_context(&json_content, "report")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::TempDir;

    fn sample_time() -> DateTime<Utc> {
        DateTime::from_timestamp(1705764600, 0).unwrap()
    }

    fn create_test_report() -> Report {
        let normalized = NormalizedItems {
            profile: Some(Profile {
                username: "testuser".to_string(),
                display_name: "Test User".to_string(),
                description: "Tést ✓ unicode".to_string(),
                followers_count: 10,
                following_count: 2,
                tweets_count: 300,
                verified: false,
            }),
            tweets: vec![Tweet {
                id: Some("123456789".to_string()),
                text: "Test tweet content 🚀".to_string(),
                created_at: None,
                retweet_count: 1,
                like_count: 2,
                reply_count: 0,
                url: "https://x.com/testuser/status/123456789".to_string(),
            }],
            dropped: 3,
        };
        Report::new("testuser", 10, normalized, &sample_time())
    }

    #[test]
    fn test_report_metadata() {
        let report = create_test_report();
        assert_eq!(report.metadata.scraped_at, "2024-01-20T15:30:00Z");
        assert_eq!(report.metadata.tweets_requested, 10);
        assert_eq!(report.metadata.tweets_found, report.tweets.len());
    }

    #[test]
    fn test_report_json_shape() {
        let value = serde_json::to_value(create_test_report()).unwrap();
        assert_eq!(
            value,
            json!({
                "metadata": {
                    "scraped_at": "2024-01-20T15:30:00Z",
                    "username": "testuser",
                    "tweets_requested": 10,
                    "tweets_found": 1
                },
                "profile": {
                    "username": "testuser",
                    "display_name": "Test User",
                    "description": "Tést ✓ unicode",
                    "followers_count": 10,
                    "following_count": 2,
                    "tweets_count": 300,
                    "verified": false
                },
                "tweets": [{
                    "id": "123456789",
                    "text": "Test tweet content 🚀",
                    "created_at": null,
                    "retweet_count": 1,
                    "like_count": 2,
                    "reply_count": 0,
                    "url": "https://x.com/testuser/status/123456789"
                }]
            })
        );
    }

    #[test]
    fn test_save_and_load_report() {
        let temp_dir = TempDir::new().unwrap();
        let dir = reports_dir(temp_dir.path());
        let report = create_test_report();

        let saved_path = save_report(&report, &dir, &sample_time()).unwrap();
        assert_eq!(
            saved_path,
            dir.join("twitter_testuser_20240120_153000.json")
        );

        let loaded = load_report(&saved_path).unwrap();
        assert_eq!(loaded, report);

        // UTF-8 is written as is, not escaped
        let raw = fs::read_to_string(&saved_path).unwrap();
        assert!(raw.contains("🚀"));
    }

    #[test]
    fn test_save_leaves_no_temp_files() {
        let temp_dir = TempDir::new().unwrap();
        save_report(&create_test_report(), temp_dir.path(), &sample_time()).unwrap();

        let names: Vec<String> = fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["twitter_testuser_20240120_153000.json"]);
    }

    #[test]
    fn test_ensure_dir_tolerates_existing() {
        let temp_dir = TempDir::new().unwrap();
        let dir = reports_dir(temp_dir.path());
        ensure_dir(&dir).unwrap();
        ensure_dir(&dir).unwrap();
        assert!(dir.is_dir());
    }

    #[test]
    fn test_save_raw_dump() {
        let temp_dir = TempDir::new().unwrap();
        let dump = RawDump {
            items: vec![json!({ "type": "tweet", "text": "hi" })],
            dataset_id: "ds1".to_string(),
        };

        let path = save_raw_dump(&dump, "testuser", temp_dir.path(), &sample_time()).unwrap();
        assert!(path.ends_with("twitter_testuser_20240120_153000_raw.json"));

        let value: Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(
            value,
            json!({ "items": [{ "type": "tweet", "text": "hi" }], "dataset_id": "ds1" })
        );
    }

    #[test]
    fn test_load_report_rejects_garbage() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.json");
        fs::write(&path, "{\"metadata\":").unwrap();
        assert!(load_report(&path).is_err());
    }
}
