use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;

/// JSON serialization/parsing error handling utilities
///
/// Serialize data to pretty JSON with contextual error handling
pub fn serialize_to_json_with_context<T: Serialize>(data: &T, data_desc: &str) -> Result<String> {
    serde_json::to_string_pretty(data)
        .with_context(|| format!("Failed to serialize {data_desc} to JSON"))
}

/// Parse JSON from string with contextual error handling
pub fn parse_json_with_context<T: DeserializeOwned>(json_str: &str, data_desc: &str) -> Result<T> {
    serde_json::from_str(json_str).with_context(|| format!("Failed to parse {data_desc} from JSON"))
}

/// Environment variable handling utilities
///
/// Get optional environment variable, returning None if not set or empty
pub fn get_optional_env_var(var_name: &str) -> Option<String> {
    std::env::var(var_name).ok().filter(|v| !v.trim().is_empty())
}

/// Return the first of `var_names` that is set to a non-empty value
pub fn first_env_var(var_names: &[&str]) -> Option<String> {
    var_names.iter().find_map(|name| get_optional_env_var(name))
}

/// Create HTTP client with a request timeout and contextual error handling
pub fn create_http_client_with_context(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("scrapetweet/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to create HTTP client")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct TestData {
        name: String,
        value: i32,
    }

    #[test]
    fn test_json_serialization_with_context() {
        let data = TestData {
            name: "test".to_string(),
            value: 42,
        };

        let json_str = serialize_to_json_with_context(&data, "test data").unwrap();
        assert!(json_str.contains("\"name\": \"test\""));
        assert!(json_str.contains("\"value\": 42"));

        let parsed_data: TestData = parse_json_with_context(&json_str, "test data").unwrap();
        assert_eq!(parsed_data, data);
    }

    #[test]
    fn test_parse_json_error_mentions_description() {
        let err = parse_json_with_context::<TestData>("{not json", "report").unwrap_err();
        assert!(err.to_string().contains("report"));
    }

    #[test]
    fn test_env_var_handling() {
        assert!(get_optional_env_var("SCRAPETWEET_NONEXISTENT_VAR").is_none());
        assert!(first_env_var(&["SCRAPETWEET_NONEXISTENT_A", "SCRAPETWEET_NONEXISTENT_B"]).is_none());

        // PATH is set on every system the tests run on
        if std::env::var("PATH").is_ok() {
            assert!(get_optional_env_var("PATH").is_some());
            assert!(first_env_var(&["SCRAPETWEET_NONEXISTENT_A", "PATH"]).is_some());
        }
    }

    #[test]
    fn test_create_http_client() {
        let client = create_http_client_with_context(Duration::from_secs(5)).unwrap();
        assert!(client.get("https://example.com").build().is_ok());
    }
}
