//! Maps raw dataset records from the tweet actors onto the two report shapes.
//!
//! Actors disagree on key names, so every logical field has a fixed list of
//! aliases tried in order. Downstream report consumers depend on that order.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

/// Alias lists per logical field, highest priority first
pub mod aliases {
    pub const TEXT: &[&str] = &["text", "full_text", "content"];
    pub const CREATED_AT: &[&str] = &["createdAt", "created_at", "date"];
    pub const URL: &[&str] = &["url", "tweetUrl"];
    pub const ID: &[&str] = &["id", "id_str"];
    pub const RETWEET_COUNT: &[&str] = &["retweetCount", "retweet_count"];
    pub const LIKE_COUNT: &[&str] = &["likeCount", "favorite_count", "like_count"];
    pub const REPLY_COUNT: &[&str] = &["replyCount", "reply_count"];

    /// Presence of this key marks a record as a profile
    pub const PROFILE_MARKER: &str = "followersCount";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub username: String,
    pub display_name: String,
    pub description: String,
    pub followers_count: u64,
    pub following_count: u64,
    pub tweets_count: u64,
    pub verified: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tweet {
    pub id: Option<String>,
    pub text: String,
    pub created_at: Option<String>,
    pub retweet_count: u64,
    pub like_count: u64,
    pub reply_count: u64,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedRecord {
    Profile(Profile),
    Tweet(Tweet),
}

/// Result of normalizing a whole dataset
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedItems {
    /// Last profile record seen, if any
    pub profile: Option<Profile>,
    /// Tweets in dataset order
    pub tweets: Vec<Tweet>,
    /// Records that matched neither shape
    pub dropped: usize,
}

/// JSON truthiness: null, false, 0, "" and empty containers are all "absent"
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// First alias whose value is truthy
fn first_truthy<'a>(record: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| record.get(*key))
        .find(|value| is_truthy(value))
}

/// First alias present as a key, whatever its value
fn first_present<'a>(record: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| record.get(*key))
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Counts arrive as numbers or numeric strings; anything else counts as zero
fn value_to_count(value: &Value) -> u64 {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

fn string_field(record: &Map<String, Value>, key: &str, default: &str) -> String {
    record
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or(default)
        .to_string()
}

fn count_field(record: &Map<String, Value>, keys: &[&str]) -> u64 {
    first_present(record, keys).map_or(0, value_to_count)
}

fn is_profile(record: &Map<String, Value>) -> bool {
    record.get("type").and_then(Value::as_str) == Some("profile")
        || record.contains_key(aliases::PROFILE_MARKER)
}

fn to_profile(record: &Map<String, Value>, username: &str) -> Profile {
    Profile {
        username: string_field(record, "username", username),
        display_name: string_field(record, "name", ""),
        description: string_field(record, "description", ""),
        followers_count: count_field(record, &["followersCount"]),
        following_count: count_field(record, &["followingCount"]),
        tweets_count: count_field(record, &["tweetsCount"]),
        verified: record
            .get("verified")
            .and_then(Value::as_bool)
            .unwrap_or(false),
    }
}

fn to_tweet(record: &Map<String, Value>) -> Option<Tweet> {
    let text = first_truthy(record, aliases::TEXT)
        .map(value_to_string)
        .unwrap_or_default();
    let url = first_truthy(record, aliases::URL)
        .map(value_to_string)
        .unwrap_or_default();

    if text.is_empty() && url.is_empty() {
        return None;
    }

    Some(Tweet {
        id: first_truthy(record, aliases::ID).map(value_to_string),
        text,
        created_at: first_truthy(record, aliases::CREATED_AT).map(value_to_string),
        retweet_count: count_field(record, aliases::RETWEET_COUNT),
        like_count: count_field(record, aliases::LIKE_COUNT),
        reply_count: count_field(record, aliases::REPLY_COUNT),
        url,
    })
}

/// Classify and normalize one raw record.
/// `username` fills in the profile username when the record lacks one.
pub fn normalize_record(record: &Value, username: &str) -> Option<NormalizedRecord> {
    let record = record.as_object()?;

    if is_profile(record) {
        return Some(NormalizedRecord::Profile(to_profile(record, username)));
    }

    to_tweet(record).map(NormalizedRecord::Tweet)
}

/// Normalize a whole dataset, keeping the last profile and every recognizable tweet
pub fn normalize_items(items: &[Value], username: &str) -> NormalizedItems {
    let mut normalized = NormalizedItems::default();

    for (index, item) in items.iter().enumerate() {
        match normalize_record(item, username) {
            Some(NormalizedRecord::Profile(profile)) => normalized.profile = Some(profile),
            Some(NormalizedRecord::Tweet(tweet)) => normalized.tweets.push(tweet),
            None => {
                debug!("Dropping dataset item {index}: no profile marker, text or url");
                normalized.dropped += 1;
            }
        }
    }

    normalized
}
