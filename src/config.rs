use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use regex::Regex;
use std::time::Duration;
use url::Url;

pub const DEFAULT_API_BASE_URL: &str = "https://api.apify.com";
pub const DEFAULT_AGENT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_SEARCH_ACTOR: &str = "apidojo~tweet-scraper";
pub const DEFAULT_HANDLES_ACTOR: &str = "web.harvester~twitter-scraper";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_MAX_WAIT_SECS: u64 = 300;
pub const DEFAULT_TWEETS_COUNT: u32 = 50;

/// Which payload shape the selected actor expects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ActorKind {
    /// Content-search actor taking `searchTerms` (e.g. apidojo~tweet-scraper)
    #[default]
    Search,
    /// Handle-based actor taking `handles` (e.g. web.harvester~twitter-scraper)
    Handles,
}

impl ActorKind {
    pub fn default_actor_id(self) -> &'static str {
        match self {
            ActorKind::Search => DEFAULT_SEARCH_ACTOR,
            ActorKind::Handles => DEFAULT_HANDLES_ACTOR,
        }
    }
}

/// Optional filters for the content-search actor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchOptions {
    /// Replaces the default `from:<username>` search term
    pub query: Option<String>,
    pub tweet_language: Option<String>,
    pub include_retweets: Option<bool>,
    pub include_replies: Option<bool>,
}

/// Fixed-interval polling budget for a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_wait: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            max_wait: Duration::from_secs(DEFAULT_MAX_WAIT_SECS),
        }
    }
}

/// Everything the job runner needs, resolved once from CLI arguments and environment
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub token: String,
    pub api_base_url: Url,
    pub actor_kind: ActorKind,
    pub actor_id: String,
    pub search: SearchOptions,
    pub proxy_groups: Vec<String>,
    pub poll: PollPolicy,
    pub request_timeout: Duration,
}

impl ScrapeConfig {
    /// Create a config with defaults for everything except the credential
    pub fn new(token: impl Into<String>) -> Result<Self> {
        Ok(Self {
            token: token.into(),
            api_base_url: parse_base_url(DEFAULT_API_BASE_URL)?,
            actor_kind: ActorKind::default(),
            actor_id: ActorKind::default().default_actor_id().to_string(),
            search: SearchOptions::default(),
            proxy_groups: Vec::new(),
            poll: PollPolicy::default(),
            request_timeout: Duration::from_secs(60),
        })
    }

    /// Select the actor kind, falling back to its default actor id when none is given
    pub fn with_actor(mut self, kind: ActorKind, actor_id: Option<&str>) -> Self {
        self.actor_kind = kind;
        self.actor_id = actor_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(normalize_actor_id)
            .unwrap_or_else(|| kind.default_actor_id().to_string());
        self
    }
}

/// The actor API addresses actors as `owner~name`; accept `owner/name` too
pub fn normalize_actor_id(actor_id: &str) -> String {
    actor_id.trim().replace('/', "~")
}

/// Parse a base URL, rejecting schemes that cannot carry path segments
pub fn parse_base_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).with_context(|| format!("Invalid base URL: {raw}"))?;
    if url.cannot_be_a_base() {
        bail!("Base URL cannot carry a path: {raw}");
    }
    Ok(url)
}

/// Interpret an on/off value: `1`, `true` and `yes` are on, anything else is off
pub fn parse_flag(value: &str) -> Result<bool, String> {
    Ok(matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes"
    ))
}

/// Split a comma-separated proxy group list, dropping blanks
pub fn parse_proxy_groups<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    raw.iter()
        .flat_map(|chunk| chunk.as_ref().split(','))
        .map(str::trim)
        .filter(|group| !group.is_empty())
        .map(str::to_string)
        .collect()
}

/// Extract a Twitter handle from `handle`, `@handle` or a profile URL
pub fn parse_username(input: &str) -> Result<String> {
    let input = input.trim();
    if input.is_empty() {
        bail!("Username cannot be empty");
    }

    let candidate = match Url::parse(input) {
        Ok(parsed)
            if parsed
                .host_str()
                .is_some_and(|h| h.contains("twitter.com") || h.contains("x.com")) =>
        {
            parsed
                .path_segments()
                .and_then(|mut segments| segments.next())
                .unwrap_or_default()
                .to_string()
        }
        _ => input.trim_start_matches('@').to_string(),
    };

    let re = Regex::new(r"^[A-Za-z0-9_]{1,15}$").context("Failed to compile username regex")?;
    if !re.is_match(&candidate) {
        bail!("Invalid Twitter username: {input}");
    }

    Ok(candidate)
}
