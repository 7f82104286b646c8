use anyhow::Result;
use clap::Args;
use serde_json::json;
use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::apify::{dataset_console_url, ApifyClient, ApifyError};
use crate::config::{
    parse_base_url, parse_flag, parse_proxy_groups, parse_username, ActorKind, PollPolicy,
    ScrapeConfig, SearchOptions, DEFAULT_AGENT_BASE_URL, DEFAULT_API_BASE_URL,
    DEFAULT_MAX_WAIT_SECS, DEFAULT_POLL_INTERVAL_SECS, DEFAULT_TWEETS_COUNT,
};
use crate::datetime_utils::now_utc;
use crate::error_utils::first_env_var;
use crate::output::{emit, Envelope};
use crate::runner::{build_run_input, JobRequest, JobRunner};
use crate::storage::{self, RawDump, Report};

/// Environment variables consulted, in order, when `--username` is absent
pub const USERNAME_ENV_VARS: &[&str] = &["username", "USERNAME", "TWITTER_USERNAME"];

/// Prefix every Apify API token carries; only enforced in strict mode
pub const TOKEN_PREFIX: &str = "apify_api_";

/// Tweets echoed back in the success envelope
const SUMMARY_TWEETS: usize = 5;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("No username provided. Use --username parameter or set env var 'username'/'USERNAME'/'TWITTER_USERNAME'.")]
    MissingUsername,

    #[error("{0}")]
    InvalidUsername(String),

    #[error("APIFY_API_TOKEN environment variable not set")]
    MissingCredential,

    #[error("Missing/invalid APIFY token")]
    InvalidCredential,

    #[error("No data found for username @{username}. Check if the username exists and is public.")]
    NoData { username: String },

    #[error("Error scraping Twitter data: {0}")]
    Apify(#[from] ApifyError),

    #[error("Error scraping Twitter data: {0:#}")]
    Other(#[from] anyhow::Error),
}

impl ScrapeError {
    /// Process exit code used in strict mode
    pub fn exit_code(&self) -> u8 {
        match self {
            ScrapeError::MissingUsername
            | ScrapeError::InvalidUsername(_)
            | ScrapeError::MissingCredential
            | ScrapeError::InvalidCredential => 1,
            ScrapeError::NoData { .. } => 2,
            ScrapeError::Apify(_) | ScrapeError::Other(_) => 3,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ScrapeCommand {
    /// Twitter username, with or without @ (falls back to $username, $USERNAME, $TWITTER_USERNAME)
    #[arg(long)]
    pub username: Option<String>,

    /// Number of tweets to scrape
    #[arg(
        long = "tweets_count",
        alias = "tweets-count",
        env = "tweets_count",
        default_value_t = DEFAULT_TWEETS_COUNT
    )]
    pub tweets_count: u32,

    /// Apify API token
    #[arg(long, env = "APIFY_API_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Payload shape expected by the actor
    #[arg(long, value_enum, env = "APIFY_ACTOR_KIND", default_value_t = ActorKind::Search)]
    pub actor_kind: ActorKind,

    /// Actor to run (defaults to the standard actor for --actor-kind)
    #[arg(long, env = "APIFY_ACTOR_ID")]
    pub actor_id: Option<String>,

    /// Apify proxy groups for the handle-based actor (comma-separated)
    #[arg(long, env = "APIFY_PROXY_GROUPS", value_delimiter = ',')]
    pub proxy_groups: Vec<String>,

    /// Search term replacing the default `from:<username>`
    #[arg(long, env = "QUERY")]
    pub query: Option<String>,

    /// Restrict search results to a language code
    #[arg(long, env = "TWEET_LANGUAGE")]
    pub tweet_language: Option<String>,

    /// Include retweets in search results (1/true/yes)
    #[arg(long, env = "INCLUDE_RETWEETS", value_parser = parse_flag)]
    pub include_retweets: Option<bool>,

    /// Include replies in search results (1/true/yes)
    #[arg(long, env = "INCLUDE_REPLIES", value_parser = parse_flag)]
    pub include_replies: Option<bool>,

    /// Seconds to wait for the run to finish
    #[arg(long, default_value_t = DEFAULT_MAX_WAIT_SECS)]
    pub max_wait: u64,

    /// Seconds between status checks
    #[arg(
        long,
        default_value_t = DEFAULT_POLL_INTERVAL_SECS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub poll_interval: u64,

    /// Actor API base URL
    #[arg(long, env = "APIFY_API_BASE_URL", default_value = DEFAULT_API_BASE_URL, hide = true)]
    pub api_base_url: String,

    /// Base URL of the agent serving /reports, used for the download link
    #[arg(long, env = "AGENT_BASE_URL", default_value = DEFAULT_AGENT_BASE_URL)]
    pub agent_base_url: String,

    /// Compact output, token format check and non-zero exit codes on failure
    #[arg(long)]
    pub strict: bool,

    /// Save the raw dataset items instead of the normalized report
    #[arg(long)]
    pub raw: bool,
}

impl ScrapeCommand {
    fn resolve_username(&self) -> Result<String, ScrapeError> {
        let raw = self
            .username
            .clone()
            .filter(|u| !u.trim().is_empty())
            .or_else(|| first_env_var(USERNAME_ENV_VARS))
            .ok_or(ScrapeError::MissingUsername)?;

        parse_username(&raw).map_err(|e| ScrapeError::InvalidUsername(e.to_string()))
    }

    fn resolve_token(&self) -> Result<&str, ScrapeError> {
        let token = self
            .token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(ScrapeError::MissingCredential)?;

        if self.strict && !token.starts_with(TOKEN_PREFIX) {
            return Err(ScrapeError::InvalidCredential);
        }

        Ok(token)
    }

    /// Build the runner configuration from the parsed arguments
    pub fn build_config(&self, token: &str) -> Result<ScrapeConfig, ScrapeError> {
        let mut config =
            ScrapeConfig::new(token)?.with_actor(self.actor_kind, self.actor_id.as_deref());

        config.api_base_url = parse_base_url(&self.api_base_url)?;
        config.search = SearchOptions {
            query: non_empty(self.query.as_deref()),
            tweet_language: non_empty(self.tweet_language.as_deref()),
            include_retweets: self.include_retweets,
            include_replies: self.include_replies,
        };
        config.proxy_groups = parse_proxy_groups(&self.proxy_groups);
        config.poll = PollPolicy {
            interval: Duration::from_secs(self.poll_interval),
            max_wait: Duration::from_secs(self.max_wait),
        };

        Ok(config)
    }

    /// Scrape, persist and describe the result.
    ///
    /// `notify` receives the "processing" envelopes printed before the final one.
    pub async fn run<F>(&self, shared_dir: &Path, mut notify: F) -> Result<Envelope, ScrapeError>
    where
        F: FnMut(Envelope),
    {
        let username = self.resolve_username()?;
        let token = self.resolve_token()?;
        let config = self.build_config(token)?;
        let request = JobRequest {
            username: username.clone(),
            tweets_count: self.tweets_count,
        };

        info!(
            "Scraping {count} tweets from @{username} with actor {actor}",
            count = request.tweets_count,
            actor = config.actor_id
        );
        notify(Envelope::processing(format!(
            "🐦 Scraping {count} tweets from @{username}...",
            count = request.tweets_count
        )));

        let client = ApifyClient::new(&config)?;
        let runner = JobRunner::new(client, config.poll);
        let input = build_run_input(&config, &request);

        let strict = self.strict;
        let handle = runner.submit(&input).await?;
        if strict {
            notify(Envelope::processing(format!("Run started: {id}", id = handle.id)));
        }

        let finished = runner
            .wait_for_completion(&handle.id, |progress| {
                if strict {
                    notify(Envelope::processing(format!(
                        "Waiting... status={status}, waited={secs}s",
                        status = progress.status,
                        secs = progress.waited.as_secs()
                    )));
                }
            })
            .await?;

        let (dataset_id, items) = runner.retrieve(&finished).await?;
        if items.is_empty() {
            return Err(ScrapeError::NoData { username });
        }

        let scraped_at = now_utc();
        let reports_dir = storage::reports_dir(shared_dir);

        if self.raw {
            let items_count = items.len();
            let dump = RawDump {
                items,
                dataset_id: dataset_id.clone(),
            };
            let path = storage::save_raw_dump(&dump, &username, &reports_dir, &scraped_at)?;

            return Ok(Envelope::success(format!(
                "Fetched {items_count} items for @{username}"
            ))
            .with_field("saved_to", path.display().to_string())
            .with_field("items_count", items_count)
            .with_field("dataset_id", dataset_id));
        }

        let normalized = crate::normalize::normalize_items(&items, &username);
        if normalized.dropped > 0 {
            warn!(
                "Dropped {dropped} unrecognized dataset items",
                dropped = normalized.dropped
            );
        }

        let report = Report::new(&username, request.tweets_count, normalized, &scraped_at);
        let path = storage::save_report(&report, &reports_dir, &scraped_at)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let tweets_found = report.metadata.tweets_found;
        let latest_tweets = &report.tweets[..tweets_found.min(SUMMARY_TWEETS)];

        Ok(Envelope::success(format!(
            "✅ Successfully scraped {tweets_found} tweets from @{username}"
        ))
        .with_field(
            "data",
            json!({
                "username": username,
                "profile": report.profile,
                "tweets_count": tweets_found,
                "latest_tweets": latest_tweets,
                "saved_to": file_name,
                "saved_to_path": path.display().to_string(),
                "apify_dataset_url": dataset_console_url(&dataset_id),
                "download_url": format!(
                    "{base}/reports/{file_name}",
                    base = self.agent_base_url.trim_end_matches('/')
                ),
            }),
        ))
    }

    /// Run the scrape and print every envelope; returns the process exit code
    pub async fn execute(self, shared_dir: &Path) -> Result<ExitCode> {
        let pretty = !self.strict;
        let print = |envelope: Envelope| {
            if let Err(e) = emit(&envelope, false) {
                warn!("Failed to print progress: {e}");
            }
        };

        match self.run(shared_dir, print).await {
            Ok(envelope) => {
                emit(&envelope, pretty)?;
                Ok(ExitCode::SUCCESS)
            }
            Err(err) => {
                error!("{err}");
                emit(&Envelope::error(err.to_string()), pretty)?;
                if self.strict {
                    Ok(ExitCode::from(err.exit_code()))
                } else {
                    Ok(ExitCode::SUCCESS)
                }
            }
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
