use crate::config::ScrapeConfig;
use crate::error_utils::create_http_client_with_context;
use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Longest slice of an error response body kept in error messages
const MAX_ERROR_BODY_CHARS: usize = 500;

/// Actor API errors with structured information
#[derive(Debug, Error)]
pub enum ApifyError {
    #[error("Failed to start actor {actor_id}: {message}")]
    Submission { actor_id: String, message: String },

    #[error("Status check failed for run {run_id}: {message}")]
    StatusCheck { run_id: String, message: String },

    #[error("Run {run_id} did not finish within {waited_secs}s (last status: {last_status})")]
    PollTimeout {
        run_id: String,
        waited_secs: u64,
        last_status: RunStatus,
    },

    #[error("Actor run {run_id} finished with status: {status}")]
    RunFinished { run_id: String, status: RunStatus },

    #[error("Failed to fetch dataset items: {message}")]
    Retrieval { message: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Lifecycle status of an actor run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RunStatus {
    Ready,
    Running,
    Succeeded,
    Failed,
    Aborting,
    Aborted,
    TimingOut,
    TimedOut,
    /// Any status this client does not know; treated as still in progress
    Other(String),
}

impl RunStatus {
    pub fn as_str(&self) -> &str {
        match self {
            RunStatus::Ready => "READY",
            RunStatus::Running => "RUNNING",
            RunStatus::Succeeded => "SUCCEEDED",
            RunStatus::Failed => "FAILED",
            RunStatus::Aborting => "ABORTING",
            RunStatus::Aborted => "ABORTED",
            RunStatus::TimingOut => "TIMING-OUT",
            RunStatus::TimedOut => "TIMED-OUT",
            RunStatus::Other(status) => status,
        }
    }

    /// Terminal statuses never change again
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStatus::Succeeded | RunStatus::Failed | RunStatus::Aborted | RunStatus::TimedOut
        )
    }
}

impl From<String> for RunStatus {
    fn from(status: String) -> Self {
        match status.as_str() {
            "READY" => RunStatus::Ready,
            "RUNNING" => RunStatus::Running,
            "SUCCEEDED" => RunStatus::Succeeded,
            "FAILED" => RunStatus::Failed,
            "ABORTING" => RunStatus::Aborting,
            "ABORTED" => RunStatus::Aborted,
            "TIMING-OUT" => RunStatus::TimingOut,
            "TIMED-OUT" => RunStatus::TimedOut,
            _ => RunStatus::Other(status),
        }
    }
}

impl From<RunStatus> for String {
    fn from(status: RunStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A submitted run as reported by the actor API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunHandle {
    pub id: String,
    pub status: RunStatus,
    #[serde(default)]
    pub default_dataset_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    data: T,
}

/// Actor input payload. The two known tweet actors take different shapes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RunInput {
    Search(SearchInput),
    Handles(HandlesInput),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchInput {
    pub search_mode: String,
    pub search_terms: Vec<String>,
    pub max_items: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tweet_language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_retweets: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_replies: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HandlesInput {
    pub handles: Vec<String>,
    pub user_queries: Vec<String>,
    pub tweets_desired: u32,
    pub profiles_desired: u32,
    pub proxy_config: ProxyConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyConfig {
    pub use_apify_proxy: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub apify_proxy_groups: Vec<String>,
}

/// The three operations the job runner needs from the actor service
#[allow(async_fn_in_trait)]
pub trait ActorBackend {
    /// Submit a run and return its initial handle
    async fn start_run(&self, input: &RunInput) -> Result<RunHandle, ApifyError>;

    /// Fetch the current state of a run
    async fn get_run(&self, run_id: &str) -> Result<RunHandle, ApifyError>;

    /// Fetch every item of a dataset in one request
    async fn dataset_items(&self, dataset_id: &str) -> Result<Vec<Value>, ApifyError>;
}

/// HTTP client for the Apify actor API
pub struct ApifyClient {
    client: Client,
    token: String,
    base_url: Url,
    actor_id: String,
}

impl ApifyClient {
    /// Creates a client for the actor configured in `config`
    pub fn new(config: &ScrapeConfig) -> Result<Self, ApifyError> {
        let client = create_http_client_with_context(config.request_timeout)?;

        debug!(
            "Actor API client ready for {actor_id} at {base}",
            actor_id = config.actor_id,
            base = config.api_base_url
        );

        Ok(Self {
            client,
            token: config.token.clone(),
            base_url: config.api_base_url.clone(),
            actor_id: config.actor_id.clone(),
        })
    }

    pub fn actor_id(&self) -> &str {
        &self.actor_id
    }

    /// Builds `<base>/<segments...>`, keeping any path prefix already on the base URL
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("Base URL cannot carry a path: {}", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Sends an authenticated request and decodes a successful JSON body.
    /// Failures come back as a message for the caller to wrap in its own error variant.
    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, String> {
        let response = request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| format!("network error: {e}"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
            return Err(format!("HTTP {code} {body}", code = status.as_u16()));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| format!("invalid response body: {e}"))
    }
}

impl ActorBackend for ApifyClient {
    async fn start_run(&self, input: &RunInput) -> Result<RunHandle, ApifyError> {
        let submission_error = |message: String| ApifyError::Submission {
            actor_id: self.actor_id.clone(),
            message,
        };

        let url = self
            .endpoint(&["v2", "acts", &self.actor_id, "runs"])
            .map_err(|e| submission_error(e.to_string()))?;
        debug!(actor_id = %self.actor_id, %url, "Starting actor run");

        let envelope: ApiEnvelope<RunHandle> = self
            .execute(self.client.post(url).json(input))
            .await
            .map_err(submission_error)?;

        Ok(envelope.data)
    }

    async fn get_run(&self, run_id: &str) -> Result<RunHandle, ApifyError> {
        let status_error = |message: String| ApifyError::StatusCheck {
            run_id: run_id.to_string(),
            message,
        };

        let url = self
            .endpoint(&["v2", "acts", &self.actor_id, "runs", run_id])
            .map_err(|e| status_error(e.to_string()))?;
        debug!(%run_id, %url, "Checking run status");

        let envelope: ApiEnvelope<RunHandle> = self
            .execute(self.client.get(url))
            .await
            .map_err(status_error)?;

        Ok(envelope.data)
    }

    async fn dataset_items(&self, dataset_id: &str) -> Result<Vec<Value>, ApifyError> {
        let url = self
            .endpoint(&["v2", "datasets", dataset_id, "items"])
            .map_err(|e| ApifyError::Retrieval {
                message: e.to_string(),
            })?;
        debug!(%dataset_id, %url, "Fetching dataset items");

        self.execute(self.client.get(url))
            .await
            .map_err(|message| ApifyError::Retrieval {
                message: format!("dataset {dataset_id}: {message}"),
            })
    }
}

/// Public console link for a dataset
pub fn dataset_console_url(dataset_id: &str) -> String {
    format!("https://console.apify.com/storage/datasets/{dataset_id}")
}

/// Build a client for the default actor against `base_url`
pub fn client_for_token(token: &str, base_url: &str) -> Result<ApifyClient> {
    let mut config = ScrapeConfig::new(token)?;
    config.api_base_url = crate::config::parse_base_url(base_url)?;
    ApifyClient::new(&config).context("Failed to initialize actor API client")
}
