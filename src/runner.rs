use crate::apify::{
    ActorBackend, ApifyError, HandlesInput, ProxyConfig, RunHandle, RunInput, RunStatus,
    SearchInput,
};
use crate::config::{ActorKind, PollPolicy, ScrapeConfig};
use crate::normalize::{normalize_items, NormalizedItems};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

/// Shortest sleep between polls, so a zero interval cannot spin
const MIN_POLL_SLEEP: Duration = Duration::from_millis(1);

/// What to scrape: built once per run and never changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    /// Handle without the leading `@`
    pub username: String,
    pub tweets_count: u32,
}

/// Reported once per status check
#[derive(Debug, Clone, PartialEq)]
pub struct RunProgress {
    pub run_id: String,
    pub status: RunStatus,
    pub waited: Duration,
}

/// A finished run and the raw records it produced
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub run_id: String,
    pub dataset_id: String,
    pub items: Vec<Value>,
}

impl RunOutcome {
    /// Split the raw records into the profile and tweet shapes
    pub fn normalize(&self, username: &str) -> NormalizedItems {
        normalize_items(&self.items, username)
    }
}

/// Build the actor input for the configured actor kind
pub fn build_run_input(config: &ScrapeConfig, request: &JobRequest) -> RunInput {
    match config.actor_kind {
        ActorKind::Search => {
            let query = config
                .search
                .query
                .clone()
                .unwrap_or_else(|| format!("from:{username}", username = request.username));

            RunInput::Search(SearchInput {
                search_mode: "live".to_string(),
                search_terms: vec![query],
                max_items: request.tweets_count,
                tweet_language: config.search.tweet_language.clone(),
                include_retweets: config.search.include_retweets,
                include_replies: config.search.include_replies,
            })
        }
        ActorKind::Handles => RunInput::Handles(HandlesInput {
            handles: vec![request.username.clone()],
            user_queries: Vec::new(),
            tweets_desired: request.tweets_count,
            profiles_desired: 1,
            proxy_config: ProxyConfig {
                use_apify_proxy: true,
                apify_proxy_groups: config.proxy_groups.clone(),
            },
        }),
    }
}

/// Drives one run through submit, poll and retrieve
pub struct JobRunner<B> {
    backend: B,
    poll: PollPolicy,
}

impl<B: ActorBackend> JobRunner<B> {
    pub fn new(backend: B, poll: PollPolicy) -> Self {
        Self { backend, poll }
    }

    /// Submit the actor input and return the new run's handle
    pub async fn submit(&self, input: &RunInput) -> Result<RunHandle, ApifyError> {
        let handle = self.backend.start_run(input).await?;
        info!(
            "Run started: {run_id} (status {status})",
            run_id = handle.id,
            status = handle.status
        );
        Ok(handle)
    }

    /// Poll the run at a fixed interval until it reaches a terminal status.
    ///
    /// Returns as soon as a terminal status is seen and never sleeps past the
    /// max-wait budget. Only `SUCCEEDED` counts as success.
    pub async fn wait_for_completion<F>(
        &self,
        run_id: &str,
        mut on_progress: F,
    ) -> Result<RunHandle, ApifyError>
    where
        F: FnMut(&RunProgress),
    {
        let mut waited = Duration::ZERO;

        loop {
            let handle = self.backend.get_run(run_id).await?;

            let progress = RunProgress {
                run_id: run_id.to_string(),
                status: handle.status.clone(),
                waited,
            };
            info!(
                "Waiting... status={status}, waited={secs}s",
                status = progress.status,
                secs = waited.as_secs()
            );
            on_progress(&progress);

            if handle.status.is_terminal() {
                if handle.status != RunStatus::Succeeded {
                    return Err(ApifyError::RunFinished {
                        run_id: run_id.to_string(),
                        status: handle.status,
                    });
                }
                debug!("Run {run_id} succeeded after {waited:?}");
                return Ok(handle);
            }

            if waited >= self.poll.max_wait {
                return Err(ApifyError::PollTimeout {
                    run_id: run_id.to_string(),
                    waited_secs: waited.as_secs(),
                    last_status: handle.status,
                });
            }

            let nap = self
                .poll
                .interval
                .max(MIN_POLL_SLEEP)
                .min(self.poll.max_wait - waited);
            tokio::time::sleep(nap).await;
            waited += nap;
        }
    }

    /// Fetch the complete result set of a succeeded run
    pub async fn retrieve(&self, handle: &RunHandle) -> Result<(String, Vec<Value>), ApifyError> {
        let dataset_id = handle
            .default_dataset_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ApifyError::Retrieval {
                message: format!("No dataset id returned for run {run_id}", run_id = handle.id),
            })?;

        let items = self.backend.dataset_items(dataset_id).await?;
        info!(
            "Fetched {count} items from dataset {dataset_id}",
            count = items.len()
        );

        Ok((dataset_id.to_string(), items))
    }

    /// Submit, wait for completion and retrieve in one go
    pub async fn run<F>(&self, input: &RunInput, on_progress: F) -> Result<RunOutcome, ApifyError>
    where
        F: FnMut(&RunProgress),
    {
        let handle = self.submit(input).await?;
        let finished = self.wait_for_completion(&handle.id, on_progress).await?;
        let (dataset_id, items) = self.retrieve(&finished).await?;

        Ok(RunOutcome {
            run_id: finished.id,
            dataset_id,
            items,
        })
    }
}
