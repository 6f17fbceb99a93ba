//! Client for the Firecrawl deep-research API.
//!
//! A deep-research job is submitted with topic and crawl limits, then polled
//! until it completes. Activity events reported by the service while the job
//! runs are forwarded to a [`CrawlProgress`] implementation so the UI can show
//! a live run log.

use std::time::{Duration, Instant};

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use url::Url;

use deepdraft_shared::{
    Activity, DeepDraftError, ResearchFindings, ResearchRequest, Result, SourceDocument,
};

/// User-Agent string for API requests.
const USER_AGENT: &str = concat!("deepdraft/", env!("CARGO_PKG_VERSION"));

/// Per-request HTTP timeout in seconds (individual submit/poll calls, not the job).
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Extra wall-clock allowance past the job's own time limit before the poll
/// loop gives up. The service needs time to finalize the analysis after the
/// crawl budget is spent.
const POLL_GRACE_SECS: u64 = 120;

// ---------------------------------------------------------------------------
// Wire types (Firecrawl v1 deep-research endpoint)
// ---------------------------------------------------------------------------

/// Request body for `POST /v1/deep-research`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StartJobRequest<'a> {
    query: &'a str,
    max_depth: u32,
    time_limit: u32,
    max_urls: u32,
}

/// Response body for `POST /v1/deep-research`.
#[derive(Debug, Deserialize)]
struct StartJobResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Response body for `GET /v1/deep-research/{id}`.
#[derive(Debug, Deserialize)]
struct JobStatusResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    data: Option<JobData>,
    #[serde(default)]
    activities: Vec<Activity>,
    #[serde(default)]
    error: Option<String>,
}

/// The `data` object of a deep-research job.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobData {
    #[serde(default)]
    final_analysis: Option<String>,
    #[serde(default)]
    sources: Vec<SourceEntry>,
}

/// One source in the job's `data.sources` array.
#[derive(Debug, Deserialize)]
struct SourceEntry {
    url: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

impl From<SourceEntry> for SourceDocument {
    fn from(entry: SourceEntry) -> Self {
        SourceDocument {
            url: entry.url,
            title: entry.title.filter(|t| !t.trim().is_empty()),
            summary: entry.description.filter(|d| !d.trim().is_empty()),
        }
    }
}

// ---------------------------------------------------------------------------
// Progress trait
// ---------------------------------------------------------------------------

/// Receives crawler activity events as the job runs.
pub trait CrawlProgress: Send + Sync {
    /// Called once per previously unseen activity entry, in order.
    fn activity(&self, activity: &Activity);
}

/// No-op progress sink.
pub struct SilentCrawlProgress;

impl CrawlProgress for SilentCrawlProgress {
    fn activity(&self, _activity: &Activity) {}
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Client for the Firecrawl deep-research endpoint.
pub struct FirecrawlClient {
    client: Client,
    base_url: Url,
    api_key: String,
    poll_interval: Duration,
}

impl FirecrawlClient {
    /// Create a new client against `base_url` (e.g. `https://api.firecrawl.dev`).
    pub fn new(api_key: impl Into<String>, base_url: &str, poll_interval_ms: u64) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| DeepDraftError::config(format!("invalid Firecrawl base URL: {e}")))?;

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(3))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| DeepDraftError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            api_key: api_key.into(),
            poll_interval: Duration::from_millis(poll_interval_ms),
        })
    }

    /// Run a deep-research job to completion.
    ///
    /// Submits the job, polls its status, forwards activity events to
    /// `progress`, and returns the final analysis plus sources. No retry:
    /// any transport or API error surfaces immediately.
    #[instrument(skip_all, fields(topic = %request.topic))]
    pub async fn deep_research(
        &self,
        request: &ResearchRequest,
        progress: &dyn CrawlProgress,
    ) -> Result<ResearchFindings> {
        let job_id = self.start_job(request).await?;
        info!(%job_id, "deep-research job submitted");

        let deadline = Instant::now()
            + Duration::from_secs(u64::from(request.time_limit_secs) + POLL_GRACE_SECS);
        let mut seen_activities = 0usize;

        loop {
            let status = self.poll_job(&job_id).await?;

            // Forward previously unseen activity entries, in order.
            for activity in status.activities.iter().skip(seen_activities) {
                debug!(kind = %activity.kind, message = %activity.message, "crawl activity");
                progress.activity(activity);
            }
            seen_activities = seen_activities.max(status.activities.len());

            match status.status.as_deref() {
                Some("completed") => return extract_findings(status),
                Some("failed") => {
                    let detail = status.error.unwrap_or_else(|| "no detail".into());
                    return Err(DeepDraftError::Crawl(format!(
                        "deep-research job failed: {detail}"
                    )));
                }
                Some(other) => {
                    debug!(status = other, "job still running");
                }
                None => {
                    return Err(DeepDraftError::Crawl(
                        "invalid response from Firecrawl API: missing job status".into(),
                    ));
                }
            }

            if Instant::now() >= deadline {
                warn!(%job_id, "gave up waiting for deep-research job");
                return Err(DeepDraftError::Crawl(format!(
                    "deep-research job did not complete within {} seconds",
                    request.time_limit_secs + POLL_GRACE_SECS as u32
                )));
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Submit a new deep-research job; returns the job id.
    async fn start_job(&self, request: &ResearchRequest) -> Result<String> {
        let url = self.endpoint("v1/deep-research")?;
        let body = StartJobRequest {
            query: &request.topic,
            max_depth: request.max_depth,
            time_limit: request.time_limit_secs,
            max_urls: request.max_urls,
        };

        let response = self
            .client
            .post(url.clone())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| DeepDraftError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let snippet = body_snippet(response).await;
            return Err(DeepDraftError::Crawl(format!(
                "deep-research submit failed: HTTP {status}: {snippet}"
            )));
        }

        let parsed: StartJobResponse = response
            .json()
            .await
            .map_err(|e| DeepDraftError::Crawl(format!("invalid submit response: {e}")))?;

        if !parsed.success {
            let detail = parsed.error.unwrap_or_else(|| "no detail".into());
            return Err(DeepDraftError::Crawl(format!(
                "deep-research submit rejected: {detail}"
            )));
        }

        parsed.id.ok_or_else(|| {
            DeepDraftError::Crawl("invalid response from Firecrawl API: missing job id".into())
        })
    }

    /// Fetch the current status of a job.
    async fn poll_job(&self, job_id: &str) -> Result<JobStatusResponse> {
        let url = self.endpoint(&format!("v1/deep-research/{job_id}"))?;

        let response = self
            .client
            .get(url.clone())
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| DeepDraftError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let snippet = body_snippet(response).await;
            return Err(DeepDraftError::Crawl(format!(
                "deep-research poll failed: HTTP {status}: {snippet}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| DeepDraftError::Crawl(format!("invalid poll response: {e}")))
    }

    /// Join a path onto the base URL.
    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| DeepDraftError::config(format!("invalid endpoint path {path}: {e}")))
    }
}

/// Turn a completed job's payload into findings.
///
/// A completed job without `data.finalAnalysis` is treated as an invalid
/// response rather than an empty result.
fn extract_findings(status: JobStatusResponse) -> Result<ResearchFindings> {
    let data = status.data.ok_or_else(|| {
        DeepDraftError::Crawl("invalid response from Firecrawl API: missing data".into())
    })?;

    let final_analysis = data.final_analysis.ok_or_else(|| {
        DeepDraftError::Crawl("invalid response from Firecrawl API: missing finalAnalysis".into())
    })?;

    let sources: Vec<SourceDocument> = data.sources.into_iter().map(Into::into).collect();

    info!(sources = sources.len(), "deep-research job completed");

    Ok(ResearchFindings {
        final_analysis,
        sources,
    })
}

/// Read at most the first 200 characters of an error response body.
async fn body_snippet(response: reqwest::Response) -> String {
    match response.text().await {
        Ok(body) => {
            let trimmed = body.trim();
            trimmed.chars().take(200).collect()
        }
        Err(_) => "<unreadable body>".into(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
