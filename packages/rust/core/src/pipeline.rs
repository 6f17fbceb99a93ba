//! End-to-end research pipeline: topic → crawl → draft → enhance.
//!
//! The pipeline is strictly linear. Each stage runs once, synchronously from
//! the caller's point of view, and any stage error propagates immediately.
//! The crawler and the generator sit behind traits so tests can drive the
//! orchestration with mocks; production wires in [`FirecrawlClient`] and
//! [`GeminiClient`].

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, instrument};

use deepdraft_firecrawl::{CrawlProgress, FirecrawlClient};
use deepdraft_gemini::GeminiClient;
use deepdraft_shared::{Activity, Report, ResearchFindings, ResearchRequest, Result, RunId};

// ---------------------------------------------------------------------------
// Trait seams
// ---------------------------------------------------------------------------

/// Source of research findings. Firecrawl in production, a mock in tests.
#[async_trait]
pub trait ResearchProvider: Send + Sync {
    /// Run a deep-research crawl for `request`, reporting activity events
    /// to `progress` as they happen.
    async fn deep_research(
        &self,
        request: &ResearchRequest,
        progress: &dyn CrawlProgress,
    ) -> Result<ResearchFindings>;
}

#[async_trait]
impl ResearchProvider for FirecrawlClient {
    async fn deep_research(
        &self,
        request: &ResearchRequest,
        progress: &dyn CrawlProgress,
    ) -> Result<ResearchFindings> {
        FirecrawlClient::deep_research(self, request, progress).await
    }
}

/// Text generation seam. Gemini in production, a mock in tests.
#[async_trait]
pub trait ReportGenerator: Send + Sync {
    /// Model identifier recorded on generated reports.
    fn model(&self) -> &str;

    /// Generate text for a single prompt.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

#[async_trait]
impl ReportGenerator for GeminiClient {
    fn model(&self) -> &str {
        GeminiClient::model(self)
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        GeminiClient::generate(self, prompt).await
    }
}

// ---------------------------------------------------------------------------
// Options and outcome
// ---------------------------------------------------------------------------

/// Tunables for one pipeline run that are not part of the crawl request.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// How many sources are quoted in the draft prompt.
    pub max_prompt_sources: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            max_prompt_sources: 5,
        }
    }
}

/// Result of one research run. Both reports exist only for this value's
/// lifetime; nothing is persisted.
#[derive(Debug)]
pub struct ResearchOutcome {
    /// Run identifier, for log correlation.
    pub run_id: RunId,
    /// The researched topic.
    pub topic: String,
    /// Number of sources the crawl produced.
    pub source_count: usize,
    /// First-pass report.
    pub initial: Report,
    /// Second-pass (enhanced) report.
    pub enhanced: Report,
    /// Total elapsed time.
    pub elapsed: Duration,
}

// ---------------------------------------------------------------------------
// Progress reporting
// ---------------------------------------------------------------------------

/// Progress callback for reporting run status to the UI layer.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called for each crawler activity event.
    fn activity(&self, activity: &Activity);
    /// Called when the run completes.
    fn done(&self, outcome: &ResearchOutcome);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn activity(&self, _activity: &Activity) {}
    fn done(&self, _outcome: &ResearchOutcome) {}
}

/// Adapts a [`ProgressReporter`] to the crawler's [`CrawlProgress`] interface.
struct PipelineCrawlProgress<'a> {
    inner: &'a dyn ProgressReporter,
}

impl CrawlProgress for PipelineCrawlProgress<'_> {
    fn activity(&self, activity: &Activity) {
        self.inner.activity(activity);
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Run the full research pipeline.
///
/// 1. Validate the request (a blank topic never reaches the crawler)
/// 2. Deep-research crawl
/// 3. Draft report (one generation call)
/// 4. Enhancement pass (one generation call over the draft)
#[instrument(skip_all, fields(topic = %request.topic))]
pub async fn run_research(
    provider: &dyn ResearchProvider,
    generator: &dyn ReportGenerator,
    request: &ResearchRequest,
    options: &PipelineOptions,
    progress: &dyn ProgressReporter,
) -> Result<ResearchOutcome> {
    let start = Instant::now();
    let run_id = RunId::new();

    request.validate()?;

    info!(
        %run_id,
        max_depth = request.max_depth,
        time_limit_secs = request.time_limit_secs,
        max_urls = request.max_urls,
        "starting research run"
    );

    // --- Phase 1: Crawl ---
    progress.phase("Performing deep research");
    let crawl_progress = PipelineCrawlProgress { inner: progress };
    let findings = provider.deep_research(request, &crawl_progress).await?;

    // --- Phase 2: Draft ---
    progress.phase("Drafting report");
    let prompt =
        deepdraft_report::draft_prompt(&request.topic, &findings, options.max_prompt_sources);
    let draft_markdown = generator.generate(&prompt).await?;
    let initial = Report {
        topic: request.topic.clone(),
        markdown: draft_markdown,
        model: generator.model().to_string(),
        generated_at: Utc::now(),
    };

    // --- Phase 3: Enhance ---
    progress.phase("Enhancing report");
    let prompt = deepdraft_report::enhancement_prompt(&request.topic, &initial.markdown);
    let enhanced_markdown = generator.generate(&prompt).await?;
    let enhanced = Report {
        topic: request.topic.clone(),
        markdown: enhanced_markdown,
        model: generator.model().to_string(),
        generated_at: Utc::now(),
    };

    let outcome = ResearchOutcome {
        run_id,
        topic: request.topic.clone(),
        source_count: findings.source_count(),
        initial,
        enhanced,
        elapsed: start.elapsed(),
    };

    progress.done(&outcome);

    info!(
        run_id = %outcome.run_id,
        sources = outcome.source_count,
        elapsed_ms = outcome.elapsed.as_millis(),
        "research run complete"
    );

    Ok(outcome)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
