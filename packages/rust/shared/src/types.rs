//! Core domain types for deepdraft research runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Placeholder shown wherever a crawled source carries no summary.
pub const NO_SUMMARY_PLACEHOLDER: &str = "No summary available";

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying one research run (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// ResearchRequest
// ---------------------------------------------------------------------------

/// Parameters for one deep-research crawl. Immutable once submitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchRequest {
    /// The research topic, as entered by the user.
    pub topic: String,
    /// Maximum crawl depth from the seed queries.
    pub max_depth: u32,
    /// Wall-clock budget for the crawl, in seconds.
    pub time_limit_secs: u32,
    /// Maximum number of URLs the crawl may visit.
    pub max_urls: u32,
}

impl ResearchRequest {
    /// Check the request is submittable: a blank topic never reaches the
    /// crawler.
    pub fn validate(&self) -> crate::Result<()> {
        if self.topic.trim().is_empty() {
            return Err(crate::DeepDraftError::validation(
                "research topic must not be empty",
            ));
        }
        if self.max_urls == 0 {
            return Err(crate::DeepDraftError::validation(
                "max_urls must be at least 1",
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// SourceDocument
// ---------------------------------------------------------------------------

/// One crawled web result. Produced by the crawler client; read-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDocument {
    /// Source URL.
    pub url: String,
    /// Page title, when the crawler extracted one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Crawler-generated summary, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl SourceDocument {
    /// The summary text to display, defaulting to the placeholder.
    pub fn summary_or_placeholder(&self) -> &str {
        self.summary.as_deref().unwrap_or(NO_SUMMARY_PLACEHOLDER)
    }
}

// ---------------------------------------------------------------------------
// ResearchFindings
// ---------------------------------------------------------------------------

/// Aggregated output of a completed deep-research crawl.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchFindings {
    /// The crawler's own synthesis of everything it read.
    pub final_analysis: String,
    /// Ordered source documents backing the analysis.
    pub sources: Vec<SourceDocument>,
}

impl ResearchFindings {
    /// Number of sources backing the analysis.
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }
}

// ---------------------------------------------------------------------------
// Activity
// ---------------------------------------------------------------------------

/// One progress event emitted by the crawler while a job runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    /// Event category as reported by the crawler (e.g. "search", "analyze").
    #[serde(rename = "type")]
    pub kind: String,
    /// Human-readable event description.
    pub message: String,
}

impl std::fmt::Display for Activity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// A generated Markdown report. Two instances exist transiently per run
/// (initial draft, enhanced); neither is persisted past the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// The topic the report covers.
    pub topic: String,
    /// Raw Markdown text.
    pub markdown: String,
    /// Model that produced the text.
    pub model: String,
    /// When generation completed.
    pub generated_at: DateTime<Utc>,
}
