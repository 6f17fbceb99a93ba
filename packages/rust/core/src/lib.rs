//! Pipeline orchestration for deepdraft.
//!
//! Ties the crawler client, prompt templates, and generation client into the
//! end-to-end research run (crawl → draft → enhance).

pub mod pipeline;

pub use pipeline::{
    PipelineOptions, ProgressReporter, ReportGenerator, ResearchOutcome, ResearchProvider,
    SilentProgress, run_research,
};
