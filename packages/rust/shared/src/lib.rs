//! Shared types, error model, and configuration for deepdraft.
//!
//! This crate is the foundation depended on by all other deepdraft crates.
//! It provides:
//! - [`DeepDraftError`] — the unified error type
//! - Domain types ([`ResearchRequest`], [`SourceDocument`], [`ResearchFindings`], [`Report`], [`RunId`])
//! - Configuration ([`AppConfig`], config loading, API key resolution)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, FirecrawlConfig, GeminiConfig, ResearchDefaults, ServerConfig, config_dir,
    config_file_path, load_config, load_config_from, resolve_api_key,
};
pub use error::{DeepDraftError, Result};
pub use types::{
    Activity, NO_SUMMARY_PLACEHOLDER, Report, ResearchFindings, ResearchRequest, RunId,
    SourceDocument,
};
