//! Application configuration for deepdraft.
//!
//! User config lives at `~/.deepdraft/deepdraft.toml`.
//! CLI flags override config file values, which override defaults.
//! API keys submitted through the web form override everything.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DeepDraftError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "deepdraft.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".deepdraft";

// ---------------------------------------------------------------------------
// Config structs (matching deepdraft.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Crawl defaults.
    #[serde(default)]
    pub research: ResearchDefaults,

    /// Gemini settings.
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// Firecrawl settings.
    #[serde(default)]
    pub firecrawl: FirecrawlConfig,

    /// Web server settings.
    #[serde(default)]
    pub server: ServerConfig,
}

/// `[research]` section — default crawl parameters for a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchDefaults {
    /// Maximum crawl depth from the seed queries.
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,

    /// Wall-clock budget for the crawl, in seconds.
    #[serde(default = "default_time_limit")]
    pub time_limit_secs: u32,

    /// Maximum number of URLs the crawl may visit.
    #[serde(default = "default_max_urls")]
    pub max_urls: u32,

    /// How many sources are quoted in the draft prompt.
    #[serde(default = "default_prompt_sources")]
    pub max_prompt_sources: usize,
}

impl Default for ResearchDefaults {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            time_limit_secs: default_time_limit(),
            max_urls: default_max_urls(),
            max_prompt_sources: default_prompt_sources(),
        }
    }
}

fn default_max_depth() -> u32 {
    3
}
fn default_time_limit() -> u32 {
    180
}
fn default_max_urls() -> u32 {
    10
}
fn default_prompt_sources() -> usize {
    5
}

/// `[gemini]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_gemini_key_env")]
    pub api_key_env: String,

    /// Model used for both the draft and the enhancement pass.
    #[serde(default = "default_gemini_model")]
    pub model: String,

    /// API base URL. Overridable for tests and proxies.
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_gemini_key_env(),
            model: default_gemini_model(),
            base_url: default_gemini_base_url(),
        }
    }
}

fn default_gemini_key_env() -> String {
    "GEMINI_API_KEY".into()
}
fn default_gemini_model() -> String {
    "gemini-1.5-flash".into()
}
fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com".into()
}

/// `[firecrawl]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirecrawlConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_firecrawl_key_env")]
    pub api_key_env: String,

    /// API base URL. Overridable for tests and proxies.
    #[serde(default = "default_firecrawl_base_url")]
    pub base_url: String,

    /// Milliseconds between job status polls.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

impl Default for FirecrawlConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_firecrawl_key_env(),
            base_url: default_firecrawl_base_url(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

fn default_firecrawl_key_env() -> String {
    "FIRECRAWL_API_KEY".into()
}
fn default_firecrawl_base_url() -> String {
    "https://api.firecrawl.dev".into()
}
fn default_poll_interval() -> u64 {
    2_000
}

/// `[server]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address for the web server.
    #[serde(default = "default_host")]
    pub host: String,

    /// Listen port for the web server.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    3875
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.deepdraft/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| DeepDraftError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.deepdraft/deepdraft.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| DeepDraftError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        DeepDraftError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Resolve an API key: an explicit override (web form) wins, otherwise the
/// configured env var is consulted. Missing both is a config error.
pub fn resolve_api_key(override_key: Option<&str>, env_var: &str) -> Result<String> {
    if let Some(key) = override_key {
        let key = key.trim();
        if !key.is_empty() {
            return Ok(key.to_string());
        }
    }

    match std::env::var(env_var) {
        Ok(val) if !val.trim().is_empty() => Ok(val),
        _ => Err(DeepDraftError::config(format!(
            "API key missing: provide it in the form or set the {env_var} environment variable"
        ))),
    }
}
