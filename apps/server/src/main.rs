//! deepdraft: deep-research report generator.
//!
//! One launch command: start the web server, open the page, enter a topic
//! and API keys, get a two-pass Markdown research report.

mod app;

use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::Result;

use deepdraft_shared::{load_config, load_config_from};

/// deepdraft: turn a topic into a researched, enhanced Markdown report.
#[derive(Parser)]
#[command(
    name = "deepdraft",
    version,
    about = "Web app that crawls a topic and drafts an enhanced research report.",
    long_about = None,
)]
struct Cli {
    /// Bind address (overrides the config file).
    #[arg(long)]
    host: Option<String>,

    /// Listen port (overrides the config file).
    #[arg(long)]
    port: Option<u16>,

    /// Path to a config file (defaults to ~/.deepdraft/deepdraft.toml).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text")]
    log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

/// Initialize tracing based on CLI flags.
fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    // Target names follow the crate names (deepdraft_server, deepdraft_core, ...).
    let filter = match cli.verbose {
        0 => "deepdraft_server=info,deepdraft_core=info,deepdraft_firecrawl=info,deepdraft_gemini=info",
        1 => "deepdraft_server=debug,deepdraft_core=debug,deepdraft_firecrawl=debug,deepdraft_gemini=debug",
        _ => "trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt().with_env_filter(env_filter).with_target(false).init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_tracing(&cli);

    let config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };

    let host = cli.host.clone().unwrap_or_else(|| config.server.host.clone());
    let port = cli.port.unwrap_or(config.server.port);

    app::serve(config, &host, port).await
}
