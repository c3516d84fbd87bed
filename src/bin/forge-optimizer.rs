//! Stdio server exposing the optimization coordinator as MCP tools.
//!
//! ```bash
//! forge-optimizer --config forge-optimizer.json
//! ```
//!
//! Configuration precedence, lowest to highest: built-in defaults, the JSON
//! file given with `--config`, then `FORGE_OPTIMIZER_*` environment variables
//! with nested keys split on `__` (e.g. `FORGE_OPTIMIZER_TPE__GAMMA=0.2`).

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized};
use forge_optimizer::server::StdioServer;
use forge_optimizer::{Coordinator, CoordinatorConfig};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "forge-optimizer", version)]
#[command(about = "Hyperparameter search coordinator over stdio JSON-RPC")]
struct Args {
    /// JSON configuration file
    #[arg(long, env = "FORGE_OPTIMIZER_CONFIG")]
    config: Option<PathBuf>,

    /// Log output format (logs go to stderr)
    #[arg(long, value_enum, default_value = "text")]
    log_format: LogFormat,
}

fn init_logging(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<CoordinatorConfig> {
    let mut figment = Figment::new().merge(Serialized::defaults(CoordinatorConfig::default()));
    if let Some(path) = path {
        figment = figment.merge(Json::file(path));
    }
    figment
        .merge(Env::prefixed("FORGE_OPTIMIZER_").split("__").ignore(&["config"]))
        .extract()
        .context("failed to load configuration")
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_format);

    let config = load_config(args.config.as_ref())?;
    tracing::info!(?config, "configuration loaded");

    let coordinator = Coordinator::with_config(config).context("invalid configuration")?;
    StdioServer::new(Arc::new(coordinator))
        .run()
        .await
        .context("stdio server failed")
}
