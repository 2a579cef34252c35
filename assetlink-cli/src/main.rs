//! Assetlink CLI
//!
//! Command-line interface for inspecting how pipeline sources map onto
//! orchestrator assets.

mod commands;
mod config;

use anyhow::Result;
use assetlink_bridge::NormalizePolicy;
use assetlink_bridge::normalize::DEFAULT_MAX_DEPTH;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "assetlink")]
#[command(about = "Pipeline to orchestrator asset bridge", long_about = None)]
struct Cli {
    /// First asset key segment for derived keys
    #[arg(long, env = "ASSETLINK_NAMESPACE", default_value = "dlt")]
    namespace: String,

    /// Handling of metadata values that cannot be classified (permissive or strict)
    #[arg(long, env = "ASSETLINK_NORMALIZE_POLICY", default_value = "permissive")]
    normalize_policy: NormalizePolicy,

    /// Maximum metadata nesting depth
    #[arg(long, env = "ASSETLINK_MAX_DEPTH", default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: usize,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "assetlink=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = Config::new(cli.namespace, cli.normalize_policy, cli.max_depth)?;

    handle_command(cli.command, &config).await
}
