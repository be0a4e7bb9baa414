mod config;
#[cfg(test)]
mod test_util;

use std::path::PathBuf;

use clap::Parser;
use clap::error::ErrorKind;
use tracing::info;

use syncgate_core::launcher::ProcessGroupLauncher;
use syncgate_core::runner::{self, GateVerdict};

use config::Overrides;

#[derive(Parser)]
#[command(
    name = "syncgate",
    version,
    about = "Launches two papyrus nodes and asserts P2P sync progress"
)]
struct Cli {
    /// URL of the base-layer (L1) node both nodes anchor against
    base_layer_node_url: String,

    /// Path to a syncgate.toml overriding the built-in defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Node binary to launch for both roles
    #[arg(long)]
    node_binary: Option<PathBuf>,

    /// Configuration file passed to the server node
    #[arg(long)]
    server_config: Option<PathBuf>,

    /// Configuration file passed to the client node
    #[arg(long)]
    client_config: Option<PathBuf>,

    /// Metrics endpoint of the client node
    #[arg(long)]
    metrics_url: Option<String>,

    /// Seconds to wait before sampling the metrics
    #[arg(long)]
    warmup_secs: Option<u64>,

    /// Minimum state marker for the gate to pass
    #[arg(long)]
    threshold: Option<i64>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // The gate's contract is exit 1 for bad usage; clap defaults to 2, so
    // map parse errors ourselves. Usage goes to stdout.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            print!("{err}");
            std::process::exit(0);
        }
        Err(err) => {
            print!("{err}");
            std::process::exit(1);
        }
    };

    let overrides = Overrides {
        config_file: cli.config,
        node_binary: cli.node_binary,
        server_config: cli.server_config,
        client_config: cli.client_config,
        metrics_url: cli.metrics_url,
        warmup_secs: cli.warmup_secs,
        threshold: cli.threshold,
    };
    let gate_config = match config::resolve(&overrides) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err:#}");
            std::process::exit(1);
        }
    };

    let launcher = ProcessGroupLauncher;
    match runner::run_sync_gate(&launcher, &gate_config, &cli.base_layer_node_url).await {
        Ok(GateVerdict::Passed { marker }) => {
            info!(marker, "sync gate passed");
        }
        Ok(GateVerdict::Failed(reason)) => {
            eprintln!("{reason}");
            std::process::exit(1);
        }
        Err(err) => {
            eprintln!("{err:#}");
            std::process::exit(1);
        }
    }
}
