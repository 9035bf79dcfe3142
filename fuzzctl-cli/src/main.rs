//! Entry point for the `fuzzctl` binary.

use clap::Parser;
use fuzzctl_cli::{cli::Cli, commands};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = commands::run(cli).await {
        tracing::error!(error = %e, "command failed");
        eprintln!("fuzzctl: {e}");
        std::process::exit(1);
    }
}
