pub mod cli;
pub mod clipboard;
pub mod commands;
pub mod error;
pub mod security;
pub mod state;
pub mod storage;
pub mod vault;

use clap::Parser;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::Cli;

/// Parse the command line, set up logging and run the selected command.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays parseable
    let default_filter = if cli.verbose {
        "passvault_app=debug"
    } else {
        "passvault_app=warn"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    debug!("Starting PassVault v{}", env!("CARGO_PKG_VERSION"));

    cli::execute(cli).await?;
    Ok(())
}
