mod builtin;
mod cli;
mod config;
mod engine;
mod error;
mod handler;
mod model;
mod orchestrator;
mod registry;
#[cfg(test)]
mod testing;

use anyhow::Result;
use clap::Parser;
use tracing::{debug, error};

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let config = cli::load_config(&args)?;

    // Initialize tracing with environment-based filtering
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(config.log_level.as_deref().unwrap_or("warn"))
            }),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    debug!(?config, "starting cmdctl");

    match cli::run(args, config).await {
        // Exit explicitly: a pending stdin read would otherwise keep the runtime alive.
        Ok(()) => std::process::exit(0),
        Err(e) => {
            error!("cmdctl failed: {:?}", e);
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}
