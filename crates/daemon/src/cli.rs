//! Command line entry for the `modelplex` binary.

use crate::{DaemonConfig, config::DEFAULT_CONFIG, serve};
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt};

/// Modelplex: an OpenAI-compatible model gateway on a unix socket.
#[derive(Debug, Parser)]
#[command(name = "modelplex", version, about)]
pub struct App {
    /// Configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG)]
    pub config: PathBuf,

    /// Socket path, overriding `server.socket_path`
    #[arg(short, long)]
    pub socket: Option<PathBuf>,

    /// Verbosity level (use -v, -vv, -vvv, etc.)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl App {
    /// Initialize the tracing subscriber. `RUST_LOG` wins, then `-v`, then
    /// `default_level`.
    pub fn init_tracing(&self, default_level: &str) {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            let directive = match self.verbose {
                0 => default_level,
                1 => "modelplex=debug",
                2 => "modelplex=trace",
                3 => "debug",
                _ => "trace",
            };
            EnvFilter::new(directive)
        });

        fmt()
            .without_time()
            .with_env_filter(filter)
            .with_target(self.verbose != 0)
            .init();
    }

    /// Load the configuration, serve until ctrl-c or SIGTERM, then shut
    /// down and remove the socket.
    pub async fn run(self) -> Result<()> {
        let config = DaemonConfig::load(&self.config)?;
        self.init_tracing(&config.server.log_level);
        tracing::info!("loaded configuration from {}", self.config.display());

        let handle = serve(&config, self.socket.as_deref()).await?;
        shutdown_signal().await?;
        handle.shutdown().await?;
        tracing::info!("gateway shut down");
        Ok(())
    }
}

/// Wait for ctrl-c or SIGTERM.
async fn shutdown_signal() -> Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut term = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result?,
        _ = term.recv() => {}
    }
    tracing::info!("received shutdown signal");
    Ok(())
}
