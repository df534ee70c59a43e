//! Hippocache - reference host binary
//!
//! Reads protocol commands from stdin, one per line, and writes one JSON
//! reply line per command to stdout. Logs go to stderr.

use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hippocache::host::handle_line;
use hippocache::{spawn_sweep_task, Config, SessionRegistry};

/// Main entry point for the Hippocache host.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create the session registry
/// 4. Start the background sweep task
/// 5. Serve stdin until EOF or Ctrl+C
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hippocache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting Hippocache host");

    let config = Config::from_env();
    info!(
        max_entries = config.max_entries,
        default_ttl = config.default_ttl,
        strategy = %config.strategy,
        sweep_interval = config.sweep_interval,
        "Configuration loaded"
    );

    let registry = Arc::new(
        SessionRegistry::from_config(&config).context("Failed to create session registry")?,
    );

    let sweep_handle = spawn_sweep_task(registry.clone(), config.sweep_interval());
    info!("Background sweep task started");

    let served = tokio::select! {
        result = serve(&registry) => result,
        _ = signal::ctrl_c() => {
            info!("Received Ctrl+C, initiating shutdown...");
            Ok(())
        }
    };

    sweep_handle.abort();
    warn!("Sweep task aborted");

    for name in registry.names() {
        registry.close(&name);
    }
    info!("Host shutdown complete");
    served
}

/// Answers stdin commands until EOF.
async fn serve(registry: &SessionRegistry) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let Some(reply) = handle_line(registry, &line) else {
            continue;
        };
        let mut out = reply.to_line();
        out.push('\n');
        stdout
            .write_all(out.as_bytes())
            .await
            .context("Failed to write reply")?;
        stdout.flush().await.context("Failed to flush stdout")?;
    }

    info!("Input closed");
    Ok(())
}
