//! mindstate: print fused command and facial state from a device event feed
//!
//! Reads newline-delimited device events on stdin, e.g.
//!
//! ```text
//! {"com":["push",0.72],"time":1712.53}
//! {"fac":["blink","neutral",0.0,"smile",0.61],"time":1712.61}
//! ```
//!
//! and prints one line to stdout every time the fused state changes. Logs go
//! to stderr; `MINDSTATE_VERBOSITY` (0-3) or `RUST_LOG` control them.

use std::sync::Arc;

use anyhow::Result;
use tokio::io::BufReader;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use mindstate::config::Config;
use mindstate::lifecycle::ShutdownSignal;
use mindstate::{fuse_streams_with, LineTransport, MindState};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_filter()))
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        verbosity = config.verbosity,
        change_detection = %config.change_detection,
        "mindstate starting"
    );

    let transport = Arc::new(LineTransport::new(BufReader::new(tokio::io::stdin())));

    let mut teardown = fuse_streams_with(
        Arc::clone(&transport),
        config.fusion_options(),
        |state: MindState| println!("{state}"),
    )
    .await?;

    info!("session active, waiting for events");

    let shutdown = ShutdownSignal::new();
    tokio::select! {
        result = shutdown.wait() => {
            let signal = result?;
            info!(%signal, "shutdown signal received");
        }
        _ = transport.finished() => {
            info!("input exhausted");
        }
        result = teardown.stopped() => {
            // A dead worker (e.g. stdout closed under us) ends the process
            let state = result?;
            warn!(%state, "event worker exited early");
        }
    }

    // Cleanup
    info!("shutting down...");
    let state = teardown.close().await?;
    info!(%state, "mindstate stopped");

    Ok(())
}
