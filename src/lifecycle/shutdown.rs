//! Signal handling for the standalone binary

use std::io;

use tokio::signal::unix::{signal, SignalKind};
use tracing::debug;

/// Which signal ended the run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shutdown {
    Terminate,
    Interrupt,
}

impl std::fmt::Display for Shutdown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Shutdown::Terminate => write!(f, "SIGTERM"),
            Shutdown::Interrupt => write!(f, "SIGINT"),
        }
    }
}

/// Waits for SIGTERM or SIGINT
#[derive(Debug, Default)]
pub struct ShutdownSignal;

impl ShutdownSignal {
    pub fn new() -> Self {
        Self
    }

    /// Resolve with the first shutdown signal received
    pub async fn wait(&self) -> io::Result<Shutdown> {
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        let received = tokio::select! {
            _ = sigterm.recv() => Shutdown::Terminate,
            _ = sigint.recv() => Shutdown::Interrupt,
        };

        debug!(signal = %received, "shutdown signal");
        Ok(received)
    }
}
