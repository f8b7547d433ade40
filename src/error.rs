//! Error taxonomy for fused sessions

use crate::session::Phase;
use crate::transport::TransportError;

/// Errors returned by session setup and teardown
#[derive(Debug, thiserror::Error)]
pub enum FusionError {
    /// The transport granted no subscription payload for a channel
    #[error("subscription to `{stream}` returned no payload")]
    Subscription { stream: String },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("cannot {operation} a session that is {phase}")]
    InvalidPhase { operation: &'static str, phase: Phase },

    #[error("event worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),

    /// The worker failed earlier and its failure was already reported
    #[error("event worker stopped before the session was closed")]
    WorkerStopped,
}
