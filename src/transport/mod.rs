//! Device transport contract
//!
//! The coordinator only relies on this trait: open and close a session,
//! subscribe and unsubscribe channels, and attach or detach listeners that
//! receive raw channel events. Two implementations ship with the crate:
//! - `MemoryTransport`: scripted, records every call, used in tests
//! - `LineTransport`: newline-delimited JSON events from an async reader

mod lines;
mod listeners;
mod memory;

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::events::{RawEvent, COMMAND_STREAM, FACIAL_STREAM};
use crate::sample::{COMMAND_COLUMNS, FACIAL_COLUMNS};

pub use lines::LineTransport;
pub use listeners::{ListenerRegistry, LISTENER_CAPACITY};
pub use memory::{MemoryTransport, TransportCall};

/// Session status values understood by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Open,
    Close,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::Open => write!(f, "open"),
            SessionStatus::Close => write!(f, "close"),
        }
    }
}

/// Subscription payload for one channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionInfo {
    /// Channel this payload belongs to
    pub stream_name: String,
    /// Field names of the channel's positional samples
    pub cols: Vec<String>,
}

impl SubscriptionInfo {
    /// Create a payload for `stream_name` with the given header
    pub fn new<I, S>(stream_name: impl Into<String>, cols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            stream_name: stream_name.into(),
            cols: cols.into_iter().map(Into::into).collect(),
        }
    }
}

/// Headers the device publishes for the command and facial channels
pub(crate) fn default_headers() -> HashMap<String, Vec<String>> {
    [
        (COMMAND_STREAM, COMMAND_COLUMNS.as_slice()),
        (FACIAL_STREAM, FACIAL_COLUMNS.as_slice()),
    ]
    .into_iter()
    .map(|(stream, cols)| {
        (
            stream.to_string(),
            cols.iter().map(|c| c.to_string()).collect(),
        )
    })
    .collect()
}

/// Identifies one registered listener on one channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Receiving end of a channel listener
#[derive(Debug)]
pub struct Listener {
    pub id: ListenerId,
    pub events: mpsc::Receiver<RawEvent>,
}

/// Errors surfaced by a transport
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("no session is open")]
    SessionNotOpen,

    #[error("{operation} rejected: {reason}")]
    Rejected {
        operation: &'static str,
        reason: String,
    },

    #[error("malformed event: {0}")]
    Malformed(String),

    #[error("failed to decode event: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Operations the coordinator needs from a device connection.
///
/// Calls are awaited one at a time; an implementation never sees two of
/// them in flight for the same session.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open a session with the given status (`Open`)
    async fn create_session(&self, status: SessionStatus) -> Result<(), TransportError>;

    /// Subscribe to channels. The result holds one entry per requested
    /// channel, in request order; a missing entry means the channel was not
    /// granted.
    async fn subscribe(&self, streams: &[&str]) -> Result<Vec<SubscriptionInfo>, TransportError>;

    async fn unsubscribe(&self, streams: &[&str]) -> Result<(), TransportError>;

    /// Change the session status (`Close` ends it)
    async fn update_session(&self, status: SessionStatus) -> Result<(), TransportError>;

    /// Attach a listener to one channel
    async fn on(&self, stream: &str) -> Listener;

    /// Detach a listener. Its receiver sees the end of the channel.
    async fn remove_listener(&self, stream: &str, id: ListenerId);
}
