//! In-memory transport
//!
//! Answers subscriptions from a fixed header table, records every call in
//! order, and lets the caller inject channel events with `emit`.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

use super::{
    default_headers, Listener, ListenerId, ListenerRegistry, SessionStatus, SubscriptionInfo, Transport,
    TransportError,
};
use crate::events::RawEvent;

/// One recorded transport call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    CreateSession(SessionStatus),
    Subscribe(Vec<String>),
    Unsubscribe(Vec<String>),
    UpdateSession(SessionStatus),
    On(String),
    RemoveListener(String),
}

/// Scripted transport for tests and embedding
#[derive(Debug)]
pub struct MemoryTransport {
    headers: HashMap<String, Vec<String>>,
    omitted: HashSet<String>,
    failing: HashSet<&'static str>,
    session_open: AtomicBool,
    calls: Mutex<Vec<TransportCall>>,
    listeners: ListenerRegistry,
}

impl MemoryTransport {
    /// A transport publishing the standard command and facial headers
    pub fn new() -> Self {
        Self {
            headers: default_headers(),
            omitted: HashSet::new(),
            failing: HashSet::new(),
            session_open: AtomicBool::new(false),
            calls: Mutex::new(Vec::new()),
            listeners: ListenerRegistry::new(),
        }
    }

    /// Publish a custom header for `stream`
    pub fn with_header<I, S>(mut self, stream: &str, cols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.headers
            .insert(stream.to_string(), cols.into_iter().map(Into::into).collect());
        self
    }

    /// Leave `stream` out of subscription results
    pub fn without_subscription(mut self, stream: &str) -> Self {
        self.omitted.insert(stream.to_string());
        self
    }

    /// Reject every call of `operation` (`create_session`, `subscribe`,
    /// `unsubscribe`, `update_session`)
    pub fn failing(mut self, operation: &'static str) -> Self {
        self.failing.insert(operation);
        self
    }

    /// Calls seen so far, oldest first
    pub async fn calls(&self) -> Vec<TransportCall> {
        self.calls.lock().await.clone()
    }

    /// Whether a session is currently open
    pub fn is_session_open(&self) -> bool {
        self.session_open.load(Ordering::SeqCst)
    }

    /// Number of listeners attached to `stream`
    pub async fn listener_count(&self, stream: &str) -> usize {
        self.listeners.count(stream).await
    }

    /// Push a sample to every listener of `stream`
    pub async fn emit(&self, stream: &str, sample: Vec<Value>) -> usize {
        self.listeners.dispatch(RawEvent::new(stream, sample)).await
    }

    async fn record(&self, call: TransportCall) {
        debug!(?call, "transport call");
        self.calls.lock().await.push(call);
    }

    fn check(&self, operation: &'static str) -> Result<(), TransportError> {
        if self.failing.contains(operation) {
            return Err(TransportError::Rejected {
                operation,
                reason: "scripted failure".to_string(),
            });
        }
        Ok(())
    }

    fn require_session(&self) -> Result<(), TransportError> {
        if self.is_session_open() {
            Ok(())
        } else {
            Err(TransportError::SessionNotOpen)
        }
    }
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

fn owned(streams: &[&str]) -> Vec<String> {
    streams.iter().map(|s| s.to_string()).collect()
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn create_session(&self, status: SessionStatus) -> Result<(), TransportError> {
        self.record(TransportCall::CreateSession(status)).await;
        self.check("create_session")?;
        self.session_open.store(status == SessionStatus::Open, Ordering::SeqCst);
        Ok(())
    }

    async fn subscribe(&self, streams: &[&str]) -> Result<Vec<SubscriptionInfo>, TransportError> {
        self.record(TransportCall::Subscribe(owned(streams))).await;
        self.check("subscribe")?;
        self.require_session()?;

        // Granted channels keep request order; omitted ones are left out
        Ok(streams
            .iter()
            .filter(|stream| !self.omitted.contains(**stream))
            .filter_map(|stream| {
                self.headers
                    .get(*stream)
                    .map(|cols| SubscriptionInfo::new(*stream, cols.iter().cloned()))
            })
            .collect())
    }

    async fn unsubscribe(&self, streams: &[&str]) -> Result<(), TransportError> {
        self.record(TransportCall::Unsubscribe(owned(streams))).await;
        self.check("unsubscribe")?;
        self.require_session()
    }

    async fn update_session(&self, status: SessionStatus) -> Result<(), TransportError> {
        self.record(TransportCall::UpdateSession(status)).await;
        self.check("update_session")?;
        self.require_session()?;
        self.session_open.store(status == SessionStatus::Open, Ordering::SeqCst);
        Ok(())
    }

    async fn on(&self, stream: &str) -> Listener {
        self.record(TransportCall::On(stream.to_string())).await;
        self.listeners.register(stream).await
    }

    async fn remove_listener(&self, stream: &str, id: ListenerId) {
        self.record(TransportCall::RemoveListener(stream.to_string())).await;
        self.listeners.remove(stream, id).await;
    }
}
