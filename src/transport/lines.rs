//! Newline-delimited JSON transport
//!
//! Reads one device event object per line from any async reader (stdin for
//! the CLI). Reading starts once the session is open and every subscribed
//! channel has a listener, so no early sample is dropped.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use super::{
    default_headers, Listener, ListenerId, ListenerRegistry, SessionStatus, SubscriptionInfo, Transport,
    TransportError,
};
use crate::events::RawEvent;

/// Transport replaying device events from a line-oriented reader
pub struct LineTransport<R> {
    reader: Mutex<Option<R>>,
    headers: HashMap<String, Vec<String>>,
    listeners: Arc<ListenerRegistry>,
    subscribed: Mutex<Vec<String>>,
    ready_tx: watch::Sender<bool>,
    finished_tx: Arc<watch::Sender<bool>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<R> LineTransport<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    /// Create a transport over `reader`; nothing is read before a session opens
    pub fn new(reader: R) -> Self {
        let (ready_tx, _) = watch::channel(false);
        let (finished_tx, _) = watch::channel(false);

        Self {
            reader: Mutex::new(Some(reader)),
            headers: default_headers(),
            listeners: Arc::new(ListenerRegistry::new()),
            subscribed: Mutex::new(Vec::new()),
            ready_tx,
            finished_tx: Arc::new(finished_tx),
            task: Mutex::new(None),
        }
    }

    /// Resolves once the reader hits end of input or the session closes
    pub async fn finished(&self) {
        let mut rx = self.finished_tx.subscribe();
        let _ = rx.wait_for(|done| *done).await;
    }

    /// Spawn the line reader; it waits for `ready` before the first read
    async fn start_reader(&self) -> Result<(), TransportError> {
        let reader = self
            .reader
            .lock()
            .await
            .take()
            .ok_or_else(|| TransportError::Rejected {
                operation: "create_session",
                reason: "input already consumed by an earlier session".to_string(),
            })?;

        let listeners = Arc::clone(&self.listeners);
        let mut ready_rx = self.ready_tx.subscribe();
        let finished_tx = Arc::clone(&self.finished_tx);

        let handle = tokio::spawn(async move {
            let ready = ready_rx.wait_for(|ready| *ready).await.is_ok();
            if ready {
                if let Err(e) = pump_lines(reader, &listeners).await {
                    warn!(?e, "line reader stopped");
                }
            }
            finished_tx.send_replace(true);
        });

        *self.task.lock().await = Some(handle);
        Ok(())
    }

    /// Mark ready once every subscribed channel has a listener
    async fn refresh_ready(&self) {
        let subscribed = self.subscribed.lock().await;
        if subscribed.is_empty() {
            return;
        }

        for stream in subscribed.iter() {
            if self.listeners.count(stream).await == 0 {
                return;
            }
        }

        if !self.ready_tx.send_replace(true) {
            debug!(streams = ?*subscribed, "all channels attached, reading input");
        }
    }
}

/// Read lines until end of input, dispatching each decoded event
async fn pump_lines<R>(reader: R, listeners: &ListenerRegistry) -> Result<(), TransportError>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut line_no = 0u64;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match RawEvent::from_line(line) {
            Ok(event) => {
                trace!(line_no, %event, "event read");
                listeners.dispatch(event).await;
            }
            Err(e) => {
                warn!(line_no, %e, "skipping undecodable line");
            }
        }
    }

    info!(lines = line_no, "end of input");
    Ok(())
}

#[async_trait]
impl<R> Transport for LineTransport<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    async fn create_session(&self, status: SessionStatus) -> Result<(), TransportError> {
        if status != SessionStatus::Open {
            return Err(TransportError::Rejected {
                operation: "create_session",
                reason: format!("cannot create a session with status {status}"),
            });
        }
        self.start_reader().await?;
        info!("line session opened");
        Ok(())
    }

    async fn subscribe(&self, streams: &[&str]) -> Result<Vec<SubscriptionInfo>, TransportError> {
        if self.task.lock().await.is_none() {
            return Err(TransportError::SessionNotOpen);
        }

        let granted: Vec<SubscriptionInfo> = streams
            .iter()
            .filter_map(|stream| {
                self.headers
                    .get(*stream)
                    .map(|cols| SubscriptionInfo::new(*stream, cols.iter().cloned()))
            })
            .collect();

        self.subscribed
            .lock()
            .await
            .extend(granted.iter().map(|info| info.stream_name.clone()));
        self.refresh_ready().await;

        Ok(granted)
    }

    async fn unsubscribe(&self, streams: &[&str]) -> Result<(), TransportError> {
        self.subscribed
            .lock()
            .await
            .retain(|s| !streams.contains(&s.as_str()));
        Ok(())
    }

    async fn update_session(&self, status: SessionStatus) -> Result<(), TransportError> {
        if status == SessionStatus::Close {
            if let Some(handle) = self.task.lock().await.take() {
                handle.abort();
            }
            self.finished_tx.send_replace(true);
            info!("line session closed");
        }
        Ok(())
    }

    async fn on(&self, stream: &str) -> Listener {
        let listener = self.listeners.register(stream).await;
        self.refresh_ready().await;
        listener
    }

    async fn remove_listener(&self, stream: &str, id: ListenerId) {
        self.listeners.remove(stream, id).await;
    }
}
