//! Stream coordinator
//!
//! Owns one device session: opens it, subscribes the command and facial
//! channels, routes their samples through the reducer, and tears everything
//! down again in a fixed order.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::worker::FusionWorker;
use crate::error::FusionError;
use crate::events::{COMMAND_STREAM, FACIAL_STREAM};
use crate::sample::ColumnMapper;
use crate::state::{FusionOptions, MindState, Reducer};
use crate::transport::{ListenerId, SessionStatus, SubscriptionInfo, Transport};

/// Channels in subscription order. Results are matched by position.
const STREAMS: [&str; 2] = [COMMAND_STREAM, FACIAL_STREAM];

/// Lifecycle of a coordinated session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    /// Created, nothing requested from the transport yet
    #[default]
    Uninitialized,
    /// Session open, both channels subscribed and attached
    Active,
    /// Torn down, or setup failed. Terminal.
    Closed,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Uninitialized => write!(f, "uninitialized"),
            Phase::Active => write!(f, "active"),
            Phase::Closed => write!(f, "closed"),
        }
    }
}

/// Coordinates one fused session over a transport
pub struct StreamCoordinator<T: ?Sized> {
    transport: Arc<T>,
    reducer: Reducer,
    phase: Phase,
    listeners: Vec<(&'static str, ListenerId)>,
    worker: Option<JoinHandle<MindState>>,
    /// How the worker ended, once observed through `stopped`
    stopped: Option<Option<MindState>>,
}

impl<T> StreamCoordinator<T>
where
    T: Transport + ?Sized + 'static,
{
    /// Create a coordinator; nothing is requested from the transport yet
    pub fn new(transport: Arc<T>, options: FusionOptions) -> Self {
        Self {
            transport,
            reducer: Reducer::new(options),
            phase: Phase::Uninitialized,
            listeners: Vec::new(),
            worker: None,
            stopped: None,
        }
    }

    /// Get the current phase
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Options the reducer runs with
    pub fn options(&self) -> &FusionOptions {
        self.reducer.options()
    }

    /// Open the session and start routing samples to `on_change`.
    ///
    /// Any failure leaves the coordinator `Closed`; nothing opened so far is
    /// released.
    pub async fn start<F>(&mut self, on_change: F) -> Result<(), FusionError>
    where
        F: FnMut(MindState) + Send + 'static,
    {
        self.expect_phase("start", Phase::Uninitialized)?;

        match self.setup(on_change).await {
            Ok(()) => {
                self.transition_to(Phase::Active);
                Ok(())
            }
            Err(e) => {
                self.transition_to(Phase::Closed);
                Err(e)
            }
        }
    }

    async fn setup<F>(&mut self, on_change: F) -> Result<(), FusionError>
    where
        F: FnMut(MindState) + Send + 'static,
    {
        self.transport.create_session(SessionStatus::Open).await?;

        let infos = self.transport.subscribe(&STREAMS).await?;
        let command = bind_header(&infos, 0, COMMAND_STREAM)?;
        let facial = bind_header(&infos, 1, FACIAL_STREAM)?;

        let command_listener = self.transport.on(COMMAND_STREAM).await;
        let facial_listener = self.transport.on(FACIAL_STREAM).await;
        self.listeners = vec![
            (COMMAND_STREAM, command_listener.id),
            (FACIAL_STREAM, facial_listener.id),
        ];

        let worker = FusionWorker::new(self.reducer.clone(), command, facial, on_change);
        self.worker = Some(tokio::spawn(
            worker.run(command_listener.events, facial_listener.events),
        ));

        Ok(())
    }

    /// Unsubscribe both channels, close the session, then detach both
    /// listeners. Returns the state as of the last processed sample.
    ///
    /// Listeners are detached and the worker joined even when a transport
    /// call fails; the first transport error is returned afterwards.
    pub async fn close(&mut self) -> Result<MindState, FusionError> {
        self.expect_phase("close", Phase::Active)?;
        self.transition_to(Phase::Closed);

        let released = self.release().await;

        for (stream, id) in self.listeners.drain(..) {
            self.transport.remove_listener(stream, id).await;
        }

        let state = match (self.worker.take(), self.stopped.take()) {
            (Some(worker), _) => Some(worker.await?),
            (None, Some(state)) => state,
            (None, None) => Some(MindState::default()),
        };

        released?;
        let state = state.ok_or(FusionError::WorkerStopped)?;
        info!(%state, "session closed");
        Ok(state)
    }

    /// Wait for the event worker to exit while the session is active.
    ///
    /// The worker only exits on its own if the transport drops both
    /// listeners or the change callback panics; the latter is returned as
    /// `FusionError::Worker`. Safe to cancel: the worker is only consumed
    /// once it has finished. The session still needs `close` afterwards.
    pub async fn stopped(&mut self) -> Result<MindState, FusionError> {
        if let Some(state) = &self.stopped {
            return state.clone().ok_or(FusionError::WorkerStopped);
        }

        let Some(worker) = self.worker.as_mut() else {
            return Err(FusionError::InvalidPhase {
                operation: "watch",
                phase: self.phase,
            });
        };

        let outcome = worker.await;
        self.worker = None;

        match outcome {
            Ok(state) => {
                info!(%state, "event worker exited");
                self.stopped = Some(Some(state.clone()));
                Ok(state)
            }
            Err(e) => {
                error!(%e, "event worker failed");
                self.stopped = Some(None);
                Err(e.into())
            }
        }
    }

    async fn release(&self) -> Result<(), FusionError> {
        self.transport.unsubscribe(&STREAMS).await?;
        self.transport.update_session(SessionStatus::Close).await?;
        Ok(())
    }

    fn expect_phase(&self, operation: &'static str, expected: Phase) -> Result<(), FusionError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(FusionError::InvalidPhase {
                operation,
                phase: self.phase,
            })
        }
    }

    fn transition_to(&mut self, phase: Phase) {
        info!(from = %self.phase, to = %phase, "session transition");
        self.phase = phase;
    }
}

/// Bind a mapper to the header granted at `index`
fn bind_header(infos: &[SubscriptionInfo], index: usize, stream: &str) -> Result<ColumnMapper, FusionError> {
    let info = infos
        .get(index)
        .filter(|info| info.stream_name == stream && !info.cols.is_empty())
        .ok_or_else(|| FusionError::Subscription {
            stream: stream.to_string(),
        })?;

    debug!(stream, cols = ?info.cols, "channel subscribed");
    Ok(ColumnMapper::bind(info.cols.iter().cloned()))
}

/// Handle returned by [`fuse_streams`]; closing it ends the session
pub struct Teardown<T: ?Sized> {
    coordinator: StreamCoordinator<T>,
}

impl<T> Teardown<T>
where
    T: Transport + ?Sized + 'static,
{
    /// Get the current phase
    pub fn phase(&self) -> Phase {
        self.coordinator.phase()
    }

    /// Resolves if the event worker exits before `close`.
    /// See [`StreamCoordinator::stopped`].
    pub async fn stopped(&mut self) -> Result<MindState, FusionError> {
        self.coordinator.stopped().await
    }

    /// Tear the session down. Consumes the handle, so it runs at most once.
    pub async fn close(mut self) -> Result<MindState, FusionError> {
        self.coordinator.close().await
    }
}

/// Fuse the command and facial channels of `transport` into change
/// notifications on `on_change`, gating powered fields on `threshold`.
pub async fn fuse_streams<T, F>(
    transport: Arc<T>,
    threshold: f64,
    on_change: F,
) -> Result<Teardown<T>, FusionError>
where
    T: Transport + ?Sized + 'static,
    F: FnMut(MindState) + Send + 'static,
{
    fuse_streams_with(transport, FusionOptions::new(threshold), on_change).await
}

/// [`fuse_streams`] with full control over the reduction options
pub async fn fuse_streams_with<T, F>(
    transport: Arc<T>,
    options: FusionOptions,
    on_change: F,
) -> Result<Teardown<T>, FusionError>
where
    T: Transport + ?Sized + 'static,
    F: FnMut(MindState) + Send + 'static,
{
    let mut coordinator = StreamCoordinator::new(transport, options);
    coordinator.start(on_change).await?;
    Ok(Teardown { coordinator })
}
