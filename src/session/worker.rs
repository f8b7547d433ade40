//! Event worker owning the fused state of one session
//!
//! Both channel receivers are drained by a single task, so the `MindState`
//! has exactly one owner and needs no lock. Each channel is handled in
//! delivery order; the two channels interleave freely.

use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::events::RawEvent;
use crate::sample::{ColumnMapper, CommandSample, FacialSample};
use crate::state::{MindState, Reducer};

pub(crate) struct FusionWorker<F> {
    reducer: Reducer,
    state: MindState,
    command: ColumnMapper,
    facial: ColumnMapper,
    on_change: F,
}

impl<F> FusionWorker<F>
where
    F: FnMut(MindState) + Send + 'static,
{
    pub(crate) fn new(reducer: Reducer, command: ColumnMapper, facial: ColumnMapper, on_change: F) -> Self {
        Self {
            reducer,
            state: MindState::default(),
            command,
            facial,
            on_change,
        }
    }

    /// Process events until both channels are detached; returns the final state
    pub(crate) async fn run(
        mut self,
        mut command_rx: mpsc::Receiver<RawEvent>,
        mut facial_rx: mpsc::Receiver<RawEvent>,
    ) -> MindState {
        let mut command_open = true;
        let mut facial_open = true;

        while command_open || facial_open {
            tokio::select! {
                event = command_rx.recv(), if command_open => match event {
                    Some(event) => self.handle_command(&event),
                    None => command_open = false,
                },
                event = facial_rx.recv(), if facial_open => match event {
                    Some(event) => self.handle_facial(&event),
                    None => facial_open = false,
                },
            }
        }

        debug!(state = %self.state, "event worker stopped");
        self.state
    }

    fn handle_command(&mut self, event: &RawEvent) {
        trace!(%event, "command sample");
        let sample = CommandSample::from_labeled(&self.command.label(&event.sample));

        if let Some(snapshot) = self.reducer.apply_command(&mut self.state, &sample) {
            (self.on_change)(snapshot);
        }
    }

    fn handle_facial(&mut self, event: &RawEvent) {
        trace!(%event, "facial sample");
        let sample = FacialSample::from_labeled(&self.facial.label(&event.sample));

        if let Some(snapshot) = self.reducer.apply_facial(&mut self.state, &sample) {
            (self.on_change)(snapshot);
        }
    }
}
