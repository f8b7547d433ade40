//! mindstate: fuses facial-expression and mental-command channels
//!
//! A device pushes two independent streams of positional samples. This crate
//! labels them with the headers granted at subscription time, folds them into
//! one four-channel state (command, eyes, brows, mouth) and notifies the
//! caller only when that state changes and the driving sample clears a power
//! threshold.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use mindstate::{fuse_streams, MemoryTransport};
//!
//! let transport = Arc::new(MemoryTransport::new());
//! let teardown = fuse_streams(transport, 0.5, |state| println!("{state}")).await?;
//! // ...
//! teardown.close().await?;
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod sample;
pub mod session;
pub mod state;
pub mod transport;

pub use error::FusionError;
pub use events::{RawEvent, COMMAND_STREAM, FACIAL_STREAM};
pub use sample::{ColumnMapper, CommandSample, FacialSample, LabeledSample};
pub use session::{fuse_streams, fuse_streams_with, Phase, StreamCoordinator, Teardown};
pub use state::{ChangeDetection, FusionOptions, MindState, Reducer};
pub use transport::{LineTransport, MemoryTransport, SessionStatus, SubscriptionInfo, Transport, TransportError};
