//! Session module for coordinating the command and facial channels
//!
//! Lifecycle: Uninitialized -> Active -> Closed
//! - `start` opens the session, subscribes both channels, attaches listeners
//! - `close` unsubscribes, closes the session, detaches listeners

mod coordinator;
mod worker;

pub use coordinator::{fuse_streams, fuse_streams_with, Phase, StreamCoordinator, Teardown};
