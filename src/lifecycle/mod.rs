//! Process lifecycle helpers for the binary

mod shutdown;

pub use shutdown::{Shutdown, ShutdownSignal};
