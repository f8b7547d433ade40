//! State module for fused channel state
//!
//! - `MindState`: the four aggregated channels (command, eyes, brows, mouth)
//! - `Reducer`: applies facial and command samples under a power threshold

mod mind;
mod reducer;

pub use mind::{MindState, NEUTRAL};
pub use reducer::{ChangeDetection, FusionOptions, Reducer};
