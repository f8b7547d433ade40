//! Aggregated state for one fused session

use serde::{Deserialize, Serialize};

/// Label every channel starts from
pub const NEUTRAL: &str = "neutral";

/// The four channels fused from the facial and command streams.
///
/// Cloning yields the snapshot handed to callers; the live value never
/// leaves the task that owns the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MindState {
    /// Current mental command
    pub command: String,
    /// Current eye action
    pub eyes: String,
    /// Current upper-face action
    pub brows: String,
    /// Current lower-face action
    pub mouth: String,
}

impl Default for MindState {
    fn default() -> Self {
        Self {
            command: NEUTRAL.to_string(),
            eyes: NEUTRAL.to_string(),
            brows: NEUTRAL.to_string(),
            mouth: NEUTRAL.to_string(),
        }
    }
}

impl std::fmt::Display for MindState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "command: {:<10} eyes: {:<10} brows: {:<10} mouth: {}",
            self.command, self.eyes, self.brows, self.mouth
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_neutral() {
        let state = MindState::default();
        assert_eq!(state.command, NEUTRAL);
        assert_eq!(state.eyes, NEUTRAL);
        assert_eq!(state.brows, NEUTRAL);
        assert_eq!(state.mouth, NEUTRAL);
    }

    #[test]
    fn test_snapshot_serialization() {
        let json = serde_json::to_value(MindState::default()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "command": "neutral",
                "eyes": "neutral",
                "brows": "neutral",
                "mouth": "neutral",
            })
        );
    }

    #[test]
    fn test_display_line() {
        let state = MindState {
            command: "push".into(),
            ..MindState::default()
        };
        let line = state.to_string();
        assert!(line.starts_with("command: push"));
        assert!(line.ends_with("mouth: neutral"));
    }
}
