//! State reducer
//!
//! Applies one typed sample to a `MindState` and reports whether the caller
//! should be notified. The state itself is owned elsewhere and passed in by
//! reference.

use tracing::debug;

use super::mind::MindState;
use crate::sample::{CommandSample, FacialSample};

/// How a facial sample decides that the state changed.
///
/// With the current facial rule every field is written at most once per
/// sample and only when its value differs, so both modes report exactly the
/// same changes. `FinalDiff` compares whole states and stays correct if a
/// rule ever writes a field twice within one sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChangeDetection {
    /// Changed as soon as any field is written with a different value
    #[default]
    AnyFieldTouched,
    /// Changed only if the state after the sample differs from the state before it
    FinalDiff,
}

impl std::fmt::Display for ChangeDetection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeDetection::AnyFieldTouched => write!(f, "any-field-touched"),
            ChangeDetection::FinalDiff => write!(f, "final-diff"),
        }
    }
}

/// Per-session reduction settings. Fixed once the session starts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionOptions {
    /// Minimum power a gated field needs before it may update
    pub threshold: f64,
    /// Rule deciding whether a facial sample changed the state
    pub change_detection: ChangeDetection,
}

impl FusionOptions {
    /// Options with the given threshold and default change detection
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            change_detection: ChangeDetection::default(),
        }
    }

    /// Replace the change detection rule
    pub fn with_change_detection(mut self, change_detection: ChangeDetection) -> Self {
        self.change_detection = change_detection;
        self
    }
}

impl Default for FusionOptions {
    fn default() -> Self {
        Self::new(0.0)
    }
}

/// Folds channel samples into a `MindState`
#[derive(Debug, Clone)]
pub struct Reducer {
    options: FusionOptions,
}

impl Reducer {
    /// Create a reducer with fixed options
    pub fn new(options: FusionOptions) -> Self {
        Self { options }
    }

    /// Get the options this reducer applies
    pub fn options(&self) -> &FusionOptions {
        &self.options
    }

    /// Apply a facial sample, returning a snapshot if the state changed.
    ///
    /// `eyes` carries no power and follows every sample. `brows` and `mouth`
    /// only move when their power clears the threshold.
    pub fn apply_facial(&self, state: &mut MindState, sample: &FacialSample) -> Option<MindState> {
        let before = match self.options.change_detection {
            ChangeDetection::FinalDiff => Some(state.clone()),
            ChangeDetection::AnyFieldTouched => None,
        };

        let mut changed = false;

        if let Some(eyes) = &sample.eye_act {
            changed |= replace(&mut state.eyes, eyes);
        }

        if self.clears(sample.upper_power) {
            if let Some(brows) = &sample.upper_act {
                changed |= replace(&mut state.brows, brows);
            }
        }

        if self.clears(sample.lower_power) {
            if let Some(mouth) = &sample.lower_act {
                changed |= replace(&mut state.mouth, mouth);
            }
        }

        if let Some(before) = before {
            changed = before != *state;
        }

        if changed {
            debug!(eyes = %state.eyes, brows = %state.brows, mouth = %state.mouth, "facial state changed");
            Some(state.clone())
        } else {
            None
        }
    }

    /// Apply a command sample, returning a snapshot if `command` changed
    pub fn apply_command(&self, state: &mut MindState, sample: &CommandSample) -> Option<MindState> {
        if !self.clears(sample.power) {
            return None;
        }

        let action = sample.action.as_deref()?;
        if !replace(&mut state.command, action) {
            return None;
        }

        debug!(command = %state.command, power = ?sample.power, "command state changed");
        Some(state.clone())
    }

    /// A missing power never clears the threshold
    fn clears(&self, power: Option<f64>) -> bool {
        power.is_some_and(|p| p >= self.options.threshold)
    }
}

/// Overwrite `field` with `value` if they differ; true if it was written
fn replace(field: &mut String, value: &str) -> bool {
    if field == value {
        return false;
    }
    *field = value.to_string();
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facial(eye: &str, upper: &str, upper_pow: f64, lower: &str, lower_pow: f64) -> FacialSample {
        FacialSample {
            eye_act: Some(eye.into()),
            upper_act: Some(upper.into()),
            upper_power: Some(upper_pow),
            lower_act: Some(lower.into()),
            lower_power: Some(lower_pow),
        }
    }

    fn command(action: &str, power: f64) -> CommandSample {
        CommandSample {
            action: Some(action.into()),
            power: Some(power),
        }
    }

    fn create_reducer(threshold: f64) -> (Reducer, MindState) {
        (Reducer::new(FusionOptions::new(threshold)), MindState::default())
    }

    #[test]
    fn test_facial_scenario_gates_mouth_by_power() {
        let (reducer, mut state) = create_reducer(0.5);

        let snapshot = reducer
            .apply_facial(&mut state, &facial("left", "up", 0.9, "neutral", 0.1))
            .expect("state should change");

        assert_eq!(
            snapshot,
            MindState {
                command: "neutral".into(),
                eyes: "left".into(),
                brows: "up".into(),
                mouth: "neutral".into(),
            }
        );
    }

    #[test]
    fn test_command_below_threshold_ignored() {
        let (reducer, mut state) = create_reducer(0.5);

        assert!(reducer.apply_command(&mut state, &command("push", 0.2)).is_none());
        assert_eq!(state, MindState::default());
    }

    #[test]
    fn test_command_above_threshold_updates() {
        let (reducer, mut state) = create_reducer(0.5);

        let snapshot = reducer.apply_command(&mut state, &command("push", 0.7)).unwrap();
        assert_eq!(snapshot.command, "push");
        assert_eq!(snapshot.eyes, "neutral");
        assert_eq!(snapshot.brows, "neutral");
        assert_eq!(snapshot.mouth, "neutral");
    }

    #[test]
    fn test_command_at_threshold_updates() {
        let (reducer, mut state) = create_reducer(0.5);
        assert!(reducer.apply_command(&mut state, &command("lift", 0.5)).is_some());
    }

    #[test]
    fn test_command_same_action_no_callback() {
        let (reducer, mut state) = create_reducer(0.0);

        assert!(reducer.apply_command(&mut state, &command("neutral", 1.0)).is_none());
        assert!(reducer.apply_command(&mut state, &command("pull", 1.0)).is_some());
        assert!(reducer.apply_command(&mut state, &command("pull", 0.8)).is_none());
    }

    #[test]
    fn test_eyes_ignore_threshold() {
        let (reducer, mut state) = create_reducer(1.0);
        let directions = ["left", "left", "right", "blink", "blink", "left"];
        let mut callbacks = 0;

        for eye in directions {
            if reducer
                .apply_facial(&mut state, &facial(eye, "raise", 0.0, "smile", 0.0))
                .is_some()
            {
                callbacks += 1;
            }
            assert_eq!(state.eyes, eye);
        }

        // left, right, blink, left
        assert_eq!(callbacks, 4);
        assert_eq!(state.brows, "neutral");
        assert_eq!(state.mouth, "neutral");
    }

    #[test]
    fn test_brows_below_threshold_never_mutate() {
        let (reducer, mut state) = create_reducer(0.6);

        for power in [0.0, 0.3, 0.59] {
            let result = reducer.apply_facial(&mut state, &facial("neutral", "furrow", power, "neutral", 0.0));
            assert!(result.is_none());
            assert_eq!(state.brows, "neutral");
        }

        assert!(reducer
            .apply_facial(&mut state, &facial("neutral", "furrow", 0.6, "neutral", 0.0))
            .is_some());
        assert_eq!(state.brows, "furrow");
    }

    #[test]
    fn test_identical_sample_twice() {
        let (reducer, mut state) = create_reducer(0.5);
        let sample = facial("right", "surprise", 0.8, "clench", 0.9);

        assert!(reducer.apply_facial(&mut state, &sample).is_some());
        assert!(reducer.apply_facial(&mut state, &sample).is_none());

        let cmd = command("push", 0.9);
        assert!(reducer.apply_command(&mut state, &cmd).is_some());
        assert!(reducer.apply_command(&mut state, &cmd).is_none());
    }

    #[test]
    fn test_any_field_touched_reports_single_change() {
        let (reducer, mut state) = create_reducer(0.5);
        state.brows = "up".into();
        state.mouth = "smile".into();

        // Only eyes differ; brows and mouth repeat their current values
        let snapshot = reducer
            .apply_facial(&mut state, &facial("wink_left", "up", 0.9, "smile", 0.9))
            .expect("eyes change alone must notify");

        assert_eq!(snapshot, state);
        assert_eq!(snapshot.eyes, "wink_left");
        assert_eq!(snapshot.brows, "up");
        assert_eq!(snapshot.mouth, "smile");
    }

    #[test]
    fn test_snapshot_is_final_merged_state() {
        let (reducer, mut state) = create_reducer(0.5);

        let snapshot = reducer
            .apply_facial(&mut state, &facial("left", "raise", 0.9, "smirk", 0.9))
            .unwrap();

        assert_eq!(snapshot.eyes, "left");
        assert_eq!(snapshot.brows, "raise");
        assert_eq!(snapshot.mouth, "smirk");

        // The snapshot is detached from the live state
        state.eyes = "right".into();
        assert_eq!(snapshot.eyes, "left");
    }

    #[test]
    fn test_missing_fields_do_not_update() {
        let (reducer, mut state) = create_reducer(0.0);

        let partial = FacialSample {
            eye_act: None,
            upper_act: Some("raise".into()),
            upper_power: None,
            lower_act: None,
            lower_power: Some(1.0),
        };
        assert!(reducer.apply_facial(&mut state, &partial).is_none());

        let no_power = CommandSample {
            action: Some("push".into()),
            power: None,
        };
        assert!(reducer.apply_command(&mut state, &no_power).is_none());

        let no_action = CommandSample {
            action: None,
            power: Some(1.0),
        };
        assert!(reducer.apply_command(&mut state, &no_action).is_none());

        assert_eq!(state, MindState::default());
    }

    #[test]
    fn test_change_detection_modes_agree() {
        let touched = Reducer::new(FusionOptions::new(0.5));
        let strict = Reducer::new(FusionOptions::new(0.5).with_change_detection(ChangeDetection::FinalDiff));
        let mut touched_state = MindState::default();
        let mut strict_state = MindState::default();

        let samples = [
            facial("left", "up", 0.9, "neutral", 0.1),
            facial("left", "up", 0.9, "neutral", 0.1),
            facial("right", "up", 0.2, "smile", 0.8),
            facial("right", "neutral", 0.6, "smile", 0.9),
            facial("right", "neutral", 0.6, "smile", 0.9),
            FacialSample::default(),
        ];

        for sample in &samples {
            let a = touched.apply_facial(&mut touched_state, sample);
            let b = strict.apply_facial(&mut strict_state, sample);
            assert_eq!(a, b);
        }
        assert_eq!(touched_state, strict_state);
    }

    #[test]
    fn test_final_diff_mode() {
        let reducer = Reducer::new(FusionOptions::new(0.5).with_change_detection(ChangeDetection::FinalDiff));
        let mut state = MindState::default();

        let snapshot = reducer
            .apply_facial(&mut state, &facial("left", "up", 0.9, "neutral", 0.1))
            .unwrap();
        assert_eq!(snapshot.eyes, "left");
        assert_eq!(snapshot.brows, "up");

        assert!(reducer
            .apply_facial(&mut state, &facial("left", "up", 0.9, "neutral", 0.9))
            .is_none());
        assert_eq!(reducer.options().change_detection, ChangeDetection::FinalDiff);
    }
}
