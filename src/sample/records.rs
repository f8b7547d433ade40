//! Typed records for the facial and command channels
//!
//! Labeled samples are untrusted. Fields are read defensively here so the
//! reducer only ever sees `Option`s: a missing or mistyped field becomes
//! `None` and simply fails whatever test the reducer applies to it.

use serde_json::Value;

use super::mapper::LabeledSample;

/// Header of the command channel as published by the device
pub const COMMAND_COLUMNS: [&str; 2] = ["act", "pow"];

/// Header of the facial channel as published by the device
pub const FACIAL_COLUMNS: [&str; 5] = ["eyeAct", "uAct", "uPow", "lAct", "lPow"];

/// One facial-expression sample
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FacialSample {
    /// Eye action (blink, wink, look direction). Carries no power.
    pub eye_act: Option<String>,
    /// Upper-face (brow) action
    pub upper_act: Option<String>,
    /// Power of the upper-face action
    pub upper_power: Option<f64>,
    /// Lower-face (mouth) action
    pub lower_act: Option<String>,
    /// Power of the lower-face action
    pub lower_power: Option<f64>,
}

impl FacialSample {
    /// Read the facial fields (`eyeAct`, `uAct`, `uPow`, `lAct`, `lPow`)
    pub fn from_labeled(sample: &LabeledSample) -> Self {
        Self {
            eye_act: label(sample, "eyeAct"),
            upper_act: label(sample, "uAct"),
            upper_power: power(sample, "uPow"),
            lower_act: label(sample, "lAct"),
            lower_power: power(sample, "lPow"),
        }
    }
}

/// One mental-command sample
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandSample {
    /// Detected command (push, pull, lift, ...)
    pub action: Option<String>,
    /// Power of the detected command
    pub power: Option<f64>,
}

impl CommandSample {
    /// Read the command fields (`act`, `pow`)
    pub fn from_labeled(sample: &LabeledSample) -> Self {
        Self {
            action: label(sample, "act"),
            power: power(sample, "pow"),
        }
    }
}

fn label(sample: &LabeledSample, key: &str) -> Option<String> {
    match sample.get(key)? {
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

fn power(sample: &LabeledSample, key: &str) -> Option<f64> {
    let value = match sample.get(key)? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    value.is_finite().then_some(value)
}
