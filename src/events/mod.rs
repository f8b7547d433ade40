//! Raw channel events delivered by a transport
//!
//! The device pushes one JSON object per sample, carrying the positional
//! array under the channel's name:
//!
//! ```text
//! {"com":["push",0.72],"sid":"...","time":1712.53}
//! {"fac":["blink","neutral",0.0,"smile",0.61],"sid":"...","time":1712.61}
//! ```

use serde_json::Value;

use crate::transport::TransportError;

/// Mental-command channel name
pub const COMMAND_STREAM: &str = "com";

/// Facial-expression channel name
pub const FACIAL_STREAM: &str = "fac";

/// Keys of an event object that never name a channel
const RESERVED_KEYS: [&str; 2] = ["sid", "time"];

/// One positional sample from one channel
#[derive(Debug, Clone, PartialEq)]
pub struct RawEvent {
    /// Channel the sample belongs to
    pub stream: String,
    /// Values in header order
    pub sample: Vec<Value>,
    /// Device timestamp in seconds, when present
    pub time: Option<f64>,
}

impl RawEvent {
    /// Create an event without a device timestamp
    pub fn new(stream: impl Into<String>, sample: Vec<Value>) -> Self {
        Self {
            stream: stream.into(),
            sample,
            time: None,
        }
    }

    /// Decode a device event object.
    ///
    /// The channel is the first non-reserved key whose value is an array.
    pub fn from_json(value: &Value) -> Result<Self, TransportError> {
        let object = value
            .as_object()
            .ok_or_else(|| TransportError::Malformed("event is not a JSON object".into()))?;

        let (stream, sample) = object
            .iter()
            .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str()))
            .find_map(|(key, value)| value.as_array().map(|arr| (key.clone(), arr.clone())))
            .ok_or_else(|| TransportError::Malformed("event carries no channel sample".into()))?;

        Ok(Self {
            stream,
            sample,
            time: object.get("time").and_then(Value::as_f64),
        })
    }

    /// Decode one line of newline-delimited JSON
    pub fn from_line(line: &str) -> Result<Self, TransportError> {
        let value: Value = serde_json::from_str(line)?;
        Self::from_json(&value)
    }
}

impl std::fmt::Display for RawEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.stream, Value::Array(self.sample.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_command_event_deserialization() {
        let line = r#"{"com":["push",0.72],"sid":"abc","time":1712.5}"#;
        let event = RawEvent::from_line(line).unwrap();

        assert_eq!(event.stream, COMMAND_STREAM);
        assert_eq!(event.sample, vec![json!("push"), json!(0.72)]);
        assert_eq!(event.time, Some(1712.5));
    }

    #[test]
    fn test_facial_event_without_time() {
        let event = RawEvent::from_json(&json!({
            "fac": ["blink", "neutral", 0.0, "smile", 0.61],
        }))
        .unwrap();

        assert_eq!(event.stream, FACIAL_STREAM);
        assert_eq!(event.sample.len(), 5);
        assert_eq!(event.time, None);
    }

    #[test]
    fn test_event_without_sample_rejected() {
        let err = RawEvent::from_json(&json!({"sid": "abc", "time": 1.0})).unwrap_err();
        assert!(matches!(err, TransportError::Malformed(_)));

        let err = RawEvent::from_json(&json!(["push", 0.1])).unwrap_err();
        assert!(matches!(err, TransportError::Malformed(_)));
    }

    #[test]
    fn test_invalid_json_rejected() {
        let err = RawEvent::from_line("{not json").unwrap_err();
        assert!(matches!(err, TransportError::Decode(_)));
    }

    #[test]
    fn test_display() {
        let event = RawEvent::new(COMMAND_STREAM, vec![json!("lift"), json!(0.5)]);
        assert_eq!(event.to_string(), r#"com ["lift",0.5]"#);
    }
}
