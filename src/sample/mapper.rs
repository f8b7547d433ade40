//! Positional-to-labeled sample mapping
//!
//! A channel's header is fixed when the channel is subscribed. The mapper is
//! bound to that header once and then reused for every sample on the channel.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

/// A sample keyed by field name
pub type LabeledSample = BTreeMap<String, Value>;

/// Zips one channel's header with its positional samples
#[derive(Debug, Clone)]
pub struct ColumnMapper {
    header: Arc<[String]>,
}

impl ColumnMapper {
    /// Bind a mapper to a channel header
    pub fn bind<I, S>(header: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            header: header.into_iter().map(Into::into).collect(),
        }
    }

    /// The header this mapper was bound to
    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Pair each header name with the value at the same index.
    ///
    /// A sample shorter than the header yields a mapping without the
    /// trailing keys. Values past the end of the header are dropped.
    pub fn label(&self, sample: &[Value]) -> LabeledSample {
        self.header
            .iter()
            .zip(sample)
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_label_pairs_by_position() {
        let mapper = ColumnMapper::bind(["act", "pow"]);
        let labeled = mapper.label(&[json!("push"), json!(0.7)]);

        assert_eq!(labeled.len(), 2);
        assert_eq!(labeled["act"], json!("push"));
        assert_eq!(labeled["pow"], json!(0.7));
    }

    #[test]
    fn test_short_sample_omits_trailing_keys() {
        let mapper = ColumnMapper::bind(["eyeAct", "uAct", "uPow", "lAct", "lPow"]);
        let labeled = mapper.label(&[json!("blink"), json!("frown")]);

        assert_eq!(labeled.len(), 2);
        assert!(labeled.contains_key("uAct"));
        assert!(!labeled.contains_key("uPow"));
        assert!(!labeled.contains_key("lPow"));
    }

    #[test]
    fn test_surplus_values_dropped() {
        let mapper = ColumnMapper::bind(["act"]);
        let labeled = mapper.label(&[json!("lift"), json!(0.3), json!("extra")]);

        assert_eq!(labeled.len(), 1);
        assert_eq!(labeled["act"], json!("lift"));
    }

    #[test]
    fn test_bound_mapper_is_reusable() {
        let mapper = ColumnMapper::bind(vec!["act".to_string(), "pow".to_string()]);

        let first = mapper.label(&[json!("push"), json!(0.1)]);
        let second = mapper.label(&[json!("pull"), json!(0.9)]);

        assert_eq!(first["act"], json!("push"));
        assert_eq!(second["act"], json!("pull"));
        assert_eq!(mapper.header(), ["act", "pow"]);
    }
}
