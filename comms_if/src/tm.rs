//! # Telemetry
//!
//! Telemetry is published as key/value pairs into a sink. Publishing is write-only and best
//! effort, a sink never reports failure back to the publisher.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Serialize;
use std::collections::BTreeMap;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A destination for telemetry values.
pub trait TelemetrySink {
    /// Publish a single value under the given key, replacing any previous value.
    fn publish(&mut self, key: &str, value: TmValue);

    fn publish_number(&mut self, key: &str, value: f64) {
        self.publish(key, TmValue::Number(value))
    }

    fn publish_bool(&mut self, key: &str, value: bool) {
        self.publish(key, TmValue::Bool(value))
    }

    fn publish_text(&mut self, key: &str, value: &str) {
        self.publish(key, TmValue::Text(value.to_string()))
    }

    fn publish_array(&mut self, key: &str, value: &[f64]) {
        self.publish(key, TmValue::Array(value.to_vec()))
    }
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A table holding the latest value published under each key.
///
/// Keys are kept sorted so that serialised tables are stable between cycles.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TmTable {
    values: BTreeMap<String, TmValue>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A telemetry value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TmValue {
    Number(f64),
    Bool(bool),
    Text(String),
    Array(Vec<f64>),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl TmTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the latest value published under the key.
    pub fn get(&self, key: &str) -> Option<&TmValue> {
        self.values.get(key)
    }

    /// Get the latest number published under the key.
    pub fn number(&self, key: &str) -> Option<f64> {
        match self.values.get(key) {
            Some(TmValue::Number(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl TelemetrySink for TmTable {
    fn publish(&mut self, key: &str, value: TmValue) {
        self.values.insert(key.to_string(), value);
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_tm_table() {
        let mut table = TmTable::new();
        table.publish_number("drivetrain/heading_deg", 12.0);
        table.publish_number("drivetrain/heading_deg", 13.0);
        table.publish_array("drivetrain/pose", &[1.0, 2.0, 0.5]);
        table.publish_text("sched/status", "OK");

        assert_eq!(table.len(), 3);
        assert_eq!(table.number("drivetrain/heading_deg"), Some(13.0));
        assert_eq!(table.number("sched/status"), None);

        let json = serde_json::to_string(&table).unwrap();
        assert_eq!(
            json,
            r#"{"values":{"drivetrain/heading_deg":13.0,"drivetrain/pose":[1.0,2.0,0.5],"sched/status":"OK"}}"#
        );
    }
}
