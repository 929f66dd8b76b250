//! Feature extraction for transaction scoring.
//!
//! Turns a sparse transaction record into the fixed-order numeric vector
//! the models were trained on. Extraction is total: a missing field or a
//! value that cannot be read as a number contributes `0.0` instead of an
//! error, so any payload the transport hands over can be scored.

use crate::schema::{FEATURE_COUNT, FEATURE_SCHEMA};
use crate::types::transaction::Transaction;
use serde_json::Value;

/// Feature extractor that transforms transactions into model input vectors.
///
/// Vector positions follow [`FEATURE_SCHEMA`] exactly; training and serving
/// share the constant, so the order cannot drift between them.
pub struct FeatureExtractor;

impl FeatureExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract the schema features from a transaction.
    ///
    /// Returns a vector of length [`FEATURE_COUNT`], one slot per schema
    /// entry, in schema order.
    pub fn extract(&self, tx: &Transaction) -> Vec<f64> {
        FEATURE_SCHEMA
            .iter()
            .map(|name| tx.fields.get(*name).and_then(coerce).unwrap_or(0.0))
            .collect()
    }

    /// Number of features produced.
    pub fn feature_count(&self) -> usize {
        FEATURE_COUNT
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Read a JSON value as a number where possible.
///
/// Numbers pass through, numeric strings are parsed, booleans map to
/// 1.0/0.0. Everything else (null, arrays, objects, non-numeric strings)
/// yields `None` and falls back to the zero default.
fn coerce(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tx(raw: Value) -> Transaction {
        serde_json::from_value(raw).unwrap()
    }

    #[test]
    fn empty_record_extracts_all_zeros() {
        let extractor = FeatureExtractor::new();
        let features = extractor.extract(&Transaction::default());

        assert_eq!(features, vec![0.0; FEATURE_COUNT]);
    }

    #[test]
    fn values_land_in_schema_order() {
        let extractor = FeatureExtractor::new();
        let features = extractor.extract(&tx(json!({
            "amount": 500,
            "velocity_1h": 2,
            "is_international": 0,
            "card_present": 1,
            "device_type": 1
        })));

        assert_eq!(features, vec![500.0, 2.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn non_numeric_value_becomes_zero_without_touching_others() {
        let extractor = FeatureExtractor::new();
        let features = extractor.extract(&tx(json!({
            "amount": "not-a-number",
            "velocity_1h": 3
        })));

        assert_eq!(features[0], 0.0);
        assert_eq!(features[1], 3.0);
    }

    #[test]
    fn numeric_strings_and_booleans_are_coerced() {
        let extractor = FeatureExtractor::new();
        let features = extractor.extract(&tx(json!({
            "amount": "120.5",
            "card_present": true,
            "is_international": false
        })));

        assert_eq!(features[0], 120.5);
        assert_eq!(features[2], 0.0);
        assert_eq!(features[3], 1.0);
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let extractor = FeatureExtractor::new();
        let features = extractor.extract(&tx(json!({
            "amount": 10,
            "merchant": "acme",
            "extra": {"deep": true}
        })));

        assert_eq!(features.len(), FEATURE_COUNT);
        assert_eq!(features[0], 10.0);
    }
}
