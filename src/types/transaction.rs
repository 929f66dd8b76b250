//! Incoming transaction records.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A raw transaction as received from the transport.
///
/// Only `transaction_id` and `timestamp` are known by name; everything else
/// arrives as arbitrary JSON fields. Scoring reads the schema slots out of
/// `fields`; unknown fields are preserved untouched so the audit row keeps
/// the payload verbatim.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,

    /// All remaining fields, schema-relevant or not.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Transaction {
    /// Build a transaction from name/value pairs. Test and tooling helper.
    pub fn from_fields<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let mut fields = Map::new();
        for (k, v) in pairs {
            fields.insert(k.into(), v);
        }
        Self {
            transaction_id: None,
            timestamp: None,
            fields,
        }
    }
}
