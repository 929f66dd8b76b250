//! Block alert message.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Alert raised for a blocked transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockAlert {
    /// Unique alert identifier
    pub alert_id: String,

    /// Associated transaction ID
    pub transaction_id: String,

    /// Short human-readable reason, e.g. `score=0.842`
    pub reason: String,

    /// Alert generation timestamp
    pub timestamp: String,
}

impl BlockAlert {
    pub fn new(transaction_id: &str, reason: &str) -> Self {
        Self {
            alert_id: uuid::Uuid::new_v4().to_string(),
            transaction_id: transaction_id.to_string(),
            reason: reason.to_string(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}
