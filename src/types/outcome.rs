//! Scoring outcome types: decision, response, audit rows.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// The action taken for a scored transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Allow,
    Block,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Allow => write!(f, "allow"),
            Action::Block => write!(f, "block"),
        }
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "allow" => Ok(Action::Allow),
            "block" => Ok(Action::Block),
            other => Err(format!("unknown action: {other}")),
        }
    }
}

/// Response returned to the transport for one scored transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreResponse {
    pub transaction_id: String,
    pub timestamp: String,
    pub score: f64,
    pub action: Action,
    pub reason: String,
}

/// The durable record of one scored transaction. Written exactly once per
/// scoring call, before any alert fires, and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRow {
    pub transaction_id: String,
    pub timestamp: String,
    pub score: f64,
    pub action: Action,
    /// Full raw payload, serialized verbatim at scoring time.
    pub raw: String,
}

/// An audit row as exposed to downstream consumers, with the raw payload
/// re-parsed into JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentRow {
    pub transaction_id: String,
    pub timestamp: String,
    pub score: f64,
    pub action: Action,
    pub raw: Value,
}

impl From<&AuditRow> for RecentRow {
    fn from(row: &AuditRow) -> Self {
        let raw = serde_json::from_str(&row.raw)
            .unwrap_or_else(|_| Value::String(row.raw.clone()));
        Self {
            transaction_id: row.transaction_id.clone(),
            timestamp: row.timestamp.clone(),
            score: row.score,
            action: row.action,
            raw,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Action::Block).unwrap(), "\"block\"");
        assert_eq!(serde_json::to_string(&Action::Allow).unwrap(), "\"allow\"");
    }

    #[test]
    fn action_round_trips_through_display() {
        for action in [Action::Allow, Action::Block] {
            assert_eq!(action.to_string().parse::<Action>().unwrap(), action);
        }
    }

    #[test]
    fn recent_row_parses_raw_payload() {
        let row = AuditRow {
            transaction_id: "tx_1".into(),
            timestamp: "2024-01-01T00:00:00Z".into(),
            score: 0.25,
            action: Action::Allow,
            raw: r#"{"amount": 10}"#.into(),
        };
        let recent = RecentRow::from(&row);
        assert_eq!(recent.raw["amount"], 10);
    }
}
