//! End-to-end scoring pipeline.
//!
//! One call takes a raw transaction through feature extraction, scaling,
//! the loaded anomaly scorers, score blending, and the decision policy,
//! then writes the audit row and — for blocks — raises an alert. The
//! pipeline is built once at startup from loaded artifacts and injected
//! collaborator ports, holds no mutable state, and can be shared across
//! concurrent tasks behind an `Arc`.

use crate::alerts::AlertSink;
use crate::error::PipelineError;
use crate::features::FeatureExtractor;
use crate::models::blend::blend;
use crate::models::AnomalyScorer;
use crate::persistence::ResultLog;
use crate::scaler::StandardScaler;
use crate::types::outcome::{Action, AuditRow, ScoreResponse};
use crate::types::transaction::Transaction;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error};
use uuid::Uuid;

/// Risk score at or above which a transaction is blocked.
pub const BLOCK_THRESHOLD: f64 = 0.7;

/// Map a blended risk score to an action. Pure, total over [0, 1].
pub fn decide(score: f64) -> Action {
    if score >= BLOCK_THRESHOLD {
        Action::Block
    } else {
        Action::Allow
    }
}

/// The scoring pipeline with its injected collaborators.
pub struct ScoringPipeline {
    extractor: FeatureExtractor,
    scaler: StandardScaler,
    scorers: Vec<Box<dyn AnomalyScorer>>,
    result_log: Arc<dyn ResultLog>,
    alert_sink: Arc<dyn AlertSink>,
}

impl ScoringPipeline {
    pub fn new(
        scaler: StandardScaler,
        scorers: Vec<Box<dyn AnomalyScorer>>,
        result_log: Arc<dyn ResultLog>,
        alert_sink: Arc<dyn AlertSink>,
    ) -> Self {
        Self {
            extractor: FeatureExtractor::new(),
            scaler,
            scorers,
            result_log,
            alert_sink,
        }
    }

    /// Names of the loaded scorers, for startup logging.
    pub fn scorer_names(&self) -> Vec<&'static str> {
        self.scorers.iter().map(|s| s.name()).collect()
    }

    /// Score one transaction end to end.
    ///
    /// Assigns the transaction id and timestamp if absent, computes the
    /// blended risk score and decision, appends the audit row, and raises
    /// an alert when blocked. The audit write must succeed before any
    /// alert fires; a persistence failure propagates and the transaction
    /// is not considered scored. An alert delivery failure is reported
    /// but leaves the decision and the response intact.
    pub async fn score_transaction(
        &self,
        raw: Transaction,
    ) -> Result<ScoreResponse, PipelineError> {
        let transaction_id = raw
            .transaction_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let timestamp = raw
            .timestamp
            .clone()
            .unwrap_or_else(|| Utc::now().to_rfc3339());

        let features = self.extractor.extract(&raw);
        let scaled = self.scaler.apply(&features)?;

        let signals: Vec<f64> = self.scorers.iter().map(|s| s.signal(&scaled)).collect();
        let score = blend(&signals);
        let action = decide(score);
        let reason = format!("score={score:.3}");

        debug!(
            transaction_id = %transaction_id,
            risk_score = score,
            action = %action,
            scorers = signals.len(),
            "Transaction scored"
        );

        let row = AuditRow {
            transaction_id: transaction_id.clone(),
            timestamp: timestamp.clone(),
            score,
            action,
            raw: serde_json::to_string(&raw)?,
        };
        self.result_log
            .append(&row)
            .await
            .map_err(PipelineError::Persistence)?;

        if action == Action::Block {
            if let Err(e) = self.alert_sink.notify(&transaction_id, &reason).await {
                error!(
                    transaction_id = %transaction_id,
                    error = %e,
                    "Alert delivery failed; decision stands"
                );
            }
        }

        Ok(ScoreResponse {
            transaction_id,
            timestamp,
            score,
            action,
            reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_is_inclusive_on_the_block_side() {
        assert_eq!(decide(0.69), Action::Allow);
        assert_eq!(decide(0.70), Action::Block);
    }

    #[test]
    fn extremes_decide_cleanly() {
        assert_eq!(decide(0.0), Action::Allow);
        assert_eq!(decide(1.0), Action::Block);
    }
}
