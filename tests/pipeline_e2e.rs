//! End-to-end pipeline tests with in-memory collaborators.

use anyhow::Result;
use async_trait::async_trait;
use fraud_scoring_pipeline::alerts::AlertSink;
use fraud_scoring_pipeline::error::PipelineError;
use fraud_scoring_pipeline::models::autoencoder::{Autoencoder, AutoencoderConfig};
use fraud_scoring_pipeline::models::isolation_forest::{IsolationForest, IsolationForestConfig};
use fraud_scoring_pipeline::models::AnomalyScorer;
use fraud_scoring_pipeline::persistence::{MemoryResultLog, ResultLog};
use fraud_scoring_pipeline::pipeline::ScoringPipeline;
use fraud_scoring_pipeline::scaler::StandardScaler;
use fraud_scoring_pipeline::types::outcome::{Action, AuditRow};
use fraud_scoring_pipeline::types::transaction::Transaction;
use fraud_scoring_pipeline::FeatureExtractor;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

/// Scorer emitting a fixed signal, for exercising the blend/decide path.
struct ConstantScorer(f64);

impl AnomalyScorer for ConstantScorer {
    fn name(&self) -> &'static str {
        "constant"
    }

    fn signal(&self, _scaled: &[f64]) -> f64 {
        self.0
    }
}

/// Alert sink that records every notification.
#[derive(Default)]
struct RecordingAlertSink {
    calls: Mutex<Vec<(String, String)>>,
}

impl RecordingAlertSink {
    fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AlertSink for RecordingAlertSink {
    async fn notify(&self, transaction_id: &str, reason: &str) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push((transaction_id.to_string(), reason.to_string()));
        Ok(())
    }
}

/// Alert sink whose delivery always fails.
struct FailingAlertSink;

#[async_trait]
impl AlertSink for FailingAlertSink {
    async fn notify(&self, _transaction_id: &str, _reason: &str) -> Result<()> {
        anyhow::bail!("alert channel down")
    }
}

/// Result log whose writes always fail.
struct FailingResultLog;

#[async_trait]
impl ResultLog for FailingResultLog {
    async fn append(&self, _row: &AuditRow) -> Result<()> {
        anyhow::bail!("disk full")
    }

    async fn recent(&self, _limit: usize) -> Result<Vec<AuditRow>> {
        Ok(Vec::new())
    }
}

fn fitted_scaler() -> StandardScaler {
    StandardScaler::fit(&[
        vec![100.0, 1.0, 0.0, 1.0, 0.0],
        vec![250.0, 2.0, 0.0, 1.0, 1.0],
        vec![400.0, 3.0, 1.0, 0.0, 2.0],
    ])
    .unwrap()
}

fn sample_record() -> Transaction {
    serde_json::from_value(json!({
        "amount": 500,
        "velocity_1h": 2,
        "is_international": 0,
        "card_present": 1,
        "device_type": 1
    }))
    .unwrap()
}

fn pipeline_with(
    scorers: Vec<Box<dyn AnomalyScorer>>,
    log: Arc<MemoryResultLog>,
    alerts: Arc<RecordingAlertSink>,
) -> ScoringPipeline {
    ScoringPipeline::new(fitted_scaler(), scorers, log, alerts)
}

#[tokio::test]
async fn zero_scorers_allow_everything_with_score_zero() {
    let log = Arc::new(MemoryResultLog::new());
    let alerts = Arc::new(RecordingAlertSink::default());
    let pipeline = pipeline_with(Vec::new(), log.clone(), alerts.clone());

    let response = pipeline.score_transaction(sample_record()).await.unwrap();

    assert_eq!(response.score, 0.0);
    assert_eq!(response.action, Action::Allow);
    assert_eq!(response.reason, "score=0.000");
    assert_eq!(log.len(), 1);
    assert!(alerts.calls().is_empty());
}

#[tokio::test]
async fn missing_ids_are_generated_fresh_per_call() {
    let log = Arc::new(MemoryResultLog::new());
    let alerts = Arc::new(RecordingAlertSink::default());
    let pipeline = pipeline_with(Vec::new(), log.clone(), alerts);

    let first = pipeline.score_transaction(sample_record()).await.unwrap();
    let second = pipeline.score_transaction(sample_record()).await.unwrap();

    assert_ne!(first.transaction_id, second.transaction_id);
    assert!(!first.transaction_id.is_empty());
    assert!(!first.timestamp.is_empty());

    let rows = log.recent(10).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].transaction_id, second.transaction_id);
    assert_eq!(rows[1].transaction_id, first.transaction_id);
}

#[tokio::test]
async fn provided_id_and_timestamp_are_preserved() {
    let log = Arc::new(MemoryResultLog::new());
    let alerts = Arc::new(RecordingAlertSink::default());
    let pipeline = pipeline_with(Vec::new(), log.clone(), alerts);

    let mut record = sample_record();
    record.transaction_id = Some("tx_fixed".to_string());
    record.timestamp = Some("2024-06-01T12:00:00Z".to_string());

    let response = pipeline.score_transaction(record).await.unwrap();
    assert_eq!(response.transaction_id, "tx_fixed");
    assert_eq!(response.timestamp, "2024-06-01T12:00:00Z");

    let rows = log.recent(1).await.unwrap();
    assert_eq!(rows[0].transaction_id, "tx_fixed");
    assert_eq!(rows[0].timestamp, "2024-06-01T12:00:00Z");
}

#[tokio::test]
async fn flagging_scorer_alone_blocks_and_alerts_with_formatted_score() {
    let log = Arc::new(MemoryResultLog::new());
    let alerts = Arc::new(RecordingAlertSink::default());
    let pipeline = pipeline_with(
        vec![Box::new(ConstantScorer(1.0))],
        log.clone(),
        alerts.clone(),
    );

    let response = pipeline.score_transaction(sample_record()).await.unwrap();

    assert_eq!(response.score, 1.0);
    assert_eq!(response.action, Action::Block);
    assert_eq!(log.len(), 1);

    let calls = alerts.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, response.transaction_id);
    assert_eq!(calls[0].1, "score=1.000");
}

#[tokio::test]
async fn two_scorers_blend_to_the_mean() {
    let log = Arc::new(MemoryResultLog::new());
    let alerts = Arc::new(RecordingAlertSink::default());
    let pipeline = pipeline_with(
        vec![Box::new(ConstantScorer(1.0)), Box::new(ConstantScorer(0.0))],
        log,
        alerts.clone(),
    );

    let response = pipeline.score_transaction(sample_record()).await.unwrap();

    assert_eq!(response.score, 0.5);
    assert_eq!(response.action, Action::Allow);
    assert!(alerts.calls().is_empty());
}

#[tokio::test]
async fn alert_failure_leaves_decision_and_audit_row_intact() {
    let log = Arc::new(MemoryResultLog::new());
    let pipeline = ScoringPipeline::new(
        fitted_scaler(),
        vec![Box::new(ConstantScorer(1.0))],
        log.clone(),
        Arc::new(FailingAlertSink),
    );

    let response = pipeline.score_transaction(sample_record()).await.unwrap();

    assert_eq!(response.action, Action::Block);
    assert_eq!(log.len(), 1);
}

#[tokio::test]
async fn persistence_failure_propagates_and_no_alert_fires() {
    let alerts = Arc::new(RecordingAlertSink::default());
    let pipeline = ScoringPipeline::new(
        fitted_scaler(),
        vec![Box::new(ConstantScorer(1.0))],
        Arc::new(FailingResultLog),
        alerts.clone(),
    );

    let err = pipeline.score_transaction(sample_record()).await.unwrap_err();

    assert!(matches!(err, PipelineError::Persistence(_)));
    assert!(alerts.calls().is_empty());
}

#[tokio::test]
async fn audit_row_keeps_the_raw_payload_verbatim() {
    let log = Arc::new(MemoryResultLog::new());
    let alerts = Arc::new(RecordingAlertSink::default());
    let pipeline = pipeline_with(Vec::new(), log.clone(), alerts);

    let record: Transaction = serde_json::from_value(json!({
        "amount": 42,
        "merchant": "acme",
        "metadata": {"channel": "web"}
    }))
    .unwrap();

    pipeline.score_transaction(record).await.unwrap();

    let rows = log.recent(1).await.unwrap();
    let raw: Value = serde_json::from_str(&rows[0].raw).unwrap();
    assert_eq!(raw["merchant"], "acme");
    assert_eq!(raw["metadata"]["channel"], "web");
}

/// Full loop with artifacts actually fitted on a synthetic corpus: the
/// ensemble should rank an obviously fraudulent record above an ordinary
/// one and let the ordinary one through.
#[tokio::test]
async fn trained_ensemble_ranks_fraud_above_normal() {
    let extractor = FeatureExtractor::new();

    let corpus: Vec<Transaction> = (0..80)
        .map(|i| {
            serde_json::from_value(json!({
                "amount": 50.0 + (i % 11) as f64 * 20.0,
                "velocity_1h": (i % 3),
                "is_international": 0,
                "card_present": 1,
                "device_type": (i % 2)
            }))
            .unwrap()
        })
        .collect();

    let vectors: Vec<Vec<f64>> = corpus.iter().map(|t| extractor.extract(t)).collect();
    let scaler = StandardScaler::fit(&vectors).unwrap();
    let scaled: Vec<Vec<f64>> = vectors.iter().map(|v| scaler.apply(v).unwrap()).collect();

    let forest = IsolationForest::fit(&scaled, &IsolationForestConfig::default()).unwrap();
    let autoencoder = Autoencoder::fit(
        &scaled,
        &AutoencoderConfig {
            epochs: 60,
            ..AutoencoderConfig::default()
        },
    )
    .unwrap();

    let log = Arc::new(MemoryResultLog::new());
    let alerts = Arc::new(RecordingAlertSink::default());
    let pipeline = ScoringPipeline::new(
        scaler,
        vec![Box::new(forest), Box::new(autoencoder)],
        log.clone(),
        alerts,
    );

    let normal: Transaction = serde_json::from_value(json!({
        "amount": 120.0,
        "velocity_1h": 1,
        "is_international": 0,
        "card_present": 1,
        "device_type": 0
    }))
    .unwrap();
    let fraud: Transaction = serde_json::from_value(json!({
        "amount": 9500.0,
        "velocity_1h": 40,
        "is_international": 1,
        "card_present": 0,
        "device_type": 7
    }))
    .unwrap();

    let normal_response = pipeline.score_transaction(normal).await.unwrap();
    let fraud_response = pipeline.score_transaction(fraud).await.unwrap();

    assert_eq!(normal_response.action, Action::Allow);
    assert!(fraud_response.score > normal_response.score);
    assert_eq!(log.len(), 2);
}
