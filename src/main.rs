//! Fraud Scoring Pipeline - Serving Entry Point
//!
//! Loads the training artifacts, consumes transactions from NATS, scores
//! each one through the pipeline, replies to requesters, and publishes
//! alerts for blocked transactions.

use anyhow::{Context, Result};
use fraud_scoring_pipeline::{
    alerts::NatsAlertSink,
    config::AppConfig,
    metrics::{MetricsReporter, PipelineMetrics},
    models::store,
    persistence::SqliteResultLog,
    pipeline::ScoringPipeline,
    transport::{RecentQueryResponder, TransactionFeed},
    types::transaction::Transaction,
};
use futures::StreamExt;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("fraud_scoring_pipeline=info".parse()?),
        )
        .init();

    info!("Starting Fraud Scoring Pipeline");

    // Load configuration
    let config = AppConfig::load()?;
    info!("Configuration loaded successfully");

    // Load training artifacts. The scaler is required; scorers degrade.
    let artifacts = store::load(Path::new(&config.artifacts.dir))
        .context("startup requires the training artifacts")?;
    if artifacts.scorers.is_empty() {
        warn!(
            "No scorer artifacts loaded: every transaction will score 0.0 and be allowed. \
             Run training to restore detection."
        );
    }

    // Open the result log
    let result_log = Arc::new(SqliteResultLog::open(Path::new(
        &config.persistence.db_path,
    ))?);

    // Connect to NATS
    let client = async_nats::connect(&config.nats.url).await?;
    info!("Connected to NATS at {}", config.nats.url);

    let alert_sink = Arc::new(NatsAlertSink::new(
        client.clone(),
        &config.nats.alert_subject,
    ));

    // Assemble the pipeline
    let pipeline = Arc::new(ScoringPipeline::new(
        artifacts.scaler,
        artifacts.scorers,
        result_log.clone(),
        alert_sink,
    ));
    info!(scorers = ?pipeline.scorer_names(), "Scoring pipeline ready");

    // Metrics and periodic summary
    let metrics = Arc::new(PipelineMetrics::new());
    let metrics_clone = metrics.clone();
    tokio::spawn(async move {
        MetricsReporter::new(metrics_clone, 30).start().await;
    });

    // Recent-rows query responder for downstream consumers
    let responder = RecentQueryResponder::new(
        client.clone(),
        &config.nats.recent_subject,
        result_log.clone(),
    );
    tokio::spawn(async move {
        if let Err(e) = responder.run().await {
            error!(error = %e, "Recent-rows responder stopped");
        }
    });

    // Transaction processing loop
    let feed = TransactionFeed::new(client.clone(), &config.nats.transaction_subject);
    let mut subscription = feed.subscribe().await?;

    let num_workers = config.pipeline.workers.max(1);
    let semaphore = Arc::new(Semaphore::new(num_workers));
    info!(
        workers = num_workers,
        subject = %config.nats.transaction_subject,
        alerts = %config.nats.alert_subject,
        "Processing transactions"
    );

    while let Some(message) = subscription.next().await {
        let permit = match semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => break,
        };

        let pipeline = pipeline.clone();
        let metrics = metrics.clone();
        let client = client.clone();

        tokio::spawn(async move {
            match serde_json::from_slice::<Transaction>(&message.payload) {
                Ok(transaction) => match pipeline.score_transaction(transaction).await {
                    Ok(response) => {
                        metrics.record(response.score, response.action);

                        if let Some(reply) = message.reply {
                            match serde_json::to_vec(&response) {
                                Ok(payload) => {
                                    if let Err(e) = client.publish(reply, payload.into()).await {
                                        error!(
                                            transaction_id = %response.transaction_id,
                                            error = %e,
                                            "Failed to send scoring reply"
                                        );
                                    }
                                }
                                Err(e) => error!(error = %e, "Failed to serialize reply"),
                            }
                        }
                    }
                    Err(e) => {
                        error!(error = %e, "Scoring failed");
                    }
                },
                Err(e) => {
                    warn!(error = %e, "Failed to deserialize transaction");
                }
            }

            drop(permit);
        });
    }

    info!("Pipeline shutting down...");
    metrics.print_summary();

    Ok(())
}
