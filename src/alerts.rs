//! Alert sink: side-channel notification for blocked transactions.

use crate::types::alert::BlockAlert;
use anyhow::Result;
use async_nats::Client;
use async_trait::async_trait;
use tracing::{debug, warn};

/// Port for block notifications. Fire-and-forget: the pipeline reports a
/// delivery failure but the decision and audit row stand regardless.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn notify(&self, transaction_id: &str, reason: &str) -> Result<()>;
}

/// Publishes [`BlockAlert`] messages to a NATS subject.
#[derive(Clone)]
pub struct NatsAlertSink {
    client: Client,
    subject: String,
}

impl NatsAlertSink {
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }
}

#[async_trait]
impl AlertSink for NatsAlertSink {
    async fn notify(&self, transaction_id: &str, reason: &str) -> Result<()> {
        let alert = BlockAlert::new(transaction_id, reason);
        let payload = serde_json::to_vec(&alert)?;

        self.client
            .publish(self.subject.clone(), payload.into())
            .await?;

        debug!(
            alert_id = %alert.alert_id,
            transaction_id = %alert.transaction_id,
            reason = %alert.reason,
            "Published block alert"
        );
        Ok(())
    }
}

/// Log-only sink for local runs without a delivery channel.
#[derive(Default)]
pub struct LogAlertSink;

impl LogAlertSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AlertSink for LogAlertSink {
    async fn notify(&self, transaction_id: &str, reason: &str) -> Result<()> {
        warn!(
            transaction_id = %transaction_id,
            reason = %reason,
            "Transaction blocked"
        );
        Ok(())
    }
}
