//! NATS edges of the serving process: the transaction feed the scoring
//! loop consumes, and the request/reply responder that serves recent
//! audit rows to downstream consumers such as dashboards.

use crate::persistence::ResultLog;
use crate::types::outcome::RecentRow;
use anyhow::Result;
use async_nats::{Client, Subscriber};
use futures::StreamExt;
use std::sync::Arc;
use tracing::{info, warn};

/// Rows returned for a recent-rows query with no explicit count.
pub const DEFAULT_RECENT_LIMIT: usize = 50;

/// Subscription to the incoming transaction subject.
pub struct TransactionFeed {
    client: Client,
    subject: String,
}

impl TransactionFeed {
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    pub async fn subscribe(&self) -> Result<Subscriber> {
        let subscriber = self.client.subscribe(self.subject.clone()).await?;
        info!(subject = %self.subject, "Subscribed to transaction subject");
        Ok(subscriber)
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }
}

/// Answers recent-rows queries over NATS request/reply.
///
/// The request payload is either empty (default limit), a bare integer,
/// or a JSON object with an `n` field. The reply is a JSON array of
/// [`RecentRow`], most recent first.
pub struct RecentQueryResponder {
    client: Client,
    subject: String,
    log: Arc<dyn ResultLog>,
}

impl RecentQueryResponder {
    pub fn new(client: Client, subject: &str, log: Arc<dyn ResultLog>) -> Self {
        Self {
            client,
            subject: subject.to_string(),
            log,
        }
    }

    pub async fn run(self) -> Result<()> {
        let mut subscription = self.client.subscribe(self.subject.clone()).await?;
        info!(subject = %self.subject, "Answering recent-rows queries");

        while let Some(message) = subscription.next().await {
            let Some(reply) = message.reply else {
                // Nothing to reply to.
                continue;
            };

            let limit = parse_limit(&message.payload);
            let rows = match self.log.recent(limit).await {
                Ok(rows) => rows,
                Err(e) => {
                    warn!(error = %e, "Recent-rows query failed");
                    continue;
                }
            };

            let recent: Vec<RecentRow> = rows.iter().map(RecentRow::from).collect();
            match serde_json::to_vec(&recent) {
                Ok(payload) => {
                    if let Err(e) = self.client.publish(reply, payload.into()).await {
                        warn!(error = %e, "Failed to reply to recent-rows query");
                    }
                }
                Err(e) => warn!(error = %e, "Failed to serialize recent rows"),
            }
        }

        Ok(())
    }
}

fn parse_limit(payload: &[u8]) -> usize {
    let text = std::str::from_utf8(payload).unwrap_or("").trim();
    if text.is_empty() {
        return DEFAULT_RECENT_LIMIT;
    }
    if let Ok(n) = text.parse::<usize>() {
        return n;
    }
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(text) {
        if let Some(n) = value.get("n").and_then(|n| n.as_u64()) {
            return n as usize;
        }
    }
    DEFAULT_RECENT_LIMIT
}
