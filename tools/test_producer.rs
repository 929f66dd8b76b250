//! Test Transaction Producer
//!
//! Generates synthetic transactions and sends them to the scoring
//! pipeline over NATS request/reply, printing the decisions that come
//! back. Useful for exercising a running pipeline end to end.
//!
//! Usage: test_producer [nats-url] [subject] [count] [fraud-rate] [delay-ms]

use chrono::Utc;
use fraud_scoring_pipeline::types::outcome::ScoreResponse;
use fraud_scoring_pipeline::types::transaction::Transaction;
use rand::Rng;
use serde_json::Value;
use std::time::Duration;
use tracing::{info, warn};

/// Synthetic transaction generator.
struct TransactionGenerator {
    rng: rand::rngs::ThreadRng,
    counter: u64,
}

impl TransactionGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
            counter: 0,
        }
    }

    /// An ordinary low-risk transaction.
    fn generate_legitimate(&mut self) -> Transaction {
        self.counter += 1;
        let mut tx = Transaction::from_fields([
            ("amount", Value::from(self.rng.gen_range(10.0..500.0))),
            ("velocity_1h", Value::from(self.rng.gen_range(0..3))),
            (
                "is_international",
                Value::from(if self.rng.gen_bool(0.1) { 1 } else { 0 }),
            ),
            (
                "card_present",
                Value::from(if self.rng.gen_bool(0.6) { 1 } else { 0 }),
            ),
            ("device_type", Value::from(self.rng.gen_range(0..3))),
            (
                "merchant_id",
                Value::from(format!("merchant_{}", self.rng.gen_range(1..1000))),
            ),
            ("currency", Value::from(self.random_choice(&["USD", "EUR", "GBP"]))),
            ("country", Value::from(self.random_choice(&["US", "UK", "DE", "FR"]))),
        ]);
        tx.transaction_id = Some(format!("tx_{:012}", self.counter));
        tx.timestamp = Some(Utc::now().to_rfc3339());
        tx
    }

    /// A transaction shaped like card-testing fraud: large amount, high
    /// velocity, card absent, unusual device.
    fn generate_suspicious(&mut self) -> Transaction {
        self.counter += 1;
        let mut tx = Transaction::from_fields([
            ("amount", Value::from(self.rng.gen_range(2000.0..9000.0))),
            ("velocity_1h", Value::from(self.rng.gen_range(8..20))),
            ("is_international", Value::from(1)),
            ("card_present", Value::from(0)),
            ("device_type", Value::from(self.rng.gen_range(3..6))),
            (
                "merchant_id",
                Value::from(format!("merchant_{}", self.rng.gen_range(1..1000))),
            ),
            ("currency", Value::from(self.random_choice(&["USD", "EUR"]))),
            ("country", Value::from(self.random_choice(&["RU", "CN", "US"]))),
        ]);
        tx.transaction_id = Some(format!("tx_{:012}", self.counter));
        tx.timestamp = Some(Utc::now().to_rfc3339());
        tx
    }

    fn random_choice<'a>(&mut self, choices: &[&'a str]) -> &'a str {
        choices[self.rng.gen_range(0..choices.len())]
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("test_producer=info".parse()?),
        )
        .init();

    info!("Starting Test Transaction Producer");

    let args: Vec<String> = std::env::args().collect();
    let nats_url = args.get(1).map(|s| s.as_str()).unwrap_or("nats://localhost:4222");
    let subject = args.get(2).map(|s| s.as_str()).unwrap_or("transactions");
    let count: u64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(100);
    let fraud_rate: f64 = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(0.1);
    let delay_ms: u64 = args.get(5).and_then(|s| s.parse().ok()).unwrap_or(100);

    info!(
        nats_url = %nats_url,
        subject = %subject,
        count = count,
        fraud_rate = fraud_rate,
        delay_ms = delay_ms,
        "Configuration loaded"
    );

    let client = match async_nats::connect(nats_url).await {
        Ok(c) => {
            info!("Connected to NATS");
            c
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect to NATS. Running in dry-run mode.");
            return run_dry_mode(count, fraud_rate, delay_ms).await;
        }
    };

    let mut generator = TransactionGenerator::new();
    let mut rng = rand::thread_rng();
    let mut blocked = 0u64;

    for i in 0..count {
        let transaction = if rng.gen_bool(fraud_rate) {
            generator.generate_suspicious()
        } else {
            generator.generate_legitimate()
        };

        let payload = serde_json::to_vec(&transaction)?;
        match client.request(subject.to_string(), payload.into()).await {
            Ok(reply) => match serde_json::from_slice::<ScoreResponse>(&reply.payload) {
                Ok(response) => {
                    if response.action == fraud_scoring_pipeline::types::outcome::Action::Block {
                        blocked += 1;
                    }
                    info!(
                        transaction_id = %response.transaction_id,
                        score = response.score,
                        action = ?response.action,
                        "Scored"
                    );
                }
                Err(e) => warn!(error = %e, "Unparseable scoring reply"),
            },
            Err(e) => warn!(error = %e, "Scoring request failed"),
        }

        if (i + 1) % 10 == 0 {
            info!("Sent {}/{} transactions ({} blocked so far)", i + 1, count, blocked);
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    info!("Completed! Sent {} transactions, {} blocked", count, blocked);
    Ok(())
}

async fn run_dry_mode(count: u64, fraud_rate: f64, delay_ms: u64) -> anyhow::Result<()> {
    info!("Running in dry-run mode (no NATS connection)");

    let mut generator = TransactionGenerator::new();
    let mut rng = rand::thread_rng();

    for i in 0..count {
        let transaction = if rng.gen_bool(fraud_rate) {
            generator.generate_suspicious()
        } else {
            generator.generate_legitimate()
        };

        let json = serde_json::to_string_pretty(&transaction)?;
        if (i + 1) % 10 == 0 || i == 0 {
            info!("Sample transaction {}:\n{}", i + 1, json);
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    Ok(())
}
