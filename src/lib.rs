//! Fraud Scoring Pipeline Library
//!
//! Scores incoming transactions against an anomaly-detection ensemble,
//! records every decision in an append-only result log, and raises alerts
//! for blocked transactions.

pub mod alerts;
pub mod config;
pub mod error;
pub mod features;
pub mod metrics;
pub mod models;
pub mod persistence;
pub mod pipeline;
pub mod scaler;
pub mod schema;
pub mod transport;
pub mod types;

pub use alerts::AlertSink;
pub use config::AppConfig;
pub use error::PipelineError;
pub use features::FeatureExtractor;
pub use models::AnomalyScorer;
pub use persistence::ResultLog;
pub use pipeline::ScoringPipeline;
pub use scaler::StandardScaler;
pub use types::outcome::{Action, ScoreResponse};
pub use types::transaction::Transaction;
