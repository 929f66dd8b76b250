//! Training Entry Point
//!
//! Fits the scaler and both anomaly scorers on a historical transaction
//! CSV and writes the serving artifacts.
//!
//! Usage: train <data.csv> [artifacts-dir]

use anyhow::{bail, Context, Result};
use fraud_scoring_pipeline::{
    features::FeatureExtractor,
    models::{
        autoencoder::{Autoencoder, AutoencoderConfig},
        isolation_forest::{IsolationForest, IsolationForestConfig},
        store,
    },
    scaler::StandardScaler,
    schema::FEATURE_SCHEMA,
    types::transaction::Transaction,
};
use serde_json::Value;
use std::path::Path;
use tracing::info;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("train=info".parse()?),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let Some(data_path) = args.get(1) else {
        bail!("usage: train <data.csv> [artifacts-dir]");
    };
    let out_dir = args.get(2).map(|s| s.as_str()).unwrap_or("artifacts");
    let out_dir = Path::new(out_dir);

    let records = load_csv(Path::new(data_path))?;
    info!(rows = records.len(), "Loaded training corpus");

    let extractor = FeatureExtractor::new();
    let vectors: Vec<Vec<f64>> = records.iter().map(|r| extractor.extract(r)).collect();

    let scaler = StandardScaler::fit(&vectors)?;
    let scaled: Vec<Vec<f64>> = vectors
        .iter()
        .map(|v| scaler.apply(v))
        .collect::<Result<_, _>>()?;
    store::save(out_dir, store::SCALER_FILE, &scaler)?;
    info!("Saved scaler");

    let forest = IsolationForest::fit(&scaled, &IsolationForestConfig::default())?;
    store::save(out_dir, store::ISOLATION_FOREST_FILE, &forest)?;
    info!("Saved isolation forest");

    let autoencoder = Autoencoder::fit(&scaled, &AutoencoderConfig::default())?;
    store::save(out_dir, store::AUTOENCODER_FILE, &autoencoder)?;
    info!("Saved autoencoder");

    info!(dir = %out_dir.display(), "Training complete");
    Ok(())
}

/// Read a headered CSV into transaction records. Every cell arrives as a
/// string; the extractor's coercion turns schema columns into numbers the
/// same way it does at serving time.
fn load_csv(path: &Path) -> Result<Vec<Transaction>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read training data at {}", path.display()))?;
    let mut lines = content.lines();

    let Some(header) = lines.next() else {
        bail!("training CSV at {} is empty", path.display());
    };
    let columns: Vec<&str> = header.split(',').map(|c| c.trim()).collect();

    let missing: Vec<&str> = FEATURE_SCHEMA
        .iter()
        .filter(|c| !columns.contains(c))
        .copied()
        .collect();
    if !missing.is_empty() {
        bail!("training CSV is missing required columns: {missing:?}");
    }

    let mut records = Vec::new();
    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let cells = line.split(',').map(|c| c.trim());
        let record = Transaction::from_fields(
            columns
                .iter()
                .zip(cells)
                .map(|(col, cell)| (col.to_string(), Value::String(cell.to_string()))),
        );
        records.push(record);
    }

    if records.is_empty() {
        bail!("training CSV at {} has a header but no rows", path.display());
    }
    Ok(records)
}
