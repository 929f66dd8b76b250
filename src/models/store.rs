//! Artifact persistence: JSON documents written by training and loaded
//! read-only at serving start.

use crate::models::{AnomalyScorer, Autoencoder, IsolationForest};
use crate::scaler::StandardScaler;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::path::Path;
use tracing::{info, warn};

pub const SCALER_FILE: &str = "scaler.json";
pub const ISOLATION_FOREST_FILE: &str = "isolation_forest.json";
pub const AUTOENCODER_FILE: &str = "autoencoder.json";

/// Everything serving needs from the artifacts directory.
pub struct LoadedArtifacts {
    pub scaler: StandardScaler,
    pub scorers: Vec<Box<dyn AnomalyScorer>>,
}

/// Load the serving artifacts from a directory.
///
/// The scaler is required and a missing or unreadable file is a hard
/// startup error. Each scorer is optional: a missing or unreadable scorer
/// artifact is logged and skipped, leaving the pipeline to run degraded.
pub fn load(dir: &Path) -> Result<LoadedArtifacts> {
    let scaler_path = dir.join(SCALER_FILE);
    let scaler: StandardScaler = read_json(&scaler_path).with_context(|| {
        format!(
            "required scaler artifact at {} is missing or unreadable; run training first",
            scaler_path.display()
        )
    })?;
    info!(path = %scaler_path.display(), slots = scaler.slots(), "Loaded scaler");

    let mut scorers: Vec<Box<dyn AnomalyScorer>> = Vec::new();

    match read_json::<IsolationForest>(&dir.join(ISOLATION_FOREST_FILE)) {
        Ok(model) => {
            info!(scorer = model.name(), "Loaded scorer artifact");
            scorers.push(Box::new(model));
        }
        Err(e) => warn!(error = %e, file = ISOLATION_FOREST_FILE, "Scorer artifact unavailable, skipping"),
    }

    match read_json::<Autoencoder>(&dir.join(AUTOENCODER_FILE)) {
        Ok(model) => {
            info!(scorer = model.name(), "Loaded scorer artifact");
            scorers.push(Box::new(model));
        }
        Err(e) => warn!(error = %e, file = AUTOENCODER_FILE, "Scorer artifact unavailable, skipping"),
    }

    info!(count = scorers.len(), "Artifacts loaded from {}", dir.display());
    Ok(LoadedArtifacts { scaler, scorers })
}

/// Write one artifact as pretty-printed JSON, creating the directory if
/// needed.
pub fn save<T: Serialize>(dir: &Path, filename: &str, value: &T) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create artifacts dir {}", dir.display()))?;
    let path = dir.join(filename);
    let file = File::create(&path)
        .with_context(|| format!("failed to create artifact file {}", path.display()))?;
    serde_json::to_writer_pretty(file, value)
        .with_context(|| format!("failed to write artifact {}", path.display()))?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file =
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    serde_json::from_reader(file)
        .with_context(|| format!("failed to parse {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::isolation_forest::IsolationForestConfig;

    fn fitted_scaler() -> StandardScaler {
        StandardScaler::fit(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap()
    }

    #[test]
    fn missing_scaler_is_a_hard_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(dir.path()).is_err());
    }

    #[test]
    fn scaler_alone_loads_with_zero_scorers() {
        let dir = tempfile::tempdir().unwrap();
        save(dir.path(), SCALER_FILE, &fitted_scaler()).unwrap();

        let artifacts = load(dir.path()).unwrap();
        assert_eq!(artifacts.scaler.slots(), 2);
        assert!(artifacts.scorers.is_empty());
    }

    #[test]
    fn present_scorer_artifacts_are_loaded() {
        let dir = tempfile::tempdir().unwrap();
        save(dir.path(), SCALER_FILE, &fitted_scaler()).unwrap();

        let data = vec![vec![0.0, 0.0], vec![0.1, 0.1], vec![5.0, 5.0]];
        let forest = IsolationForest::fit(&data, &IsolationForestConfig::default()).unwrap();
        save(dir.path(), ISOLATION_FOREST_FILE, &forest).unwrap();

        let artifacts = load(dir.path()).unwrap();
        assert_eq!(artifacts.scorers.len(), 1);
        assert_eq!(artifacts.scorers[0].name(), "isolation_forest");
    }

    #[test]
    fn corrupt_scorer_artifact_degrades_instead_of_failing() {
        let dir = tempfile::tempdir().unwrap();
        save(dir.path(), SCALER_FILE, &fitted_scaler()).unwrap();
        std::fs::write(dir.path().join(AUTOENCODER_FILE), b"not json").unwrap();

        let artifacts = load(dir.path()).unwrap();
        assert!(artifacts.scorers.is_empty());
    }
}
