//! Per-feature standardization fitted at training time.

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};

/// Floor applied to the standard deviation so constant features do not
/// divide by zero.
pub const SCALE_EPSILON: f64 = 1e-9;

/// Affine per-slot normalization: `(value - mean) / max(std, ε)`.
///
/// Fitted once from the training corpus (population standard deviation,
/// i.e. divisor `n`) and persisted as a read-only JSON artifact. Serving
/// applies the same parameters to every incoming vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Vec<f64>,
    std: Vec<f64>,
}

impl StandardScaler {
    /// Fit scaling parameters from a non-empty set of feature vectors.
    pub fn fit(vectors: &[Vec<f64>]) -> Result<Self, PipelineError> {
        let Some(first) = vectors.first() else {
            return Err(PipelineError::EmptyCorpus);
        };
        let slots = first.len();
        for v in vectors {
            if v.len() != slots {
                return Err(PipelineError::SchemaMismatch {
                    expected: slots,
                    got: v.len(),
                });
            }
        }

        let n = vectors.len() as f64;
        let mut mean = vec![0.0; slots];
        for v in vectors {
            for (m, x) in mean.iter_mut().zip(v) {
                *m += x;
            }
        }
        for m in &mut mean {
            *m /= n;
        }

        let mut std = vec![0.0; slots];
        for v in vectors {
            for ((s, m), x) in std.iter_mut().zip(&mean).zip(v) {
                *s += (x - m).powi(2);
            }
        }
        for s in &mut std {
            *s = (*s / n).sqrt();
        }

        Ok(Self { mean, std })
    }

    /// Normalize one feature vector with the fitted parameters.
    ///
    /// Fails with [`PipelineError::SchemaMismatch`] if the vector length
    /// differs from the fitted slot count.
    pub fn apply(&self, vector: &[f64]) -> Result<Vec<f64>, PipelineError> {
        if vector.len() != self.mean.len() {
            return Err(PipelineError::SchemaMismatch {
                expected: self.mean.len(),
                got: vector.len(),
            });
        }

        Ok(vector
            .iter()
            .zip(self.mean.iter().zip(&self.std))
            .map(|(x, (m, s))| (x - m) / s.max(SCALE_EPSILON))
            .collect())
    }

    /// Number of feature slots the scaler was fitted for.
    pub fn slots(&self) -> usize {
        self.mean.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Vec<Vec<f64>> {
        vec![
            vec![10.0, 1.0, 0.0],
            vec![20.0, 2.0, 0.0],
            vec![30.0, 3.0, 0.0],
            vec![40.0, 4.0, 0.0],
        ]
    }

    #[test]
    fn fitting_an_empty_corpus_fails() {
        assert!(matches!(
            StandardScaler::fit(&[]),
            Err(PipelineError::EmptyCorpus)
        ));
    }

    #[test]
    fn normalized_corpus_has_zero_mean_unit_std() {
        let corpus = corpus();
        let scaler = StandardScaler::fit(&corpus).unwrap();

        let scaled: Vec<Vec<f64>> = corpus
            .iter()
            .map(|v| scaler.apply(v).unwrap())
            .collect();

        for slot in 0..2 {
            let n = scaled.len() as f64;
            let mean: f64 = scaled.iter().map(|v| v[slot]).sum::<f64>() / n;
            let var: f64 = scaled.iter().map(|v| (v[slot] - mean).powi(2)).sum::<f64>() / n;

            assert!(mean.abs() < 1e-9, "slot {slot} mean {mean}");
            assert!((var.sqrt() - 1.0).abs() < 1e-9, "slot {slot} std {}", var.sqrt());
        }
    }

    #[test]
    fn constant_feature_scales_without_dividing_by_zero() {
        let corpus = corpus();
        let scaler = StandardScaler::fit(&corpus).unwrap();
        let scaled = scaler.apply(&corpus[0]).unwrap();

        assert!(scaled[2].is_finite());
        assert_eq!(scaled[2], 0.0);
    }

    #[test]
    fn length_mismatch_is_rejected() {
        let scaler = StandardScaler::fit(&corpus()).unwrap();
        let err = scaler.apply(&[1.0, 2.0]).unwrap_err();

        assert!(matches!(
            err,
            PipelineError::SchemaMismatch { expected: 3, got: 2 }
        ));
    }

    #[test]
    fn json_round_trip_preserves_behavior() {
        let corpus = corpus();
        let scaler = StandardScaler::fit(&corpus).unwrap();
        let json = serde_json::to_string(&scaler).unwrap();
        let restored: StandardScaler = serde_json::from_str(&json).unwrap();

        assert_eq!(
            scaler.apply(&corpus[1]).unwrap(),
            restored.apply(&corpus[1]).unwrap()
        );
    }
}
