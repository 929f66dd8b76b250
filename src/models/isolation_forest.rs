//! Tree-ensemble outlier detector.
//!
//! Unsupervised isolation forest: each tree recursively partitions a
//! random subsample with random axis-aligned splits, and points that end
//! up isolated after few splits are scored as anomalous. The flag cutoff
//! is fixed at fit time from the contamination quantile of the training
//! scores, so serving produces a binary signal per vector.

use crate::error::PipelineError;
use crate::models::AnomalyScorer;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Fitting parameters. Serving reads none of these; they only shape the
/// artifact produced by training.
#[derive(Debug, Clone)]
pub struct IsolationForestConfig {
    pub n_trees: usize,
    pub max_samples: usize,
    /// Expected fraction of outliers in the training corpus; sets the
    /// flag cutoff quantile.
    pub contamination: f64,
    pub seed: u64,
}

impl Default for IsolationForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 200,
            max_samples: 256,
            contamination: 0.01,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    Leaf {
        size: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

/// Fitted isolation forest artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsolationForest {
    trees: Vec<Node>,
    sample_size: usize,
    /// Training-score quantile above which a vector is flagged.
    score_threshold: f64,
}

impl IsolationForest {
    /// Fit a forest on scaled training vectors.
    pub fn fit(
        vectors: &[Vec<f64>],
        config: &IsolationForestConfig,
    ) -> Result<Self, PipelineError> {
        if vectors.is_empty() {
            return Err(PipelineError::EmptyCorpus);
        }

        let mut rng = StdRng::seed_from_u64(config.seed);
        let sample_size = config.max_samples.min(vectors.len()).max(1);
        let height_limit = (sample_size as f64).log2().ceil().max(1.0) as usize;

        let trees = (0..config.n_trees.max(1))
            .map(|_| {
                let indices =
                    rand::seq::index::sample(&mut rng, vectors.len(), sample_size).into_vec();
                build_tree(vectors, &indices, 0, height_limit, &mut rng)
            })
            .collect();

        let mut forest = Self {
            trees,
            sample_size,
            score_threshold: f64::INFINITY,
        };

        // Flag cutoff: the (1 - contamination) quantile of training scores.
        let mut scores: Vec<f64> = vectors.iter().map(|v| forest.anomaly_score(v)).collect();
        scores.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let q = (1.0 - config.contamination).clamp(0.0, 1.0);
        let idx = ((q * scores.len() as f64) as usize).min(scores.len() - 1);
        forest.score_threshold = scores[idx];

        Ok(forest)
    }

    /// Continuous anomaly score in (0, 1]; higher means easier to isolate.
    pub fn anomaly_score(&self, vector: &[f64]) -> f64 {
        let mean_path: f64 = self
            .trees
            .iter()
            .map(|t| path_length(t, vector, 0))
            .sum::<f64>()
            / self.trees.len() as f64;
        let norm = average_path_length(self.sample_size).max(SCORE_NORM_FLOOR);
        2f64.powf(-mean_path / norm)
    }

    /// Whether a vector falls above the fitted flag cutoff.
    pub fn is_anomalous(&self, vector: &[f64]) -> bool {
        self.anomaly_score(vector) >= self.score_threshold
    }
}

const SCORE_NORM_FLOOR: f64 = 1e-9;

impl AnomalyScorer for IsolationForest {
    fn name(&self) -> &'static str {
        "isolation_forest"
    }

    fn signal(&self, scaled: &[f64]) -> f64 {
        if self.is_anomalous(scaled) {
            1.0
        } else {
            0.0
        }
    }
}

fn build_tree(
    data: &[Vec<f64>],
    indices: &[usize],
    depth: usize,
    height_limit: usize,
    rng: &mut StdRng,
) -> Node {
    if indices.len() <= 1 || depth >= height_limit {
        return Node::Leaf {
            size: indices.len(),
        };
    }

    // Only features with spread in this partition can split it.
    let dims = data[indices[0]].len();
    let splittable: Vec<usize> = (0..dims)
        .filter(|&f| {
            let (min, max) = feature_range(data, indices, f);
            max > min
        })
        .collect();
    if splittable.is_empty() {
        return Node::Leaf {
            size: indices.len(),
        };
    }

    let feature = splittable[rng.gen_range(0..splittable.len())];
    let (min, max) = feature_range(data, indices, feature);
    let threshold = rng.gen_range(min..max);

    let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
        .iter()
        .copied()
        .partition(|&i| data[i][feature] < threshold);
    if left_idx.is_empty() || right_idx.is_empty() {
        return Node::Leaf {
            size: indices.len(),
        };
    }

    Node::Split {
        feature,
        threshold,
        left: Box::new(build_tree(data, &left_idx, depth + 1, height_limit, rng)),
        right: Box::new(build_tree(data, &right_idx, depth + 1, height_limit, rng)),
    }
}

fn feature_range(data: &[Vec<f64>], indices: &[usize], feature: usize) -> (f64, f64) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for &i in indices {
        let v = data[i][feature];
        min = min.min(v);
        max = max.max(v);
    }
    (min, max)
}

fn path_length(node: &Node, vector: &[f64], depth: usize) -> f64 {
    match node {
        Node::Leaf { size } => depth as f64 + average_path_length(*size),
        Node::Split {
            feature,
            threshold,
            left,
            right,
        } => {
            let next = if vector.get(*feature).copied().unwrap_or(0.0) < *threshold {
                left
            } else {
                right
            };
            path_length(next, vector, depth + 1)
        }
    }
}

/// Expected path length of an unsuccessful BST search among `n` points.
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}
