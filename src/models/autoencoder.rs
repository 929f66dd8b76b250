//! Reconstruction-based anomaly detector.
//!
//! A small dense encoder/decoder trained to reproduce scaled feature
//! vectors. Vectors resembling the training corpus reconstruct well;
//! unusual ones come back distorted, and the mean squared reconstruction
//! error is the raw anomaly signal. The error is normalized to [0, 1]
//! with min/max bounds measured over the training corpus and persisted in
//! the artifact, so a single-vector serving call gets a meaningful signal.

use crate::error::PipelineError;
use crate::models::AnomalyScorer;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Epsilon in the error normalization denominator, guarding a corpus whose
/// reconstruction errors are all identical.
const NORM_EPSILON: f64 = 1e-9;

/// Fitting parameters; serving reads none of these.
#[derive(Debug, Clone)]
pub struct AutoencoderConfig {
    pub hidden_dim: usize,
    pub latent_dim: usize,
    pub epochs: usize,
    pub learning_rate: f64,
    pub seed: u64,
}

impl Default for AutoencoderConfig {
    fn default() -> Self {
        Self {
            hidden_dim: 16,
            latent_dim: 3,
            epochs: 200,
            learning_rate: 0.01,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum Activation {
    Relu,
    Linear,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DenseLayer {
    /// Row-major weights, `weights[out][in]`.
    weights: Vec<Vec<f64>>,
    biases: Vec<f64>,
    activation: Activation,
}

impl DenseLayer {
    fn init(input: usize, output: usize, activation: Activation, rng: &mut StdRng) -> Self {
        // Xavier-uniform initialization.
        let limit = (6.0 / (input + output) as f64).sqrt();
        let weights = (0..output)
            .map(|_| (0..input).map(|_| rng.gen_range(-limit..limit)).collect())
            .collect();
        Self {
            weights,
            biases: vec![0.0; output],
            activation,
        }
    }

    fn forward(&self, input: &[f64]) -> Vec<f64> {
        self.weights
            .iter()
            .zip(&self.biases)
            .map(|(row, b)| {
                let z: f64 = row.iter().zip(input).map(|(w, x)| w * x).sum::<f64>() + b;
                match self.activation {
                    Activation::Relu => z.max(0.0),
                    Activation::Linear => z,
                }
            })
            .collect()
    }
}

/// Fitted autoencoder artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Autoencoder {
    layers: Vec<DenseLayer>,
    /// Reconstruction-error bounds over the training corpus, fixed at fit
    /// time and used to normalize serving-time errors.
    error_min: f64,
    error_max: f64,
}

impl Autoencoder {
    /// Train on scaled vectors with per-sample stochastic gradient descent
    /// on the mean squared reconstruction error.
    pub fn fit(vectors: &[Vec<f64>], config: &AutoencoderConfig) -> Result<Self, PipelineError> {
        let Some(first) = vectors.first() else {
            return Err(PipelineError::EmptyCorpus);
        };
        let dim = first.len();
        for v in vectors {
            if v.len() != dim {
                return Err(PipelineError::SchemaMismatch {
                    expected: dim,
                    got: v.len(),
                });
            }
        }

        let mut rng = StdRng::seed_from_u64(config.seed);
        let hidden = config.hidden_dim.max(1);
        let latent = config.latent_dim.max(1);
        let sizes = [dim, hidden, latent, hidden, dim];
        let mut layers: Vec<DenseLayer> = sizes
            .windows(2)
            .enumerate()
            .map(|(i, w)| {
                let activation = if i == sizes.len() - 2 {
                    Activation::Linear
                } else {
                    Activation::Relu
                };
                DenseLayer::init(w[0], w[1], activation, &mut rng)
            })
            .collect();

        let mut order: Vec<usize> = (0..vectors.len()).collect();
        for _ in 0..config.epochs {
            order.shuffle(&mut rng);
            for &i in &order {
                sgd_step(&mut layers, &vectors[i], config.learning_rate);
            }
        }

        let mut model = Self {
            layers,
            error_min: 0.0,
            error_max: 0.0,
        };
        let errors: Vec<f64> = vectors
            .iter()
            .map(|v| model.reconstruction_error(v))
            .collect();
        model.error_min = errors.iter().cloned().fold(f64::INFINITY, f64::min);
        model.error_max = errors.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

        Ok(model)
    }

    /// Run a vector through the encoder and decoder.
    pub fn reconstruct(&self, vector: &[f64]) -> Vec<f64> {
        self.layers
            .iter()
            .fold(vector.to_vec(), |acc, layer| layer.forward(&acc))
    }

    /// Mean squared reconstruction error for one vector.
    pub fn reconstruction_error(&self, vector: &[f64]) -> f64 {
        let recon = self.reconstruct(vector);
        vector
            .iter()
            .zip(&recon)
            .map(|(x, r)| (x - r).powi(2))
            .sum::<f64>()
            / vector.len() as f64
    }
}

impl AnomalyScorer for Autoencoder {
    fn name(&self) -> &'static str {
        "autoencoder"
    }

    fn signal(&self, scaled: &[f64]) -> f64 {
        let error = self.reconstruction_error(scaled);
        ((error - self.error_min) / (self.error_max - self.error_min + NORM_EPSILON))
            .clamp(0.0, 1.0)
    }
}

/// One forward/backward pass updating the layers in place.
fn sgd_step(layers: &mut [DenseLayer], target: &[f64], learning_rate: f64) {
    // Forward, keeping every activation for the backward pass.
    let mut activations: Vec<Vec<f64>> = Vec::with_capacity(layers.len() + 1);
    activations.push(target.to_vec());
    for (l, layer) in layers.iter().enumerate() {
        let out = layer.forward(&activations[l]);
        activations.push(out);
    }

    let output = &activations[layers.len()];
    let dim = target.len() as f64;
    let mut grad: Vec<f64> = output
        .iter()
        .zip(target)
        .map(|(y, t)| 2.0 * (y - t) / dim)
        .collect();

    for l in (0..layers.len()).rev() {
        let (input, out) = (&activations[l], &activations[l + 1]);
        let activation = layers[l].activation;

        // d(loss)/d(pre-activation); ReLU derivative read off the output.
        let delta: Vec<f64> = grad
            .iter()
            .zip(out)
            .map(|(g, o)| match activation {
                Activation::Relu => {
                    if *o > 0.0 {
                        *g
                    } else {
                        0.0
                    }
                }
                Activation::Linear => *g,
            })
            .collect();

        // Propagate before overwriting the weights.
        let mut next_grad = vec![0.0; input.len()];
        for (j, dj) in delta.iter().enumerate() {
            for (k, w) in layers[l].weights[j].iter().enumerate() {
                next_grad[k] += w * dj;
            }
        }

        for (j, dj) in delta.iter().enumerate() {
            for (k, xk) in input.iter().enumerate() {
                layers[l].weights[j][k] -= learning_rate * dj * xk;
            }
            layers[l].biases[j] -= learning_rate * dj;
        }

        grad = next_grad;
    }
}
