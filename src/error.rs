//! Pipeline error taxonomy.

use thiserror::Error;

/// Errors surfaced by the scoring pipeline itself.
///
/// Feature extraction is total and never appears here; optional scorer
/// artifacts that fail to load degrade the pipeline instead of erroring.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A feature vector's length disagrees with the fitted scaler. The
    /// shared schema constant makes this unreachable in correct wiring;
    /// it fails fast instead of silently miscomputing scores.
    #[error("feature vector has {got} slots, scaler was fitted for {expected}")]
    SchemaMismatch { expected: usize, got: usize },

    /// The scaler cannot be fitted on an empty corpus.
    #[error("cannot fit scaler on an empty training corpus")]
    EmptyCorpus,

    /// The audit row could not be durably written. A transaction is not
    /// considered scored until its row is in the result log, so this
    /// propagates to the caller.
    #[error("failed to persist audit row: {0}")]
    Persistence(anyhow::Error),

    /// The raw payload could not be serialized for the audit row.
    #[error("failed to serialize transaction payload: {0}")]
    Serialize(#[from] serde_json::Error),
}
