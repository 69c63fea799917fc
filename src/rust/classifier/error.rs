use ort::Error as OrtError;
use std::io;

/// Failures while bringing the model up. Any of these means the process has
/// no model and cannot serve a single request.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// The artifact path does not exist or is not a regular file
    #[error("Model file not found: {0}")]
    NotFound(String),
    /// The artifact could not be read from disk
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    /// The artifact content does not match the configured digest
    #[error("Hash mismatch for {path}: expected {expected}, got {actual}")]
    HashMismatch {
        path: String,
        expected: String,
        actual: String,
    },
    /// ONNX Runtime could not be initialized
    #[error("Runtime error: {0}")]
    RuntimeError(String),
    /// The artifact is not a loadable ONNX graph
    #[error("Failed to load model: {0}")]
    LoadError(String),
    /// The graph loads but does not fit the twelve-feature contract
    #[error("Model does not match the feature schema: {0}")]
    SchemaMismatch(String),
}

impl From<OrtError> for ModelError {
    fn from(err: OrtError) -> Self {
        ModelError::LoadError(err.to_string())
    }
}

/// Failures of a single submission. The shared model is untouched and the
/// next submission starts clean.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PredictionError {
    /// A form value is outside its domain or could not be parsed
    #[error("Validation error: {0}")]
    InvalidInput(String),
    /// A raw feature row has the wrong length or a non-finite value
    #[error("Malformed feature vector: {0}")]
    MalformedVector(String),
    /// The model call itself failed
    #[error("Inference error: {0}")]
    InferenceError(String),
    /// The model answered with something other than a binary label and a
    /// two-class probability row
    #[error("Malformed model output: {0}")]
    MalformedOutput(String),
}

impl From<OrtError> for PredictionError {
    fn from(err: OrtError) -> Self {
        PredictionError::InferenceError(err.to_string())
    }
}
