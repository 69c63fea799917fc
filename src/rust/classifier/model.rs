use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::{debug, info};
use ort::session::Session;
use ort::tensor::TensorElementType;
use ort::value::Tensor;

use super::error::{ModelError, PredictionError};
use crate::features::FeatureVector;
use crate::runtime::{create_session_builder, RuntimeConfig};
use crate::schema::{feature_names, FEATURE_COUNT};

/// Custom metadata key a model may use to declare its training column order.
pub const FEATURE_NAMES_KEY: &str = "feature_names";

/// The two answers of one model call, computed from the same input row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Inference {
    /// Predicted class, `1` for high risk.
    pub label: i64,
    /// `[p(class 0), p(class 1)]`
    pub probabilities: [f32; 2],
}

impl Inference {
    /// Probability of the positive (high risk) class.
    pub fn positive_probability(&self) -> f32 {
        self.probabilities[1]
    }
}

/// A loaded binary risk classifier.
///
/// Implementations are immutable after construction and shared read-only
/// between callers, hence the `Send + Sync` bound.
pub trait RiskModel: Send + Sync {
    /// Predicted class for one row.
    fn predict(&self, features: &FeatureVector) -> Result<i64, PredictionError>;

    /// `[p(class 0), p(class 1)]` for one row.
    fn predict_proba(&self, features: &FeatureVector) -> Result<[f32; 2], PredictionError>;

    /// Label and probabilities for one row. Models that produce both in a
    /// single pass should override this.
    fn classify(&self, features: &FeatureVector) -> Result<Inference, PredictionError> {
        Ok(Inference {
            label: self.predict(features)?,
            probabilities: self.predict_proba(features)?,
        })
    }
}

/// A classifier exported to ONNX and run through ONNX Runtime.
///
/// The graph takes one float32 `[N, 12]` input and produces an int64 label
/// tensor plus a float32 `[N, 2]` probability tensor, which is what
/// `skl2onnx` emits for a binary classifier exported with `zipmap=False`.
#[derive(Debug)]
pub struct OnnxModel {
    path: PathBuf,
    session: Session,
    input_name: String,
    label_output: String,
    probability_output: String,
}

// Compile-time verification of thread-safety
const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn verify_thread_safety() {
        assert_send_sync::<OnnxModel>();
    }
};

impl OnnxModel {
    /// Loads and validates an ONNX artifact. Does not consult any cache; see
    /// [`ModelLoader`](super::ModelLoader) for load-once semantics.
    pub fn from_file(path: impl AsRef<Path>, config: &RuntimeConfig) -> Result<Self, ModelError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ModelError::NotFound(path.display().to_string()));
        }

        let session = create_session_builder(config)?
            .commit_from_file(path)
            .map_err(|e| ModelError::LoadError(format!("{}: {}", path.display(), e)))?;

        let (input_name, label_output, probability_output) = Self::validate_model(&session)?;
        Self::validate_metadata(&session)?;
        info!("Model structure validated successfully");

        Ok(Self {
            path: path.to_path_buf(),
            session,
            input_name,
            label_output,
            probability_output,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Checks the graph signature against the feature schema and returns the
    /// names of the input, label output and probability output.
    fn validate_model(session: &Session) -> Result<(String, String, String), ModelError> {
        let inputs = &session.inputs;
        if inputs.len() != 1 {
            return Err(ModelError::SchemaMismatch(format!(
                "expected exactly 1 input tensor, found {}",
                inputs.len()
            )));
        }

        let input = &inputs[0];
        if !matches!(input.input_type.tensor_type(), Some(TensorElementType::Float32)) {
            return Err(ModelError::SchemaMismatch(format!(
                "input '{}' must be a float32 tensor, found {:?}",
                input.name, input.input_type
            )));
        }
        if let Some(dims) = input.input_type.tensor_dimensions() {
            check_input_dimensions(dims)
                .map_err(|msg| ModelError::SchemaMismatch(format!("input '{}': {}", input.name, msg)))?;
        }

        let outputs = &session.outputs;
        let label_output = outputs.iter()
            .find(|o| matches!(o.output_type.tensor_type(), Some(TensorElementType::Int64)))
            .ok_or_else(|| ModelError::SchemaMismatch(
                "model has no int64 label output".to_string()
            ))?;
        let probability_output = outputs.iter()
            .find(|o| matches!(o.output_type.tensor_type(), Some(TensorElementType::Float32)))
            .ok_or_else(|| ModelError::SchemaMismatch(
                "model has no float32 probability tensor; export the classifier with zipmap disabled".to_string()
            ))?;

        debug!(
            "Model signature: input '{}', label '{}', probabilities '{}'",
            input.name, label_output.name, probability_output.name
        );
        Ok((input.name.clone(), label_output.name.clone(), probability_output.name.clone()))
    }

    fn validate_metadata(session: &Session) -> Result<(), ModelError> {
        let metadata = session.metadata()?;
        if let Ok(producer) = metadata.producer() {
            info!("Model produced by {}", producer);
        }
        match metadata.custom(FEATURE_NAMES_KEY)? {
            Some(declared) => check_feature_names(&declared),
            None => {
                debug!("Model carries no '{}' metadata; column order is not checked", FEATURE_NAMES_KEY);
                Ok(())
            }
        }
    }

    fn run(&self, features: &FeatureVector) -> Result<Inference, PredictionError> {
        let mut input_tensors = HashMap::new();
        input_tensors.insert(self.input_name.as_str(), Tensor::from_array(features.to_row())?);

        let outputs = self.session.run(input_tensors)
            .map_err(|e| PredictionError::InferenceError(format!("Failed to run model: {}", e)))?;

        let labels = outputs[self.label_output.as_str()].try_extract_tensor::<i64>()
            .map_err(|e| PredictionError::MalformedOutput(format!("Failed to extract label tensor: {}", e)))?;
        let label = labels.iter().next().copied()
            .ok_or_else(|| PredictionError::MalformedOutput("empty label tensor".into()))?;

        let probabilities = outputs[self.probability_output.as_str()].try_extract_tensor::<f32>()
            .map_err(|e| PredictionError::MalformedOutput(format!("Failed to extract probability tensor: {}", e)))?;
        let row: Vec<f32> = probabilities.iter().copied().collect();
        let probabilities: [f32; 2] = row.as_slice().try_into().map_err(|_| {
            PredictionError::MalformedOutput(format!("expected 2 class probabilities, got {}", row.len()))
        })?;

        Ok(Inference { label, probabilities })
    }
}

impl RiskModel for OnnxModel {
    fn predict(&self, features: &FeatureVector) -> Result<i64, PredictionError> {
        self.run(features).map(|inference| inference.label)
    }

    fn predict_proba(&self, features: &FeatureVector) -> Result<[f32; 2], PredictionError> {
        self.run(features).map(|inference| inference.probabilities)
    }

    fn classify(&self, features: &FeatureVector) -> Result<Inference, PredictionError> {
        self.run(features)
    }
}

/// A symbolic (negative) dimension is accepted; a fixed one must match.
fn check_input_dimensions(dims: &[i64]) -> Result<(), String> {
    if dims.len() != 2 {
        return Err(format!("expected a rank-2 [batch, {}] tensor, found shape {:?}", FEATURE_COUNT, dims));
    }
    let width = dims[1];
    if width >= 0 && width != FEATURE_COUNT as i64 {
        return Err(format!("expected {} features, model takes {}", FEATURE_COUNT, width));
    }
    Ok(())
}

/// Compares a comma-separated column list declared by the model with the schema.
fn check_feature_names(declared: &str) -> Result<(), ModelError> {
    let declared: Vec<&str> = declared.split(',').map(str::trim).collect();
    let expected = feature_names();
    if declared != expected {
        return Err(ModelError::SchemaMismatch(format!(
            "model was trained on [{}], schema is [{}]",
            declared.join(", "),
            expected.join(", ")
        )));
    }
    Ok(())
}
