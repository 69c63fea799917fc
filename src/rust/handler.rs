use std::fmt;
use std::sync::Arc;

use log::{debug, warn};
use serde::Serialize;

use crate::classifier::{Inference, PredictionError, RiskModel};
use crate::features::{FeatureVector, FormInputs};

/// Binary outcome shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiskLabel {
    HighRisk,
    LowRisk,
}

impl RiskLabel {
    /// Class `1` is high risk; every other label is low risk.
    pub fn from_class(class: i64) -> Self {
        if class == 1 { Self::HighRisk } else { Self::LowRisk }
    }

    pub fn is_high(self) -> bool {
        self == Self::HighRisk
    }
}

impl fmt::Display for RiskLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HighRisk => write!(f, "High Risk"),
            Self::LowRisk => write!(f, "Low Risk"),
        }
    }
}

/// Outcome of one submission. Both fields come from the same model call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PredictionResult {
    pub label: RiskLabel,
    /// Model probability of the high risk class, 0.0 to 1.0
    pub probability: f32,
    /// `probability` as a percentage, 0.0 to 100.0
    pub probability_percent: f32,
}

impl PredictionResult {
    fn from_inference(inference: &Inference) -> Self {
        let probability = inference.positive_probability();
        Self {
            label: RiskLabel::from_class(inference.label),
            probability,
            probability_percent: probability * 100.0,
        }
    }

    /// Whole percent for a progress bar, truncated toward zero.
    pub fn progress(&self) -> u8 {
        self.probability_percent.clamp(0.0, 100.0) as u8
    }
}

impl fmt::Display for PredictionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:.2} %)", self.label, self.probability_percent)
    }
}

/// Turns one form submission into a [`PredictionResult`].
///
/// Holds the model through an `Arc`; cloning a handler is cheap and every
/// clone shares the same model.
#[derive(Debug)]
pub struct InferenceHandler<M: RiskModel> {
    model: Arc<M>,
}

impl<M: RiskModel> Clone for InferenceHandler<M> {
    fn clone(&self) -> Self {
        Self { model: Arc::clone(&self.model) }
    }
}

impl<M: RiskModel> InferenceHandler<M> {
    pub fn new(model: Arc<M>) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &Arc<M> {
        &self.model
    }

    /// Assembles the feature vector (age converted to days), runs the model
    /// once and maps the answer to a label and a percentage.
    ///
    /// Inputs are taken as already range-checked at the collection boundary.
    /// Any model failure or malformed model answer fails the whole
    /// submission; no partial result is produced.
    pub fn handle(&self, inputs: &FormInputs) -> Result<PredictionResult, PredictionError> {
        let vector = FeatureVector::from_inputs(inputs);
        self.handle_vector(&vector)
    }

    /// Runs an already assembled row.
    pub fn handle_vector(&self, vector: &FeatureVector) -> Result<PredictionResult, PredictionError> {
        debug!("Feature vector: {:?}", vector.as_slice());

        let inference = self.model.classify(vector)?;
        check_inference(&inference)?;

        let result = PredictionResult::from_inference(&inference);
        if result.label.is_high() != (result.probability >= 0.5) {
            warn!(
                "Model label {} disagrees with p(high risk) = {:.4}; keeping the label",
                inference.label, result.probability
            );
        }
        debug!("Prediction: {}", result);
        Ok(result)
    }
}

fn check_inference(inference: &Inference) -> Result<(), PredictionError> {
    if !matches!(inference.label, 0 | 1) {
        return Err(PredictionError::MalformedOutput(format!(
            "expected label 0 or 1, got {}",
            inference.label
        )));
    }
    if let Some(p) = inference.probabilities.iter().find(|p| !p.is_finite() || !(0.0..=1.0).contains(*p)) {
        return Err(PredictionError::MalformedOutput(format!(
            "class probability {} is outside [0, 1]",
            p
        )));
    }
    Ok(())
}
