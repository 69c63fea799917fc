#![allow(dead_code)]

use std::sync::Mutex;

use cardiorisk::{Feature, FeatureVector, PredictionError, RiskModel};

/// Deterministic stand-in for the trained model: a logistic score over a few
/// clinically meaningful slots.
pub struct LogisticModel;

impl LogisticModel {
    fn score(features: &FeatureVector) -> f32 {
        let z = 0.0003 * (features[Feature::Age] - 18_250.0)
            + 0.04 * (features[Feature::Systolic] - 130.0)
            + 0.5 * (features[Feature::Cholesterol] - 1.0)
            + 0.05 * (features[Feature::Bmi] - 27.0)
            - 0.3 * features[Feature::Active];
        1.0 / (1.0 + (-z).exp())
    }
}

impl RiskModel for LogisticModel {
    fn predict(&self, features: &FeatureVector) -> Result<i64, PredictionError> {
        Ok(if Self::score(features) >= 0.5 { 1 } else { 0 })
    }

    fn predict_proba(&self, features: &FeatureVector) -> Result<[f32; 2], PredictionError> {
        let p = Self::score(features);
        Ok([1.0 - p, p])
    }
}

/// Records every row it is asked about.
#[derive(Default)]
pub struct RecordingModel {
    pub seen: Mutex<Vec<Vec<f32>>>,
}

impl RecordingModel {
    pub fn rows(&self) -> Vec<Vec<f32>> {
        self.seen.lock().unwrap().clone()
    }
}

impl RiskModel for RecordingModel {
    fn predict(&self, features: &FeatureVector) -> Result<i64, PredictionError> {
        self.seen.lock().unwrap().push(features.to_vec());
        Ok(0)
    }

    fn predict_proba(&self, features: &FeatureVector) -> Result<[f32; 2], PredictionError> {
        self.seen.lock().unwrap().push(features.to_vec());
        Ok([0.9, 0.1])
    }
}

/// Rejects every call, like a runtime fed a row it cannot use.
pub struct FailingModel;

impl RiskModel for FailingModel {
    fn predict(&self, _: &FeatureVector) -> Result<i64, PredictionError> {
        Err(PredictionError::InferenceError("input shape mismatch".into()))
    }

    fn predict_proba(&self, _: &FeatureVector) -> Result<[f32; 2], PredictionError> {
        Err(PredictionError::InferenceError("input shape mismatch".into()))
    }
}
