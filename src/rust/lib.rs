//! Cardiovascular risk prediction from twelve clinical and lifestyle values,
//! backed by a pre-trained binary classifier exported to ONNX.
//!
//! # Basic Usage
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use cardiorisk::{FormInputs, InferenceHandler, ModelLoader};
//!
//! let loader = ModelLoader::default();
//! let model = loader.load("best_gradient_boosting_model.onnx")?;
//! let handler = InferenceHandler::new(model);
//!
//! let result = handler.handle(&FormInputs { age_years: 58, ap_hi: 150, ..FormInputs::default() })?;
//! println!("{}: {:.2} %", result.label, result.probability_percent);
//! # Ok(())
//! # }
//! ```
//!
//! # Substituting the model
//!
//! The handler is generic over [`RiskModel`], so anything that can answer
//! `predict` and `predict_proba` for a [`FeatureVector`] can stand in for the
//! ONNX model:
//!
//! ```rust
//! use std::sync::Arc;
//! use cardiorisk::{FeatureVector, FormInputs, InferenceHandler, PredictionError, RiskLabel, RiskModel};
//!
//! struct AlwaysHigh;
//!
//! impl RiskModel for AlwaysHigh {
//!     fn predict(&self, _: &FeatureVector) -> Result<i64, PredictionError> {
//!         Ok(1)
//!     }
//!     fn predict_proba(&self, _: &FeatureVector) -> Result<[f32; 2], PredictionError> {
//!         Ok([0.2, 0.8])
//!     }
//! }
//!
//! let handler = InferenceHandler::new(Arc::new(AlwaysHigh));
//! let result = handler.handle(&FormInputs::default()).unwrap();
//! assert_eq!(result.label, RiskLabel::HighRisk);
//! ```
//!
//! # Thread Safety
//!
//! A loaded model is immutable and `Send + Sync`. Share it with `Arc` (the
//! loader already returns one) and give each session its own handler clone.

pub mod classifier;
pub mod config;
pub mod features;
pub mod handler;
mod runtime;
pub mod schema;
pub mod session;

pub use classifier::{Inference, ModelError, ModelLoader, OnnxModel, PredictionError, RiskModel};
pub use config::AppConfig;
pub use features::{FeatureVector, FormInputs, Gender, Level};
pub use handler::{InferenceHandler, PredictionResult, RiskLabel};
pub use runtime::{create_session_builder, RuntimeConfig};
pub use schema::{Feature, FeatureSpec, FEATURE_COUNT, FEATURE_SCHEMA};
pub use session::{FormSession, SubmissionState};

/// Initializes `env_logger`, defaulting to `warn` unless `RUST_LOG` is set.
pub fn init_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .try_init();
}
