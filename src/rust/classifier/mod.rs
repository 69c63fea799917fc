mod error;
mod loader;
mod model;

pub use error::{ModelError, PredictionError};
pub use loader::{file_sha256, ModelLoader};
pub use model::{Inference, OnnxModel, RiskModel, FEATURE_NAMES_KEY};
