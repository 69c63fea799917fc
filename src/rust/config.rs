use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::classifier::{ModelError, ModelLoader, OnnxModel};
use crate::runtime::RuntimeConfig;

/// Environment variable naming the model artifact.
pub const MODEL_ENV: &str = "CARDIORISK_MODEL";

/// File name the artifact is looked up under when no path is configured.
pub const DEFAULT_MODEL_FILE: &str = "best_gradient_boosting_model.onnx";

/// Everything needed to bring the model up at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub model_path: PathBuf,
    /// Hex SHA-256 the artifact must match, if set.
    pub expected_sha256: Option<String>,
    pub runtime: RuntimeConfig,
}

impl AppConfig {
    /// Uses `model_path` when given, otherwise [`default_model_path`].
    pub fn new(model_path: Option<PathBuf>) -> Self {
        Self {
            model_path: model_path.unwrap_or_else(default_model_path),
            expected_sha256: None,
            runtime: RuntimeConfig::default(),
        }
    }

    pub fn with_sha256(mut self, expected: Option<String>) -> Self {
        self.expected_sha256 = expected;
        self
    }

    pub fn with_threads(mut self, intra_threads: usize, inter_threads: usize) -> Self {
        self.runtime.intra_threads = intra_threads;
        self.runtime.inter_threads = inter_threads;
        self
    }

    /// A loader using this configuration's runtime settings.
    pub fn loader(&self) -> ModelLoader {
        ModelLoader::new(self.runtime.clone())
    }

    /// Loads the configured artifact through `loader`, checking the digest
    /// when one is set.
    pub fn load_model(&self, loader: &ModelLoader) -> Result<Arc<OnnxModel>, ModelError> {
        match &self.expected_sha256 {
            Some(expected) => loader.load_verified(&self.model_path, expected),
            None => loader.load(&self.model_path),
        }
    }
}

/// Where to find the model when no path was given explicitly.
pub fn default_model_path() -> PathBuf {
    // 1. Check environment variable
    if let Ok(path) = env::var(MODEL_ENV) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    // 2. Artifact shipped next to the working directory
    let local = Path::new(DEFAULT_MODEL_FILE);
    if local.is_file() {
        return local.to_path_buf();
    }

    // 3. Use platform-specific cache directory
    if let Some(cache_dir) = dirs::cache_dir() {
        return cache_dir.join("cardiorisk").join("models").join(DEFAULT_MODEL_FILE);
    }

    // 4. Fallback to user's home directory
    if let Some(home_dir) = dirs::home_dir() {
        return home_dir.join(".cache").join("cardiorisk").join("models").join(DEFAULT_MODEL_FILE);
    }

    // 5. If all else fails, use system temp directory
    env::temp_dir().join("cardiorisk").join(DEFAULT_MODEL_FILE)
}
