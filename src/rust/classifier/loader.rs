use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use log::{error, info};
use sha2::{Digest, Sha256};

use super::error::ModelError;
use super::model::OnnxModel;
use crate::runtime::RuntimeConfig;

/// Loads model artifacts once and hands out shared read-only handles.
///
/// Construct one at startup and pass it (or the models it returns) to
/// whatever needs them. Loading the same path twice returns the same `Arc`
/// without reading the file again.
#[derive(Debug, Default)]
pub struct ModelLoader {
    runtime_config: RuntimeConfig,
    cache: Mutex<HashMap<PathBuf, Arc<OnnxModel>>>,
}

impl ModelLoader {
    pub fn new(runtime_config: RuntimeConfig) -> Self {
        Self {
            runtime_config,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Loads the artifact at `path`, or returns the instance already loaded
    /// from it.
    ///
    /// # Errors
    /// - `NotFound` if the path does not exist or is not a file
    /// - `RuntimeError` if ONNX Runtime cannot start
    /// - `LoadError` if the file is not a valid ONNX graph
    /// - `SchemaMismatch` if the graph does not take the twelve-feature row
    pub fn load(&self, path: impl AsRef<Path>) -> Result<Arc<OnnxModel>, ModelError> {
        self.load_inner(path.as_ref(), None)
    }

    /// Like [`load`](Self::load), additionally checking the file's SHA-256
    /// digest before handing it to ONNX Runtime. The digest is checked only
    /// on the first load of a path.
    pub fn load_verified(
        &self,
        path: impl AsRef<Path>,
        expected_sha256: &str,
    ) -> Result<Arc<OnnxModel>, ModelError> {
        self.load_inner(path.as_ref(), Some(expected_sha256))
    }

    /// Number of distinct artifacts held.
    pub fn loaded_count(&self) -> usize {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn load_inner(&self, path: &Path, expected_sha256: Option<&str>) -> Result<Arc<OnnxModel>, ModelError> {
        let key = fs::canonicalize(path)
            .map_err(|_| ModelError::NotFound(path.display().to_string()))?;

        // Held across the load so two callers racing on a cold path load it once.
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(model) = cache.get(&key) {
            info!("Model {:?} already loaded", key);
            return Ok(Arc::clone(model));
        }

        info!("Loading model from {:?}", key);
        if let Some(expected) = expected_sha256 {
            verify_file(&key, expected)?;
        }

        let model = OnnxModel::from_file(&key, &self.runtime_config).map_err(|e| {
            error!("Failed to load model {:?}: {}", key, e);
            e
        })?;
        let model = Arc::new(model);
        cache.insert(key, Arc::clone(&model));
        Ok(model)
    }
}

/// Hex-encoded SHA-256 of a file's content.
pub fn file_sha256(path: &Path) -> Result<String, ModelError> {
    let bytes = fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

fn verify_file(path: &Path, expected: &str) -> Result<(), ModelError> {
    let actual = file_sha256(path)?;
    info!("Calculated hash: {}", actual);
    if !actual.eq_ignore_ascii_case(expected.trim()) {
        error!("Model hash mismatch: expected {}, got {}", expected, actual);
        return Err(ModelError::HashMismatch {
            path: path.display().to_string(),
            expected: expected.to_string(),
            actual,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_file_sha256() -> Result<(), Box<dyn std::error::Error>> {
        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(b"abc")?;
        assert_eq!(
            file_sha256(file.path())?,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        Ok(())
    }

    #[test]
    fn test_hash_mismatch_stops_before_runtime() -> Result<(), Box<dyn std::error::Error>> {
        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(b"not a model")?;

        let loader = ModelLoader::default();
        let err = loader.load_verified(file.path(), &"0".repeat(64)).unwrap_err();
        assert!(matches!(err, ModelError::HashMismatch { .. }));
        assert_eq!(loader.loaded_count(), 0);
        Ok(())
    }

    #[test]
    fn test_missing_path() {
        let loader = ModelLoader::default();
        let err = loader.load("/nonexistent/model.onnx").unwrap_err();
        assert!(matches!(err, ModelError::NotFound(_)));
    }
}
