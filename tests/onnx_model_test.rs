//! Runs real ONNX Runtime sessions over the graphs in `tests/fixtures`
//! (regenerate with `python3 tests/fixtures/make_fixtures.py`). Each graph
//! scores p(high risk) = sigmoid(0.04 * ap_hi - 5.2) and labels by argmax.

use std::path::PathBuf;
use std::sync::Arc;

use cardiorisk::classifier::file_sha256;
use cardiorisk::{
    FeatureVector, FormInputs, InferenceHandler, ModelError, ModelLoader, RiskLabel, RiskModel,
};
use env_logger::{Builder, Env};

// Initialize test logger
fn init() {
    let _ = Builder::from_env(Env::default().default_filter_or("warn"))
        .try_init();
}

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures").join(name)
}

fn expected_probability(ap_hi: u32) -> f32 {
    1.0 / (1.0 + (-(0.04 * ap_hi as f32 - 5.2)).exp())
}

#[test]
fn test_second_load_reuses_instance() -> Result<(), ModelError> {
    init();
    let loader = ModelLoader::default();
    let path = fixture("risk_12.onnx");

    let first = loader.load(&path)?;
    let second = loader.load(&path)?;
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(loader.loaded_count(), 1);
    assert!(first.path().ends_with("risk_12.onnx"));

    // A second artifact gets its own entry.
    let other = loader.load(fixture("risk_12_unnamed.onnx"))?;
    assert!(!Arc::ptr_eq(&first, &other));
    assert_eq!(loader.loaded_count(), 2);
    Ok(())
}

#[test]
fn test_handle_through_onnx_model() -> Result<(), Box<dyn std::error::Error>> {
    init();
    let loader = ModelLoader::default();
    let model = loader.load(fixture("risk_12.onnx"))?;
    let handler = InferenceHandler::new(Arc::clone(&model));
    assert!(Arc::ptr_eq(handler.model(), &model));

    let low = handler.handle(&FormInputs::default())?;
    assert_eq!(low.label, RiskLabel::LowRisk);
    assert!((low.probability - expected_probability(120)).abs() < 1e-4);

    let high = handler.handle(&FormInputs { ap_hi: 180, ..FormInputs::default() })?;
    assert_eq!(high.label, RiskLabel::HighRisk);
    assert!((high.probability - expected_probability(180)).abs() < 1e-4);
    assert!((high.probability_percent - high.probability * 100.0).abs() < 1e-3);

    // Same input, same answer.
    assert_eq!(handler.handle(&FormInputs::default())?, low);
    Ok(())
}

#[test]
fn test_predict_and_predict_proba_agree() -> Result<(), Box<dyn std::error::Error>> {
    let model = ModelLoader::default().load(fixture("risk_12_unnamed.onnx"))?;
    for ap_hi in [60, 120, 129, 131, 240] {
        let vector = FeatureVector::from_inputs(&FormInputs { ap_hi, ..FormInputs::default() });
        let label = model.predict(&vector)?;
        let [p0, p1] = model.predict_proba(&vector)?;
        assert!((p0 + p1 - 1.0).abs() < 1e-5);
        assert_eq!(label, if p1 > p0 { 1 } else { 0 });
        assert_eq!(model.classify(&vector)?.label, label);
    }
    Ok(())
}

#[test]
fn test_narrow_input_is_rejected() {
    init();
    let err = ModelLoader::default().load(fixture("risk_11.onnx")).unwrap_err();
    match err {
        ModelError::SchemaMismatch(msg) => assert!(msg.contains("11"), "{}", msg),
        other => panic!("expected a schema mismatch, got {}", other),
    }
}

#[test]
fn test_missing_probability_output_is_rejected() {
    let err = ModelLoader::default().load(fixture("label_only.onnx")).unwrap_err();
    match err {
        ModelError::SchemaMismatch(msg) => assert!(msg.contains("zipmap")),
        other => panic!("expected a schema mismatch, got {}", other),
    }
}

#[test]
fn test_declared_column_order_is_checked() {
    let loader = ModelLoader::default();
    let err = loader.load(fixture("swapped_names.onnx")).unwrap_err();
    assert!(matches!(err, ModelError::SchemaMismatch(_)));
    assert_eq!(loader.loaded_count(), 0);
}

#[test]
fn test_verified_load_with_matching_digest() -> Result<(), ModelError> {
    let path = fixture("risk_12.onnx");
    let digest = file_sha256(&path)?;

    let loader = ModelLoader::default();
    let model = loader.load_verified(&path, &digest.to_uppercase())?;
    assert!(Arc::ptr_eq(&model, &loader.load(&path)?));
    Ok(())
}
