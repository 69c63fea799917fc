//! Typed form input and the ordered feature vector built from it.

use std::ops::Index;

use ndarray::Array2;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

use crate::classifier::PredictionError;
use crate::schema::{Feature, AGE_DAYS_PER_YEAR, FEATURE_COUNT, FEATURE_SCHEMA};

/// Biological sex as coded in the training data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn code(self) -> u8 {
        match self {
            Self::Male => 1,
            Self::Female => 2,
        }
    }
}

impl TryFrom<u8> for Gender {
    type Error = PredictionError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Self::Male),
            2 => Ok(Self::Female),
            other => Err(PredictionError::InvalidInput(format!(
                "gender must be 1 (male) or 2 (female), got {}",
                other
            ))),
        }
    }
}

impl From<Gender> for u8 {
    fn from(gender: Gender) -> Self {
        gender.code()
    }
}

/// Three-step lab level used for cholesterol and glucose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Level {
    Normal,
    AboveNormal,
    WellAboveNormal,
}

impl Level {
    pub fn code(self) -> u8 {
        match self {
            Self::Normal => 1,
            Self::AboveNormal => 2,
            Self::WellAboveNormal => 3,
        }
    }
}

impl TryFrom<u8> for Level {
    type Error = PredictionError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Self::Normal),
            2 => Ok(Self::AboveNormal),
            3 => Ok(Self::WellAboveNormal),
            other => Err(PredictionError::InvalidInput(format!(
                "level must be 1, 2 or 3, got {}",
                other
            ))),
        }
    }
}

impl From<Level> for u8 {
    fn from(level: Level) -> Self {
        level.code()
    }
}

/// The twelve values captured by the form, in form units.
///
/// JSON keys are the training column names, so a form submitted as
/// `{"age": 50, "gender": 1, ...}` deserializes directly. Flags accept either
/// `0`/`1` or `true`/`false`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormInputs {
    /// Age in whole years.
    #[serde(rename = "age")]
    pub age_years: u32,
    pub gender: Gender,
    /// Height in centimeters.
    #[serde(rename = "height")]
    pub height_cm: f32,
    /// Weight in kilograms.
    #[serde(rename = "weight")]
    pub weight_kg: f32,
    /// Systolic blood pressure.
    pub ap_hi: u32,
    /// Diastolic blood pressure.
    pub ap_lo: u32,
    pub cholesterol: Level,
    #[serde(rename = "gluc")]
    pub glucose: Level,
    #[serde(rename = "smoke", deserialize_with = "flag")]
    pub smoker: bool,
    #[serde(rename = "alco", deserialize_with = "flag")]
    pub alcohol: bool,
    #[serde(deserialize_with = "flag")]
    pub active: bool,
    pub bmi: f32,
}

impl Default for FormInputs {
    /// The values the form starts out with.
    fn default() -> Self {
        Self {
            age_years: 50,
            gender: Gender::Male,
            height_cm: 165.0,
            weight_kg: 70.0,
            ap_hi: 120,
            ap_lo: 80,
            cholesterol: Level::Normal,
            glucose: Level::Normal,
            smoker: false,
            alcohol: false,
            active: false,
            bmi: 25.0,
        }
    }
}

impl FormInputs {
    /// Parses a JSON form submission and checks it against the schema domains.
    pub fn from_json(json: &str) -> Result<Self, PredictionError> {
        let inputs: Self = serde_json::from_str(json)
            .map_err(|e| PredictionError::InvalidInput(format!("Invalid form data: {}", e)))?;
        inputs.validate()?;
        Ok(inputs)
    }

    /// The value of `feature` in form units (age in years).
    pub fn value(&self, feature: Feature) -> f32 {
        match feature {
            Feature::Age => self.age_years as f32,
            Feature::Gender => f32::from(self.gender.code()),
            Feature::Height => self.height_cm,
            Feature::Weight => self.weight_kg,
            Feature::Systolic => self.ap_hi as f32,
            Feature::Diastolic => self.ap_lo as f32,
            Feature::Cholesterol => f32::from(self.cholesterol.code()),
            Feature::Glucose => f32::from(self.glucose.code()),
            Feature::Smoker => flag_value(self.smoker),
            Feature::Alcohol => flag_value(self.alcohol),
            Feature::Active => flag_value(self.active),
            Feature::Bmi => self.bmi,
        }
    }

    /// Range check at the collection boundary. Reports the first field, in
    /// schema order, that falls outside its domain.
    pub fn validate(&self) -> Result<(), PredictionError> {
        for spec in &FEATURE_SCHEMA {
            let value = self.value(spec.feature);
            if !spec.accepts(value) {
                return Err(PredictionError::InvalidInput(format!(
                    "{} = {} is outside the accepted range {}..={}",
                    spec.name, value, spec.min, spec.max
                )));
            }
        }
        Ok(())
    }
}

fn flag_value(flag: bool) -> f32 {
    if flag { 1.0 } else { 0.0 }
}

fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Bool(bool),
        Code(u8),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Bool(b) => Ok(b),
        Raw::Code(0) => Ok(false),
        Raw::Code(1) => Ok(true),
        Raw::Code(other) => Err(de::Error::custom(format!("expected 0 or 1, got {}", other))),
    }
}

/// One model input row: twelve values in [`FEATURE_SCHEMA`] order, in model
/// units (age in days).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector([f32; FEATURE_COUNT]);

impl FeatureVector {
    /// Assembles the row from form values, converting age to days.
    pub fn from_inputs(inputs: &FormInputs) -> Self {
        let mut values = [0.0; FEATURE_COUNT];
        for feature in Feature::all() {
            values[feature.index()] = match feature {
                Feature::Age => inputs.age_years as f32 * AGE_DAYS_PER_YEAR as f32,
                other => inputs.value(other),
            };
        }
        Self(values)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<f32> {
        self.0.to_vec()
    }

    /// The vector as a `[1, FEATURE_COUNT]` batch of one.
    pub fn to_row(&self) -> Array2<f32> {
        Array2::from_shape_fn((1, FEATURE_COUNT), |(_, col)| self.0[col])
    }
}

impl From<&FormInputs> for FeatureVector {
    fn from(inputs: &FormInputs) -> Self {
        Self::from_inputs(inputs)
    }
}

impl TryFrom<&[f32]> for FeatureVector {
    type Error = PredictionError;

    /// Accepts an already-encoded row. Rejects wrong lengths and non-finite values.
    fn try_from(values: &[f32]) -> Result<Self, Self::Error> {
        let values: [f32; FEATURE_COUNT] = values.try_into().map_err(|_| {
            PredictionError::MalformedVector(format!(
                "expected {} features, got {}",
                FEATURE_COUNT,
                values.len()
            ))
        })?;
        if let Some(pos) = values.iter().position(|v| !v.is_finite()) {
            return Err(PredictionError::MalformedVector(format!(
                "{} is not a finite number",
                FEATURE_SCHEMA[pos].name
            )));
        }
        Ok(Self(values))
    }
}

impl Index<Feature> for FeatureVector {
    type Output = f32;

    fn index(&self, feature: Feature) -> &f32 {
        &self.0[feature.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_inputs() -> FormInputs {
        FormInputs {
            active: true,
            ..FormInputs::default()
        }
    }

    #[test]
    fn test_vector_in_training_order() {
        let vector = FeatureVector::from_inputs(&reference_inputs());
        assert_eq!(
            vector.as_slice(),
            &[18250.0, 1.0, 165.0, 70.0, 120.0, 80.0, 1.0, 1.0, 0.0, 0.0, 1.0, 25.0]
        );
    }

    #[test]
    fn test_age_converted_to_days() {
        for years in 25..=70 {
            let inputs = FormInputs { age_years: years, ..FormInputs::default() };
            let vector = FeatureVector::from(&inputs);
            assert_eq!(vector[Feature::Age], (years * 365) as f32);
        }
    }

    #[test]
    fn test_row_shape() {
        let row = FeatureVector::from_inputs(&reference_inputs()).to_row();
        assert_eq!(row.shape(), &[1, FEATURE_COUNT]);
        assert_eq!(row[[0, Feature::Bmi.index()]], 25.0);
        assert_eq!(row[[0, Feature::Weight.index()]], 70.0);
    }

    #[test]
    fn test_raw_vector_length_checked() {
        let short = vec![1.0; FEATURE_COUNT - 1];
        assert!(matches!(
            FeatureVector::try_from(short.as_slice()),
            Err(PredictionError::MalformedVector(_))
        ));

        let mut row = vec![1.0; FEATURE_COUNT];
        row[Feature::Bmi.index()] = f32::NAN;
        let err = FeatureVector::try_from(row.as_slice()).unwrap_err();
        assert!(err.to_string().contains("bmi"));
    }

    #[test]
    fn test_json_form_with_numeric_flags() {
        let json = r#"{
            "age": 50, "gender": 2, "height": 160, "weight": 58.5,
            "ap_hi": 130, "ap_lo": 85, "cholesterol": 2, "gluc": 1,
            "smoke": 0, "alco": 1, "active": true, "bmi": 22.9
        }"#;
        let inputs = FormInputs::from_json(json).unwrap();
        assert_eq!(inputs.gender, Gender::Female);
        assert_eq!(inputs.cholesterol, Level::AboveNormal);
        assert!(!inputs.smoker);
        assert!(inputs.alcohol);
        assert!(inputs.active);
    }

    #[test]
    fn test_json_form_rejects_bad_codes() {
        let json = r#"{
            "age": 50, "gender": 3, "height": 160, "weight": 58,
            "ap_hi": 130, "ap_lo": 85, "cholesterol": 2, "gluc": 1,
            "smoke": 0, "alco": 0, "active": 0, "bmi": 22.9
        }"#;
        assert!(FormInputs::from_json(json).is_err());

        let json = json.replace("\"gender\": 3", "\"gender\": 1").replace("\"smoke\": 0", "\"smoke\": 2");
        assert!(FormInputs::from_json(&json).is_err());
    }

    #[test]
    fn test_validate_ranges() {
        assert!(FormInputs::default().validate().is_ok());

        let too_young = FormInputs { age_years: 24, ..FormInputs::default() };
        let err = too_young.validate().unwrap_err();
        assert!(err.to_string().contains("age"));

        let heavy = FormInputs { bmi: 50.1, ..FormInputs::default() };
        assert!(heavy.validate().is_err());
    }
}
