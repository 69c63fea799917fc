//! The fixed feature schema the risk model was trained on.
//!
//! Slot order is part of the model contract: the graph receives a bare row of
//! twelve floats, so nothing at runtime can tell a swapped height and weight
//! from a real patient. [`FEATURE_SCHEMA`] is the only place the order lives;
//! vector assembly, load-time validation and the tests all read it from here.

use std::fmt;
use std::ops::RangeInclusive;

/// Number of slots in a [`FeatureVector`](crate::FeatureVector).
pub const FEATURE_COUNT: usize = 12;

/// The model was trained on age in days; the form collects years.
pub const AGE_DAYS_PER_YEAR: u32 = 365;

/// One named slot of the feature vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    Age,
    Gender,
    Height,
    Weight,
    Systolic,
    Diastolic,
    Cholesterol,
    Glucose,
    Smoker,
    Alcohol,
    Active,
    Bmi,
}

/// How a slot is encoded on the model side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Encoding {
    /// Age collected in years, fed to the model in days.
    YearsAsDays,
    /// Plain integer measurement.
    Integer,
    /// Continuous measurement.
    Continuous,
    /// Categorical code drawn from a fixed set.
    Code(&'static [u8]),
    /// 0 or 1.
    Flag,
}

/// Schema entry for a single slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureSpec {
    pub feature: Feature,
    /// Training column name, also the JSON form key.
    pub name: &'static str,
    pub encoding: Encoding,
    /// Inclusive range accepted at the collection boundary, in form units.
    pub min: f32,
    pub max: f32,
}

impl FeatureSpec {
    pub fn domain(&self) -> RangeInclusive<f32> {
        self.min..=self.max
    }

    /// Checks a form-unit value against this slot's domain and encoding.
    pub fn accepts(&self, value: f32) -> bool {
        if !value.is_finite() || !self.domain().contains(&value) {
            return false;
        }
        match self.encoding {
            Encoding::Code(codes) => codes.iter().any(|&c| f32::from(c) == value),
            Encoding::Flag | Encoding::Integer | Encoding::YearsAsDays => value.fract() == 0.0,
            Encoding::Continuous => true,
        }
    }

    /// Parses a form-unit value and checks it against this slot.
    pub fn parse(&self, raw: &str) -> Result<f32, String> {
        let value: f32 = raw.trim().parse()
            .map_err(|_| format!("'{}' is not a number", raw))?;
        if !self.accepts(value) {
            return Err(format!("{} must be in {}..={}, got {}", self.name, self.min, self.max, value));
        }
        Ok(value)
    }
}

const LEVEL_CODES: &[u8] = &[1, 2, 3];

/// The training-time column order. Position `i` here is position `i` in every
/// vector handed to the model.
pub static FEATURE_SCHEMA: [FeatureSpec; FEATURE_COUNT] = [
    FeatureSpec { feature: Feature::Age, name: "age", encoding: Encoding::YearsAsDays, min: 25.0, max: 70.0 },
    FeatureSpec { feature: Feature::Gender, name: "gender", encoding: Encoding::Code(&[1, 2]), min: 1.0, max: 2.0 },
    FeatureSpec { feature: Feature::Height, name: "height", encoding: Encoding::Continuous, min: 50.0, max: 250.0 },
    FeatureSpec { feature: Feature::Weight, name: "weight", encoding: Encoding::Continuous, min: 30.0, max: 200.0 },
    FeatureSpec { feature: Feature::Systolic, name: "ap_hi", encoding: Encoding::Integer, min: 60.0, max: 240.0 },
    FeatureSpec { feature: Feature::Diastolic, name: "ap_lo", encoding: Encoding::Integer, min: 40.0, max: 180.0 },
    FeatureSpec { feature: Feature::Cholesterol, name: "cholesterol", encoding: Encoding::Code(LEVEL_CODES), min: 1.0, max: 3.0 },
    FeatureSpec { feature: Feature::Glucose, name: "gluc", encoding: Encoding::Code(LEVEL_CODES), min: 1.0, max: 3.0 },
    FeatureSpec { feature: Feature::Smoker, name: "smoke", encoding: Encoding::Flag, min: 0.0, max: 1.0 },
    FeatureSpec { feature: Feature::Alcohol, name: "alco", encoding: Encoding::Flag, min: 0.0, max: 1.0 },
    FeatureSpec { feature: Feature::Active, name: "active", encoding: Encoding::Flag, min: 0.0, max: 1.0 },
    FeatureSpec { feature: Feature::Bmi, name: "bmi", encoding: Encoding::Continuous, min: 10.0, max: 50.0 },
];

impl Feature {
    /// Slot index in the model input row.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn spec(self) -> &'static FeatureSpec {
        &FEATURE_SCHEMA[self.index()]
    }

    pub fn name(self) -> &'static str {
        self.spec().name
    }

    /// All features in model order.
    pub fn all() -> impl Iterator<Item = Feature> {
        FEATURE_SCHEMA.iter().map(|spec| spec.feature)
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Column names in model order, as stored in a `feature_names` metadata entry.
pub fn feature_names() -> Vec<&'static str> {
    FEATURE_SCHEMA.iter().map(|spec| spec.name).collect()
}
