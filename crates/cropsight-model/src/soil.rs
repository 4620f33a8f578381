//! Soil-feature crop recommendation.

use crate::artifact;
use crate::classifier::Classifier;
use crate::error::{ArtifactResult, InferenceResult};
use crate::scaler::Scaler;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Column order the scaler and classifier were fitted with.
pub const SOIL_FEATURES: [&str; 7] = ["N", "P", "K", "temperature", "humidity", "ph", "rainfall"];

/// Seven soil and climate measurements. No range checks are applied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SoilReading {
    #[serde(rename = "N", deserialize_with = "lenient_f64")]
    pub nitrogen: f64,
    #[serde(rename = "P", deserialize_with = "lenient_f64")]
    pub phosphorus: f64,
    #[serde(rename = "K", deserialize_with = "lenient_f64")]
    pub potassium: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub temperature: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub humidity: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub ph: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub rainfall: f64,
}

impl SoilReading {
    /// Values in [`SOIL_FEATURES`] order.
    pub fn to_features(&self) -> [f64; 7] {
        [
            self.nitrogen,
            self.phosphorus,
            self.potassium,
            self.temperature,
            self.humidity,
            self.ph,
            self.rainfall,
        ]
    }
}

/// Accept a JSON number or a string holding one.
fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    struct LenientF64;

    impl Visitor<'_> for LenientF64 {
        type Value = f64;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a number or a numeric string")
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<f64, E> {
            Ok(v)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<f64, E> {
            Ok(v as f64)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<f64, E> {
            Ok(v as f64)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<f64, E> {
            v.trim()
                .parse::<f64>()
                .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
        }
    }

    deserializer.deserialize_any(LenientF64)
}

/// Fitted scaler plus classifier for crop recommendation.
#[derive(Debug, Clone)]
pub struct SoilBundle {
    scaler: Scaler,
    classifier: Classifier,
}

impl SoilBundle {
    pub fn new(scaler: Scaler, classifier: Classifier) -> Self {
        if scaler.n_features() != SOIL_FEATURES.len()
            || classifier.n_features() != scaler.n_features()
        {
            tracing::warn!(
                scaler_features = scaler.n_features(),
                classifier_features = classifier.n_features(),
                expected = SOIL_FEATURES.len(),
                "Soil artifacts disagree on feature count, predictions will fail"
            );
        }
        Self { scaler, classifier }
    }

    pub fn load(scaler_path: impl AsRef<Path>, model_path: impl AsRef<Path>) -> ArtifactResult<Self> {
        let scaler: Scaler = artifact::load(scaler_path)?;
        let classifier: Classifier = artifact::load(model_path)?;
        Ok(Self::new(scaler, classifier))
    }

    pub fn classes(&self) -> &[String] {
        self.classifier.classes()
    }

    /// Scale the reading and predict one crop label.
    pub fn recommend(&self, reading: &SoilReading) -> InferenceResult<String> {
        let scaled = self.scaler.transform(&reading.to_features())?;
        self.classifier.predict(scaled.as_slice())
    }
}
