//! Fitted feature scalers.

use crate::artifact::{Artifact, ArtifactKind};
use crate::error::{ArtifactError, ArtifactResult, InferenceError, InferenceResult};
use serde::{Deserialize, Serialize};

/// A fitted per-column affine transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Scaler {
    /// `(x - mean) / scale`, zero scale treated as one.
    Standard { mean: Vec<f64>, scale: Vec<f64> },
    /// `x * scale + min`.
    MinMax { min: Vec<f64>, scale: Vec<f64> },
}

impl Scaler {
    pub fn standard(mean: Vec<f64>, scale: Vec<f64>) -> ArtifactResult<Self> {
        let scaler = Scaler::Standard { mean, scale };
        scaler.validate()?;
        Ok(scaler)
    }

    pub fn min_max(min: Vec<f64>, scale: Vec<f64>) -> ArtifactResult<Self> {
        let scaler = Scaler::MinMax { min, scale };
        scaler.validate()?;
        Ok(scaler)
    }

    /// Number of columns the scaler was fitted on.
    pub fn n_features(&self) -> usize {
        match self {
            Scaler::Standard { mean, .. } => mean.len(),
            Scaler::MinMax { min, .. } => min.len(),
        }
    }

    pub fn variant(&self) -> &'static str {
        match self {
            Scaler::Standard { .. } => "standard",
            Scaler::MinMax { .. } => "min_max",
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Scaler::Standard { .. } => "StandardScaler",
            Scaler::MinMax { .. } => "MinMaxScaler",
        }
    }

    /// Scale one row. Values are not range checked.
    pub fn transform(&self, row: &[f64]) -> InferenceResult<Vec<f64>> {
        if row.len() != self.n_features() {
            return Err(InferenceError::FeatureMismatch {
                component: self.name(),
                expected: self.n_features(),
                found: row.len(),
            });
        }

        let out = match self {
            Scaler::Standard { mean, scale } => row
                .iter()
                .zip(mean)
                .zip(scale)
                .map(|((x, m), s)| if *s == 0.0 { x - m } else { (x - m) / s })
                .collect(),
            Scaler::MinMax { min, scale } => row
                .iter()
                .zip(min)
                .zip(scale)
                .map(|((x, lo), s)| x * s + lo)
                .collect(),
        };
        Ok(out)
    }
}

impl Artifact for Scaler {
    const KIND: ArtifactKind = ArtifactKind::Scaler;

    fn validate(&self) -> ArtifactResult<()> {
        let (offset, scale) = match self {
            Scaler::Standard { mean, scale } => (mean, scale),
            Scaler::MinMax { min, scale } => (min, scale),
        };
        if offset.is_empty() {
            return Err(ArtifactError::invalid("scaler", "no fitted columns"));
        }
        if offset.len() != scale.len() {
            return Err(ArtifactError::invalid(
                "scaler",
                format!(
                    "offset has {} columns but scale has {}",
                    offset.len(),
                    scale.len()
                ),
            ));
        }
        Ok(())
    }
}
