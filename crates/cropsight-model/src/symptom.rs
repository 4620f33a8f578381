//! Symptom-text disease identification.

use crate::artifact;
use crate::classifier::Classifier;
use crate::error::{ArtifactResult, InferenceResult};
use crate::treatments::Treatments;
use crate::vectorizer::TextVectorizer;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Predicted disease and the treatment advice for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnosis {
    pub disease: String,
    pub treatment: String,
}

/// Fitted vectorizer, classifier and treatment table.
#[derive(Debug, Clone)]
pub struct SymptomBundle {
    vectorizer: TextVectorizer,
    classifier: Classifier,
    treatments: Treatments,
}

impl SymptomBundle {
    pub fn new(vectorizer: TextVectorizer, classifier: Classifier, treatments: Treatments) -> Self {
        if vectorizer.n_features() != classifier.n_features() {
            tracing::warn!(
                vectorizer_features = vectorizer.n_features(),
                classifier_features = classifier.n_features(),
                "Symptom artifacts disagree on feature count, predictions will fail"
            );
        }
        Self {
            vectorizer,
            classifier,
            treatments,
        }
    }

    pub fn load(
        vectorizer_path: impl AsRef<Path>,
        model_path: impl AsRef<Path>,
        treatments_path: impl AsRef<Path>,
    ) -> ArtifactResult<Self> {
        let vectorizer: TextVectorizer = artifact::load(vectorizer_path)?;
        let classifier: Classifier = artifact::load(model_path)?;
        let treatments: Treatments = artifact::load(treatments_path)?;
        Ok(Self::new(vectorizer, classifier, treatments))
    }

    pub fn classes(&self) -> &[String] {
        self.classifier.classes()
    }

    pub fn treatments(&self) -> &Treatments {
        &self.treatments
    }

    /// Vectorize the raw text, predict a disease and look up its treatment.
    pub fn diagnose(&self, symptoms: &str) -> InferenceResult<Diagnosis> {
        let row = self.vectorizer.transform(symptoms);
        let disease = self.classifier.predict(&row)?;
        let treatment = self.treatments.lookup(&disease).to_string();
        Ok(Diagnosis { disease, treatment })
    }
}
