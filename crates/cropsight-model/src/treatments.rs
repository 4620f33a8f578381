//! Disease label to treatment text mapping.

use crate::artifact::{Artifact, ArtifactKind};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Returned when a predicted label has no treatment entry.
pub const NO_TREATMENT_FOUND: &str = "No specific treatment found";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Treatments(IndexMap<String, String>);

impl Treatments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, label: impl Into<String>, treatment: impl Into<String>) {
        self.0.insert(label.into(), treatment.into());
    }

    pub fn get(&self, label: &str) -> Option<&str> {
        self.0.get(label).map(String::as_str)
    }

    /// Treatment for `label`, or [`NO_TREATMENT_FOUND`].
    pub fn lookup(&self, label: &str) -> &str {
        self.get(label).unwrap_or(NO_TREATMENT_FOUND)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Treatments {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl Artifact for Treatments {
    const KIND: ArtifactKind = ArtifactKind::Treatments;
}
