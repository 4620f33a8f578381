//! Versioned artifact envelope.
//!
//! Every fitted object is stored as a JSON document:
//!
//! ```json
//! {
//!   "format": "cropsight-artifact",
//!   "version": 1,
//!   "kind": "scaler",
//!   "payload": { "type": "standard", "mean": [..], "scale": [..] }
//! }
//! ```
//!
//! The loader checks the format tag, the version and the kind before touching
//! the payload, so an artifact produced for another purpose or by an
//! incompatible trainer is rejected with a precise [`ArtifactError`].

use crate::error::{ArtifactError, ArtifactResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Format tag carried by every artifact.
pub const ARTIFACT_FORMAT: &str = "cropsight-artifact";

/// The only envelope version this build understands.
pub const ARTIFACT_VERSION: u32 = 1;

/// What an artifact contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Scaler,
    Classifier,
    TextVectorizer,
    Treatments,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Scaler => "scaler",
            ArtifactKind::Classifier => "classifier",
            ArtifactKind::TextVectorizer => "text_vectorizer",
            ArtifactKind::Treatments => "treatments",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Envelope with an undecoded payload.
#[derive(Debug, Deserialize)]
struct RawEnvelope {
    format: String,
    version: u32,
    kind: String,
    #[serde(default)]
    payload: serde_json::Value,
}

/// Envelope used when writing artifacts.
#[derive(Debug, Serialize)]
struct Envelope<'a, T: Serialize> {
    format: &'static str,
    version: u32,
    kind: ArtifactKind,
    payload: &'a T,
}

/// Payload types that can be stored as an artifact.
pub trait Artifact: DeserializeOwned + Serialize {
    const KIND: ArtifactKind;

    /// Check internal consistency after decoding.
    fn validate(&self) -> ArtifactResult<()> {
        Ok(())
    }
}

/// Read, check and decode an artifact from disk.
pub fn load<T: Artifact>(path: impl AsRef<Path>) -> ArtifactResult<T> {
    let path = path.as_ref();
    let raw = read_envelope(path)?;

    if raw.kind != T::KIND.as_str() {
        return Err(ArtifactError::WrongKind {
            path: path.to_path_buf(),
            expected: T::KIND.as_str(),
            found: raw.kind,
        });
    }

    let payload: T = serde_json::from_value(raw.payload).map_err(|e| ArtifactError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    payload.validate()?;

    tracing::debug!(path = %path.display(), kind = %T::KIND, "Loaded artifact");
    Ok(payload)
}

/// Encode an artifact into its JSON envelope.
pub fn to_json<T: Artifact>(payload: &T) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&Envelope {
        format: ARTIFACT_FORMAT,
        version: ARTIFACT_VERSION,
        kind: T::KIND,
        payload,
    })
}

/// Write an artifact to disk.
pub fn save<T: Artifact>(payload: &T, path: impl AsRef<Path>) -> ArtifactResult<()> {
    let path = path.as_ref();
    let json = to_json(payload).map_err(|e| ArtifactError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    std::fs::write(path, json).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn read_envelope(path: &Path) -> ArtifactResult<RawEnvelope> {
    let content = std::fs::read_to_string(path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let raw: RawEnvelope = serde_json::from_str(&content).map_err(|e| ArtifactError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    if raw.format != ARTIFACT_FORMAT {
        return Err(ArtifactError::UnknownFormat {
            path: path.to_path_buf(),
            found: raw.format,
        });
    }
    if raw.version != ARTIFACT_VERSION {
        return Err(ArtifactError::UnsupportedVersion {
            path: path.to_path_buf(),
            found: raw.version,
            supported: ARTIFACT_VERSION,
        });
    }
    Ok(raw)
}

/// Short description of an artifact, for the `inspect` command.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtifactSummary {
    pub kind: ArtifactKind,
    pub version: u32,
    /// Scaler/vectorizer output width or classifier input width.
    pub features: Option<usize>,
    /// Class labels, or treatment labels for a treatments table.
    pub labels: Vec<String>,
    /// Model family for classifiers and scalers.
    pub variant: Option<String>,
}

/// Load any artifact and summarise it without knowing its kind up front.
pub fn inspect(path: impl AsRef<Path>) -> ArtifactResult<ArtifactSummary> {
    use crate::classifier::Classifier;
    use crate::scaler::Scaler;
    use crate::treatments::Treatments;
    use crate::vectorizer::TextVectorizer;

    let path = path.as_ref();
    let raw = read_envelope(path)?;
    let version = raw.version;

    let summary = match raw.kind.as_str() {
        "scaler" => {
            let scaler: Scaler = load(path)?;
            ArtifactSummary {
                kind: ArtifactKind::Scaler,
                version,
                features: Some(scaler.n_features()),
                labels: Vec::new(),
                variant: Some(scaler.variant().to_string()),
            }
        }
        "classifier" => {
            let classifier: Classifier = load(path)?;
            ArtifactSummary {
                kind: ArtifactKind::Classifier,
                version,
                features: Some(classifier.n_features()),
                labels: classifier.classes().to_vec(),
                variant: Some(classifier.variant().to_string()),
            }
        }
        "text_vectorizer" => {
            let vectorizer: TextVectorizer = load(path)?;
            ArtifactSummary {
                kind: ArtifactKind::TextVectorizer,
                version,
                features: Some(vectorizer.n_features()),
                labels: Vec::new(),
                variant: None,
            }
        }
        "treatments" => {
            let treatments: Treatments = load(path)?;
            ArtifactSummary {
                kind: ArtifactKind::Treatments,
                version,
                features: None,
                labels: treatments.labels().map(str::to_string).collect(),
                variant: None,
            }
        }
        other => {
            return Err(ArtifactError::Parse {
                path: path.to_path_buf(),
                message: format!("unknown artifact kind '{}'", other),
            })
        }
    };
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scaler::Scaler;

    fn write(dir: &Path, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scaler.json");
        let scaler = Scaler::standard(vec![1.0, 2.0], vec![0.5, 4.0]).unwrap();
        save(&scaler, &path).unwrap();

        let loaded: Scaler = load(&path).unwrap();
        assert_eq!(loaded, scaler);
    }

    #[test]
    fn test_treatments_keep_file_order() {
        use crate::treatments::Treatments;

        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "treatments.json",
            r#"{"format": "cropsight-artifact", "version": 1, "kind": "treatments",
                "payload": {"Powdery Mildew": "Sulfur spray", "Aphids": "Neem oil",
                            "Leaf Rust": "Triazole fungicide"}}"#,
        );

        let loaded: Treatments = load(&path).unwrap();
        assert_eq!(
            loaded.labels().collect::<Vec<_>>(),
            vec!["Powdery Mildew", "Aphids", "Leaf Rust"]
        );
        assert_eq!(
            inspect(&path).unwrap().labels,
            vec!["Powdery Mildew", "Aphids", "Leaf Rust"]
        );
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load::<Scaler>(dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, ArtifactError::Io { .. }));
    }

    #[test]
    fn test_rejects_foreign_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "a.json",
            r#"{"format": "joblib", "version": 1, "kind": "scaler", "payload": {}}"#,
        );
        let err = load::<Scaler>(&path).unwrap_err();
        assert!(matches!(err, ArtifactError::UnknownFormat { ref found, .. } if found == "joblib"));
    }

    #[test]
    fn test_rejects_future_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "a.json",
            r#"{"format": "cropsight-artifact", "version": 2, "kind": "scaler", "payload": {}}"#,
        );
        let err = load::<Scaler>(&path).unwrap_err();
        assert!(matches!(
            err,
            ArtifactError::UnsupportedVersion {
                found: 2,
                supported: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_wrong_kind() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "a.json",
            r#"{"format": "cropsight-artifact", "version": 1, "kind": "treatments", "payload": {}}"#,
        );
        let err = load::<Scaler>(&path).unwrap_err();
        assert!(err.to_string().contains("expected a scaler"));
    }

    #[test]
    fn test_corrupt_json_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "a.json", "{ not json");
        let err = load::<Scaler>(&path).unwrap_err();
        assert!(matches!(err, ArtifactError::Parse { .. }));
    }

    #[test]
    fn test_inspect_scaler() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scaler.json");
        save(&Scaler::standard(vec![0.0; 7], vec![1.0; 7]).unwrap(), &path).unwrap();

        let summary = inspect(&path).unwrap();
        assert_eq!(summary.kind, ArtifactKind::Scaler);
        assert_eq!(summary.version, ARTIFACT_VERSION);
        assert_eq!(summary.features, Some(7));
        assert_eq!(summary.variant.as_deref(), Some("standard"));
    }
}
