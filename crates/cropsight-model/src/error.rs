//! Error types for artifact loading and inference.

use std::path::PathBuf;

/// Failure to load or validate a model artifact.
///
/// These only occur at startup. A service that sees one keeps running with
/// its bundle marked unavailable.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("Failed to read artifact {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse artifact {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Artifact {path} is not a cropsight artifact (format tag '{found}')")]
    UnknownFormat { path: PathBuf, found: String },

    #[error("Artifact {path} has version {found}, only version {supported} is supported")]
    UnsupportedVersion {
        path: PathBuf,
        found: u32,
        supported: u32,
    },

    #[error("Artifact {path} holds a {found}, expected a {expected}")]
    WrongKind {
        path: PathBuf,
        expected: &'static str,
        found: String,
    },

    #[error("Invalid {component}: {message}")]
    Invalid {
        component: &'static str,
        message: String,
    },
}

impl ArtifactError {
    pub(crate) fn invalid(component: &'static str, message: impl Into<String>) -> Self {
        ArtifactError::Invalid {
            component,
            message: message.into(),
        }
    }
}

/// Failure while transforming or predicting a single request.
///
/// The `Display` text is what callers of the HTTP services see verbatim.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InferenceError {
    #[error("X has {found} features, but {component} is expecting {expected} features as input.")]
    FeatureMismatch {
        component: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("{component} has no classes to predict")]
    NoClasses { component: &'static str },

    #[error("Tree {tree} references missing node {node}")]
    CorruptTree { tree: usize, node: usize },

    #[error("Class index {index} is out of range for {classes} classes")]
    ClassOutOfRange { index: usize, classes: usize },
}

pub type ArtifactResult<T> = Result<T, ArtifactError>;
pub type InferenceResult<T> = Result<T, InferenceError>;
