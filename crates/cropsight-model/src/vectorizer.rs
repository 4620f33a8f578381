//! Fitted bag-of-words text vectorizer with optional tf-idf weighting.

use crate::artifact::{Artifact, ArtifactKind};
use crate::error::{ArtifactError, ArtifactResult};
use crate::features::SparseVector;
use regex::Regex;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

/// Default tokenizer: runs of two or more word characters.
pub const DEFAULT_TOKEN_PATTERN: &str = r"(?u)\b\w\w+\b";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Norm {
    L1,
    L2,
}

/// On-disk form of [`TextVectorizer`]; the token regex is compiled from it on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorizerSpec {
    vocabulary: FxHashMap<String, usize>,
    #[serde(default)]
    idf: Option<Vec<f64>>,
    #[serde(default = "default_true")]
    lowercase: bool,
    #[serde(default = "default_token_pattern")]
    token_pattern: String,
    #[serde(default = "default_ngram_range")]
    ngram_range: (usize, usize),
    #[serde(default)]
    stop_words: Vec<String>,
    #[serde(default)]
    binary: bool,
    #[serde(default)]
    sublinear_tf: bool,
    #[serde(default = "default_norm")]
    norm: Option<Norm>,
}

fn default_true() -> bool {
    true
}

fn default_token_pattern() -> String {
    DEFAULT_TOKEN_PATTERN.to_string()
}

fn default_ngram_range() -> (usize, usize) {
    (1, 1)
}

fn default_norm() -> Option<Norm> {
    Some(Norm::L2)
}

/// Maps free text to a sparse term vector over a fixed vocabulary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "VectorizerSpec", into = "VectorizerSpec")]
pub struct TextVectorizer {
    spec: VectorizerSpec,
    token_re: Regex,
    stop_words: FxHashSet<String>,
}

impl TryFrom<VectorizerSpec> for TextVectorizer {
    type Error = ArtifactError;

    fn try_from(spec: VectorizerSpec) -> ArtifactResult<Self> {
        let token_re = Regex::new(&spec.token_pattern).map_err(|e| {
            ArtifactError::invalid("text vectorizer", format!("bad token pattern: {}", e))
        })?;
        let stop_words = spec.stop_words.iter().cloned().collect();
        let vectorizer = Self {
            spec,
            token_re,
            stop_words,
        };
        vectorizer.validate()?;
        Ok(vectorizer)
    }
}

impl From<TextVectorizer> for VectorizerSpec {
    fn from(v: TextVectorizer) -> Self {
        v.spec
    }
}

/// Builder used by tests and tooling to create vectorizers in code.
#[derive(Debug, Clone)]
pub struct TextVectorizerBuilder {
    spec: VectorizerSpec,
}

impl TextVectorizerBuilder {
    /// Start from a vocabulary; terms are assigned columns in iteration order.
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let vocabulary = terms
            .into_iter()
            .enumerate()
            .map(|(i, t)| (t.into(), i))
            .collect();
        Self {
            spec: VectorizerSpec {
                vocabulary,
                idf: None,
                lowercase: true,
                token_pattern: default_token_pattern(),
                ngram_range: (1, 1),
                stop_words: Vec::new(),
                binary: false,
                sublinear_tf: false,
                norm: default_norm(),
            },
        }
    }

    pub fn idf(mut self, idf: Vec<f64>) -> Self {
        self.spec.idf = Some(idf);
        self
    }

    pub fn norm(mut self, norm: Option<Norm>) -> Self {
        self.spec.norm = norm;
        self
    }

    pub fn ngram_range(mut self, min: usize, max: usize) -> Self {
        self.spec.ngram_range = (min, max);
        self
    }

    pub fn stop_words<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.spec.stop_words = words.into_iter().map(Into::into).collect();
        self
    }

    pub fn binary(mut self, binary: bool) -> Self {
        self.spec.binary = binary;
        self
    }

    pub fn sublinear_tf(mut self, sublinear: bool) -> Self {
        self.spec.sublinear_tf = sublinear;
        self
    }

    pub fn lowercase(mut self, lowercase: bool) -> Self {
        self.spec.lowercase = lowercase;
        self
    }

    pub fn build(self) -> ArtifactResult<TextVectorizer> {
        TextVectorizer::try_from(self.spec)
    }
}

impl TextVectorizer {
    /// Width of the produced vectors.
    pub fn n_features(&self) -> usize {
        self.spec.vocabulary.len()
    }

    /// Column of a vocabulary term.
    pub fn column(&self, term: &str) -> Option<usize> {
        self.spec.vocabulary.get(term).copied()
    }

    /// Split text into the terms the vocabulary is keyed on.
    pub fn analyze(&self, text: &str) -> Vec<String> {
        let text = if self.spec.lowercase {
            text.to_lowercase()
        } else {
            text.to_string()
        };

        let tokens: Vec<&str> = self
            .token_re
            .find_iter(&text)
            .map(|m| m.as_str())
            .filter(|t| !self.stop_words.contains(*t))
            .collect();

        let (min_n, max_n) = self.spec.ngram_range;
        if min_n == 1 && max_n == 1 {
            return tokens.into_iter().map(str::to_string).collect();
        }

        let mut terms = Vec::new();
        for n in min_n..=max_n.min(tokens.len()) {
            for window in tokens.windows(n) {
                terms.push(window.join(" "));
            }
        }
        terms
    }

    /// Vectorize one document. Unknown terms are ignored.
    pub fn transform(&self, text: &str) -> SparseVector {
        let dimension = self.n_features();
        let pairs = self
            .analyze(text)
            .into_iter()
            .filter_map(|term| self.column(&term).map(|col| (col, 1.0)));
        let mut row = SparseVector::from_pairs(dimension, pairs);

        if self.spec.binary {
            row.map_values(|_, _| 1.0);
        }
        if self.spec.sublinear_tf {
            row.map_values(|_, tf| 1.0 + tf.ln());
        }
        if let Some(idf) = &self.spec.idf {
            row.map_values(|col, tf| tf * idf.get(col).copied().unwrap_or(1.0));
        }

        let norm = match self.spec.norm {
            Some(Norm::L2) => row.values().iter().map(|v| v * v).sum::<f64>().sqrt(),
            Some(Norm::L1) => row.values().iter().map(|v| v.abs()).sum(),
            None => 0.0,
        };
        if norm > 0.0 {
            row.scale(1.0 / norm);
        }
        row
    }
}

impl Artifact for TextVectorizer {
    const KIND: ArtifactKind = ArtifactKind::TextVectorizer;

    fn validate(&self) -> ArtifactResult<()> {
        let spec = &self.spec;
        if spec.vocabulary.is_empty() {
            return Err(ArtifactError::invalid("text vectorizer", "empty vocabulary"));
        }
        let width = spec.vocabulary.len();
        if let Some((term, col)) = spec.vocabulary.iter().find(|(_, col)| **col >= width) {
            return Err(ArtifactError::invalid(
                "text vectorizer",
                format!("term '{}' maps to column {} of {}", term, col, width),
            ));
        }
        if let Some(idf) = &spec.idf {
            if idf.len() != width {
                return Err(ArtifactError::invalid(
                    "text vectorizer",
                    format!("idf has {} entries for {} terms", idf.len(), width),
                ));
            }
        }
        let (min_n, max_n) = spec.ngram_range;
        if min_n == 0 || min_n > max_n {
            return Err(ArtifactError::invalid(
                "text vectorizer",
                format!("invalid ngram range ({}, {})", min_n, max_n),
            ));
        }
        Ok(())
    }
}
