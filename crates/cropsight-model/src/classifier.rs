//! Fitted classifiers.
//!
//! Four model families cover what the offline trainer exports:
//!
//! - **linear**: one weight row per class (or a single row for two classes),
//!   highest decision score wins
//! - **multinomial_nb**: multinomial naive Bayes over term counts/weights
//! - **random_forest**: averaged class distributions of axis-aligned trees
//! - **k_nearest**: majority vote among the `k` closest fitted samples
//!
//! All of them accept any [`FeatureRow`], dense or sparse.

use crate::artifact::{Artifact, ArtifactKind};
use crate::error::{ArtifactError, ArtifactResult, InferenceError, InferenceResult};
use crate::features::FeatureRow;
use serde::{Deserialize, Serialize};

/// Marker for a leaf in [`TreeNode::left`]/[`TreeNode::right`].
pub const LEAF: i64 = -1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    #[serde(default)]
    pub feature: usize,
    #[serde(default)]
    pub threshold: f64,
    pub left: i64,
    pub right: i64,
    /// Class weights at this node; only read at leaves.
    #[serde(default)]
    pub value: Vec<f64>,
}

impl TreeNode {
    pub fn split(feature: usize, threshold: f64, left: usize, right: usize) -> Self {
        Self {
            feature,
            threshold,
            left: left as i64,
            right: right as i64,
            value: Vec::new(),
        }
    }

    pub fn leaf(value: Vec<f64>) -> Self {
        Self {
            feature: 0,
            threshold: 0.0,
            left: LEAF,
            right: LEAF,
            value,
        }
    }

    fn is_leaf(&self) -> bool {
        self.left == LEAF && self.right == LEAF
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    /// Walk from the root to a leaf and return its normalised class weights.
    fn leaf_distribution<R: FeatureRow + ?Sized>(
        &self,
        tree_index: usize,
        row: &R,
    ) -> InferenceResult<Vec<f64>> {
        let mut index = 0usize;
        // A well formed tree reaches a leaf in fewer steps than it has nodes.
        for _ in 0..=self.nodes.len() {
            let node = self.nodes.get(index).ok_or(InferenceError::CorruptTree {
                tree: tree_index,
                node: index,
            })?;
            if node.is_leaf() {
                let total: f64 = node.value.iter().sum();
                if total > 0.0 {
                    return Ok(node.value.iter().map(|v| v / total).collect());
                }
                return Ok(node.value.clone());
            }
            let next = if row.value(node.feature) <= node.threshold {
                node.left
            } else {
                node.right
            };
            index = usize::try_from(next).map_err(|_| InferenceError::CorruptTree {
                tree: tree_index,
                node: index,
            })?;
        }
        Err(InferenceError::CorruptTree {
            tree: tree_index,
            node: index,
        })
    }
}

/// A fitted classifier mapping a feature row to one of `classes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Classifier {
    Linear {
        classes: Vec<String>,
        coef: Vec<Vec<f64>>,
        intercept: Vec<f64>,
    },
    MultinomialNb {
        classes: Vec<String>,
        class_log_prior: Vec<f64>,
        feature_log_prob: Vec<Vec<f64>>,
    },
    RandomForest {
        classes: Vec<String>,
        n_features: usize,
        trees: Vec<DecisionTree>,
    },
    KNearest {
        classes: Vec<String>,
        k: usize,
        samples: Vec<Vec<f64>>,
        targets: Vec<usize>,
    },
}

impl Classifier {
    pub fn classes(&self) -> &[String] {
        match self {
            Classifier::Linear { classes, .. }
            | Classifier::MultinomialNb { classes, .. }
            | Classifier::RandomForest { classes, .. }
            | Classifier::KNearest { classes, .. } => classes,
        }
    }

    /// Width of the rows the classifier was fitted on.
    pub fn n_features(&self) -> usize {
        match self {
            Classifier::Linear { coef, .. } => coef.first().map_or(0, Vec::len),
            Classifier::MultinomialNb {
                feature_log_prob, ..
            } => feature_log_prob.first().map_or(0, Vec::len),
            Classifier::RandomForest { n_features, .. } => *n_features,
            Classifier::KNearest { samples, .. } => samples.first().map_or(0, Vec::len),
        }
    }

    pub fn variant(&self) -> &'static str {
        match self {
            Classifier::Linear { .. } => "linear",
            Classifier::MultinomialNb { .. } => "multinomial_nb",
            Classifier::RandomForest { .. } => "random_forest",
            Classifier::KNearest { .. } => "k_nearest",
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Classifier::Linear { .. } => "LinearClassifier",
            Classifier::MultinomialNb { .. } => "MultinomialNB",
            Classifier::RandomForest { .. } => "RandomForestClassifier",
            Classifier::KNearest { .. } => "KNeighborsClassifier",
        }
    }

    /// Predict the label of one row.
    pub fn predict<R: FeatureRow + ?Sized>(&self, row: &R) -> InferenceResult<String> {
        let index = self.predict_index(row)?;
        let classes = self.classes();
        classes
            .get(index)
            .cloned()
            .ok_or(InferenceError::ClassOutOfRange {
                index,
                classes: classes.len(),
            })
    }

    /// Predict the class index of one row.
    pub fn predict_index<R: FeatureRow + ?Sized>(&self, row: &R) -> InferenceResult<usize> {
        if self.classes().is_empty() {
            return Err(InferenceError::NoClasses {
                component: self.name(),
            });
        }
        if row.dimension() != self.n_features() {
            return Err(InferenceError::FeatureMismatch {
                component: self.name(),
                expected: self.n_features(),
                found: row.dimension(),
            });
        }

        match self {
            Classifier::Linear {
                coef, intercept, ..
            } => {
                if coef.len() == 1 {
                    let score = row.dot(&coef[0]) + intercept.first().copied().unwrap_or(0.0);
                    return Ok(usize::from(score > 0.0));
                }
                let scores = coef
                    .iter()
                    .zip(intercept)
                    .map(|(w, b)| row.dot(w) + b);
                Ok(argmax(scores))
            }
            Classifier::MultinomialNb {
                class_log_prior,
                feature_log_prob,
                ..
            } => {
                let scores = feature_log_prob
                    .iter()
                    .zip(class_log_prior)
                    .map(|(w, prior)| row.dot(w) + prior);
                Ok(argmax(scores))
            }
            Classifier::RandomForest { classes, trees, .. } => {
                let mut votes = vec![0.0; classes.len()];
                for (t, tree) in trees.iter().enumerate() {
                    let dist = tree.leaf_distribution(t, row)?;
                    for (acc, p) in votes.iter_mut().zip(dist) {
                        *acc += p;
                    }
                }
                Ok(argmax(votes.into_iter()))
            }
            Classifier::KNearest {
                classes,
                k,
                samples,
                targets,
            } => {
                let mut distances: Vec<(f64, usize)> = samples
                    .iter()
                    .zip(targets)
                    .map(|(s, t)| (row.squared_distance(s), *t))
                    .collect();
                distances.sort_by(|a, b| a.0.total_cmp(&b.0));

                let mut votes = vec![0usize; classes.len()];
                for (_, target) in distances.iter().take(*k) {
                    let slot = votes.get_mut(*target).ok_or(InferenceError::ClassOutOfRange {
                        index: *target,
                        classes: classes.len(),
                    })?;
                    *slot += 1;
                }
                Ok(argmax(votes.into_iter().map(|v| v as f64)))
            }
        }
    }
}

/// Index of the largest score; the first one wins ties.
fn argmax(scores: impl Iterator<Item = f64>) -> usize {
    let mut best = 0;
    let mut best_score = f64::NEG_INFINITY;
    for (i, s) in scores.enumerate() {
        if s > best_score {
            best = i;
            best_score = s;
        }
    }
    best
}

impl Artifact for Classifier {
    const KIND: ArtifactKind = ArtifactKind::Classifier;

    fn validate(&self) -> ArtifactResult<()> {
        let invalid = |message: String| ArtifactError::invalid("classifier", message);
        let n_classes = self.classes().len();
        if n_classes == 0 {
            return Err(invalid("no classes".into()));
        }

        match self {
            Classifier::Linear {
                coef, intercept, ..
            } => {
                let expected_rows = if n_classes == 2 && coef.len() == 1 {
                    1
                } else {
                    n_classes
                };
                if coef.len() != expected_rows || intercept.len() != expected_rows {
                    return Err(invalid(format!(
                        "{} classes need {} coefficient rows and intercepts, found {} and {}",
                        n_classes,
                        expected_rows,
                        coef.len(),
                        intercept.len()
                    )));
                }
                check_rectangular(coef, "coef")?;
            }
            Classifier::MultinomialNb {
                class_log_prior,
                feature_log_prob,
                ..
            } => {
                if class_log_prior.len() != n_classes || feature_log_prob.len() != n_classes {
                    return Err(invalid(format!(
                        "{} classes but {} priors and {} likelihood rows",
                        n_classes,
                        class_log_prior.len(),
                        feature_log_prob.len()
                    )));
                }
                check_rectangular(feature_log_prob, "feature_log_prob")?;
            }
            Classifier::RandomForest {
                n_features, trees, ..
            } => {
                if trees.is_empty() {
                    return Err(invalid("forest has no trees".into()));
                }
                for (t, tree) in trees.iter().enumerate() {
                    if tree.nodes.is_empty() {
                        return Err(invalid(format!("tree {} has no nodes", t)));
                    }
                    for (i, node) in tree.nodes.iter().enumerate() {
                        if node.is_leaf() {
                            if node.value.len() != n_classes {
                                return Err(invalid(format!(
                                    "tree {} leaf {} has {} class weights for {} classes",
                                    t,
                                    i,
                                    node.value.len(),
                                    n_classes
                                )));
                            }
                            continue;
                        }
                        let in_range =
                            |child: i64| child >= 0 && (child as usize) < tree.nodes.len();
                        if !in_range(node.left) || !in_range(node.right) {
                            return Err(invalid(format!(
                                "tree {} node {} has children {} and {}",
                                t, i, node.left, node.right
                            )));
                        }
                        if node.feature >= *n_features {
                            return Err(invalid(format!(
                                "tree {} node {} splits on feature {} of {}",
                                t, i, node.feature, n_features
                            )));
                        }
                    }
                }
            }
            Classifier::KNearest {
                k,
                samples,
                targets,
                ..
            } => {
                if *k == 0 || samples.is_empty() {
                    return Err(invalid("k and the sample set must be non-zero".into()));
                }
                if samples.len() != targets.len() {
                    return Err(invalid(format!(
                        "{} samples but {} targets",
                        samples.len(),
                        targets.len()
                    )));
                }
                if let Some(t) = targets.iter().find(|t| **t >= n_classes) {
                    return Err(invalid(format!(
                        "target {} out of range for {} classes",
                        t, n_classes
                    )));
                }
                check_rectangular(samples, "samples")?;
            }
        }
        Ok(())
    }
}

fn check_rectangular(rows: &[Vec<f64>], what: &str) -> ArtifactResult<()> {
    let width = rows.first().map_or(0, Vec::len);
    if width == 0 {
        return Err(ArtifactError::invalid(
            "classifier",
            format!("{} has no columns", what),
        ));
    }
    if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != width) {
        return Err(ArtifactError::invalid(
            "classifier",
            format!("{} row {} has {} columns, expected {}", what, i, row.len(), width),
        ));
    }
    Ok(())
}
