//! # Cropsight Model
//!
//! Loading and inference for the pre-trained artifacts behind the cropsight
//! prediction services.
//!
//! ## Modules
//!
//! - [`artifact`]: versioned JSON envelope, load/save/inspect
//! - [`scaler`]: fitted standard and min-max scalers
//! - [`vectorizer`]: fitted bag-of-words / tf-idf text vectorizer
//! - [`classifier`]: linear, naive Bayes, random forest and k-nearest models
//! - [`soil`]: soil reading and the crop recommendation bundle
//! - [`symptom`]: symptom text and the disease identification bundle
//! - [`bundle`]: load-once handle that degrades instead of failing
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cropsight_model::{BundleHandle, SoilBundle};
//!
//! let handle = BundleHandle::load_or_degrade("soil", || {
//!     SoilBundle::load("models/scaler.json", "models/crop_model.json")
//! });
//! if let Some(bundle) = handle.get() {
//!     let crop = bundle.recommend(&reading)?;
//! }
//! ```

pub mod artifact;
pub mod bundle;
pub mod classifier;
pub mod error;
pub mod features;
pub mod scaler;
pub mod soil;
pub mod symptom;
pub mod treatments;
pub mod vectorizer;

pub use artifact::{ArtifactKind, ArtifactSummary, ARTIFACT_FORMAT, ARTIFACT_VERSION};
pub use bundle::BundleHandle;
pub use classifier::{Classifier, DecisionTree, TreeNode};
pub use error::{ArtifactError, InferenceError};
pub use features::{FeatureRow, SparseVector};
pub use scaler::Scaler;
pub use soil::{SoilBundle, SoilReading, SOIL_FEATURES};
pub use symptom::{Diagnosis, SymptomBundle};
pub use treatments::{Treatments, NO_TREATMENT_FOUND};
pub use vectorizer::{Norm, TextVectorizer, TextVectorizerBuilder};
