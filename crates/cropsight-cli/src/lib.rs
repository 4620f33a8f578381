//! Cropsight CLI library - testable functions and modules
//!
//! Hosts the two prediction services (crop recommendation and disease
//! detection), a client for calling them, and the plant height monitor.

pub mod client;
pub mod config;
pub mod cors;
pub mod market;
pub mod monitor;
pub mod rejection;
pub mod soil_api;
pub mod symptom_api;

use anyhow::Result;
use config::{LoggingConfig, SoilServiceConfig, SymptomServiceConfig};
use cropsight_model::{BundleHandle, SoilBundle, SymptomBundle, SOIL_FEATURES};
use soil_api::SharedSoilBundle;
use symptom_api::SharedSymptomBundle;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber. `RUST_LOG` overrides the configured level.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| anyhow::anyhow!("Invalid log level '{}': {}", config.level, e))?;

    let registry = tracing_subscriber::registry().with(filter);
    match config.format.to_lowercase().as_str() {
        "json" => registry.with(fmt::layer().json()).try_init()?,
        "text" => registry.with(fmt::layer()).try_init()?,
        other => anyhow::bail!("Unsupported log format: {}. Use 'text' or 'json'", other),
    }
    Ok(())
}

/// Load the crop recommendation artifacts, degrading on failure.
pub fn load_soil_bundle(config: &SoilServiceConfig) -> SharedSoilBundle {
    let handle = BundleHandle::load_or_degrade("soil", || {
        SoilBundle::load(&config.scaler_path, &config.model_path)
    });
    if let Some(bundle) = handle.get() {
        tracing::info!(
            classes = bundle.classes().len(),
            features = SOIL_FEATURES.len(),
            scaler = %config.scaler_path.display(),
            model = %config.model_path.display(),
            "Crop recommendation model ready"
        );
    }
    handle
}

/// Load the disease detection artifacts, degrading on failure.
pub fn load_symptom_bundle(config: &SymptomServiceConfig) -> SharedSymptomBundle {
    let handle = BundleHandle::load_or_degrade("symptom", || {
        SymptomBundle::load(
            &config.vectorizer_path,
            &config.model_path,
            &config.treatments_path,
        )
    });
    if let Some(bundle) = handle.get() {
        tracing::info!(
            classes = bundle.classes().len(),
            treatments = bundle.treatments().len(),
            vectorizer = %config.vectorizer_path.display(),
            model = %config.model_path.display(),
            "Disease detection model ready"
        );
    }
    handle
}
