//! Load-once bundle handles.
//!
//! A service owns exactly one handle, fixed at startup: either the bundle
//! loaded and shared read-only, or the reason it could not be loaded. The
//! handle is cloned into every request handler; it is never re-evaluated.

use crate::error::ArtifactResult;
use std::fmt;
use std::sync::Arc;

pub enum BundleHandle<B> {
    Ready(Arc<B>),
    Unavailable(Arc<str>),
}

impl<B> BundleHandle<B> {
    pub fn ready(bundle: B) -> Self {
        BundleHandle::Ready(Arc::new(bundle))
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        BundleHandle::Unavailable(Arc::from(reason.into()))
    }

    /// Run `load` once. On failure the error is logged and the handle is
    /// marked unavailable instead of propagating.
    pub fn load_or_degrade(name: &str, load: impl FnOnce() -> ArtifactResult<B>) -> Self {
        match load() {
            Ok(bundle) => {
                tracing::info!(bundle = name, "Model bundle loaded");
                Self::ready(bundle)
            }
            Err(e) => {
                tracing::error!(
                    bundle = name,
                    error = %e,
                    "Failed to load model bundle, serving in degraded mode"
                );
                Self::unavailable(e.to_string())
            }
        }
    }

    pub fn get(&self) -> Option<&B> {
        match self {
            BundleHandle::Ready(bundle) => Some(&**bundle),
            BundleHandle::Unavailable(_) => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, BundleHandle::Ready(_))
    }

    /// Why loading failed, if it did.
    pub fn unavailable_reason(&self) -> Option<&str> {
        match self {
            BundleHandle::Ready(_) => None,
            BundleHandle::Unavailable(reason) => Some(&**reason),
        }
    }
}

impl<B> Clone for BundleHandle<B> {
    fn clone(&self) -> Self {
        match self {
            BundleHandle::Ready(bundle) => BundleHandle::Ready(Arc::clone(bundle)),
            BundleHandle::Unavailable(reason) => BundleHandle::Unavailable(Arc::clone(reason)),
        }
    }
}

impl<B> fmt::Debug for BundleHandle<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BundleHandle::Ready(_) => f.write_str("BundleHandle::Ready"),
            BundleHandle::Unavailable(reason) => {
                f.debug_tuple("BundleHandle::Unavailable").field(reason).finish()
            }
        }
    }
}
