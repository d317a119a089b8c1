//! Fitted pipeline artifacts persisted next to a trained classifier.

use crate::features::{NodeType, Strategy, TfidfVectorizer};
use crate::schema::ReferenceSchema;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

pub const BUNDLE_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureBundle {
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub strategies: BTreeSet<Strategy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vectorizer: Option<TfidfVectorizer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taxonomy: Option<Vec<NodeType>>,
    pub schema: ReferenceSchema,
    /// Fingerprint of `schema` at save time
    pub fingerprint: String,
}

#[derive(Debug)]
pub enum BundleError {
    Io(std::io::Error),
    Json(serde_json::Error),
    UnsupportedVersion(u32),
    FingerprintMismatch { stored: String, computed: String },
}

impl fmt::Display for BundleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "io error: {}", err),
            Self::Json(err) => write!(f, "invalid bundle: {}", err),
            Self::UnsupportedVersion(v) => write!(f, "unsupported bundle version {}", v),
            Self::FingerprintMismatch { stored, computed } => write!(
                f,
                "schema fingerprint mismatch: stored {}, computed {}",
                stored, computed
            ),
        }
    }
}

impl std::error::Error for BundleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for BundleError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for BundleError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl FeatureBundle {
    pub fn new(
        strategies: BTreeSet<Strategy>,
        vectorizer: Option<TfidfVectorizer>,
        taxonomy: Option<Vec<NodeType>>,
        schema: ReferenceSchema,
    ) -> Self {
        let fingerprint = schema.fingerprint();
        Self {
            version: BUNDLE_VERSION,
            created_at: Utc::now(),
            strategies,
            vectorizer,
            taxonomy,
            schema,
            fingerprint,
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), BundleError> {
        let data = serde_json::to_string_pretty(self)?;
        std::fs::write(path, data)?;
        tracing::info!(path = %path.display(), columns = self.schema.len(), "feature bundle saved");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, BundleError> {
        let data = std::fs::read_to_string(path)?;
        let mut bundle: FeatureBundle = serde_json::from_str(&data)?;
        if bundle.version != BUNDLE_VERSION {
            return Err(BundleError::UnsupportedVersion(bundle.version));
        }
        let computed = bundle.schema.fingerprint();
        if computed != bundle.fingerprint {
            return Err(BundleError::FingerprintMismatch {
                stored: bundle.fingerprint,
                computed,
            });
        }
        if let Some(v) = bundle.vectorizer.as_mut() {
            v.rebuild_lookup();
        }
        tracing::info!(
            path = %path.display(),
            columns = bundle.schema.len(),
            fingerprint = %bundle.fingerprint,
            "feature bundle loaded"
        );
        Ok(bundle)
    }
}
