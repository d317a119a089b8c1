//! Classifier seam. The trained model itself is loaded elsewhere and handed in
//! as an immutable handle together with the feature bundle it was trained on.

mod bundle;
mod verdict;

pub use bundle::{BundleError, FeatureBundle, BUNDLE_VERSION};
pub use verdict::Verdict;

use crate::config::PipelineConfig;
use crate::features::{FeaturePipeline, PipelineError};
use crate::table::{FeatureTable, Sample};
use ndarray::ArrayView2;
use std::fmt;
use std::sync::Arc;

/// A trained model: one prediction per input row
pub trait Classifier: Send + Sync {
    fn predict(&self, features: ArrayView2<'_, f32>) -> Result<Vec<f32>, ModelError>;
}

#[derive(Debug)]
pub enum ModelError {
    Pipeline(PipelineError),
    Prediction(String),
    /// Classifier returned a different number of predictions than rows
    OutputShape { expected: usize, actual: usize },
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pipeline(err) => write!(f, "feature pipeline: {}", err),
            Self::Prediction(msg) => write!(f, "prediction failed: {}", msg),
            Self::OutputShape { expected, actual } => {
                write!(f, "expected {} predictions, got {}", expected, actual)
            }
        }
    }
}

impl std::error::Error for ModelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Pipeline(err) => Some(err),
            _ => None,
        }
    }
}

impl From<PipelineError> for ModelError {
    fn from(value: PipelineError) -> Self {
        Self::Pipeline(value)
    }
}

/// Built once at startup and shared read-only for the process lifetime
#[derive(Clone)]
pub struct ModelHandle {
    classifier: Arc<dyn Classifier>,
    bundle: Arc<FeatureBundle>,
    pipeline: Arc<FeaturePipeline>,
}

impl ModelHandle {
    pub fn new(classifier: Arc<dyn Classifier>, bundle: FeatureBundle, config: &PipelineConfig) -> Self {
        Self {
            classifier,
            bundle: Arc::new(bundle),
            pipeline: Arc::new(FeaturePipeline::new(config)),
        }
    }

    pub fn bundle(&self) -> &FeatureBundle {
        &self.bundle
    }

    /// Score a batch; the result has one verdict per row
    pub fn classify_table(&self, table: &FeatureTable) -> Result<Vec<Verdict>, ModelError> {
        let features = self.pipeline.transform(table, &self.bundle)?;
        let matrix = features.to_matrix(&self.bundle.schema.columns);
        let predictions = self.classifier.predict(matrix.view())?;
        if predictions.len() != table.len() {
            return Err(ModelError::OutputShape {
                expected: table.len(),
                actual: predictions.len(),
            });
        }
        Ok(predictions.into_iter().map(Verdict::from_prediction).collect())
    }

    /// Score one source snippet
    pub fn classify(&self, source: &str) -> Result<Verdict, ModelError> {
        let table = FeatureTable::new(vec![Sample::from_source(source)]);
        let verdict = self
            .classify_table(&table)?
            .into_iter()
            .next()
            .ok_or(ModelError::OutputShape {
                expected: 1,
                actual: 0,
            })?;
        tracing::debug!(len = source.len(), verdict = verdict.label(), "sample classified");
        Ok(verdict)
    }
}
