//! jsguard-features — turns raw JavaScript source into numeric feature vectors
//! for malicious/benign classification.
//!
//! Modular structure:
//! - [`table`] — Samples and the feature table extractors append to
//! - [`features`] — Statistical, lexical (TF-IDF) and syntactic (AST) extractors
//! - [`schema`] — Reference schemas and train/inference column alignment
//! - [`model`] — Classifier seam, verdicts and persisted feature bundles
//! - [`logging`] — Structured JSON logging

pub mod config;
pub mod table;
pub mod features;
pub mod schema;
pub mod model;
pub mod logging;

pub use config::PipelineConfig;
pub use table::{ColumnGroup, ColumnKey, FeatureTable, Sample};
pub use features::{FeaturePipeline, Strategy};
pub use schema::{ReferenceSchema, SchemaAligner};
pub use model::{Classifier, FeatureBundle, ModelHandle, Verdict};
pub use logging::StructuredLogger;
