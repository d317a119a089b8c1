//! Feature pipeline: samples → selected strategies → feature table (+ fitted artifacts).

use super::{LexicalExtractor, StatisticalExtractor, Strategy, SyntacticExtractor};
use crate::config::PipelineConfig;
use crate::model::FeatureBundle;
use crate::schema::{AlignmentPolicy, ReferenceSchema, SchemaAligner};
use crate::table::{FeatureTable, TableError};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug)]
pub enum PipelineError {
    Table(TableError),
    /// The bundle enables a strategy but carries no fitted artifact for it
    MissingArtifact(Strategy),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Table(err) => write!(f, "table error: {}", err),
            Self::MissingArtifact(s) => write!(f, "bundle has no fitted artifact for {:?}", s),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Table(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TableError> for PipelineError {
    fn from(value: TableError) -> Self {
        Self::Table(value)
    }
}

pub struct FeaturePipeline {
    strategies: BTreeSet<Strategy>,
    statistical: StatisticalExtractor,
    lexical: LexicalExtractor,
    syntactic: SyntacticExtractor,
    aligner: SchemaAligner,
}

impl FeaturePipeline {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            strategies: config.strategies.clone(),
            statistical: StatisticalExtractor::new(),
            lexical: LexicalExtractor::new(config.lexical.clone()),
            syntactic: SyntacticExtractor::new(&config.syntactic),
            aligner: SchemaAligner::new(AlignmentPolicy::Intersect, None),
        }
    }

    pub fn strategies(&self) -> &BTreeSet<Strategy> {
        &self.strategies
    }

    /// Run every configured strategy on a training batch and capture the fitted artifacts
    pub fn fit(&self, table: &FeatureTable) -> Result<(FeatureTable, FeatureBundle), PipelineError> {
        let mut out = table.clone();
        let mut vectorizer = None;
        let mut taxonomy = None;

        for strategy in &self.strategies {
            out = match strategy {
                Strategy::Statistical => self.statistical.extract(&out)?,
                Strategy::Lexical => {
                    let (t, v) = self.lexical.extract(&out)?;
                    vectorizer = Some(v);
                    t
                }
                Strategy::Syntactic => {
                    let (t, report) = self.syntactic.extract(&out)?;
                    taxonomy = Some(report.taxonomy);
                    t
                }
            };
        }

        let schema = ReferenceSchema::of(&out, None);
        tracing::info!(
            rows = out.len(),
            columns = schema.len(),
            fingerprint = %schema.fingerprint(),
            "feature pipeline fitted"
        );
        let bundle = FeatureBundle::new(self.strategies.clone(), vectorizer, taxonomy, schema);
        Ok((out, bundle))
    }

    /// Apply a fitted bundle without refitting; output columns are exactly the bundle schema
    pub fn transform(&self, table: &FeatureTable, bundle: &FeatureBundle) -> Result<FeatureTable, PipelineError> {
        let mut out = table.clone();
        for strategy in &bundle.strategies {
            out = match strategy {
                Strategy::Statistical => self.statistical.extract(&out)?,
                Strategy::Lexical => {
                    let v = bundle
                        .vectorizer
                        .as_ref()
                        .ok_or(PipelineError::MissingArtifact(Strategy::Lexical))?;
                    self.lexical.apply(&out, v)?
                }
                Strategy::Syntactic => {
                    let taxonomy = bundle
                        .taxonomy
                        .as_ref()
                        .ok_or(PipelineError::MissingArtifact(Strategy::Syntactic))?;
                    self.syntactic.apply_taxonomy(&out, taxonomy)?.0
                }
            };
        }
        Ok(self.aligner.project(out, &bundle.schema))
    }
}
