//! AST node-type frequency features.
//!
//! Each row is parsed independently; rows that fail to parse keep their sample
//! fields and read 0.0 in every node-type column. The column set of a batch is
//! the union of node types seen in its parseable rows, so inference batches
//! should use [`SyntacticExtractor::apply_taxonomy`] with the training taxonomy.

mod parse;
mod scan;
mod tree;

pub use parse::{parse_script, ParseError, ParseLimits};
pub use scan::{estimate_nesting, NestingEstimate};
pub use tree::{NodeId, NodeType, SyntaxTree, Walk};

use crate::config::SyntacticConfig;
use crate::table::{ColumnGroup, ColumnKey, FeatureTable, TableError};
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet, HashMap};

pub type NodeCounts = BTreeMap<NodeType, u32>;

/// Node-type counts of a single source
pub fn count_node_types(source: &str, limits: &ParseLimits) -> Result<NodeCounts, ParseError> {
    parse_script(source, limits).map(|tree| tree.node_type_counts())
}

#[derive(Debug, Clone, Default)]
pub struct SyntacticReport {
    pub rows: usize,
    pub parsed: usize,
    /// Row index and reason for every row excluded from node-type counting
    pub failures: Vec<(usize, ParseError)>,
    pub taxonomy: Vec<NodeType>,
    /// Node types seen in this batch but outside a supplied taxonomy
    pub unseen: BTreeSet<NodeType>,
}

#[derive(Debug, Clone)]
pub struct SyntacticExtractor {
    limits: ParseLimits,
    workers: usize,
}

impl SyntacticExtractor {
    pub fn new(config: &SyntacticConfig) -> Self {
        Self {
            limits: ParseLimits::from(config),
            workers: config.worker_count(),
        }
    }

    pub fn limits(&self) -> &ParseLimits {
        &self.limits
    }

    /// Append one column per node type seen in this batch
    pub fn extract(&self, table: &FeatureTable) -> Result<(FeatureTable, SyntacticReport), TableError> {
        let parsed = self.parse_rows(table);
        let taxonomy: BTreeSet<NodeType> = parsed
            .iter()
            .filter_map(|r| r.as_ref().ok())
            .flat_map(|counts| counts.keys().copied())
            .collect();
        let taxonomy: Vec<NodeType> = taxonomy.into_iter().collect();
        self.materialize(table, parsed, taxonomy)
    }

    /// Append exactly the columns of `taxonomy`; other node types are ignored
    pub fn apply_taxonomy(
        &self,
        table: &FeatureTable,
        taxonomy: &[NodeType],
    ) -> Result<(FeatureTable, SyntacticReport), TableError> {
        let parsed = self.parse_rows(table);
        self.materialize(table, parsed, taxonomy.to_vec())
    }

    fn parse_rows(&self, table: &FeatureTable) -> Vec<Result<NodeCounts, ParseError>> {
        let texts: Vec<&str> = table.texts().collect();
        let limits = &self.limits;
        let workers = self.workers.clamp(1, texts.len().max(1));
        if workers == 1 {
            return texts.iter().map(|t| count_node_types(t, limits)).collect();
        }

        let pool = rayon::ThreadPoolBuilder::new().num_threads(workers).build();
        match pool {
            Ok(pool) => pool.install(|| {
                texts
                    .par_iter()
                    .map(|t| count_node_types(t, limits))
                    .collect()
            }),
            Err(error) => {
                tracing::warn!(%error, "parse worker pool unavailable; parsing sequentially");
                texts.iter().map(|t| count_node_types(t, limits)).collect()
            }
        }
    }

    fn materialize(
        &self,
        table: &FeatureTable,
        parsed: Vec<Result<NodeCounts, ParseError>>,
        taxonomy: Vec<NodeType>,
    ) -> Result<(FeatureTable, SyntacticReport), TableError> {
        let position: HashMap<NodeType, usize> =
            taxonomy.iter().enumerate().map(|(j, k)| (*k, j)).collect();
        let mut report = SyntacticReport {
            rows: parsed.len(),
            ..SyntacticReport::default()
        };
        let mut columns: Vec<Vec<f64>> = vec![vec![0.0; parsed.len()]; taxonomy.len()];

        for (row, result) in parsed.into_iter().enumerate() {
            let counts = match result {
                Ok(counts) => counts,
                Err(error) => {
                    tracing::debug!(row, %error, "row excluded from syntactic features");
                    report.failures.push((row, error));
                    continue;
                }
            };
            report.parsed += 1;
            for (kind, count) in counts {
                match position.get(&kind) {
                    Some(&j) => columns[j][row] = f64::from(count),
                    None => {
                        report.unseen.insert(kind);
                    }
                }
            }
        }

        let mut out = table.clone();
        for (kind, values) in taxonomy.iter().zip(columns) {
            out.push_column(ColumnKey::new(ColumnGroup::Syntactic, kind.as_str()), values)?;
        }

        if !report.unseen.is_empty() {
            tracing::debug!(unseen = report.unseen.len(), "node types outside taxonomy ignored");
        }
        tracing::info!(
            rows = report.rows,
            parsed = report.parsed,
            failed = report.failures.len(),
            node_types = taxonomy.len(),
            "syntactic features extracted"
        );
        report.taxonomy = taxonomy;
        Ok((out, report))
    }
}
