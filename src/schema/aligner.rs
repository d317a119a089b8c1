//! Column reconciliation between a fresh batch and a reference table.
//!
//! `remove_extra_columns` keeps the one-sided rule: batch surplus is dropped
//! first, and only when the batch has none is the reference trimmed and
//! returned. That leaves the other side's surplus in place. `Intersect`
//! trims the batch to the shared columns instead.

use super::ReferenceSchema;
use crate::table::{ColumnGroup, ColumnKey, FeatureTable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignmentPolicy {
    /// Batch restricted to columns present on both sides, in reference order
    Intersect,
    /// One-sided: trim the batch if it has surplus, otherwise trim the reference
    PreferBatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignedSide {
    Batch,
    Reference,
}

#[derive(Debug, Clone)]
pub struct Alignment {
    /// Which input `table` was derived from
    pub side: AlignedSide,
    pub table: FeatureTable,
    /// Columns removed from `table`
    pub dropped: BTreeSet<ColumnKey>,
    /// Columns of the other side that `table` still does not have
    pub missing: BTreeSet<ColumnKey>,
}

#[derive(Debug, Clone)]
pub struct SchemaAligner {
    policy: AlignmentPolicy,
    /// Only columns of this group are compared; `None` compares all feature columns
    scope: Option<ColumnGroup>,
}

impl SchemaAligner {
    pub fn new(policy: AlignmentPolicy, scope: Option<ColumnGroup>) -> Self {
        Self { policy, scope }
    }

    pub fn lexical(policy: AlignmentPolicy) -> Self {
        Self::new(policy, Some(ColumnGroup::Lexical))
    }

    pub fn policy(&self) -> AlignmentPolicy {
        self.policy
    }

    pub fn align(&self, batch: FeatureTable, reference: FeatureTable) -> Alignment {
        match self.policy {
            AlignmentPolicy::PreferBatch => self.remove_extra_columns(batch, reference),
            AlignmentPolicy::Intersect => self.intersect(batch, &reference),
        }
    }

    pub fn remove_extra_columns(&self, mut batch: FeatureTable, mut reference: FeatureTable) -> Alignment {
        let batch_cols = self.scoped(&batch);
        let ref_cols = self.scoped(&reference);
        let extra_batch: BTreeSet<ColumnKey> = batch_cols.difference(&ref_cols).cloned().collect();
        let extra_ref: BTreeSet<ColumnKey> = ref_cols.difference(&batch_cols).cloned().collect();

        if !extra_batch.is_empty() {
            batch.drop_columns(&extra_batch);
            tracing::debug!(dropped = extra_batch.len(), side = "batch", "schema surplus dropped");
            Alignment {
                side: AlignedSide::Batch,
                table: batch,
                dropped: extra_batch,
                missing: extra_ref,
            }
        } else {
            reference.drop_columns(&extra_ref);
            tracing::debug!(dropped = extra_ref.len(), side = "reference", "schema surplus dropped");
            Alignment {
                side: AlignedSide::Reference,
                table: reference,
                dropped: extra_ref,
                missing: BTreeSet::new(),
            }
        }
    }

    pub fn intersect(&self, mut batch: FeatureTable, reference: &FeatureTable) -> Alignment {
        let batch_cols = self.scoped(&batch);
        let ref_cols = self.scoped(reference);
        let dropped: BTreeSet<ColumnKey> = batch_cols.difference(&ref_cols).cloned().collect();
        let missing: BTreeSet<ColumnKey> = ref_cols.difference(&batch_cols).cloned().collect();

        // keep out-of-scope columns where they are, shared columns in reference order
        let order: Vec<ColumnKey> = batch
            .column_keys()
            .filter(|k| !self.in_scope(k))
            .cloned()
            .chain(
                reference
                    .column_keys()
                    .filter(|k| self.in_scope(k) && batch_cols.contains(*k))
                    .cloned(),
            )
            .collect();
        batch.project(&order);

        if !dropped.is_empty() || !missing.is_empty() {
            tracing::debug!(
                dropped = dropped.len(),
                missing = missing.len(),
                "batch intersected with reference schema"
            );
        }
        Alignment {
            side: AlignedSide::Batch,
            table: batch,
            dropped,
            missing,
        }
    }

    /// Exactly the reference columns in reference order; absent ones are zero-filled
    pub fn project(&self, mut table: FeatureTable, schema: &ReferenceSchema) -> FeatureTable {
        let present: BTreeSet<ColumnKey> = table.column_keys().cloned().collect();
        let zero_filled = schema.columns.iter().filter(|k| !present.contains(*k)).count();
        let expected: BTreeSet<&ColumnKey> = schema.columns.iter().collect();
        let discarded = present.iter().filter(|k| !expected.contains(k)).count();
        if zero_filled > 0 || discarded > 0 {
            tracing::debug!(zero_filled, discarded, "table projected onto reference schema");
        }
        table.project(&schema.columns);
        table
    }

    fn in_scope(&self, key: &ColumnKey) -> bool {
        self.scope.map_or(true, |g| key.group == g)
    }

    fn scoped(&self, table: &FeatureTable) -> BTreeSet<ColumnKey> {
        table.keys_in(self.scope).into_iter().collect()
    }
}
