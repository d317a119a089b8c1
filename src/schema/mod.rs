//! Reference schemas and train/inference column reconciliation.

mod aligner;

pub use aligner::{AlignedSide, Alignment, AlignmentPolicy, SchemaAligner};

use crate::table::{ColumnGroup, ColumnKey, FeatureTable};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Ordered column set a trained classifier expects
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceSchema {
    pub columns: Vec<ColumnKey>,
}

impl ReferenceSchema {
    pub fn new(columns: Vec<ColumnKey>) -> Self {
        Self { columns }
    }

    /// Feature columns of `table`, optionally limited to one group
    pub fn of(table: &FeatureTable, group: Option<ColumnGroup>) -> Self {
        Self::new(table.keys_in(group))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// SHA-256 over `group:name` lines; changes with any rename or reorder
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for key in &self.columns {
            hasher.update(key.to_string().as_bytes());
            hasher.update(b"\n");
        }
        format!("{:x}", hasher.finalize())
    }
}
