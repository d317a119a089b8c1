//! Feature table: the batch of samples plus numeric columns appended by extractors.
//!
//! Sample fields are the fixed core of every row and are never renamed, reordered
//! or removed. Feature columns are keyed by `(group, name)` so a lexical term can
//! never shadow a statistical or syntactic column of the same spelling.

mod sample;

pub use sample::{read_samples, Sample};

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Which extractor produced a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnGroup {
    Statistical,
    Lexical,
    Syntactic,
}

impl ColumnGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnGroup::Statistical => "statistical",
            ColumnGroup::Lexical => "lexical",
            ColumnGroup::Syntactic => "syntactic",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColumnKey {
    pub group: ColumnGroup,
    pub name: String,
}

impl ColumnKey {
    pub fn new(group: ColumnGroup, name: impl Into<String>) -> Self {
        Self {
            group,
            name: name.into(),
        }
    }
}

impl fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group.as_str(), self.name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub key: ColumnKey,
    pub values: Vec<f64>,
}

#[derive(Debug)]
pub enum TableError {
    DuplicateColumn(ColumnKey),
    LengthMismatch {
        key: ColumnKey,
        expected: usize,
        actual: usize,
    },
    Io(std::io::Error),
    Sample {
        line: usize,
        source: serde_json::Error,
    },
}

impl fmt::Display for TableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateColumn(key) => write!(f, "column {} already exists", key),
            Self::LengthMismatch {
                key,
                expected,
                actual,
            } => write!(
                f,
                "column {} has {} values, table has {} rows",
                key, actual, expected
            ),
            Self::Io(err) => write!(f, "io error: {}", err),
            Self::Sample { line, source } => write!(f, "invalid sample on line {}: {}", line, source),
        }
    }
}

impl std::error::Error for TableError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Sample { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<std::io::Error> for TableError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureTable {
    samples: Vec<Sample>,
    columns: Vec<Column>,
    index: HashMap<ColumnKey, usize>,
}

impl FeatureTable {
    pub fn new(samples: Vec<Sample>) -> Self {
        Self {
            samples,
            columns: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn from_sources<I, S>(sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(sources.into_iter().map(Sample::from_source).collect())
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> + '_ {
        self.samples.iter().map(Sample::text)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_keys(&self) -> impl Iterator<Item = &ColumnKey> + '_ {
        self.columns.iter().map(|c| &c.key)
    }

    /// Keys of the given group, or of every feature column when `group` is `None`
    pub fn keys_in(&self, group: Option<ColumnGroup>) -> Vec<ColumnKey> {
        self.columns
            .iter()
            .filter(|c| group.map_or(true, |g| c.key.group == g))
            .map(|c| c.key.clone())
            .collect()
    }

    pub fn contains(&self, key: &ColumnKey) -> bool {
        self.index.contains_key(key)
    }

    pub fn column(&self, key: &ColumnKey) -> Option<&[f64]> {
        self.index.get(key).map(|&i| self.columns[i].values.as_slice())
    }

    pub fn get(&self, group: ColumnGroup, name: &str) -> Option<&[f64]> {
        self.column(&ColumnKey::new(group, name))
    }

    pub fn value(&self, row: usize, key: &ColumnKey) -> Option<f64> {
        self.column(key).and_then(|v| v.get(row).copied())
    }

    /// Append a column at the end of the feature set
    pub fn push_column(&mut self, key: ColumnKey, values: Vec<f64>) -> Result<(), TableError> {
        if self.index.contains_key(&key) {
            return Err(TableError::DuplicateColumn(key));
        }
        if values.len() != self.samples.len() {
            return Err(TableError::LengthMismatch {
                key,
                expected: self.samples.len(),
                actual: values.len(),
            });
        }
        self.index.insert(key.clone(), self.columns.len());
        self.columns.push(Column { key, values });
        Ok(())
    }

    /// Remove the named feature columns; keys not present are ignored
    pub fn drop_columns(&mut self, keys: &BTreeSet<ColumnKey>) {
        if keys.is_empty() {
            return;
        }
        self.columns.retain(|c| !keys.contains(&c.key));
        self.reindex();
    }

    /// Rebuild the feature set as exactly `keys`, in that order; missing columns are zero-filled
    pub fn project(&mut self, keys: &[ColumnKey]) {
        let rows = self.samples.len();
        let mut old: HashMap<ColumnKey, Vec<f64>> = self
            .columns
            .drain(..)
            .map(|c| (c.key, c.values))
            .collect();
        self.columns = keys
            .iter()
            .map(|k| Column {
                key: k.clone(),
                values: old.remove(k).unwrap_or_else(|| vec![0.0; rows]),
            })
            .collect();
        self.reindex();
    }

    /// Dense row-major matrix of the given columns, for classifier input
    pub fn to_matrix(&self, keys: &[ColumnKey]) -> Array2<f32> {
        let mut out = Array2::<f32>::zeros((self.samples.len(), keys.len()));
        for (j, key) in keys.iter().enumerate() {
            if let Some(values) = self.column(key) {
                for (i, v) in values.iter().enumerate() {
                    out[[i, j]] = *v as f32;
                }
            }
        }
        out
    }

    /// JSON object for one row: sample fields followed by `group:name` features
    pub fn row_json(&self, row: usize) -> Option<serde_json::Value> {
        let sample = self.samples.get(row)?;
        let mut obj = match serde_json::to_value(sample) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        };
        for c in &self.columns {
            obj.insert(c.key.to_string(), serde_json::json!(c.values[row]));
        }
        Some(serde_json::Value::Object(obj))
    }

    fn reindex(&mut self) {
        self.index = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.key.clone(), i))
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_rejects_duplicate_and_short_columns() {
        let mut t = FeatureTable::from_sources(["a", "b"]);
        let key = ColumnKey::new(ColumnGroup::Lexical, "x");
        t.push_column(key.clone(), vec![1.0, 2.0]).unwrap();
        assert!(matches!(
            t.push_column(key, vec![0.0, 0.0]),
            Err(TableError::DuplicateColumn(_))
        ));
        assert!(matches!(
            t.push_column(ColumnKey::new(ColumnGroup::Lexical, "y"), vec![0.0]),
            Err(TableError::LengthMismatch { expected: 2, actual: 1, .. })
        ));
    }

    #[test]
    fn same_name_in_different_groups_is_allowed() {
        let mut t = FeatureTable::from_sources(["a"]);
        t.push_column(ColumnKey::new(ColumnGroup::Statistical, "entropy"), vec![1.0])
            .unwrap();
        t.push_column(ColumnKey::new(ColumnGroup::Lexical, "entropy"), vec![0.5])
            .unwrap();
        assert_eq!(t.get(ColumnGroup::Lexical, "entropy"), Some(&[0.5][..]));
    }

    #[test]
    fn project_reorders_and_zero_fills() {
        let mut t = FeatureTable::from_sources(["a", "b"]);
        let a = ColumnKey::new(ColumnGroup::Lexical, "a");
        let b = ColumnKey::new(ColumnGroup::Lexical, "b");
        let c = ColumnKey::new(ColumnGroup::Lexical, "c");
        t.push_column(a.clone(), vec![1.0, 2.0]).unwrap();
        t.push_column(b.clone(), vec![3.0, 4.0]).unwrap();
        t.project(&[c.clone(), b.clone()]);
        assert_eq!(t.keys_in(None), vec![c.clone(), b.clone()]);
        assert_eq!(t.column(&c), Some(&[0.0, 0.0][..]));
        assert_eq!(t.column(&b), Some(&[3.0, 4.0][..]));
        assert!(!t.contains(&a));
    }

    #[test]
    fn missing_text_reads_as_empty() {
        let s: Sample = serde_json::from_str(r#"{"js": null, "malicious": true}"#).unwrap();
        assert_eq!(s.text(), "");
        assert_eq!(s.malicious, Some(true));
    }

    #[test]
    fn integer_labels_are_accepted() {
        let s: Sample = serde_json::from_str(r#"{"js": "x", "malicious": 1, "obfuscated": 0}"#).unwrap();
        assert_eq!(s.malicious, Some(true));
        assert_eq!(s.obfuscated, Some(false));

        let s: Sample = serde_json::from_str(r#"{"js": "x", "malicious": "1", "obfuscated": "yes"}"#).unwrap();
        assert_eq!(s.malicious, Some(true));
        assert_eq!(s.obfuscated, None);

        let rows = read_samples("{\"js\": \"a\", \"malicious\": 0}\n{\"js\": \"b\", \"malicious\": null}\n".as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].malicious, Some(false));
        assert_eq!(rows[1].malicious, None);
    }
}
