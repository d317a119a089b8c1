//! TF-IDF term features over raw source text.
//!
//! Fitting and transforming are separate so a vocabulary fitted on a training
//! corpus can be persisted and applied to single samples later. Refitting on a
//! one-document batch leaves every term in 100% of documents and therefore
//! yields an empty vocabulary.

use crate::config::LexicalConfig;
use crate::table::{ColumnGroup, ColumnKey, FeatureTable, TableError};
use ndarray::Array2;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

fn token_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b\w\w+\b").expect("token pattern"))
}

/// Word tokens of two or more characters
pub fn tokenize(text: &str, lowercase: bool) -> Vec<String> {
    let text = if lowercase {
        text.to_lowercase()
    } else {
        text.to_string()
    };
    token_pattern()
        .find_iter(&text)
        .map(|m| m.as_str().to_string())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    /// Retained terms, sorted
    terms: Vec<String>,
    /// Smoothed inverse document frequency per term
    idf: Vec<f64>,
    sublinear_tf: bool,
    lowercase: bool,
    /// Corpus size the vocabulary was fitted on
    documents: usize,
    #[serde(skip)]
    lookup: HashMap<String, usize>,
}

impl TfidfVectorizer {
    /// Learn vocabulary and IDF weights. Terms need `df >= min_df` and `df <= max_df * n`.
    pub fn fit<S: AsRef<str>>(docs: &[S], config: &LexicalConfig) -> Self {
        let n = docs.len();
        let mut df: BTreeMap<String, usize> = BTreeMap::new();
        for doc in docs {
            let mut seen: Vec<String> = tokenize(doc.as_ref(), config.lowercase);
            seen.sort_unstable();
            seen.dedup();
            for term in seen {
                *df.entry(term).or_insert(0) += 1;
            }
        }

        let max_doc_count = config.max_df * n as f64;
        let (terms, idf): (Vec<String>, Vec<f64>) = df
            .into_iter()
            .filter(|(_, d)| *d >= config.min_df && (*d as f64) <= max_doc_count)
            .map(|(term, d)| {
                let idf = ((1.0 + n as f64) / (1.0 + d as f64)).ln() + 1.0;
                (term, idf)
            })
            .unzip();

        if terms.is_empty() {
            tracing::warn!(
                documents = n,
                min_df = config.min_df,
                max_df = config.max_df,
                "document-frequency bounds leave no terms; vocabulary is empty"
            );
        } else {
            tracing::info!(documents = n, terms = terms.len(), "lexical vocabulary fitted");
        }

        let mut v = Self {
            terms,
            idf,
            sublinear_tf: config.sublinear_tf,
            lowercase: config.lowercase,
            documents: n,
            lookup: HashMap::new(),
        };
        v.rebuild_lookup();
        v
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn idf(&self) -> &[f64] {
        &self.idf
    }

    pub fn documents(&self) -> usize {
        self.documents
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// One L2-normalized row per document, one column per vocabulary term
    pub fn transform<S: AsRef<str>>(&self, docs: &[S]) -> Array2<f64> {
        let mut out = Array2::<f64>::zeros((docs.len(), self.terms.len()));
        if self.terms.is_empty() {
            return out;
        }
        for (i, doc) in docs.iter().enumerate() {
            let mut tf: HashMap<usize, u64> = HashMap::new();
            for token in tokenize(doc.as_ref(), self.lowercase) {
                if let Some(j) = self.index_of(&token) {
                    *tf.entry(j).or_insert(0) += 1;
                }
            }
            for (j, count) in tf {
                let weight = if self.sublinear_tf {
                    1.0 + (count as f64).ln()
                } else {
                    count as f64
                };
                out[[i, j]] = weight * self.idf[j];
            }
            let norm = out.row(i).iter().map(|v| v * v).sum::<f64>().sqrt();
            if norm > 0.0 {
                out.row_mut(i).mapv_inplace(|v| v / norm);
            }
        }
        out
    }

    fn index_of(&self, term: &str) -> Option<usize> {
        if self.lookup.len() == self.terms.len() {
            return self.lookup.get(term).copied();
        }
        // deserialized without the lookup; terms are sorted
        self.terms.binary_search_by(|t| t.as_str().cmp(term)).ok()
    }

    /// Restore the term index after deserialization
    pub fn rebuild_lookup(&mut self) {
        self.lookup = self
            .terms
            .iter()
            .enumerate()
            .map(|(j, t)| (t.clone(), j))
            .collect();
    }
}

#[derive(Debug, Clone)]
pub struct LexicalExtractor {
    config: LexicalConfig,
}

impl LexicalExtractor {
    pub fn new(config: LexicalConfig) -> Self {
        Self { config }
    }

    pub fn fit(&self, table: &FeatureTable) -> TfidfVectorizer {
        let docs: Vec<&str> = table.texts().collect();
        TfidfVectorizer::fit(&docs, &self.config)
    }

    /// Fit on this batch and append one column per retained term
    pub fn extract(&self, table: &FeatureTable) -> Result<(FeatureTable, TfidfVectorizer), TableError> {
        let vectorizer = self.fit(table);
        let out = self.apply(table, &vectorizer)?;
        Ok((out, vectorizer))
    }

    /// Append term columns of an already fitted vocabulary
    pub fn apply(&self, table: &FeatureTable, vectorizer: &TfidfVectorizer) -> Result<FeatureTable, TableError> {
        let docs: Vec<&str> = table.texts().collect();
        let matrix = vectorizer.transform(&docs);
        let mut out = table.clone();
        for (j, term) in vectorizer.terms().iter().enumerate() {
            out.push_column(
                ColumnKey::new(ColumnGroup::Lexical, term.clone()),
                matrix.column(j).to_vec(),
            )?;
        }
        Ok(out)
    }
}
