//! Character, punctuation and API-keyword statistics over raw source text.
//!
//! The column layout is fixed and versioned: a classifier trained on one layout
//! version must be retrained when names or order change.

use super::entropy::shannon_entropy;
use crate::table::{ColumnGroup, ColumnKey, FeatureTable, TableError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

pub const STATISTICAL_LAYOUT_VERSION: u8 = 1;

/// Column names in the order they are appended
pub const STATISTICAL_LAYOUT: [&str; STATISTICAL_COUNT] = [
    "js_length",
    "num_spaces",
    "num_parenthesis",
    "num_slash",
    "num_plus",
    "num_point",
    "num_comma",
    "num_semicolon",
    "num_alpha",
    "num_numeric",
    "ratio_spaces",
    "ratio_alpha",
    "ratio_numeric",
    "ratio_parenthesis",
    "ratio_slash",
    "ratio_plus",
    "ratio_point",
    "ratio_comma",
    "ratio_semicolon",
    "entropy",
    "num_string_oper",
    "ratio_num_string_oper",
    "num_encoding_oper",
    "ratio_num_encoding_oper",
    "num_url_redirection",
    "ratio_num_url_redirection",
    "num_specific_func",
    "ratio_num_specific_func",
];

pub const STATISTICAL_COUNT: usize = 28;

/// API keyword lists. Matching is case-sensitive substring counting, so
/// `escape` also fires inside `unescape` and `setTime` inside `setTimeout`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeywordBucket {
    StringOperation,
    Encoding,
    UrlRedirection,
    SpecificBehavior,
}

impl KeywordBucket {
    pub const ALL: [KeywordBucket; 4] = [
        KeywordBucket::StringOperation,
        KeywordBucket::Encoding,
        KeywordBucket::UrlRedirection,
        KeywordBucket::SpecificBehavior,
    ];

    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            KeywordBucket::StringOperation => {
                &["substring", "charAt", "split", "concat", "slice", "substr"]
            }
            KeywordBucket::Encoding => &["escape", "unescape", "string", "fromCharCode"],
            KeywordBucket::UrlRedirection => &[
                "setTimeout",
                "location.reload",
                "location.replace",
                "document.URL",
                "document.location",
                "document.referrer",
            ],
            KeywordBucket::SpecificBehavior => &[
                "eval",
                "setTime",
                "setInterval",
                "ActiveXObject",
                "createElement",
                "document.write",
                "document.writeln",
                "document.replaceChildren",
            ],
        }
    }

    /// Sum of non-overlapping occurrence counts of each keyword
    pub fn count(&self, text: &str) -> u64 {
        self.keywords()
            .iter()
            .map(|kw| text.matches(kw).count() as u64)
            .sum()
    }
}

fn word_char() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\w").expect("word character pattern"))
}

fn ascii_digit() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[0-9]").expect("digit pattern"))
}

/// Per-sample statistics; ratios are derived in [`StatisticalFeatures::to_values`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatisticalFeatures {
    /// Length in characters
    pub length: u64,
    pub spaces: u64,
    pub parenthesis: u64,
    pub slash: u64,
    pub plus: u64,
    pub point: u64,
    pub comma: u64,
    pub semicolon: u64,
    pub alpha: u64,
    pub numeric: u64,
    pub entropy: f64,
    pub string_oper: u64,
    pub encoding_oper: u64,
    pub url_redirection: u64,
    pub specific_func: u64,
}

impl StatisticalFeatures {
    pub fn from_source(text: &str) -> Self {
        let mut s = StatisticalFeatures::default();
        for c in text.chars() {
            s.length += 1;
            match c {
                ' ' => s.spaces += 1,
                '(' | ')' => s.parenthesis += 1,
                '/' => s.slash += 1,
                '+' => s.plus += 1,
                '.' => s.point += 1,
                ',' => s.comma += 1,
                ';' => s.semicolon += 1,
                _ => {}
            }
        }
        s.alpha = word_char().find_iter(text).count() as u64;
        s.numeric = ascii_digit().find_iter(text).count() as u64;
        s.entropy = shannon_entropy(text);
        s.string_oper = KeywordBucket::StringOperation.count(text);
        s.encoding_oper = KeywordBucket::Encoding.count(text);
        s.url_redirection = KeywordBucket::UrlRedirection.count(text);
        s.specific_func = KeywordBucket::SpecificBehavior.count(text);
        s
    }

    /// `count / length`, defined as 0.0 for empty text
    pub fn ratio(&self, count: u64) -> f64 {
        if self.length == 0 {
            0.0
        } else {
            count as f64 / self.length as f64
        }
    }

    /// Values in [`STATISTICAL_LAYOUT`] order
    pub fn to_values(&self) -> [f64; STATISTICAL_COUNT] {
        [
            self.length as f64,
            self.spaces as f64,
            self.parenthesis as f64,
            self.slash as f64,
            self.plus as f64,
            self.point as f64,
            self.comma as f64,
            self.semicolon as f64,
            self.alpha as f64,
            self.numeric as f64,
            self.ratio(self.spaces),
            self.ratio(self.alpha),
            self.ratio(self.numeric),
            self.ratio(self.parenthesis),
            self.ratio(self.slash),
            self.ratio(self.plus),
            self.ratio(self.point),
            self.ratio(self.comma),
            self.ratio(self.semicolon),
            self.entropy,
            self.string_oper as f64,
            self.ratio(self.string_oper),
            self.encoding_oper as f64,
            self.ratio(self.encoding_oper),
            self.url_redirection as f64,
            self.ratio(self.url_redirection),
            self.specific_func as f64,
            self.ratio(self.specific_func),
        ]
    }
}

pub fn statistical_keys() -> Vec<ColumnKey> {
    STATISTICAL_LAYOUT
        .iter()
        .map(|name| ColumnKey::new(ColumnGroup::Statistical, *name))
        .collect()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StatisticalExtractor;

impl StatisticalExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Append the statistical columns to a copy of `table`. Never drops rows.
    pub fn extract(&self, table: &FeatureTable) -> Result<FeatureTable, TableError> {
        let rows: Vec<[f64; STATISTICAL_COUNT]> = table
            .texts()
            .map(|text| StatisticalFeatures::from_source(text).to_values())
            .collect();

        let mut out = table.clone();
        for (j, key) in statistical_keys().into_iter().enumerate() {
            out.push_column(key, rows.iter().map(|r| r[j]).collect())?;
        }
        tracing::debug!(rows = out.len(), columns = STATISTICAL_COUNT, "statistical features extracted");
        Ok(out)
    }
}
