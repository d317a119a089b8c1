//! One input row: source text plus optional labels.

use super::TableError;
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};
use std::io::BufRead;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Raw JavaScript source; `None` is read as empty text
    #[serde(default)]
    pub js: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub js_filename: Option<String>,
    /// Accepts `true`/`false`, `0`/`1` and their string forms
    #[serde(default, deserialize_with = "deserialize_label_lenient", skip_serializing_if = "Option::is_none")]
    pub malicious: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_label_lenient", skip_serializing_if = "Option::is_none")]
    pub obfuscated: Option<bool>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawLabel {
    Flag(bool),
    Number(f64),
    Text(String),
    Other(IgnoredAny),
}

/// Unrecognized label values read as unlabelled rather than failing the row
fn deserialize_label_lenient<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawLabel>::deserialize(deserializer)?;
    Ok(match raw {
        Some(RawLabel::Flag(flag)) => Some(flag),
        Some(RawLabel::Number(n)) => Some(n != 0.0),
        Some(RawLabel::Text(text)) => match text.trim().to_ascii_lowercase().as_str() {
            "1" | "true" => Some(true),
            "0" | "false" => Some(false),
            _ => None,
        },
        Some(RawLabel::Other(_)) | None => None,
    })
}

impl Sample {
    pub fn from_source(js: impl Into<String>) -> Self {
        Self {
            js: Some(js.into()),
            ..Self::default()
        }
    }

    pub fn text(&self) -> &str {
        self.js.as_deref().unwrap_or("")
    }
}

/// Read JSON-lines samples. Blank lines are skipped; line numbers in errors are 1-based.
pub fn read_samples(reader: impl BufRead) -> Result<Vec<Sample>, TableError> {
    let mut out = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let sample = serde_json::from_str::<Sample>(&line).map_err(|source| TableError::Sample {
            line: idx + 1,
            source,
        })?;
        out.push(sample);
    }
    Ok(out)
}
