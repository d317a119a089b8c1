//! Maps a raw classifier prediction onto the binary verdict returned to callers.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Benign,
    Malicious,
}

impl Verdict {
    /// 0 is benign; any other prediction is malicious
    pub fn from_prediction(prediction: f32) -> Self {
        if prediction == 0.0 {
            Verdict::Benign
        } else {
            Verdict::Malicious
        }
    }

    /// Wire label: "0" benign, "1" malicious
    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Benign => "0",
            Verdict::Malicious => "1",
        }
    }
}
