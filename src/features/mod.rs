//! Feature extraction strategies over raw JavaScript source.

pub mod entropy;
pub mod lexical;
pub mod statistical;
pub mod syntactic;
mod pipeline;

pub use entropy::shannon_entropy;
pub use lexical::{LexicalExtractor, TfidfVectorizer};
pub use pipeline::{FeaturePipeline, PipelineError};
pub use statistical::{
    KeywordBucket, StatisticalExtractor, StatisticalFeatures, STATISTICAL_COUNT, STATISTICAL_LAYOUT,
};
pub use syntactic::{NodeType, SyntacticExtractor, SyntacticReport, SyntaxTree};

use crate::table::ColumnGroup;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Statistical,
    Lexical,
    Syntactic,
}

impl Strategy {
    pub fn group(&self) -> ColumnGroup {
        match self {
            Strategy::Statistical => ColumnGroup::Statistical,
            Strategy::Lexical => ColumnGroup::Lexical,
            Strategy::Syntactic => ColumnGroup::Syntactic,
        }
    }
}
