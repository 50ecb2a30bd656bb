//! Pairwise comparison of base and comparison records.

pub mod matcher;
pub mod result;
pub mod sequence;

pub use matcher::{size_similarity, Matcher};
pub use result::{compare_results, sort_best_first, Annotation, MatchId, MatchResult};
