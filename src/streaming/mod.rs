//! Streaming candidate generation.
//!
//! Sorted sources are validated, merged into one ordered stream, and cut
//! into proximity-bounded chunks. Every stage is a lazy, single-pass
//! iterator, so memory stays bounded by the largest chunk.

pub mod chunker;
pub mod merge;
pub mod validation;

pub use chunker::{Chunk, Chunker, FilteredTally};
pub use merge::MergedRecords;
pub use validation::{ChromOrder, SortValidator, SortedRecords};
