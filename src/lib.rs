// Clippy allows for the whole crate
#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]

//! svmatch: structural variant benchmarking
//!
//! Reconciles a base (truth) VCF with a comparison VCF, classifying every
//! record as a true positive, false negative or false positive, and derives
//! precision, recall, F1 and genotype concordance.
//!
//! # Features
//!
//! - **Multi-criteria matching**: reference distance, type, size similarity,
//!   reciprocal overlap, sequence similarity and genotype
//! - **Two candidate strategies**: streaming chunked merge, or an interval
//!   index over the comparison calls
//! - **Parallel processing**: independent chunks are resolved with Rayon
//!
//! # Example
//!
//! ```rust,no_run
//! use svmatch::{bench::BenchCommand, config::MatchParameters};
//!
//! let params = MatchParameters::new().with_pctseq(0.0);
//! let stats = BenchCommand::new("base.vcf.gz", "comp.vcf.gz", "bench_out")
//!     .with_params(params)
//!     .run()
//!     .unwrap();
//! println!("recall {:.3}", stats.recall);
//! ```

pub mod bed;
pub mod bench;
pub mod config;
pub mod error;
pub mod index;
pub mod input;
pub mod interval;
pub mod matching;
pub mod parallel;
pub mod reference;
pub mod regions;
pub mod store;
pub mod streaming;
pub mod variant;
pub mod vcf;

// Re-export commonly used types
pub use bench::{BenchCommand, StatsBox, Strategy};
pub use config::MatchParameters;
pub use error::{BenchError, Result};
pub use matching::{MatchResult, Matcher};
pub use variant::VariantRecord;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::bench::{
        AssignmentResolver, BaseOutcome, BenchCommand, BenchOutput, MatchedState, RecordKey,
        Source, StatsBox, Strategy,
    };
    pub use crate::config::{MatchParameters, NoRefPolicy, SeqSimAlgorithm};
    pub use crate::error::{BenchError, Result};
    pub use crate::index::SpanIndex;
    pub use crate::matching::{compare_results, MatchId, MatchResult, Matcher};
    pub use crate::reference::{FastaReference, ReferenceProvider};
    pub use crate::regions::RegionFilter;
    pub use crate::streaming::{ChromOrder, Chunk, Chunker, MergedRecords};
    pub use crate::variant::{Genotype, VariantRecord, VariantType};
    pub use crate::vcf::{VcfReader, VcfWriter};
}
