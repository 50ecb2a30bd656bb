//! Benchmark reconciliation: claims, assignment, statistics and the
//! command that ties them to input and output files.

pub mod registry;
pub mod resolver;
pub mod runner;
pub mod stats;

pub use registry::{MatchedState, RecordKey, Source};
pub use resolver::{AnnotatedRecord, AssignmentResolver, BaseOutcome, BenchOutput};
pub use runner::{BenchCommand, CheckedInputs, Strategy};
pub use stats::StatsBox;
