//! Error types shared by the readers, the matcher and the bench runner.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Exit status used for configuration and malformed-input failures.
pub const FATAL_INPUT_EXIT_CODE: i32 = 100;

/// Errors that can occur while benchmarking.
#[derive(Error, Debug)]
pub enum BenchError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Unable to parse {}: {message}", path.display())]
    MalformedSource { path: PathBuf, message: String },

    #[error("Reference sequence unavailable for {chrom}:{start}-{end}")]
    ReferenceUnavailable { chrom: String, start: u64, end: u64 },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BenchError {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            BenchError::Config(_) | BenchError::MalformedSource { .. } => FATAL_INPUT_EXIT_CODE,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, BenchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(BenchError::Config("bad".into()).exit_code(), 100);
        let malformed = BenchError::MalformedSource {
            path: PathBuf::from("comp.vcf"),
            message: "bad header".into(),
        };
        assert_eq!(malformed.exit_code(), 100);
        assert!(malformed.to_string().contains("comp.vcf"));
        assert_eq!(BenchError::InvalidFormat("x".into()).exit_code(), 1);
    }
}
