//! Matching parameters for a benchmarking run.
//!
//! A `MatchParameters` value is built once (defaults, CLI flags or the
//! `with_*` setters), validated once, and then shared read-only by the
//! matcher, the candidate generators and the resolver. Nothing on the
//! comparison hot path re-checks these values.

use crate::error::{BenchError, Result};
use serde::{Deserialize, Serialize};

/// Which side(s) drop records whose genotype is missing or homozygous reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum NoRefPolicy {
    /// Keep every record regardless of genotype.
    #[default]
    Off,
    /// Exclude uncalled base records.
    Base,
    /// Exclude uncalled comparison records.
    Comp,
    /// Exclude uncalled records on both sides.
    All,
}

impl NoRefPolicy {
    /// True when the policy applies to the given side.
    #[inline]
    pub fn applies_to(self, is_base: bool) -> bool {
        match self {
            NoRefPolicy::Off => false,
            NoRefPolicy::All => true,
            NoRefPolicy::Base => is_base,
            NoRefPolicy::Comp => !is_base,
        }
    }
}

/// Sequence similarity algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SeqSimAlgorithm {
    /// (|a| + |b| - edit distance) / (|a| + |b|)
    #[default]
    EditDistance,
    /// Levenshtein (indel) ratio: 2 * LCS / (|a| + |b|)
    Levenshtein,
}

/// Default maximum reference distance between base and comparison calls.
pub const DEFAULT_REFDIST: u64 = 500;
/// Default chunk gap for the streaming strategy.
pub const DEFAULT_CHUNKSIZE: u64 = 1000;

/// Thresholds and filters controlling how records are compared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchParameters {
    /// Max reference location distance
    pub refdist: u64,
    /// Min percent sequence similarity, 0 disables the check
    pub pctseq: f64,
    /// Bases of reference context added around haplotypes
    pub minhaplen: u64,
    /// Min percent size similarity
    pub pctsize: f64,
    /// Min percent reciprocal overlap
    pub pctovl: f64,
    /// Only apply `pctovl` to deletions
    pub pctovl_del_only: bool,
    /// Variant types don't need to match
    pub typeignore: bool,
    /// Sequence similarity algorithm
    pub seqsim_algorithm: SeqSimAlgorithm,
    /// Max gap between calls inside one chunk
    pub chunksize: u64,
    /// Compare genotypes (also forces presence filtering)
    pub gtcomp: bool,
    /// Base sample name (first sample when unset)
    pub b_sample: Option<String>,
    /// Comparison sample name (first sample when unset)
    pub c_sample: Option<String>,
    /// Treat DUP as INS when checking types
    pub dup_to_ins: bool,
    /// Minimum base call size
    pub sizemin: u64,
    /// Minimum comparison call size
    pub sizefilt: u64,
    /// Maximum call size on both sides
    pub sizemax: u64,
    /// Only consider calls with FILTER == PASS
    pub passonly: bool,
    /// Uncalled-genotype exclusion policy
    pub no_ref: NoRefPolicy,
    /// Allow one record to match several on the other side
    pub multimatch: bool,
}

impl Default for MatchParameters {
    fn default() -> Self {
        Self {
            refdist: DEFAULT_REFDIST,
            pctseq: 0.70,
            minhaplen: 50,
            pctsize: 0.70,
            pctovl: 0.0,
            pctovl_del_only: false,
            typeignore: false,
            seqsim_algorithm: SeqSimAlgorithm::EditDistance,
            chunksize: DEFAULT_CHUNKSIZE,
            gtcomp: false,
            b_sample: None,
            c_sample: None,
            dup_to_ins: false,
            sizemin: 50,
            sizefilt: 30,
            sizemax: 50_000,
            passonly: false,
            no_ref: NoRefPolicy::Off,
            multimatch: false,
        }
    }
}

impl MatchParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the reference distance buffer (builder pattern).
    pub fn with_refdist(mut self, refdist: u64) -> Self {
        self.refdist = refdist;
        self
    }

    /// Set the minimum sequence similarity (builder pattern).
    pub fn with_pctseq(mut self, pctseq: f64) -> Self {
        self.pctseq = pctseq;
        self
    }

    /// Set the minimum size similarity (builder pattern).
    pub fn with_pctsize(mut self, pctsize: f64) -> Self {
        self.pctsize = pctsize;
        self
    }

    /// Set the minimum reciprocal overlap (builder pattern).
    pub fn with_pctovl(mut self, pctovl: f64) -> Self {
        self.pctovl = pctovl;
        self
    }

    /// Set the size thresholds (builder pattern).
    pub fn with_sizes(mut self, sizemin: u64, sizefilt: u64, sizemax: u64) -> Self {
        self.sizemin = sizemin;
        self.sizefilt = sizefilt;
        self.sizemax = sizemax;
        self
    }

    /// Set the chunk gap (builder pattern).
    pub fn with_chunksize(mut self, chunksize: u64) -> Self {
        self.chunksize = chunksize;
        self
    }

    /// Set multimatch (builder pattern).
    pub fn with_multimatch(mut self, multimatch: bool) -> Self {
        self.multimatch = multimatch;
        self
    }

    /// Set typeignore (builder pattern).
    pub fn with_typeignore(mut self, typeignore: bool) -> Self {
        self.typeignore = typeignore;
        self
    }

    /// Set the no-call exclusion policy (builder pattern).
    pub fn with_no_ref(mut self, no_ref: NoRefPolicy) -> Self {
        self.no_ref = no_ref;
        self
    }

    /// Set passonly (builder pattern).
    pub fn with_passonly(mut self, passonly: bool) -> Self {
        self.passonly = passonly;
        self
    }

    /// Set gtcomp (builder pattern).
    pub fn with_gtcomp(mut self, gtcomp: bool) -> Self {
        self.gtcomp = gtcomp;
        self
    }

    /// Check every threshold once, before any matching starts.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("pctseq", self.pctseq),
            ("pctsize", self.pctsize),
            ("pctovl", self.pctovl),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(BenchError::Config(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }

        if self.sizemin > self.sizemax {
            return Err(BenchError::Config(format!(
                "sizemin ({}) is larger than sizemax ({})",
                self.sizemin, self.sizemax
            )));
        }
        if self.sizefilt > self.sizemax {
            return Err(BenchError::Config(format!(
                "sizefilt ({}) is larger than sizemax ({})",
                self.sizefilt, self.sizemax
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = MatchParameters::default();
        assert_eq!(params.refdist, 500);
        assert_eq!(params.sizemin, 50);
        assert_eq!(params.sizefilt, 30);
        assert_eq!(params.sizemax, 50_000);
        assert_eq!(params.chunksize, 1000);
        assert!((params.pctseq - 0.7).abs() < f64::EPSILON);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_invalid_fraction() {
        let params = MatchParameters::new().with_pctsize(1.5);
        assert!(matches!(params.validate(), Err(BenchError::Config(_))));

        let params = MatchParameters::new().with_pctovl(-0.1);
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_invalid_sizes() {
        let params = MatchParameters::new().with_sizes(100, 30, 50);
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_no_ref_policy() {
        assert!(!NoRefPolicy::Off.applies_to(true));
        assert!(NoRefPolicy::Base.applies_to(true));
        assert!(!NoRefPolicy::Base.applies_to(false));
        assert!(NoRefPolicy::Comp.applies_to(false));
        assert!(NoRefPolicy::All.applies_to(true));
        assert!(NoRefPolicy::All.applies_to(false));
    }

    #[test]
    fn test_params_serialize() {
        let json = serde_json::to_string(&MatchParameters::default()).unwrap();
        assert!(json.contains("\"refdist\":500"));
        assert!(json.contains("\"no_ref\":\"off\""));
    }
}
