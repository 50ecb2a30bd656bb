//! Matched-state bookkeeping.

use crate::variant::VariantRecord;
use rustc_hash::FxHashMap;
use std::fmt;

/// Which input a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Source {
    Base,
    Comp,
}

impl Source {
    #[inline]
    pub fn is_base(self) -> bool {
        self == Source::Base
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Base => write!(f, "base"),
            Source::Comp => write!(f, "comp"),
        }
    }
}

/// Identity of a record within one source.
///
/// The record number keeps repeated lines of one file apart; the remaining
/// fields are the structural position and alleles.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordKey {
    pub source: Source,
    pub ordinal: u64,
    pub chrom: String,
    pub start: u64,
    pub end: u64,
    pub allele_hash: u64,
}

impl RecordKey {
    pub fn new(source: Source, record: &VariantRecord) -> Self {
        let (start, end) = record.boundaries();
        Self {
            source,
            ordinal: record.ordinal,
            chrom: record.chrom.clone(),
            start,
            end,
            allele_hash: record.allele_hash(),
        }
    }
}

/// Which records have already been counted as matched.
///
/// Lookups never insert: an unknown key is simply unclaimed.
#[derive(Debug, Default, Clone)]
pub struct MatchedState {
    claimed: FxHashMap<RecordKey, bool>,
}

impl MatchedState {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when the key was claimed; `false` for keys never seen.
    #[inline]
    pub fn is_claimed(&self, key: &RecordKey) -> bool {
        self.claimed.get(key).copied().unwrap_or(false)
    }

    /// Mark a key as claimed. Returns true on the first claim only.
    #[inline]
    pub fn claim(&mut self, key: RecordKey) -> bool {
        let slot = self.claimed.entry(key).or_insert(false);
        let first = !*slot;
        *slot = true;
        first
    }

    /// Number of claimed keys.
    pub fn claimed_count(&self) -> usize {
        self.claimed.values().filter(|&&c| c).count()
    }

    /// Fold another registry into this one.
    pub fn extend(&mut self, other: MatchedState) {
        for (key, claimed) in other.claimed {
            if claimed {
                self.claimed.insert(key, true);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vcf::parse_record_line;

    fn key(source: Source, line: &str) -> RecordKey {
        numbered_key(source, line, 1)
    }

    fn numbered_key(source: Source, line: &str, ordinal: u64) -> RecordKey {
        RecordKey::new(source, &parse_record_line(line, ordinal).unwrap())
    }

    #[test]
    fn test_unknown_key_is_unclaimed() {
        let state = MatchedState::new();
        let k = key(Source::Comp, "chr1\t100\t.\tA\tAC\t.\t.\t.");
        assert!(!state.is_claimed(&k));
        assert!(!state.is_claimed(&k));
        assert_eq!(state.claimed_count(), 0);
    }

    #[test]
    fn test_claim_is_idempotent() {
        let mut state = MatchedState::new();
        let k = key(Source::Base, "chr1\t100\t.\tA\tAC\t.\t.\t.");
        assert!(state.claim(k.clone()));
        assert!(!state.claim(k.clone()));
        assert!(state.is_claimed(&k));
        assert_eq!(state.claimed_count(), 1);
    }

    #[test]
    fn test_keys_ignore_annotation_columns() {
        let a = key(Source::Comp, "chr1\t100\tid1\tA\tAC\t.\t.\t.");
        let b = key(Source::Comp, "chr1\t100\tid2\tA\tAC\t50\tPASS\tFOO=1");
        let other_allele = key(Source::Comp, "chr1\t100\t.\tA\tAG\t.\t.\t.");
        let other_source = key(Source::Base, "chr1\t100\t.\tA\tAC\t.\t.\t.");

        assert_eq!(a, b);
        assert_ne!(a, other_allele);
        assert_ne!(a, other_source);
    }

    #[test]
    fn test_repeated_records_have_distinct_keys() {
        let line = "chr1\t1000\t.\tA\t<DEL>\t.\tPASS\tSVLEN=-100";
        let first = numbered_key(Source::Base, line, 1);
        let second = numbered_key(Source::Base, line, 2);
        assert_ne!(first, second);

        let mut state = MatchedState::new();
        assert!(state.claim(first));
        assert!(!state.is_claimed(&second));
    }
}
