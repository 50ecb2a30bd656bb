//! Comparison results and their total order.

use crate::variant::{Genotype, VariantRecord};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Identifier shared by every output row of one base record's match event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct MatchId {
    /// Chunk number (chunk strategy) or base ordinal (index strategy)
    pub group: usize,
    /// Base record number within the group
    pub index: usize,
}

impl MatchId {
    pub fn new(group: usize, index: usize) -> Self {
        Self { group, index }
    }
}

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.group, self.index)
    }
}

/// Outcome of comparing one base record with one comparison record.
///
/// Built once by the [`Matcher`](super::Matcher) and not modified afterwards.
#[derive(Debug, Clone)]
pub struct MatchResult {
    pub base: Arc<VariantRecord>,
    pub comp: Arc<VariantRecord>,
    pub matid: Option<MatchId>,
    /// `None` when no sequence comparison was possible
    pub seqsim: Option<f64>,
    pub sizesim: f64,
    /// Base size minus comparison size
    pub sizediff: i64,
    pub ovlpct: f64,
    /// Base start minus comparison start
    pub st_dist: i64,
    /// Base end minus comparison end
    pub ed_dist: i64,
    /// Absolute difference of non-reference allele counts, `None` when
    /// genotypes were skipped
    pub gt_match: Option<u32>,
    pub base_gt: Option<Genotype>,
    pub base_gt_count: u32,
    pub comp_gt: Option<Genotype>,
    pub comp_gt_count: u32,
    /// True only when every enabled filter passed
    pub state: bool,
    /// mean(seqsim, sizesim, ovlpct) * 100, when all three are defined
    pub score: Option<f64>,
    /// Content hash of the comparison record, the last tie-break
    pub comp_hash: u64,
}

impl MatchResult {
    /// Both sides carry the same number of first-ALT copies, hom-ref and
    /// missing calls included.
    pub fn is_gt_concordant(&self) -> bool {
        self.gt_match == Some(0)
    }
}

/// Composite score: `mean(seqsim, sizesim, ovlpct) * 100`.
#[inline]
pub fn composite_score(seqsim: Option<f64>, sizesim: f64, ovlpct: f64) -> Option<f64> {
    seqsim.map(|seqsim| (seqsim + sizesim + ovlpct) / 3.0 * 100.0)
}

/// Total order on results: state, then score (unset lowest), then the
/// comparison record's content hash.
///
/// Greater means better.
pub fn compare_results(a: &MatchResult, b: &MatchResult) -> Ordering {
    a.state
        .cmp(&b.state)
        .then_with(|| match (a.score, b.score) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.comp_hash.cmp(&b.comp_hash))
}

/// Sort results best first.
pub fn sort_best_first(results: &mut [MatchResult]) {
    results.sort_by(|a, b| compare_results(b, a));
}

/// Match annotations written to an output record's INFO column.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Annotation {
    pub score: Option<f64>,
    pub seqsim: Option<f64>,
    pub sizesim: Option<f64>,
    pub ovlpct: Option<f64>,
    pub sizediff: Option<i64>,
    pub st_dist: Option<i64>,
    pub ed_dist: Option<i64>,
    pub num_neighbors: usize,
    pub num_threshold_neighbors: usize,
    pub match_id: Option<MatchId>,
}

impl Annotation {
    /// Annotations from a result.
    pub fn matched(result: &MatchResult, num_neighbors: usize, num_threshold_neighbors: usize) -> Self {
        Self {
            score: result.score,
            seqsim: result.seqsim,
            sizesim: Some(result.sizesim),
            ovlpct: Some(result.ovlpct),
            sizediff: Some(result.sizediff),
            st_dist: Some(result.st_dist),
            ed_dist: Some(result.ed_dist),
            num_neighbors,
            num_threshold_neighbors,
            match_id: result.matid,
        }
    }

    /// Annotations for a record without a match.
    pub fn unmatched(num_neighbors: usize, num_threshold_neighbors: usize, match_id: Option<MatchId>) -> Self {
        Self {
            num_neighbors,
            num_threshold_neighbors,
            match_id,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vcf::parse_record_line;

    fn result(state: bool, score: Option<f64>, comp_pos: u64) -> MatchResult {
        let base = Arc::new(parse_record_line("chr1\t100\t.\tA\tAC\t.\t.\t.", 1).unwrap());
        let comp_line = format!("chr1\t{}\t.\tA\tAC\t.\t.\t.", comp_pos);
        let comp = Arc::new(parse_record_line(&comp_line, 1).unwrap());
        let comp_hash = comp.content_hash();
        MatchResult {
            base,
            comp,
            matid: None,
            seqsim: score.map(|_| 1.0),
            sizesim: 1.0,
            sizediff: 0,
            ovlpct: 1.0,
            st_dist: 0,
            ed_dist: 0,
            gt_match: None,
            base_gt: None,
            base_gt_count: 0,
            comp_gt: None,
            comp_gt_count: 0,
            state,
            score,
            comp_hash,
        }
    }

    #[test]
    fn test_state_dominates_score() {
        let passing = result(true, Some(10.0), 100);
        let failing = result(false, Some(99.0), 101);
        assert_eq!(compare_results(&passing, &failing), Ordering::Greater);
        assert_eq!(compare_results(&failing, &passing), Ordering::Less);
    }

    #[test]
    fn test_unset_score_sorts_lowest() {
        let scored = result(true, Some(0.0), 100);
        let unscored = result(true, None, 101);
        assert_eq!(compare_results(&scored, &unscored), Ordering::Greater);
    }

    #[test]
    fn test_ties_broken_by_content_hash() {
        let a = result(true, Some(50.0), 100);
        let b = result(true, Some(50.0), 101);
        let forward = compare_results(&a, &b);
        assert_ne!(forward, Ordering::Equal);
        assert_eq!(compare_results(&b, &a), forward.reverse());
    }

    #[test]
    fn test_sort_best_first_ignores_input_order() {
        let make = || {
            vec![
                result(false, Some(90.0), 100),
                result(true, Some(70.0), 101),
                result(true, Some(80.0), 102),
                result(true, Some(70.0), 103),
            ]
        };
        let mut forward = make();
        let mut backward = make();
        backward.reverse();
        sort_best_first(&mut forward);
        sort_best_first(&mut backward);

        assert_eq!(forward[0].comp.pos, 102);
        assert!(!forward[3].state);
        let order = |v: &[MatchResult]| v.iter().map(|r| r.comp.pos).collect::<Vec<_>>();
        assert_eq!(order(&forward), order(&backward));
    }

    #[test]
    fn test_hom_ref_pair_is_concordant() {
        let mut both_ref = result(true, Some(100.0), 100);
        both_ref.gt_match = Some(0);
        assert!(both_ref.is_gt_concordant());

        let mut differ = result(true, Some(100.0), 100);
        differ.gt_match = Some(1);
        assert!(!differ.is_gt_concordant());

        // Genotypes were not compared
        assert!(!result(true, Some(100.0), 100).is_gt_concordant());
    }

    #[test]
    fn test_composite_score() {
        assert_eq!(composite_score(Some(1.0), 1.0, 1.0), Some(100.0));
        assert_eq!(composite_score(None, 1.0, 1.0), None);
        assert_eq!(MatchId::new(3, 1).to_string(), "3.1");
    }
}
