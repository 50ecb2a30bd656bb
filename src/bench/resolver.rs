//! Greedy assignment of comparison records to base records.
//!
//! Each admitted base record runs through one pass of a small state
//! machine: gather neighbors, score them, keep the ones passing every
//! threshold, then either claim the best one(s) or end as a false negative.
//! Claims live in a [`MatchedState`] owned by the caller, so the same
//! resolver serves a single chunk or a whole genome.

use super::registry::{MatchedState, RecordKey, Source};
use super::stats::StatsBox;
use crate::matching::{sort_best_first, Annotation, MatchId, MatchResult, Matcher};
use crate::regions::RegionFilter;
use crate::streaming::Chunk;
use crate::variant::VariantRecord;
use std::sync::Arc;
use tracing::debug;

/// Terminal state of one base record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseOutcome {
    /// At least one neighbor passed every threshold.
    Matched {
        neighbors: usize,
        threshold_neighbors: usize,
    },
    /// No neighbor passed; the base is a false negative.
    FalseNegative { neighbors: usize },
}

impl BaseOutcome {
    pub fn is_matched(&self) -> bool {
        matches!(self, BaseOutcome::Matched { .. })
    }
}

/// A record bound for one of the output files.
#[derive(Debug, Clone)]
pub struct AnnotatedRecord {
    pub record: Arc<VariantRecord>,
    pub annotation: Annotation,
}

impl AnnotatedRecord {
    fn new(record: &Arc<VariantRecord>, annotation: Annotation) -> Self {
        Self {
            record: Arc::clone(record),
            annotation,
        }
    }
}

/// Classified records and counters produced by a unit of work.
#[derive(Debug, Clone, Default)]
pub struct BenchOutput {
    pub stats: StatsBox,
    pub tp_base: Vec<AnnotatedRecord>,
    pub tp_comp: Vec<AnnotatedRecord>,
    pub false_negatives: Vec<AnnotatedRecord>,
    pub false_positives: Vec<AnnotatedRecord>,
}

impl BenchOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append another output after this one, keeping record order.
    pub fn merge(&mut self, other: BenchOutput) {
        self.stats.merge(&other.stats);
        self.tp_base.extend(other.tp_base);
        self.tp_comp.extend(other.tp_comp);
        self.false_negatives.extend(other.false_negatives);
        self.false_positives.extend(other.false_positives);
    }

    /// Number of records waiting to be written.
    pub fn pending(&self) -> usize {
        self.tp_base.len() + self.tp_comp.len() + self.false_negatives.len() + self.false_positives.len()
    }
}

/// Resolves base records against candidate comparison records.
pub struct AssignmentResolver<'a> {
    matcher: &'a Matcher,
    regions: Option<&'a RegionFilter>,
    skip_gt: bool,
}

impl<'a> AssignmentResolver<'a> {
    pub fn new(matcher: &'a Matcher) -> Self {
        Self {
            matcher,
            regions: None,
            skip_gt: false,
        }
    }

    /// Restrict every side to records lying inside the regions.
    pub fn with_regions(mut self, regions: &'a RegionFilter) -> Self {
        self.regions = Some(regions);
        self
    }

    /// Skip genotype extraction (inputs without sample columns).
    pub fn with_skip_gt(mut self, skip_gt: bool) -> Self {
        self.skip_gt = skip_gt;
        self
    }

    pub fn matcher(&self) -> &Matcher {
        self.matcher
    }

    /// True when a record takes part in matching at all.
    pub fn admits(&self, source: Source, record: &VariantRecord) -> bool {
        !record.is_monomorphic()
            && !self.matcher.should_exclude(record, source.is_base())
            && self.regions.map_or(true, |regions| regions.includes(record))
    }

    /// Resolve one admitted base record against its candidates.
    ///
    /// Candidates that are not admitted are ignored, as are already claimed
    /// ones when multimatch is off. Annotated records and counters go to
    /// `out`; claims go to `state`.
    pub fn resolve_base(
        &self,
        base: &Arc<VariantRecord>,
        candidates: &[Arc<VariantRecord>],
        matid: MatchId,
        state: &mut MatchedState,
        out: &mut BenchOutput,
    ) -> BaseOutcome {
        let multimatch = self.matcher.params().multimatch;

        let mut neighbors = 0;
        let mut threshold: Vec<MatchResult> = Vec::new();
        for comp in candidates {
            if !self.admits(Source::Comp, comp) {
                continue;
            }
            if !multimatch && state.is_claimed(&RecordKey::new(Source::Comp, comp)) {
                continue;
            }
            neighbors += 1;
            let result = self.matcher.compare(base, comp, Some(matid), self.skip_gt);
            if result.state {
                threshold.push(result);
            }
        }

        if threshold.is_empty() {
            out.stats.fn_ += 1;
            out.false_negatives.push(AnnotatedRecord::new(
                base,
                Annotation::unmatched(neighbors, 0, Some(matid)),
            ));
            return BaseOutcome::FalseNegative { neighbors };
        }

        sort_best_first(&mut threshold);
        let threshold_neighbors = threshold.len();
        let best = &threshold[0];
        debug!("Best match for {} is {} ({:?})", base, best.comp, best.score);

        if state.claim(RecordKey::new(Source::Base, base)) {
            out.stats.add_tp_base(best.is_gt_concordant());
        }
        out.tp_base.push(AnnotatedRecord::new(
            base,
            Annotation::matched(best, neighbors, threshold_neighbors),
        ));

        for result in &threshold {
            if state.claim(RecordKey::new(Source::Comp, &result.comp)) {
                out.stats.add_tp_comp(result.is_gt_concordant());
            } else if !multimatch {
                continue;
            }
            out.tp_comp.push(AnnotatedRecord::new(
                &result.comp,
                Annotation::matched(result, neighbors, threshold_neighbors),
            ));
            if !multimatch {
                break;
            }
        }

        BaseOutcome::Matched {
            neighbors,
            threshold_neighbors,
        }
    }

    /// Tally every admitted comparison record, and report the unclaimed
    /// ones as false positives.
    pub fn sweep_false_positives<'r, I>(&self, comps: I, state: &MatchedState, out: &mut BenchOutput)
    where
        I: IntoIterator<Item = &'r Arc<VariantRecord>>,
    {
        for comp in comps {
            if !self.admits(Source::Comp, comp) {
                continue;
            }
            out.stats.add_admitted(Source::Comp);
            if state.is_claimed(&RecordKey::new(Source::Comp, comp)) {
                continue;
            }
            out.stats.fp += 1;
            out.false_positives
                .push(AnnotatedRecord::new(comp, Annotation::default()));
        }
    }

    /// Resolve a whole chunk. Claims never leave the chunk.
    pub fn resolve_chunk(&self, chunk: &Chunk) -> BenchOutput {
        let mut state = MatchedState::new();
        let mut out = BenchOutput::new();
        for (index, base) in chunk.base.iter().enumerate() {
            if !self.admits(Source::Base, base) {
                continue;
            }
            out.stats.add_admitted(Source::Base);
            self.resolve_base(base, &chunk.comp, MatchId::new(chunk.id, index), &mut state, &mut out);
        }
        self.sweep_false_positives(&chunk.comp, &state, &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MatchParameters;
    use crate::interval::Interval;
    use crate::vcf::parse_record_line;

    fn pattern(len: usize) -> String {
        "ACGGTCATTGCA".chars().cycle().take(len).collect()
    }

    fn del(pos: u64, len: usize, gt: &str) -> Arc<VariantRecord> {
        numbered_del(1, pos, len, gt)
    }

    fn numbered_del(ordinal: u64, pos: u64, len: usize, gt: &str) -> Arc<VariantRecord> {
        let line = format!("chr1\t{}\t.\tA{}\tA\t.\tPASS\t.\tGT\t{}", pos, pattern(len), gt);
        Arc::new(parse_record_line(&line, ordinal).unwrap())
    }

    fn matcher(multimatch: bool) -> Matcher {
        Matcher::new(MatchParameters::new().with_multimatch(multimatch)).unwrap()
    }

    #[test]
    fn test_single_match() {
        let matcher = matcher(false);
        let resolver = AssignmentResolver::new(&matcher);
        let base = del(1000, 100, "0/1");
        let comps = vec![del(1000, 100, "0/1")];

        let mut state = MatchedState::new();
        let mut out = BenchOutput::new();
        let outcome = resolver.resolve_base(&base, &comps, MatchId::new(1, 0), &mut state, &mut out);

        assert_eq!(
            outcome,
            BaseOutcome::Matched {
                neighbors: 1,
                threshold_neighbors: 1
            }
        );
        assert_eq!(out.stats.tp_base, 1);
        assert_eq!(out.stats.tp_comp, 1);
        assert_eq!(out.stats.tp_base_tp_gt, 1);
        assert_eq!(out.tp_base[0].annotation.score, Some(100.0));
        assert_eq!(out.tp_comp[0].annotation.match_id, Some(MatchId::new(1, 0)));
    }

    #[test]
    fn test_false_negative_is_annotated() {
        let matcher = matcher(false);
        let resolver = AssignmentResolver::new(&matcher);
        let base = del(1000, 100, "0/1");
        // Within refdist but far too small
        let comps = vec![del(1050, 31, "0/1")];

        let mut state = MatchedState::new();
        let mut out = BenchOutput::new();
        let outcome = resolver.resolve_base(&base, &comps, MatchId::new(2, 3), &mut state, &mut out);

        assert_eq!(outcome, BaseOutcome::FalseNegative { neighbors: 1 });
        assert!(!outcome.is_matched());
        assert_eq!(out.stats.fn_, 1);
        let fn_record = &out.false_negatives[0];
        assert_eq!(fn_record.annotation.num_neighbors, 1);
        assert_eq!(fn_record.annotation.num_threshold_neighbors, 0);
        assert_eq!(fn_record.annotation.match_id, Some(MatchId::new(2, 3)));
        assert!(fn_record.annotation.score.is_none());
    }

    #[test]
    fn test_claimed_comp_is_not_reused() {
        let matcher = matcher(false);
        let resolver = AssignmentResolver::new(&matcher);
        let first = del(1000, 100, "0/1");
        let second = del(1002, 100, "0/1");
        let comps = vec![del(1000, 100, "0/1")];

        let mut state = MatchedState::new();
        let mut out = BenchOutput::new();
        resolver.resolve_base(&first, &comps, MatchId::new(1, 0), &mut state, &mut out);
        let outcome = resolver.resolve_base(&second, &comps, MatchId::new(1, 1), &mut state, &mut out);

        assert_eq!(outcome, BaseOutcome::FalseNegative { neighbors: 0 });
        assert_eq!(out.stats.tp_base, 1);
        assert_eq!(out.stats.tp_comp, 1);
        assert_eq!(out.stats.fn_, 1);
    }

    #[test]
    fn test_multimatch_reuses_comp_without_double_counting() {
        let matcher = matcher(true);
        let resolver = AssignmentResolver::new(&matcher);
        let first = del(1000, 100, "0/1");
        let second = del(1002, 100, "0/1");
        let comps = vec![del(1000, 100, "0/1"), del(1001, 98, "1/1")];

        let mut state = MatchedState::new();
        let mut out = BenchOutput::new();
        resolver.resolve_base(&first, &comps, MatchId::new(1, 0), &mut state, &mut out);
        resolver.resolve_base(&second, &comps, MatchId::new(1, 1), &mut state, &mut out);

        assert_eq!(out.stats.tp_base, 2);
        assert_eq!(out.stats.tp_comp, 2);
        assert_eq!(out.stats.fn_, 0);
        // Every threshold neighbor of every base is written
        assert_eq!(out.tp_comp.len(), 4);
    }

    #[test]
    fn test_best_candidate_wins() {
        let matcher = matcher(false);
        let resolver = AssignmentResolver::new(&matcher);
        let base = del(1000, 100, "0/1");
        let near = del(1000, 100, "0/1");
        let far = del(1010, 95, "0/1");
        let comps = vec![Arc::clone(&far), Arc::clone(&near)];

        let mut state = MatchedState::new();
        let mut out = BenchOutput::new();
        resolver.resolve_base(&base, &comps, MatchId::new(1, 0), &mut state, &mut out);

        assert_eq!(out.tp_comp.len(), 1);
        assert_eq!(out.tp_comp[0].record.pos, near.pos);
        assert_eq!(out.tp_base[0].annotation.num_threshold_neighbors, 2);
        assert!(!state.is_claimed(&RecordKey::new(Source::Comp, &far)));
    }

    #[test]
    fn test_resolve_chunk_sweeps_false_positives() {
        let matcher = matcher(false);
        let resolver = AssignmentResolver::new(&matcher);
        let chunk = Chunk {
            id: 1,
            base: vec![del(1000, 100, "0/1")],
            comp: vec![del(1000, 100, "0/1"), del(1500, 80, "0/1")],
            ..Default::default()
        };

        let out = resolver.resolve_chunk(&chunk);
        assert_eq!(out.stats.tp_base, 1);
        assert_eq!(out.stats.tp_comp, 1);
        assert_eq!(out.stats.fp, 1);
        assert_eq!(out.false_positives[0].record.pos, 1500);
        assert_eq!(out.stats.base_cnt, 1);
        assert_eq!(out.stats.comp_cnt, 2);
        assert_eq!(out.stats.tp_comp + out.stats.fp, out.stats.comp_cnt);
    }

    #[test]
    fn test_repeated_base_records_count_separately() {
        let matcher = matcher(false);
        let resolver = AssignmentResolver::new(&matcher);
        let chunk = Chunk {
            id: 0,
            base: vec![numbered_del(1, 1000, 100, "0/1"), numbered_del(2, 1000, 100, "0/1")],
            comp: vec![numbered_del(1, 1000, 100, "0/1"), numbered_del(2, 1005, 100, "0/1")],
            ..Default::default()
        };

        let out = resolver.resolve_chunk(&chunk);
        assert_eq!(out.stats.base_cnt, 2);
        assert_eq!(out.stats.tp_base, 2);
        assert_eq!(out.stats.fn_, 0);
        assert_eq!(out.stats.tp_comp, 2);
        assert_eq!(out.stats.fp, 0);
        assert_eq!(out.tp_base.len(), 2);
    }

    #[test]
    fn test_regions_limit_admission() {
        let matcher = matcher(false);
        let regions = RegionFilter::from_intervals(vec![Interval::new("chr1", 0, 1200)]);
        let resolver = AssignmentResolver::new(&matcher).with_regions(&regions);

        assert!(resolver.admits(Source::Base, &del(1000, 100, "0/1")));
        assert!(!resolver.admits(Source::Comp, &del(1150, 100, "0/1")));
    }

    #[test]
    fn test_merge_keeps_order() {
        let mut a = BenchOutput::new();
        a.stats.fp = 1;
        a.false_positives
            .push(AnnotatedRecord::new(&del(100, 60, "0/1"), Annotation::default()));
        let mut b = BenchOutput::new();
        b.stats.fp = 1;
        b.false_positives
            .push(AnnotatedRecord::new(&del(900, 60, "0/1"), Annotation::default()));

        a.merge(b);
        assert_eq!(a.stats.fp, 2);
        assert_eq!(a.pending(), 2);
        assert_eq!(a.false_positives[1].record.pos, 900);
    }
}
