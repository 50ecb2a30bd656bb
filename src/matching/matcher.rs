//! Pairwise comparator and record filter.

use super::result::{composite_score, MatchId, MatchResult};
use super::sequence::{build_haplotype, similarity, unroll_similarity, HaplotypeWindow};
use crate::config::MatchParameters;
use crate::error::Result;
use crate::interval::{overlaps, reciprocal_overlap, signed_distance, widen};
use crate::reference::ReferenceProvider;
use crate::variant::{Genotype, VariantRecord, VariantType};
use std::sync::Arc;
use tracing::{debug, warn};

/// Size similarity and signed size difference (base - comp).
///
/// Two zero sizes are identical; a single zero size is treated as 1.
pub fn size_similarity(base_size: u64, comp_size: u64) -> (f64, i64) {
    let diff = base_size as i64 - comp_size as i64;
    if base_size == 0 && comp_size == 0 {
        return (1.0, diff);
    }
    let a = base_size.max(1);
    let b = comp_size.max(1);
    (a.min(b) as f64 / a.max(b) as f64, diff)
}

/// Holds validated matching parameters and compares records.
///
/// `Matcher` only reads its inputs, so one instance can be shared across
/// threads.
pub struct Matcher {
    params: MatchParameters,
    reference: Option<Arc<dyn ReferenceProvider>>,
    b_sample: usize,
    c_sample: usize,
}

impl Matcher {
    /// Validate the parameters and build a matcher. Samples default to the
    /// first column of each file.
    pub fn new(params: MatchParameters) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params,
            reference: None,
            b_sample: 0,
            c_sample: 0,
        })
    }

    /// Use a reference to build haplotypes for sequence similarity.
    pub fn with_reference(mut self, reference: Arc<dyn ReferenceProvider>) -> Self {
        self.reference = Some(reference);
        self
    }

    /// Set the base and comparison sample columns.
    pub fn with_samples(mut self, b_sample: usize, c_sample: usize) -> Self {
        self.b_sample = b_sample;
        self.c_sample = c_sample;
        self
    }

    pub fn params(&self) -> &MatchParameters {
        &self.params
    }

    pub fn has_reference(&self) -> bool {
        self.reference.is_some()
    }

    /// True when the record should be kept out of matching entirely.
    ///
    /// Base records use `sizemin` as the lower bound, comparison records the
    /// looser `sizefilt`.
    pub fn should_exclude(&self, record: &VariantRecord, is_base: bool) -> bool {
        let p = &self.params;
        let size = record.size();
        if size > p.sizemax {
            return true;
        }
        let min = if is_base { p.sizemin } else { p.sizefilt };
        if size < min {
            return true;
        }

        let sample = if is_base { self.b_sample } else { self.c_sample };
        if (p.no_ref.applies_to(is_base) || p.gtcomp) && !record.is_present(sample) {
            return true;
        }

        p.passonly && record.is_filtered()
    }

    /// Compare a base record with a comparison record.
    ///
    /// Every metric is computed even after a filter fails; a failed filter
    /// only ever clears `state`.
    pub fn compare(
        &self,
        base: &Arc<VariantRecord>,
        comp: &Arc<VariantRecord>,
        matid: Option<MatchId>,
        skip_gt: bool,
    ) -> MatchResult {
        let p = &self.params;
        let mut state = true;

        if !p.typeignore
            && base.variant_type().normalized(p.dup_to_ins)
                != comp.variant_type().normalized(p.dup_to_ins)
        {
            debug!("{} and {} are not the same SVTYPE", base, comp);
            state = false;
        }

        let same_chrom = base.chrom == comp.chrom;
        let (bstart, bend) = base.boundaries();
        let (cstart, cend) = comp.boundaries();
        let (wstart, wend) = widen(bstart, bend, p.refdist);
        if !same_chrom || !overlaps(wstart, wend, cstart, cend) {
            debug!("{} and {} are not within REFDIST", base, comp);
            state = false;
        }

        let (sizesim, sizediff) = size_similarity(base.size(), comp.size());
        if sizesim < p.pctsize {
            debug!(
                "{} and {} size similarity is too low ({:.3})",
                base, comp, sizesim
            );
            state = false;
        }

        let ovlpct = if same_chrom {
            reciprocal_overlap(bstart, bend, cstart, cend)
        } else {
            0.0
        };
        let ovl_applies = !p.pctovl_del_only || base.variant_type() == VariantType::Del;
        if ovl_applies && ovlpct < p.pctovl {
            debug!(
                "{} and {} overlap percent is too low ({:.3})",
                base, comp, ovlpct
            );
            state = false;
        }

        let seqsim = if p.pctseq > 0.0 {
            let seqsim = if same_chrom {
                self.sequence_similarity(base, comp)
            } else {
                None
            };
            if let Some(sim) = seqsim.filter(|&sim| sim < p.pctseq) {
                debug!(
                    "{} and {} sequence similarity is too low ({:.3})",
                    base, comp, sim
                );
                state = false;
            }
            seqsim
        } else {
            Some(0.0)
        };

        let (base_gt, comp_gt) = if skip_gt {
            (None, None)
        } else {
            (
                base.genotype(self.b_sample).cloned(),
                comp.genotype(self.c_sample).cloned(),
            )
        };
        let base_gt_count = base_gt.as_ref().map_or(0, Genotype::first_alt_count);
        let comp_gt_count = comp_gt.as_ref().map_or(0, Genotype::first_alt_count);
        let gt_match = (!skip_gt).then(|| base_gt_count.abs_diff(comp_gt_count));

        MatchResult {
            base: Arc::clone(base),
            comp: Arc::clone(comp),
            matid,
            seqsim,
            sizesim,
            sizediff,
            ovlpct,
            st_dist: signed_distance(bstart, cstart),
            ed_dist: signed_distance(bend, cend),
            gt_match,
            base_gt,
            base_gt_count,
            comp_gt,
            comp_gt_count,
            state,
            score: composite_score(seqsim, sizesim, ovlpct),
            comp_hash: comp.content_hash(),
        }
    }

    /// Sequence similarity of two records on the same chromosome.
    ///
    /// `None` when either allele is symbolic.
    fn sequence_similarity(&self, base: &VariantRecord, comp: &VariantRecord) -> Option<f64> {
        if base.is_symbolic() || comp.is_symbolic() {
            return None;
        }
        if base.ref_allele == comp.ref_allele && base.alt().is_some() && base.alt() == comp.alt() {
            return Some(1.0);
        }

        let algorithm = self.params.seqsim_algorithm;
        if let Some(ref reference) = self.reference {
            let window = HaplotypeWindow::around(base, comp, self.params.minhaplen);
            let haplotypes = build_haplotype(reference.as_ref(), base, window)
                .and_then(|a| Ok((a, build_haplotype(reference.as_ref(), comp, window)?)));
            match haplotypes {
                Ok((a, b)) => return Some(similarity(&a, &b, algorithm)),
                Err(e) => warn!("{}; comparing alleles of {} and {} directly", e, base, comp),
            }
        }

        let a = base.allele_sequence()?;
        let b = comp.allele_sequence()?;
        let offset = base.start().abs_diff(comp.start());
        Some(unroll_similarity(a, b, offset, algorithm))
    }
}
