//! Per-chromosome span index for the index candidate strategy.
//!
//! Each admitted record contributes its `[start, end)` span with its own
//! start coordinate as payload. A query answers "which start coordinates
//! have a span overlapping this buffered window", returning only the
//! minimum and maximum payload so the caller can range-fetch the candidates
//! from the record source.

use crate::interval::{overlaps, widen};
use crate::variant::VariantRecord;
use rustc_hash::FxHashMap;
use std::borrow::Borrow;

/// Spans on one chromosome, sorted by start.
#[derive(Debug, Default)]
struct ChromSpans {
    /// (start, end, payload)
    spans: Vec<(u64, u64, u64)>,
    /// Running maximum of `end` over `spans[..=i]`
    max_end: Vec<u64>,
}

impl ChromSpans {
    fn finish(&mut self) {
        self.spans.sort_unstable();
        let mut running = 0;
        self.max_end = self
            .spans
            .iter()
            .map(|&(_, end, _)| {
                running = running.max(end);
                running
            })
            .collect();
    }

    /// Index range that can hold spans overlapping `[start, end)`.
    ///
    /// Spans before `lo` all end at or before `start`; spans from `hi` on all
    /// begin at or after `end`.
    #[inline]
    fn window(&self, start: u64, end: u64) -> (usize, usize) {
        let lo = self.max_end.partition_point(|&e| e <= start);
        let hi = self.spans.partition_point(|&(s, _, _)| s < end);
        (lo, hi)
    }

    fn overlapping(&self, start: u64, end: u64) -> impl Iterator<Item = &(u64, u64, u64)> {
        let (lo, hi) = self.window(start, end);
        self.spans[lo..hi.max(lo)]
            .iter()
            .filter(move |&&(s, e, _)| overlaps(start, end, s, e))
    }
}

/// Summary of a build, for logging.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IndexStats {
    /// Records seen
    pub total: usize,
    /// Records inserted
    pub indexed: usize,
}

/// An interval index over one record source, organized by chromosome.
#[derive(Debug, Default)]
pub struct SpanIndex {
    by_chrom: FxHashMap<String, ChromSpans>,
    stats: IndexStats,
}

impl SpanIndex {
    /// Create a new empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index over records whose size lies in `[size_min, size_max]`,
    /// optionally keeping only PASS records.
    ///
    /// Monomorphic and zero-length records are never inserted: neither can
    /// overlap a query window.
    pub fn build<I, R>(records: I, size_min: u64, size_max: u64, pass_only: bool) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Borrow<VariantRecord>,
    {
        let mut index = Self::new();
        for record in records {
            let record = record.borrow();
            index.stats.total += 1;
            if pass_only && record.is_filtered() {
                continue;
            }
            if record.is_monomorphic() {
                continue;
            }
            let size = record.size();
            if size < size_min || size > size_max {
                continue;
            }
            let (start, end) = record.boundaries();
            if start >= end {
                continue;
            }
            index
                .by_chrom
                .entry(record.chrom.clone())
                .or_default()
                .spans
                .push((start, end, record.start()));
            index.stats.indexed += 1;
        }
        for spans in index.by_chrom.values_mut() {
            spans.finish();
        }
        index
    }

    /// Fast existence check for any span overlapping `[start, end)`.
    pub fn has_overlap(&self, chrom: &str, start: u64, end: u64) -> bool {
        self.by_chrom
            .get(chrom)
            .is_some_and(|spans| spans.overlapping(start, end).next().is_some())
    }

    /// Min and max payload among spans overlapping the record's span
    /// widened by `buffer`, or `None` when nothing overlaps.
    pub fn query(&self, record: &VariantRecord, buffer: u64) -> Option<(u64, u64)> {
        let (start, end) = widen(record.start(), record.end(), buffer);
        self.query_span(&record.chrom, start, end)
    }

    /// Min and max payload among spans overlapping `[start, end)`.
    pub fn query_span(&self, chrom: &str, start: u64, end: u64) -> Option<(u64, u64)> {
        if !self.has_overlap(chrom, start, end) {
            return None;
        }
        let spans = self.by_chrom.get(chrom)?;
        spans
            .overlapping(start, end)
            .fold(None, |acc, &(_, _, payload)| match acc {
                None => Some((payload, payload)),
                Some((lo, hi)) => Some((lo.min(payload), hi.max(payload))),
            })
    }

    pub fn stats(&self) -> IndexStats {
        self.stats
    }

    /// Number of indexed spans.
    pub fn len(&self) -> usize {
        self.stats.indexed
    }

    /// Check if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.stats.indexed == 0
    }
}
