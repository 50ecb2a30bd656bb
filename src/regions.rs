//! Genome region inclusion filter (`--includebed`).

use crate::bed::read_intervals;
use crate::error::Result;
use crate::interval::Interval;
use crate::variant::VariantRecord;
use rustc_hash::FxHashMap;
use std::path::Path;

/// Sorted, merged inclusion regions per chromosome.
///
/// A record is included when its whole `[start, end)` span lies inside a
/// single region. Regions that touch or overlap are merged on load, so a
/// span crossing the boundary of two abutting BED lines still counts.
#[derive(Debug, Default, Clone)]
pub struct RegionFilter {
    regions: FxHashMap<String, Vec<(u64, u64)>>,
}

impl RegionFilter {
    pub fn from_intervals(intervals: Vec<Interval>) -> Self {
        let mut regions: FxHashMap<String, Vec<(u64, u64)>> = FxHashMap::default();
        for iv in intervals {
            regions.entry(iv.chrom).or_default().push((iv.start, iv.end));
        }
        for spans in regions.values_mut() {
            spans.sort_unstable();
            let mut merged: Vec<(u64, u64)> = Vec::with_capacity(spans.len());
            for &(start, end) in spans.iter() {
                match merged.last_mut() {
                    Some(last) if start <= last.1 => last.1 = last.1.max(end),
                    _ => merged.push((start, end)),
                }
            }
            *spans = merged;
        }
        Self { regions }
    }

    /// Load regions from a BED file.
    pub fn from_bed<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::from_intervals(read_intervals(path)?))
    }

    /// True when `[start, end)` on `chrom` lies within one region.
    pub fn contains(&self, chrom: &str, start: u64, end: u64) -> bool {
        let Some(spans) = self.regions.get(chrom) else {
            return false;
        };
        // Last region starting at or before `start`
        let idx = spans.partition_point(|&(s, _)| s <= start);
        idx > 0 && end <= spans[idx - 1].1
    }

    /// True when the record's span lies within one region.
    #[inline]
    pub fn includes(&self, record: &VariantRecord) -> bool {
        let (start, end) = record.boundaries();
        self.contains(&record.chrom, start, end)
    }

    /// Number of merged regions.
    pub fn len(&self) -> usize {
        self.regions.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
