//! Lazy k-way merge of sorted record sources.
//!
//! Each source must already be sorted by (chromosome, start). The merge keeps
//! one head record per source in a min-heap and always emits the smallest,
//! tagged with the source it came from.
//!
//! Chromosomes are ranked with a shared [`ChromOrder`], the same one the sort
//! validator enforces, so sources that skip chromosomes still interleave
//! correctly. Records of one chromosome from different sources are adjacent.

use crate::bench::Source;
use crate::error::Result;
use crate::streaming::validation::ChromOrder;
use crate::variant::VariantRecord;
use rustc_hash::FxHashMap;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;
use tracing::info;

/// A source head waiting in the merge heap.
#[derive(Debug)]
struct HeapEntry {
    chrom_rank: usize,
    start: u64,
    source_idx: usize,
    record: VariantRecord,
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap
        other
            .chrom_rank
            .cmp(&self.chrom_rank)
            .then_with(|| other.record.chrom.cmp(&self.record.chrom))
            .then(other.start.cmp(&self.start))
            .then(other.source_idx.cmp(&self.source_idx))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

/// Iterator over `(Source, VariantRecord)` in merged order.
///
/// Single pass: once exhausted (or after the first error) it yields nothing
/// more. Re-open the sources to scan again.
pub struct MergedRecords<I> {
    sources: Vec<(Source, I)>,
    heap: BinaryHeap<HeapEntry>,
    order: Arc<ChromOrder>,
    emitted: FxHashMap<Source, usize>,
    primed: bool,
    done: bool,
}

impl<I> MergedRecords<I>
where
    I: Iterator<Item = Result<VariantRecord>>,
{
    /// Merge with chromosomes in plain string order.
    pub fn new(sources: Vec<(Source, I)>) -> Self {
        Self::with_chrom_order(sources, Arc::new(ChromOrder::lexicographic()))
    }

    pub fn with_chrom_order(sources: Vec<(Source, I)>, order: Arc<ChromOrder>) -> Self {
        let n = sources.len();
        Self {
            sources,
            heap: BinaryHeap::with_capacity(n),
            order,
            emitted: FxHashMap::default(),
            primed: false,
            done: false,
        }
    }

    /// Pull the next record of one source into the heap.
    fn advance(&mut self, source_idx: usize) -> Result<()> {
        let Some(next) = self.sources[source_idx].1.next() else {
            return Ok(());
        };
        let record = next?;
        self.heap.push(HeapEntry {
            chrom_rank: self.order.rank(&record.chrom),
            start: record.start(),
            source_idx,
            record,
        });
        Ok(())
    }

    fn fail(&mut self, e: crate::error::BenchError) -> Option<Result<(Source, VariantRecord)>> {
        self.done = true;
        self.heap.clear();
        Some(Err(e))
    }
}

impl<I> Iterator for MergedRecords<I>
where
    I: Iterator<Item = Result<VariantRecord>>,
{
    type Item = Result<(Source, VariantRecord)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if !self.primed {
            self.primed = true;
            for idx in 0..self.sources.len() {
                if let Err(e) = self.advance(idx) {
                    return self.fail(e);
                }
            }
        }

        let Some(entry) = self.heap.pop() else {
            self.done = true;
            info!(
                "Zipped {} variants (base: {}, comp: {})",
                self.emitted.values().sum::<usize>(),
                self.emitted.get(&Source::Base).copied().unwrap_or(0),
                self.emitted.get(&Source::Comp).copied().unwrap_or(0)
            );
            return None;
        };
        if let Err(e) = self.advance(entry.source_idx) {
            return self.fail(e);
        }

        let source = self.sources[entry.source_idx].0;
        *self.emitted.entry(source).or_insert(0) += 1;
        Some(Ok((source, entry.record)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BenchError;
    use crate::vcf::parse_record_line;

    fn rec(chrom: &str, pos: u64) -> Result<VariantRecord> {
        parse_record_line(&format!("{}\t{}\t.\tA\tAC\t.\t.\t.", chrom, pos), 1)
    }

    fn positions(merged: Vec<(Source, VariantRecord)>) -> Vec<(Source, String, u64)> {
        merged
            .into_iter()
            .map(|(s, r)| (s, r.chrom.clone(), r.pos))
            .collect()
    }

    #[test]
    fn test_merge_interleaves_by_position() {
        let base = vec![rec("chr1", 100), rec("chr1", 300), rec("chr2", 50)];
        let comp = vec![rec("chr1", 200), rec("chr1", 300), rec("chr2", 10)];
        let merged: Vec<_> = MergedRecords::new(vec![
            (Source::Base, base.into_iter()),
            (Source::Comp, comp.into_iter()),
        ])
        .collect::<Result<_>>()
        .unwrap();

        assert_eq!(
            positions(merged),
            vec![
                (Source::Base, "chr1".to_string(), 100),
                (Source::Comp, "chr1".to_string(), 200),
                // Ties go to the earlier source
                (Source::Base, "chr1".to_string(), 300),
                (Source::Comp, "chr1".to_string(), 300),
                (Source::Comp, "chr2".to_string(), 10),
                (Source::Base, "chr2".to_string(), 50),
            ]
        );
    }

    #[test]
    fn test_merge_unequal_and_empty_sources() {
        let base = vec![rec("chr1", 100)];
        let comp: Vec<Result<VariantRecord>> = Vec::new();
        let merged: Vec<_> = MergedRecords::new(vec![
            (Source::Base, base.into_iter()),
            (Source::Comp, comp.into_iter()),
        ])
        .collect::<Result<_>>()
        .unwrap();
        assert_eq!(merged.len(), 1);

        let empty: Vec<Result<VariantRecord>> = Vec::new();
        let mut merged = MergedRecords::new(vec![(Source::Base, empty.into_iter())]);
        assert!(merged.next().is_none());
        assert!(merged.next().is_none());
    }

    fn chroms(merged: Vec<(Source, VariantRecord)>) -> Vec<(Source, String)> {
        merged.into_iter().map(|(s, r)| (s, r.chrom)).collect()
    }

    #[test]
    fn test_merge_defaults_to_name_order() {
        let base = vec![rec("chr10", 100), rec("chr2", 100)];
        let comp = vec![rec("chr10", 50), rec("chr2", 500)];
        let merged: Vec<_> = MergedRecords::new(vec![
            (Source::Base, base.into_iter()),
            (Source::Comp, comp.into_iter()),
        ])
        .collect::<Result<_>>()
        .unwrap();
        let names: Vec<String> = merged.into_iter().map(|(_, r)| r.chrom).collect();
        assert_eq!(names, vec!["chr10", "chr10", "chr2", "chr2"]);
    }

    #[test]
    fn test_merge_follows_contig_order() {
        let order = Arc::new(ChromOrder::from_contigs(["chr2", "chr10"]));
        let base = vec![rec("chr2", 100), rec("chr10", 100)];
        let comp = vec![rec("chr2", 500), rec("chr10", 50)];
        let merged: Vec<_> = MergedRecords::with_chrom_order(
            vec![
                (Source::Base, base.into_iter()),
                (Source::Comp, comp.into_iter()),
            ],
            order,
        )
        .collect::<Result<_>>()
        .unwrap();
        let names: Vec<String> = merged.into_iter().map(|(_, r)| r.chrom).collect();
        assert_eq!(names, vec!["chr2", "chr2", "chr10", "chr10"]);
    }

    #[test]
    fn test_merge_source_missing_leading_chromosomes() {
        // Comp has no chr1 or chr2, so its first head is chr3
        let base = vec![rec("chr1", 1000), rec("chr2", 1000), rec("chr3", 1000)];
        let comp = vec![rec("chr3", 1000)];
        let merged: Vec<_> = MergedRecords::new(vec![
            (Source::Base, base.into_iter()),
            (Source::Comp, comp.into_iter()),
        ])
        .collect::<Result<_>>()
        .unwrap();
        assert_eq!(
            chroms(merged),
            vec![
                (Source::Base, "chr1".to_string()),
                (Source::Base, "chr2".to_string()),
                (Source::Base, "chr3".to_string()),
                (Source::Comp, "chr3".to_string()),
            ]
        );
    }

    #[test]
    fn test_merge_stops_on_error() {
        let base = vec![
            rec("chr1", 100),
            Err(BenchError::InvalidFormat("bad".into())),
            rec("chr1", 300),
        ];
        let mut merged = MergedRecords::new(vec![(Source::Base, base.into_iter())]);
        assert!(merged.next().unwrap().is_err());
        assert!(merged.next().is_none());
    }
}
