//! Proximity-bounded grouping of a merged record stream.

use crate::bench::Source;
use crate::error::Result;
use crate::variant::VariantRecord;
use std::sync::Arc;
use tracing::{debug, info};

/// Filtered-record counts of one chunk.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FilteredTally {
    pub base: usize,
    pub comp: usize,
}

impl FilteredTally {
    #[inline]
    pub fn get(&self, source: Source) -> usize {
        match source {
            Source::Base => self.base,
            Source::Comp => self.comp,
        }
    }

    #[inline]
    fn bump(&mut self, source: Source) {
        match source {
            Source::Base => self.base += 1,
            Source::Comp => self.comp += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.base + self.comp
    }
}

/// A group of nearby records matched as one isolated unit.
#[derive(Debug, Default, Clone)]
pub struct Chunk {
    /// 1-based chunk number in stream order
    pub id: usize,
    pub base: Vec<Arc<VariantRecord>>,
    pub comp: Vec<Arc<VariantRecord>>,
    pub filtered: FilteredTally,
    /// Chromosome of every record in the chunk
    pub(crate) chrom: Option<String>,
}

impl Chunk {
    fn new(id: usize) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    pub fn chrom(&self) -> Option<&str> {
        self.chrom.as_deref()
    }

    /// Admitted records on one side.
    pub fn records(&self, source: Source) -> &[Arc<VariantRecord>] {
        match source {
            Source::Base => &self.base,
            Source::Comp => &self.comp,
        }
    }

    /// True when the chunk holds no record at all, filtered or not.
    pub fn is_empty(&self) -> bool {
        self.base.is_empty() && self.comp.is_empty() && self.filtered.total() == 0
    }

    fn has_admitted(&self) -> bool {
        !self.base.is_empty() || !self.comp.is_empty()
    }
}

/// Iterator turning a merged `(Source, VariantRecord)` stream into chunks.
///
/// A new chunk starts when the chromosome changes, or when the running
/// maximum end of the admitted records plus `chunk_gap` is less than the
/// next record's start. Monomorphic records and records rejected by
/// `exclude` are only tallied; they never extend the running end.
pub struct Chunker<I, F> {
    records: I,
    chunk_gap: u64,
    exclude: F,
    current: Chunk,
    running_end: u64,
    next_id: usize,
    done: bool,
    admitted: usize,
    filtered: usize,
}

impl<I, F> Chunker<I, F>
where
    I: Iterator<Item = Result<(Source, VariantRecord)>>,
    F: Fn(Source, &VariantRecord) -> bool,
{
    /// `exclude(source, record)` returns true for records kept out of
    /// matching.
    pub fn new(records: I, chunk_gap: u64, exclude: F) -> Self {
        Self {
            records,
            chunk_gap,
            exclude,
            current: Chunk::new(1),
            running_end: 0,
            next_id: 2,
            done: false,
            admitted: 0,
            filtered: 0,
        }
    }

    /// Start a new chunk, returning the finished one.
    fn rotate(&mut self) -> Chunk {
        let fresh = Chunk::new(self.next_id);
        self.next_id += 1;
        self.running_end = 0;
        std::mem::replace(&mut self.current, fresh)
    }

    fn starts_new_chunk(&self, record: &VariantRecord, admitted: bool) -> bool {
        if self.current.chrom().is_some_and(|c| c != record.chrom) {
            return true;
        }
        admitted
            && self.current.has_admitted()
            && self.running_end.saturating_add(self.chunk_gap) < record.start()
    }

    /// Place one record, returning a finished chunk if it closed one.
    fn push(&mut self, source: Source, record: VariantRecord) -> Option<Chunk> {
        let admitted = !record.is_monomorphic() && !(self.exclude)(source, &record);
        let finished = if self.starts_new_chunk(&record, admitted) {
            Some(self.rotate())
        } else {
            None
        };

        if self.current.chrom.is_none() {
            self.current.chrom = Some(record.chrom.clone());
        }
        if admitted {
            debug!("Adding to {} -> {}", source, record);
            self.running_end = self.running_end.max(record.end());
            self.admitted += 1;
            let record = Arc::new(record);
            match source {
                Source::Base => self.current.base.push(record),
                Source::Comp => self.current.comp.push(record),
            }
        } else {
            self.filtered += 1;
            self.current.filtered.bump(source);
        }
        finished
    }
}

impl<I, F> Iterator for Chunker<I, F>
where
    I: Iterator<Item = Result<(Source, VariantRecord)>>,
    F: Fn(Source, &VariantRecord) -> bool,
{
    type Item = Result<Chunk>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            match self.records.next() {
                Some(Ok((source, record))) => {
                    if let Some(chunk) = self.push(source, record) {
                        return Some(Ok(chunk));
                    }
                }
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e));
                }
                None => {
                    self.done = true;
                    if self.current.is_empty() {
                        return None;
                    }
                    let last = self.rotate();
                    info!(
                        "{} chunks of {} variants ({} admitted, {} filtered)",
                        last.id,
                        self.admitted + self.filtered,
                        self.admitted,
                        self.filtered
                    );
                    return Some(Ok(last));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streaming::MergedRecords;
    use crate::vcf::parse_record_line;

    /// An insertion of `len` bases at 1-based `pos`.
    fn ins(chrom: &str, pos: u64, len: usize) -> VariantRecord {
        let alt = format!("A{}", "C".repeat(len));
        parse_record_line(&format!("{}\t{}\t.\tA\t{}\t.\t.\t.", chrom, pos, alt), 1).unwrap()
    }

    fn stream(records: Vec<(Source, VariantRecord)>) -> impl Iterator<Item = Result<(Source, VariantRecord)>> {
        records.into_iter().map(Ok)
    }

    fn keep_all(_: Source, _: &VariantRecord) -> bool {
        false
    }

    #[test]
    fn test_split_on_gap() {
        let records = vec![
            (Source::Base, ins("chr1", 100, 60)),
            (Source::Comp, ins("chr1", 150, 60)),
            (Source::Base, ins("chr1", 1150, 60)), // end 150 + 1000 >= 1149
            (Source::Comp, ins("chr1", 2200, 60)), // 1150 + 1000 < 2199
        ];
        let chunks: Vec<Chunk> = Chunker::new(stream(records), 1000, keep_all)
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].id, 1);
        assert_eq!(chunks[0].base.len(), 2);
        assert_eq!(chunks[0].comp.len(), 1);
        assert_eq!(chunks[1].id, 2);
        assert_eq!(chunks[1].comp.len(), 1);
    }

    #[test]
    fn test_filtered_records_are_tallied() {
        let mono = parse_record_line("chr1\t120\t.\tA\t.\t.\t.\t.", 1).unwrap();
        let records = vec![
            (Source::Base, ins("chr1", 100, 60)),
            (Source::Base, mono),
            (Source::Comp, ins("chr1", 130, 5)),
            (Source::Comp, ins("chr1", 140, 60)),
        ];
        let small = |_: Source, r: &VariantRecord| r.size() < 30;
        let chunks: Vec<Chunk> = Chunker::new(stream(records), 1000, small)
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].base.len(), 1);
        assert_eq!(chunks[0].comp.len(), 1);
        assert_eq!(chunks[0].filtered, FilteredTally { base: 1, comp: 1 });
    }

    #[test]
    fn test_filtered_records_do_not_extend_chunk() {
        // A long filtered record would bridge the gap if it counted
        let long = parse_record_line(
            "chr1\t101\t.\tN\t<DEL>\t.\tLowQual\tSVTYPE=DEL;END=5000;SVLEN=-4900",
            1,
        )
        .unwrap();
        let records = vec![
            (Source::Base, ins("chr1", 100, 60)),
            (Source::Comp, long),
            (Source::Comp, ins("chr1", 3000, 60)),
        ];
        let exclude = |_: Source, r: &VariantRecord| r.is_filtered();
        let chunks: Vec<Chunk> = Chunker::new(stream(records), 1000, exclude)
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(chunks.len(), 2);
    }

    #[test]
    fn test_infinite_gap_gives_one_chunk_per_chromosome() {
        let base = vec![
            Ok(ins("chr1", 100, 60)),
            Ok(ins("chr1", 900_000, 60)),
            Ok(ins("chr2", 5, 60)),
            Ok(ins("chr3", 10_000_000, 60)),
        ];
        let comp = vec![
            Ok(ins("chr1", 50_000_000, 60)),
            Ok(ins("chr2", 7, 60)),
            Ok(ins("chr3", 1, 60)),
        ];
        let merged = MergedRecords::new(vec![
            (Source::Base, base.into_iter()),
            (Source::Comp, comp.into_iter()),
        ]);
        let chunks: Vec<Chunk> = Chunker::new(merged, u64::MAX, keep_all)
            .collect::<Result<_>>()
            .unwrap();

        let chroms: Vec<&str> = chunks.iter().filter_map(|c| c.chrom()).collect();
        assert_eq!(chroms, vec!["chr1", "chr2", "chr3"]);
        for chunk in &chunks {
            let chrom = chunk.chrom().unwrap();
            assert!(chunk.base.iter().chain(&chunk.comp).all(|r| r.chrom == chrom));
        }
        assert_eq!(chunks[0].base.len() + chunks[0].comp.len(), 3);
    }

    #[test]
    fn test_empty_stream() {
        let mut chunker = Chunker::new(stream(Vec::new()), 1000, keep_all);
        assert!(chunker.next().is_none());
    }
}
