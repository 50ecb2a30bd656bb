//! Chromosome ordering and input order checks.
//!
//! Both sources must list chromosomes in one shared [`ChromOrder`]: the
//! `##contig` declarations of the headers where present, then plain string
//! comparison for anything undeclared. The merge ranks chromosomes with the
//! same order, so a source that skips chromosomes still lines up with the
//! other one.

use crate::error::{BenchError, Result};
use crate::variant::VariantRecord;
use crate::vcf::VcfHeader;
use rustc_hash::FxHashMap;
use std::cmp::Ordering;
use std::path::PathBuf;
use std::sync::Arc;

/// Rank of a chromosome. Declared contigs come first in declaration order;
/// undeclared names sort after them by name.
#[derive(Debug, Clone, Default)]
pub struct ChromOrder {
    declared: FxHashMap<String, usize>,
}

impl ChromOrder {
    /// Plain string order for every chromosome.
    pub fn lexicographic() -> Self {
        Self::default()
    }

    /// Declared order from a list of contig names; repeats keep their first rank.
    pub fn from_contigs<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let mut declared = FxHashMap::default();
        for name in names {
            let rank = declared.len();
            declared.entry(name.to_string()).or_insert(rank);
        }
        Self { declared }
    }

    /// Contigs of the base header, then any the comparison header adds.
    pub fn from_headers(base: &VcfHeader, comp: &VcfHeader) -> Self {
        Self::from_contigs(base.contig_names().chain(comp.contig_names()))
    }

    /// Declared rank, `usize::MAX` for undeclared names.
    #[inline]
    pub fn rank(&self, chrom: &str) -> usize {
        self.declared.get(chrom).copied().unwrap_or(usize::MAX)
    }

    #[inline]
    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        self.rank(a).cmp(&self.rank(b)).then_with(|| a.cmp(b))
    }
}

/// Tracks the last (chromosome, start) of a stream and rejects records that
/// step backwards in the shared order.
#[derive(Debug)]
pub struct SortValidator {
    order: Arc<ChromOrder>,
    last: Option<(String, u64)>,
    checked: usize,
}

impl SortValidator {
    pub fn new(order: Arc<ChromOrder>) -> Self {
        Self {
            order,
            last: None,
            checked: 0,
        }
    }

    /// Accept the next record position, or describe why it is out of order.
    #[inline]
    pub fn check(&mut self, chrom: &str, start: u64) -> std::result::Result<(), String> {
        self.checked += 1;
        if let Some((last_chrom, last_start)) = self.last.as_mut() {
            match self.order.compare(last_chrom, chrom) {
                Ordering::Equal if start < *last_start => {
                    return Err(format!(
                        "record {} starts at {}:{} after {}:{}",
                        self.checked, chrom, start, last_chrom, last_start
                    ));
                }
                Ordering::Equal => {
                    *last_start = start;
                    return Ok(());
                }
                Ordering::Greater => {
                    return Err(format!(
                        "record {} on {} follows {}; chromosomes must follow header contig order, then name order",
                        self.checked, chrom, last_chrom
                    ));
                }
                Ordering::Less => {}
            }
        }
        self.last = Some((chrom.to_string(), start));
        Ok(())
    }

    /// Records checked so far.
    pub fn checked(&self) -> usize {
        self.checked
    }
}

/// Iterator adapter that checks record order and tags failures with the
/// source path.
///
/// Parse errors and ordering violations both surface as
/// [`BenchError::MalformedSource`]; I/O errors pass through unchanged.
pub struct SortedRecords<I> {
    records: I,
    path: PathBuf,
    validator: SortValidator,
    stopped: bool,
}

impl<I> SortedRecords<I>
where
    I: Iterator<Item = Result<VariantRecord>>,
{
    pub fn new(records: I, path: impl Into<PathBuf>, order: Arc<ChromOrder>) -> Self {
        Self {
            records,
            path: path.into(),
            validator: SortValidator::new(order),
            stopped: false,
        }
    }

    fn malformed(&self, message: String) -> BenchError {
        BenchError::MalformedSource {
            path: self.path.clone(),
            message,
        }
    }
}

impl<I> Iterator for SortedRecords<I>
where
    I: Iterator<Item = Result<VariantRecord>>,
{
    type Item = Result<VariantRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.stopped {
            return None;
        }
        let item = match self.records.next()? {
            Ok(record) => self
                .validator
                .check(&record.chrom, record.start())
                .map(|()| record)
                .map_err(|message| self.malformed(format!("unsorted input: {}", message))),
            Err(e @ (BenchError::Parse { .. } | BenchError::InvalidFormat(_))) => {
                Err(self.malformed(e.to_string()))
            }
            Err(e) => Err(e),
        };
        self.stopped = item.is_err();
        Some(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vcf::parse_record_line;

    fn rec(chrom: &str, pos: u64) -> Result<VariantRecord> {
        parse_record_line(&format!("{}\t{}\t.\tA\tAC\t.\t.\t.", chrom, pos), 1)
    }

    fn lexicographic() -> Arc<ChromOrder> {
        Arc::new(ChromOrder::lexicographic())
    }

    #[test]
    fn test_declared_contigs_rank_first() {
        let order = ChromOrder::from_contigs(["chr2", "chr10", "chr2"]);
        assert_eq!(order.rank("chr2"), 0);
        assert_eq!(order.rank("chr10"), 1);
        assert_eq!(order.rank("chrM"), usize::MAX);
        assert_eq!(order.compare("chr2", "chr10"), Ordering::Less);
        assert_eq!(order.compare("chr10", "chrM"), Ordering::Less);
        assert_eq!(order.compare("chrX", "chrM"), Ordering::Greater);
    }

    #[test]
    fn test_lexicographic_rejects_karyotypic() {
        let mut validator = SortValidator::new(lexicographic());
        assert!(validator.check("chr1", 100).is_ok());
        assert!(validator.check("chr1", 100).is_ok());
        assert!(validator.check("chr10", 50).is_ok());
        assert!(validator.check("chr2", 10).is_ok());
        assert_eq!(validator.checked(), 4);

        let mut validator = SortValidator::new(lexicographic());
        assert!(validator.check("chr2", 100).is_ok());
        let err = validator.check("chr10", 100).unwrap_err();
        assert!(err.contains("chr10 follows chr2"));
    }

    #[test]
    fn test_contig_order_accepts_karyotypic() {
        let order = Arc::new(ChromOrder::from_contigs(["chr1", "chr2", "chr10"]));
        let mut validator = SortValidator::new(order);
        assert!(validator.check("chr2", 100).is_ok());
        assert!(validator.check("chr10", 5).is_ok());
        // Undeclared chromosomes come last
        assert!(validator.check("chrUn", 1).is_ok());
        assert!(validator.check("chr1", 1).is_err());
    }

    #[test]
    fn test_rejects_backwards_start_and_revisits() {
        let mut validator = SortValidator::new(lexicographic());
        assert!(validator.check("chr1", 200).is_ok());
        let err = validator.check("chr1", 100).unwrap_err();
        assert!(err.contains("chr1:100 after chr1:200"));

        let mut validator = SortValidator::new(lexicographic());
        assert!(validator.check("chr1", 100).is_ok());
        assert!(validator.check("chr2", 100).is_ok());
        assert!(validator.check("chr1", 300).is_err());
    }

    #[test]
    fn test_sorted_records_tags_path() {
        let records = vec![rec("chr1", 300), rec("chr1", 100), rec("chr1", 400)];
        let mut iter = SortedRecords::new(records.into_iter(), "comp.vcf", lexicographic());

        assert!(iter.next().unwrap().is_ok());
        match iter.next().unwrap() {
            Err(BenchError::MalformedSource { path, message }) => {
                assert_eq!(path, PathBuf::from("comp.vcf"));
                assert!(message.starts_with("unsorted input"));
            }
            other => panic!("expected malformed source, got {:?}", other),
        }
        // Stops after the first failure
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_sorted_records_wraps_parse_errors() {
        let records = vec![rec("chr1", 100), parse_record_line("chr1\tx\t.\tA\tG\t.\t.\t.", 2)];
        let results: Vec<_> =
            SortedRecords::new(records.into_iter(), "base.vcf", lexicographic()).collect();
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(BenchError::MalformedSource { .. })));
        assert_eq!(results[1].as_ref().unwrap_err().exit_code(), 100);
    }
}
