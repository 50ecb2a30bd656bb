//! In-memory record source with range fetch.
//!
//! Used by the index strategy: the comparison records are read once, the
//! [`SpanIndex`](crate::index::SpanIndex) narrows each base record to a
//! coordinate range, and the candidates are fetched back from here.

use crate::variant::VariantRecord;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Records grouped by chromosome, sorted by start within each group.
#[derive(Debug, Default)]
pub struct RecordStore {
    by_chrom: FxHashMap<String, Vec<Arc<VariantRecord>>>,
    /// Chromosomes in first-seen order
    chrom_order: Vec<String>,
    len: usize,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from records in file order.
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = Arc<VariantRecord>>,
    {
        let mut store = Self::new();
        for record in records {
            store.push(record);
        }
        for records in store.by_chrom.values_mut() {
            // Stable, so equal starts keep file order
            records.sort_by_key(|r| r.start());
        }
        store
    }

    fn push(&mut self, record: Arc<VariantRecord>) {
        if !self.by_chrom.contains_key(&record.chrom) {
            self.chrom_order.push(record.chrom.clone());
        }
        self.by_chrom
            .entry(record.chrom.clone())
            .or_default()
            .push(record);
        self.len += 1;
    }

    /// Records on `chrom` whose start lies in `[start, end]`.
    pub fn fetch(&self, chrom: &str, start: u64, end: u64) -> &[Arc<VariantRecord>] {
        let Some(records) = self.by_chrom.get(chrom) else {
            return &[];
        };
        let lo = records.partition_point(|r| r.start() < start);
        let hi = records.partition_point(|r| r.start() <= end);
        if lo >= hi {
            &[]
        } else {
            &records[lo..hi]
        }
    }

    /// All records, chromosome by chromosome in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<VariantRecord>> {
        self.chrom_order
            .iter()
            .filter_map(|chrom| self.by_chrom.get(chrom))
            .flatten()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
