//! Sequence similarity primitives.
//!
//! All comparisons are case-insensitive. Two empty sequences are identical.

use crate::config::SeqSimAlgorithm;
use crate::error::Result;
use crate::reference::ReferenceProvider;
use crate::variant::VariantRecord;

/// Levenshtein edit distance (substitutions, insertions, deletions).
pub fn edit_distance(a: &[u8], b: &[u8]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut cur = vec![0usize; b.len() + 1];
    for (i, &ca) in a.iter().enumerate() {
        cur[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let cost = usize::from(!ca.eq_ignore_ascii_case(&cb));
            cur[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(cur[j] + 1);
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}

/// Length of the longest common subsequence.
pub fn lcs_length(a: &[u8], b: &[u8]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let mut prev = vec![0usize; b.len() + 1];
    let mut cur = vec![0usize; b.len() + 1];
    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            cur[j + 1] = if ca.eq_ignore_ascii_case(&cb) {
                prev[j] + 1
            } else {
                prev[j + 1].max(cur[j])
            };
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}

/// `(|a| + |b| - edit distance) / (|a| + |b|)`
pub fn edit_ratio(a: &[u8], b: &[u8]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    (total - edit_distance(a, b)) as f64 / total as f64
}

/// Indel similarity: `2 * LCS / (|a| + |b|)`
pub fn levenshtein_ratio(a: &[u8], b: &[u8]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    (2 * lcs_length(a, b)) as f64 / total as f64
}

/// Similarity ratio in `[0, 1]` with the chosen algorithm.
#[inline]
pub fn similarity(a: &str, b: &str, algorithm: SeqSimAlgorithm) -> f64 {
    match algorithm {
        SeqSimAlgorithm::EditDistance => edit_ratio(a.as_bytes(), b.as_bytes()),
        SeqSimAlgorithm::Levenshtein => levenshtein_ratio(a.as_bytes(), b.as_bytes()),
    }
}

/// Compare two alleles directly, and again after rotating `b` by `offset`.
///
/// Tandem-repeat insertions placed at different positions describe the same
/// haplotype with a rotated allele; the better of the two ratios is kept.
pub fn unroll_similarity(a: &str, b: &str, offset: u64, algorithm: SeqSimAlgorithm) -> f64 {
    let direct = similarity(a, b, algorithm);
    if b.is_empty() || !b.is_ascii() {
        return direct;
    }
    let pos = (offset % b.len() as u64) as usize;
    if pos == 0 {
        return direct;
    }
    let rotated = format!("{}{}", &b[pos..], &b[..pos]);
    direct.max(similarity(a, &rotated, algorithm))
}

/// A haplotype window shared by two records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HaplotypeWindow {
    pub start: u64,
    pub end: u64,
}

impl HaplotypeWindow {
    /// `[min start - buffer, max end + buffer)` over both records.
    pub fn around(a: &VariantRecord, b: &VariantRecord, buffer: u64) -> Self {
        Self {
            start: a.start().min(b.start()).saturating_sub(buffer),
            end: a.end().max(b.end()).saturating_add(buffer),
        }
    }
}

/// Reference sequence of the window with the record's first ALT substituted
/// for its REF bases.
pub fn build_haplotype(
    reference: &dyn ReferenceProvider,
    record: &VariantRecord,
    window: HaplotypeWindow,
) -> Result<String> {
    let context = reference.fetch(&record.chrom, window.start, window.end)?;
    let alt = record.alt().unwrap_or_default();
    let ref_start = (record.start() - window.start) as usize;
    let ref_end = ref_start + record.ref_allele.len();
    let prefix = context.get(..ref_start.min(context.len())).unwrap_or_default();
    let suffix = context.get(ref_end.min(context.len())..).unwrap_or_default();
    Ok(format!("{}{}{}", prefix, alt, suffix))
}
