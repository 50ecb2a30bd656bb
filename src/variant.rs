//! Variant record model.
//!
//! Records are built by [`crate::vcf::VcfReader`] from noodles records and
//! never mutated after that. Everything the matcher needs (type, size, boundaries, allele
//! sequence, genotypes) is derived once when the record is built.

use rustc_hash::FxHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Structural variant classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariantType {
    Snp,
    Del,
    Ins,
    Dup,
    Inv,
    Bnd,
    /// Monomorphic reference (no ALT)
    Non,
    Unk,
}

impl VariantType {
    /// Parse an `SVTYPE` value or symbolic ALT tag (`DEL`, `DUP:TANDEM`, ...).
    pub fn from_tag(tag: &str) -> Self {
        let base = tag.split(':').next().unwrap_or(tag);
        match base.to_ascii_uppercase().as_str() {
            "DEL" => VariantType::Del,
            "INS" => VariantType::Ins,
            "DUP" => VariantType::Dup,
            "INV" => VariantType::Inv,
            "BND" | "TRA" => VariantType::Bnd,
            "SNP" | "SNV" => VariantType::Snp,
            _ => VariantType::Unk,
        }
    }

    /// Bucket used by the type check, optionally folding DUP into INS.
    #[inline]
    pub fn normalized(self, dup_to_ins: bool) -> Self {
        if dup_to_ins && self == VariantType::Dup {
            VariantType::Ins
        } else {
            self
        }
    }
}

impl fmt::Display for VariantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VariantType::Snp => "SNP",
            VariantType::Del => "DEL",
            VariantType::Ins => "INS",
            VariantType::Dup => "DUP",
            VariantType::Inv => "INV",
            VariantType::Bnd => "BND",
            VariantType::Non => "NON",
            VariantType::Unk => "UNK",
        };
        write!(f, "{}", s)
    }
}

/// A per-sample genotype: allele indices in call order, `None` for `.`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Genotype {
    pub alleles: Vec<Option<u32>>,
    pub phased: bool,
}

impl Genotype {
    /// Parse a GT value such as `0/1`, `1|1`, `./.` or `1`.
    pub fn parse(gt: &str) -> Self {
        let phased = gt.contains('|');
        let alleles = gt
            .split(['/', '|'])
            .map(|a| if a == "." { None } else { a.parse().ok() })
            .collect();
        Self { alleles, phased }
    }

    /// Number of called non-reference alleles, any ALT index.
    #[inline]
    pub fn non_ref_count(&self) -> u32 {
        self.alleles
            .iter()
            .filter(|a| matches!(a, Some(i) if *i > 0))
            .count() as u32
    }

    /// Copies of the first ALT allele. Genotype matching compares these, so
    /// `1/2` counts one copy.
    #[inline]
    pub fn first_alt_count(&self) -> u32 {
        self.alleles.iter().filter(|a| **a == Some(1)).count() as u32
    }

    /// True when at least one non-reference allele was called.
    #[inline]
    pub fn is_present(&self) -> bool {
        self.non_ref_count() > 0
    }
}

impl fmt::Display for Genotype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sep = if self.phased { "|" } else { "/" };
        let parts: Vec<String> = self
            .alleles
            .iter()
            .map(|a| a.map_or_else(|| ".".to_string(), |i| i.to_string()))
            .collect();
        write!(f, "{}", parts.join(sep))
    }
}

/// One VCF data line with its derived matching attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantRecord {
    /// 1-based record number within its source file
    pub ordinal: u64,
    pub chrom: String,
    /// 1-based VCF position
    pub pos: u64,
    pub id: String,
    pub ref_allele: String,
    /// Alternate alleles; empty for monomorphic records
    pub alts: Vec<String>,
    pub qual: String,
    /// FILTER values; empty for `.`
    pub filters: Vec<String>,
    /// Raw INFO column
    pub info: String,
    /// FORMAT and sample columns, tab joined, untouched
    pub sample_columns: Option<String>,
    /// GT per sample, `None` when the FORMAT has no GT
    pub genotypes: Vec<Option<Genotype>>,
    pub(crate) svtype: Option<String>,
    pub(crate) svlen: Option<i64>,
    pub(crate) info_end: Option<u64>,
    // derived
    start: u64,
    end: u64,
    variant_type: VariantType,
    size: u64,
}

impl VariantRecord {
    /// Build a record and compute its derived attributes.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_columns(
        ordinal: u64,
        chrom: String,
        pos: u64,
        id: String,
        ref_allele: String,
        alts: Vec<String>,
        qual: String,
        filters: Vec<String>,
        info: String,
        sample_columns: Option<String>,
        genotypes: Vec<Option<Genotype>>,
    ) -> Self {
        let (svtype, svlen, info_end) = scan_info(&info);
        let mut record = Self {
            ordinal,
            chrom,
            pos,
            id,
            ref_allele,
            alts,
            qual,
            filters,
            info,
            sample_columns,
            genotypes,
            svtype,
            svlen,
            info_end,
            start: 0,
            end: 0,
            variant_type: VariantType::Unk,
            size: 0,
        };
        record.start = record.pos.saturating_sub(1);
        record.end = match record.info_end {
            Some(end) if end >= record.start => end,
            _ => record.start + record.ref_allele.len() as u64,
        };
        record.variant_type = record.derive_type();
        record.size = record.derive_size();
        record
    }

    /// 0-based inclusive start.
    #[inline]
    pub fn start(&self) -> u64 {
        self.start
    }

    /// 0-based exclusive end.
    #[inline]
    pub fn end(&self) -> u64 {
        self.end
    }

    /// `(start, end)` boundaries used for proximity and overlap.
    #[inline]
    pub fn boundaries(&self) -> (u64, u64) {
        (self.start, self.end)
    }

    #[inline]
    pub fn variant_type(&self) -> VariantType {
        self.variant_type
    }

    /// Absolute variant size.
    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// First ALT allele, if any.
    #[inline]
    pub fn alt(&self) -> Option<&str> {
        self.alts.first().map(String::as_str)
    }

    /// True when there is no ALT allele.
    #[inline]
    pub fn is_monomorphic(&self) -> bool {
        self.alts.is_empty()
    }

    /// True when the first ALT is symbolic (`<DEL>`) or a breakend.
    pub fn is_symbolic(&self) -> bool {
        self.alt().is_some_and(|a| {
            a.starts_with('<') || a.contains('[') || a.contains(']') || a == "*"
        })
    }

    /// True when FILTER is set and doesn't include PASS.
    #[inline]
    pub fn is_filtered(&self) -> bool {
        !self.filters.is_empty() && !self.filters.iter().any(|f| f == "PASS")
    }

    /// Genotype for the given sample column.
    #[inline]
    pub fn genotype(&self, sample: usize) -> Option<&Genotype> {
        self.genotypes.get(sample).and_then(Option::as_ref)
    }

    /// True when the sample carries a non-reference allele.
    #[inline]
    pub fn is_present(&self, sample: usize) -> bool {
        self.genotype(sample).is_some_and(Genotype::is_present)
    }

    /// The sequence-resolved allele: deleted bases for deletions, inserted
    /// (or replacement) bases otherwise. `None` for symbolic alleles.
    pub fn allele_sequence(&self) -> Option<&str> {
        if self.is_symbolic() {
            return None;
        }
        let alt = self.alt()?;
        let shared = self
            .ref_allele
            .bytes()
            .zip(alt.bytes())
            .take_while(|(r, a)| r.eq_ignore_ascii_case(a))
            .count()
            .min(1);
        if self.variant_type == VariantType::Del {
            self.ref_allele.get(shared..)
        } else {
            alt.get(shared..)
        }
    }

    /// Stable content hash of the record's identifying columns.
    ///
    /// Uses `FxHasher`, which has no random state, so the value is the same
    /// on every run.
    pub fn content_hash(&self) -> u64 {
        let mut hasher = FxHasher::default();
        self.chrom.hash(&mut hasher);
        self.pos.hash(&mut hasher);
        self.id.hash(&mut hasher);
        self.ref_allele.hash(&mut hasher);
        self.alts.hash(&mut hasher);
        self.info.hash(&mut hasher);
        self.sample_columns.hash(&mut hasher);
        hasher.finish()
    }

    /// Digest of the alleles only, used in record keys.
    pub fn allele_hash(&self) -> u64 {
        let mut hasher = FxHasher::default();
        self.ref_allele.hash(&mut hasher);
        self.alts.hash(&mut hasher);
        hasher.finish()
    }

    fn derive_type(&self) -> VariantType {
        if let Some(ref svtype) = self.svtype {
            return VariantType::from_tag(svtype);
        }
        let Some(alt) = self.alt() else {
            return VariantType::Non;
        };
        if let Some(tag) = alt.strip_prefix('<').and_then(|a| a.strip_suffix('>')) {
            return VariantType::from_tag(tag);
        }
        if alt.contains('[') || alt.contains(']') {
            return VariantType::Bnd;
        }
        let r_len = self.ref_allele.len();
        let a_len = alt.len();
        if r_len < a_len {
            VariantType::Ins
        } else if r_len > a_len {
            VariantType::Del
        } else if r_len == 1 {
            VariantType::Snp
        } else {
            VariantType::Unk
        }
    }

    fn derive_size(&self) -> u64 {
        if let Some(svlen) = self.svlen {
            return svlen.unsigned_abs();
        }
        let Some(alt) = self.alt() else {
            return 0;
        };
        if self.is_symbolic() {
            return self.end - self.start;
        }
        let r_len = self.ref_allele.len() as u64;
        let a_len = alt.len() as u64;
        if r_len == a_len {
            if r_len == 1 {
                0
            } else {
                r_len
            }
        } else {
            r_len.abs_diff(a_len)
        }
    }
}

impl fmt::Display for VariantRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} {} {}>{}",
            self.chrom,
            self.pos,
            self.variant_type,
            truncate(&self.ref_allele),
            truncate(self.alt().unwrap_or("."))
        )
    }
}

fn truncate(allele: &str) -> &str {
    let cut = allele
        .char_indices()
        .nth(12)
        .map_or(allele.len(), |(i, _)| i);
    &allele[..cut]
}

/// Pull SVTYPE, SVLEN and END out of an INFO column.
fn scan_info(info: &str) -> (Option<String>, Option<i64>, Option<u64>) {
    let mut svtype = None;
    let mut svlen = None;
    let mut end = None;
    if info == "." {
        return (svtype, svlen, end);
    }
    for field in info.split(';') {
        let Some((key, value)) = field.split_once('=') else {
            continue;
        };
        let first = value.split(',').next().unwrap_or(value);
        match key {
            "SVTYPE" => svtype = Some(first.to_string()),
            "SVLEN" => svlen = first.parse().ok(),
            "END" => end = first.parse().ok(),
            _ => {}
        }
    }
    (svtype, svlen, end)
}
