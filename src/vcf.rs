//! VCF input through noodles, and the annotated VCF writer.
//!
//! Records are read with the lazy `noodles::vcf::Record` so that columns the
//! matcher does not interpret (INFO, FORMAT and the samples) are carried as
//! their raw text. Only GT is pulled out of the sample columns.

use crate::error::{BenchError, Result};
use crate::input::open_input;
use crate::matching::Annotation;
use crate::variant::{Genotype, VariantRecord};
use memchr::memchr_iter;
use noodles::vcf;
use std::io::{self, BufRead, BufWriter, Write};
use std::path::Path;

/// Buffer size for output VCF files.
const DEFAULT_BUFFER_SIZE: usize = 1024 * 1024;

/// INFO header lines describing the annotations written to output records.
pub const ANNOTATION_HEADER_LINES: &[&str] = &[
    "##INFO=<ID=TruScore,Number=1,Type=Float,Description=\"Composite score for similarity of match\">",
    "##INFO=<ID=PctSeqSimilarity,Number=1,Type=Float,Description=\"Pct sequence similarity between this variant and its closest match\">",
    "##INFO=<ID=PctSizeSimilarity,Number=1,Type=Float,Description=\"Pct size similarity between this variant and its closest match\">",
    "##INFO=<ID=PctRecOverlap,Number=1,Type=Float,Description=\"Percent reciprocal overlap percent of the two calls' coordinates\">",
    "##INFO=<ID=SizeDiff,Number=1,Type=Float,Description=\"Base variant length - comparison variant length\">",
    "##INFO=<ID=StartDistance,Number=1,Type=Integer,Description=\"Distance of the base variant's start from the comparison variant's start\">",
    "##INFO=<ID=EndDistance,Number=1,Type=Integer,Description=\"Distance of the base variant's end from the comparison variant's end\">",
    "##INFO=<ID=NumNeighbors,Number=1,Type=Integer,Description=\"Number of calls compared to this call\">",
    "##INFO=<ID=NumThresholdNeighbors,Number=1,Type=Integer,Description=\"Number of calls compared that passed all thresholds\">",
    "##INFO=<ID=MatchId,Number=1,Type=String,Description=\"Id to help tie base/comp calls together {chunkid}.{baseid}\">",
];

const MINIMAL_HEADER: &str =
    "##fileformat=VCFv4.2\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n";

/// Parsed VCF header.
#[derive(Debug, Clone)]
pub struct VcfHeader {
    inner: vcf::Header,
}

impl VcfHeader {
    pub fn sample_count(&self) -> usize {
        self.inner.sample_names().len()
    }

    /// Column index of a sample by name.
    pub fn sample_index(&self, name: &str) -> Option<usize> {
        self.inner.sample_names().get_index_of(name)
    }

    /// Resolve an optional sample selector; `None` means the first sample.
    pub fn resolve_sample(&self, name: Option<&str>) -> Result<usize> {
        match name {
            Some(name) => self.sample_index(name).ok_or_else(|| {
                BenchError::Config(format!("sample {} not found in VCF", name))
            }),
            None => Ok(0),
        }
    }

    /// `##contig` IDs in declaration order.
    pub fn contig_names(&self) -> impl Iterator<Item = &str> {
        self.inner.contigs().keys().map(|name| name.as_str())
    }
}

/// A streaming VCF reader over plain or gzip input.
pub struct VcfReader<R: BufRead> {
    inner: vcf::io::Reader<R>,
    header: VcfHeader,
    record: vcf::Record,
    ordinal: u64,
}

impl VcfReader<Box<dyn BufRead + Send>> {
    /// Open a plain or gzip compressed VCF from a path.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::new(open_input(path)?)
    }
}

impl<R: BufRead> VcfReader<R> {
    /// Create a reader and consume the header.
    pub fn new(reader: R) -> Result<Self> {
        let mut inner = vcf::io::Reader::new(reader);
        let header = inner
            .read_header()
            .map_err(|e| BenchError::InvalidFormat(format!("invalid VCF header: {}", e)))?;
        Ok(Self {
            inner,
            header: VcfHeader { inner: header },
            record: vcf::Record::default(),
            ordinal: 0,
        })
    }

    pub fn header(&self) -> &VcfHeader {
        &self.header
    }

    /// Read the next record.
    pub fn read_record(&mut self) -> Result<Option<VariantRecord>> {
        let ordinal = self.ordinal + 1;
        match self.inner.read_record(&mut self.record) {
            Ok(0) => Ok(None),
            Ok(_) => {
                self.ordinal = ordinal;
                from_noodles(&self.record, ordinal).map(Some)
            }
            Err(e) => Err(record_error(ordinal, e)),
        }
    }

    /// Get an iterator over all records.
    pub fn records(self) -> VcfRecordIter<R> {
        VcfRecordIter { reader: self }
    }
}

/// Iterator over VCF records.
pub struct VcfRecordIter<R: BufRead> {
    reader: VcfReader<R>,
}

impl<R: BufRead> Iterator for VcfRecordIter<R> {
    type Item = Result<VariantRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.reader.read_record().transpose()
    }
}

/// Parse one tab-delimited VCF data line.
pub fn parse_record_line(line: &str, ordinal: u64) -> Result<VariantRecord> {
    let text = format!("{}{}\n", MINIMAL_HEADER, line);
    let mut reader = VcfReader::new(text.as_bytes())?;
    reader.ordinal = ordinal.saturating_sub(1);
    reader
        .read_record()?
        .ok_or_else(|| BenchError::InvalidFormat(format!("record {}: empty line", ordinal)))
}

fn record_error(ordinal: u64, e: io::Error) -> BenchError {
    match e.kind() {
        io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof => {
            BenchError::InvalidFormat(format!("record {}: {}", ordinal, e))
        }
        _ => BenchError::Io(e),
    }
}

fn missing(value: &str) -> bool {
    value.is_empty() || value == "."
}

fn from_noodles(record: &vcf::Record, ordinal: u64) -> Result<VariantRecord> {
    let pos = match record.variant_start() {
        Some(start) => usize::from(start.map_err(|e| record_error(ordinal, e))?) as u64,
        None => 0,
    };
    let ref_allele = record.reference_bases();
    if ref_allele.is_empty() {
        return Err(BenchError::InvalidFormat(format!("record {}: empty REF", ordinal)));
    }

    let id = match record.ids().as_ref() {
        ids if missing(ids) => ".".to_string(),
        ids => ids.to_string(),
    };
    let alts = match record.alternate_bases().as_ref() {
        alts if missing(alts) => Vec::new(),
        alts => alts.split(',').map(String::from).collect(),
    };
    let filters = match record.filters().as_ref() {
        filters if missing(filters) => Vec::new(),
        filters => filters.split(';').map(String::from).collect(),
    };
    let info = match record.info().as_ref() {
        info if missing(info) => ".".to_string(),
        info => info.to_string(),
    };
    let qual = match record.quality_score() {
        Some(score) => format_qual(score.map_err(|e| record_error(ordinal, e))?),
        None => ".".to_string(),
    };

    let samples = record.samples();
    let (sample_columns, genotypes) = match samples.as_ref() {
        "" => (None, Vec::new()),
        raw => (Some(raw.to_string()), parse_genotypes(raw)),
    };

    Ok(VariantRecord::from_columns(
        ordinal,
        record.reference_sequence_name().to_string(),
        pos,
        id,
        ref_allele.to_string(),
        alts,
        qual,
        filters,
        info,
        sample_columns,
        genotypes,
    ))
}

fn format_qual(score: f32) -> String {
    if score.fract() == 0.0 && score >= 0.0 && score < u32::MAX as f32 {
        itoa::Buffer::new().format(score as u32).to_string()
    } else {
        ryu::Buffer::new().format(score).to_string()
    }
}

/// GT of each sample from the FORMAT and sample columns.
fn parse_genotypes(raw: &str) -> Vec<Option<Genotype>> {
    let mut columns = Vec::with_capacity(4);
    let mut last = 0;
    for tab in memchr_iter(b'\t', raw.as_bytes()) {
        columns.push(&raw[last..tab]);
        last = tab + 1;
    }
    columns.push(&raw[last..]);

    let gt_field = columns[0].split(':').position(|key| key == "GT");
    columns[1..]
        .iter()
        .map(|sample| {
            gt_field
                .and_then(|idx| sample.split(':').nth(idx))
                .map(Genotype::parse)
        })
        .collect()
}

/// The annotation INFO definitions as noodles header records.
fn annotation_infos() -> Result<vcf::Header> {
    let mut text = String::from("##fileformat=VCFv4.2\n");
    for line in ANNOTATION_HEADER_LINES {
        text.push_str(line);
        text.push('\n');
    }
    text.push_str("#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n");
    text.parse::<vcf::Header>()
        .map_err(|e| BenchError::InvalidFormat(format!("annotation header: {}", e)))
}

/// VCF writer that appends match annotations to the INFO column.
///
/// The header goes through noodles; data lines are written directly with
/// itoa/ryu for the numeric annotation values.
pub struct VcfWriter<W: Write> {
    writer: BufWriter<W>,
    itoa_buf: itoa::Buffer,
    ryu_buf: ryu::Buffer,
}

impl<W: Write> VcfWriter<W> {
    pub fn new(output: W) -> Self {
        Self {
            writer: BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, output),
            itoa_buf: itoa::Buffer::new(),
            ryu_buf: ryu::Buffer::new(),
        }
    }

    /// Write the input header with the annotation INFO fields added.
    pub fn write_header(&mut self, header: &VcfHeader) -> Result<()> {
        let mut header = header.inner.clone();
        let annotations = annotation_infos()?;
        for (id, info) in annotations.infos() {
            if !header.infos().contains_key(id) {
                header.infos_mut().insert(id.clone(), info.clone());
            }
        }
        vcf::io::Writer::new(&mut self.writer).write_header(&header)?;
        Ok(())
    }

    /// Write one record with its annotations.
    pub fn write_record(&mut self, record: &VariantRecord, annotation: &Annotation) -> Result<()> {
        let w = &mut self.writer;
        w.write_all(record.chrom.as_bytes())?;
        w.write_all(b"\t")?;
        w.write_all(self.itoa_buf.format(record.pos).as_bytes())?;
        w.write_all(b"\t")?;
        w.write_all(record.id.as_bytes())?;
        w.write_all(b"\t")?;
        w.write_all(record.ref_allele.as_bytes())?;
        w.write_all(b"\t")?;
        write_joined(w, &record.alts, b",")?;
        w.write_all(b"\t")?;
        w.write_all(record.qual.as_bytes())?;
        w.write_all(b"\t")?;
        write_joined(w, &record.filters, b";")?;
        w.write_all(b"\t")?;

        let mut first = record.info == "." || record.info.is_empty();
        if !first {
            w.write_all(record.info.as_bytes())?;
        }
        let mut put = |key: &str, value: &[u8], first: &mut bool| -> std::io::Result<()> {
            if !*first {
                w.write_all(b";")?;
            }
            *first = false;
            w.write_all(key.as_bytes())?;
            w.write_all(b"=")?;
            w.write_all(value)
        };

        if let Some(score) = annotation.score {
            put("TruScore", self.ryu_buf.format(score).as_bytes(), &mut first)?;
        }
        if let Some(seqsim) = annotation.seqsim {
            put("PctSeqSimilarity", self.ryu_buf.format(seqsim).as_bytes(), &mut first)?;
        }
        if let Some(sizesim) = annotation.sizesim {
            put("PctSizeSimilarity", self.ryu_buf.format(sizesim).as_bytes(), &mut first)?;
        }
        if let Some(ovlpct) = annotation.ovlpct {
            put("PctRecOverlap", self.ryu_buf.format(ovlpct).as_bytes(), &mut first)?;
        }
        if let Some(sizediff) = annotation.sizediff {
            put("SizeDiff", self.itoa_buf.format(sizediff).as_bytes(), &mut first)?;
        }
        if let Some(st_dist) = annotation.st_dist {
            put("StartDistance", self.itoa_buf.format(st_dist).as_bytes(), &mut first)?;
        }
        if let Some(ed_dist) = annotation.ed_dist {
            put("EndDistance", self.itoa_buf.format(ed_dist).as_bytes(), &mut first)?;
        }
        put(
            "NumNeighbors",
            self.itoa_buf.format(annotation.num_neighbors).as_bytes(),
            &mut first,
        )?;
        put(
            "NumThresholdNeighbors",
            self.itoa_buf.format(annotation.num_threshold_neighbors).as_bytes(),
            &mut first,
        )?;
        if let Some(match_id) = annotation.match_id {
            put("MatchId", match_id.to_string().as_bytes(), &mut first)?;
        }

        if let Some(ref samples) = record.sample_columns {
            w.write_all(b"\t")?;
            w.write_all(samples.as_bytes())?;
        }
        w.write_all(b"\n")?;
        Ok(())
    }

    /// Flush the output buffer.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

fn write_joined<W: Write>(w: &mut W, values: &[String], sep: &[u8]) -> std::io::Result<()> {
    if values.is_empty() {
        return w.write_all(b".");
    }
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            w.write_all(sep)?;
        }
        w.write_all(value.as_bytes())?;
    }
    Ok(())
}
