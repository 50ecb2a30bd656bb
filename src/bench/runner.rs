//! The `bench` command: input checks, strategy dispatch and report files.

use super::registry::{MatchedState, Source};
use super::resolver::{AnnotatedRecord, AssignmentResolver, BenchOutput};
use super::stats::StatsBox;
use crate::config::MatchParameters;
use crate::error::{BenchError, Result};
use crate::index::SpanIndex;
use crate::interval::{overlaps, widen};
use crate::matching::{MatchId, Matcher};
use crate::parallel::{map_ordered, CHUNK_BATCH_SIZE};
use crate::reference::{FastaReference, ReferenceProvider};
use crate::regions::RegionFilter;
use crate::store::RecordStore;
use crate::streaming::{ChromOrder, Chunker, MergedRecords, SortedRecords};
use crate::variant::VariantRecord;
use crate::vcf::{VcfHeader, VcfReader, VcfRecordIter, VcfWriter};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufRead, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Flush buffered index-strategy output after this many records.
const INDEX_FLUSH_RECORDS: usize = 4096;
/// Log recall after this many chunks.
const PEEK_INTERVAL: usize = 10_000;

/// How candidate comparison records are found for each base record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Merge both sorted inputs and match within proximity chunks
    #[default]
    Chunk,
    /// Index the comparison records and look up each base record
    Index,
}

/// Headers and sample columns resolved by [`BenchCommand::check`].
#[derive(Debug, Clone)]
pub struct CheckedInputs {
    pub base_header: VcfHeader,
    pub comp_header: VcfHeader,
    pub b_sample: usize,
    pub c_sample: usize,
    /// Either input has no sample columns
    pub skip_gt: bool,
    /// Chromosome order both inputs must follow
    pub chrom_order: Arc<ChromOrder>,
}

/// Benchmark command configuration.
#[derive(Debug, Clone)]
pub struct BenchCommand {
    pub base: PathBuf,
    pub comp: PathBuf,
    pub output: PathBuf,
    pub reference: Option<PathBuf>,
    pub includebed: Option<PathBuf>,
    pub params: MatchParameters,
    pub strategy: Strategy,
    /// Resolve chunks on the rayon pool
    pub parallel: bool,
}

/// Everything written to `params.json`.
#[derive(Serialize)]
struct RunParams<'a> {
    base: &'a Path,
    comp: &'a Path,
    output: &'a Path,
    reference: Option<&'a Path>,
    includebed: Option<&'a Path>,
    strategy: Strategy,
    #[serde(flatten)]
    params: &'a MatchParameters,
}

impl BenchCommand {
    pub fn new(base: impl Into<PathBuf>, comp: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            comp: comp.into(),
            output: output.into(),
            reference: None,
            includebed: None,
            params: MatchParameters::default(),
            strategy: Strategy::default(),
            parallel: false,
        }
    }

    pub fn with_params(mut self, params: MatchParameters) -> Self {
        self.params = params;
        self
    }

    pub fn with_reference(mut self, reference: impl Into<PathBuf>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn with_includebed(mut self, includebed: impl Into<PathBuf>) -> Self {
        self.includebed = Some(includebed.into());
        self
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Validate everything that can be validated before any output exists.
    pub fn check(&self) -> Result<CheckedInputs> {
        self.params.validate()?;

        if self.output.exists() {
            return Err(BenchError::Config(format!(
                "Output directory '{}' already exists",
                self.output.display()
            )));
        }
        for path in [&self.base, &self.comp] {
            require_file(path)?;
        }
        if let Some(ref includebed) = self.includebed {
            require_file(includebed)?;
        }
        match self.reference {
            Some(ref reference) => require_file(reference)?,
            None if self.params.pctseq > 0.0 => {
                return Err(BenchError::Config(
                    "--reference is required when --pctseq is set (use --pctseq 0 to skip sequence comparison)"
                        .to_string(),
                ))
            }
            None => {}
        }

        let base_header = read_source_header(&self.base)?;
        let comp_header = read_source_header(&self.comp)?;
        let b_sample = check_sample(&self.base, &base_header, self.params.b_sample.as_deref(), self.params.gtcomp)?;
        let c_sample = check_sample(&self.comp, &comp_header, self.params.c_sample.as_deref(), self.params.gtcomp)?;
        let skip_gt = base_header.sample_count() == 0 || comp_header.sample_count() == 0;
        let chrom_order = Arc::new(ChromOrder::from_headers(&base_header, &comp_header));

        Ok(CheckedInputs {
            base_header,
            comp_header,
            b_sample,
            c_sample,
            skip_gt,
            chrom_order,
        })
    }

    /// Run the benchmark and write every output file.
    pub fn run(&self) -> Result<StatsBox> {
        let inputs = self.check()?;

        let mut matcher = Matcher::new(self.params.clone())?.with_samples(inputs.b_sample, inputs.c_sample);
        if let Some(ref path) = self.reference {
            let reference = FastaReference::from_path(path)?;
            info!("Loaded {} reference contigs", reference.len());
            matcher = matcher.with_reference(Arc::new(reference) as Arc<dyn ReferenceProvider>);
        }
        let regions = match self.includebed {
            Some(ref path) => Some(RegionFilter::from_bed(path)?),
            None => None,
        };

        let mut resolver = AssignmentResolver::new(&matcher).with_skip_gt(inputs.skip_gt);
        if let Some(ref regions) = regions {
            info!("{} include regions", regions.len());
            resolver = resolver.with_regions(regions);
        }

        fs::create_dir_all(&self.output)?;
        self.write_params()?;
        let mut outputs = OutputFiles::create(&self.output, &inputs.base_header, &inputs.comp_header)?;

        match self.strategy {
            Strategy::Chunk => self.run_chunked(&resolver, &inputs.chrom_order, &mut outputs)?,
            Strategy::Index => self.run_indexed(&resolver, &inputs.chrom_order, &mut outputs)?,
        }

        let mut stats = outputs.finish()?;
        stats.calc_performance();
        let summary = BufWriter::new(File::create(self.output.join("summary.json"))?);
        serde_json::to_writer_pretty(summary, &stats)?;
        info!("{}", stats);
        Ok(stats)
    }

    fn write_params(&self) -> Result<()> {
        let run_params = RunParams {
            base: &self.base,
            comp: &self.comp,
            output: &self.output,
            reference: self.reference.as_deref(),
            includebed: self.includebed.as_deref(),
            strategy: self.strategy,
            params: &self.params,
        };
        let writer = BufWriter::new(File::create(self.output.join("params.json"))?);
        serde_json::to_writer_pretty(writer, &run_params)?;
        debug!("Params: {:?}", self.params);
        Ok(())
    }

    /// Streaming strategy: merge both inputs, chunk, resolve chunk by chunk.
    fn run_chunked(
        &self,
        resolver: &AssignmentResolver<'_>,
        order: &Arc<ChromOrder>,
        outputs: &mut OutputFiles,
    ) -> Result<()> {
        let base = self.sorted_source(&self.base, order)?;
        let comp = self.sorted_source(&self.comp, order)?;
        let merged =
            MergedRecords::with_chrom_order(vec![(Source::Base, base), (Source::Comp, comp)], Arc::clone(order));
        let chunks = Chunker::new(merged, self.params.chunksize, |source, record| {
            !resolver.admits(source, record)
        });

        info!("Matching base to comparison calls in chunks");
        let mut processed = 0usize;
        map_ordered(
            chunks,
            self.parallel,
            CHUNK_BATCH_SIZE,
            |chunk| resolver.resolve_chunk(&chunk),
            |out| {
                processed += 1;
                outputs.write(out)?;
                if processed % PEEK_INTERVAL == 0 {
                    outputs.stats.peek();
                }
                Ok(())
            },
        )
    }

    /// Index strategy: load and index the comparison records, then look up
    /// each base record.
    fn run_indexed(
        &self,
        resolver: &AssignmentResolver<'_>,
        order: &Arc<ChromOrder>,
        outputs: &mut OutputFiles,
    ) -> Result<()> {
        let params = resolver.matcher().params();

        let comp_records = self
            .sorted_source(&self.comp, order)?
            .map(|r| r.map(Arc::new))
            .collect::<Result<Vec<_>>>()?;
        let store = RecordStore::from_records(comp_records);
        let index = SpanIndex::build(store.iter().map(Arc::as_ref), params.sizefilt, params.sizemax, params.passonly);
        let index_stats = index.stats();
        info!("{} comparison variants in total", index_stats.total);
        info!(
            "{} comparison variants within size range ({}, {})",
            index_stats.indexed, params.sizefilt, params.sizemax
        );

        info!("Matching base to comparison calls");
        let mut state = MatchedState::new();
        let mut out = BenchOutput::new();
        for (ordinal, record) in self.sorted_source(&self.base, order)?.enumerate() {
            let base = Arc::new(record?);
            if !resolver.admits(Source::Base, &base) {
                continue;
            }
            out.stats.add_admitted(Source::Base);
            let candidates = index_candidates(&index, &store, &base, params.refdist);
            resolver.resolve_base(&base, &candidates, MatchId::new(ordinal, 0), &mut state, &mut out);
            if out.pending() >= INDEX_FLUSH_RECORDS {
                outputs.write(std::mem::take(&mut out))?;
            }
        }
        outputs.write(std::mem::take(&mut out))?;
        outputs.stats.peek();

        info!("Parsing FPs from comparison calls");
        resolver.sweep_false_positives(store.iter(), &state, &mut out);
        outputs.write(out)
    }

    /// Records of one input, checked against the shared chromosome order.
    fn sorted_source(
        &self,
        path: &Path,
        order: &Arc<ChromOrder>,
    ) -> Result<SortedRecords<VcfRecordIter<Box<dyn BufRead + Send>>>> {
        let reader = VcfReader::from_path(path).map_err(|e| malformed(path, e))?;
        Ok(SortedRecords::new(reader.records(), path, Arc::clone(order)))
    }
}

/// Comparison records near `base`: the index narrows the fetch range, and
/// each fetched record must still overlap the buffered base span.
fn index_candidates(
    index: &SpanIndex,
    store: &RecordStore,
    base: &VariantRecord,
    refdist: u64,
) -> Vec<Arc<VariantRecord>> {
    let Some((lo, hi)) = index.query(base, refdist) else {
        return Vec::new();
    };
    let (wstart, wend) = widen(base.start(), base.end(), refdist);
    store
        .fetch(&base.chrom, lo, hi)
        .iter()
        .filter(|comp| overlaps(wstart, wend, comp.start(), comp.end()))
        .cloned()
        .collect()
}

fn require_file(path: &Path) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(BenchError::Config(format!("File {} does not exist", path.display())))
    }
}

/// Parse failures in a source are fatal for the whole run.
fn malformed(path: &Path, e: BenchError) -> BenchError {
    match e {
        BenchError::Parse { .. } | BenchError::InvalidFormat(_) => BenchError::MalformedSource {
            path: path.to_path_buf(),
            message: e.to_string(),
        },
        other => other,
    }
}

fn read_source_header(path: &Path) -> Result<VcfHeader> {
    VcfReader::from_path(path)
        .map(|reader| reader.header().clone())
        .map_err(|e| malformed(path, e))
}

fn check_sample(path: &Path, header: &VcfHeader, sample: Option<&str>, gtcomp: bool) -> Result<usize> {
    if header.sample_count() == 0 {
        if let Some(name) = sample {
            return Err(BenchError::Config(format!(
                "Sample {} not found in vcf ({})",
                name,
                path.display()
            )));
        }
        if gtcomp {
            return Err(BenchError::Config(format!(
                "No SAMPLE columns found in vcf ({})",
                path.display()
            )));
        }
        return Ok(0);
    }
    header.resolve_sample(sample).map_err(|e| match e {
        BenchError::Config(message) => BenchError::Config(format!("{} ({})", message, path.display())),
        other => other,
    })
}

/// The four classified VCFs plus the running totals.
struct OutputFiles {
    tp_base: VcfWriter<File>,
    tp_comp: VcfWriter<File>,
    false_negatives: VcfWriter<File>,
    false_positives: VcfWriter<File>,
    stats: StatsBox,
}

impl OutputFiles {
    fn create(dir: &Path, base_header: &VcfHeader, comp_header: &VcfHeader) -> Result<Self> {
        let open = |name: &str, header: &VcfHeader| -> Result<VcfWriter<File>> {
            let mut writer = VcfWriter::new(File::create(dir.join(name))?);
            writer.write_header(header)?;
            Ok(writer)
        };
        Ok(Self {
            tp_base: open("tp-base.vcf", base_header)?,
            tp_comp: open("tp-comp.vcf", comp_header)?,
            false_negatives: open("fn.vcf", base_header)?,
            false_positives: open("fp.vcf", comp_header)?,
            stats: StatsBox::new(),
        })
    }

    fn write(&mut self, out: BenchOutput) -> Result<()> {
        self.stats.merge(&out.stats);
        write_all(&mut self.tp_base, &out.tp_base)?;
        write_all(&mut self.tp_comp, &out.tp_comp)?;
        write_all(&mut self.false_negatives, &out.false_negatives)?;
        write_all(&mut self.false_positives, &out.false_positives)
    }

    fn finish(mut self) -> Result<StatsBox> {
        self.tp_base.flush()?;
        self.tp_comp.flush()?;
        self.false_negatives.flush()?;
        self.false_positives.flush()?;
        Ok(self.stats)
    }
}

fn write_all(writer: &mut VcfWriter<File>, records: &[AnnotatedRecord]) -> Result<()> {
    for annotated in records {
        writer.write_record(&annotated.record, &annotated.annotation)?;
    }
    Ok(())
}
