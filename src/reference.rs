//! Reference sequence lookup.
//!
//! A FASTA with a `.fai` next to it is queried region by region through the
//! noodles indexed reader. Without an index (or when gzip compressed) the
//! whole file is loaded into memory.

use crate::error::{BenchError, Result};
use crate::input::{is_gzipped, open_input};
use noodles::core::{Position, Region};
use noodles::fasta;
use rustc_hash::FxHashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::info;

/// Something that can return the reference bases of a region.
pub trait ReferenceProvider: Send + Sync {
    /// Bases of `[start, end)` on `chrom`. The end is clamped to the
    /// sequence length; a region starting past the end is an error.
    fn fetch(&self, chrom: &str, start: u64, end: u64) -> Result<String>;
}

enum Contigs {
    Loaded(FxHashMap<String, Vec<u8>>),
    Indexed {
        reader: Mutex<fasta::io::IndexedReader<BufReader<File>>>,
        lengths: FxHashMap<String, u64>,
    },
}

/// A FASTA reference, uppercased on fetch.
pub struct FastaReference {
    contigs: Contigs,
}

impl FastaReference {
    /// Open a FASTA file, using `<path>.fai` for region queries when present.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let fai = fai_path(path);
        if fai.exists() && !is_gzipped(path)? {
            let index = fasta::fai::io::Reader::new(BufReader::new(File::open(&fai)?))
                .read_index()
                .map_err(|e| {
                    BenchError::InvalidFormat(format!("invalid FASTA index {}: {}", fai.display(), e))
                })?;
            let lengths = index
                .as_ref()
                .iter()
                .map(|record| (String::from_utf8_lossy(record.name()).to_string(), record.length()))
                .collect();
            let reader = fasta::io::IndexedReader::new(BufReader::new(File::open(path)?), index);
            info!("Querying reference {} through its index", path.display());
            return Ok(Self {
                contigs: Contigs::Indexed {
                    reader: Mutex::new(reader),
                    lengths,
                },
            });
        }

        info!("Loading reference {} into memory", path.display());
        Self::from_reader(open_input(path)?)
    }

    /// Load every FASTA record from a buffered reader.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut sequences = FxHashMap::default();
        for result in fasta::io::Reader::new(reader).records() {
            let record = result
                .map_err(|e| BenchError::InvalidFormat(format!("invalid FASTA record: {}", e)))?;
            let name = String::from_utf8_lossy(record.name()).to_string();
            let sequence = record.sequence().as_ref().to_ascii_uppercase();
            sequences.insert(name, sequence);
        }
        Ok(Self {
            contigs: Contigs::Loaded(sequences),
        })
    }

    /// Number of contigs available.
    pub fn len(&self) -> usize {
        match &self.contigs {
            Contigs::Loaded(sequences) => sequences.len(),
            Contigs::Indexed { lengths, .. } => lengths.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn fai_path(path: &Path) -> PathBuf {
    let mut fai = path.as_os_str().to_owned();
    fai.push(".fai");
    PathBuf::from(fai)
}

impl ReferenceProvider for FastaReference {
    fn fetch(&self, chrom: &str, start: u64, end: u64) -> Result<String> {
        let unavailable = || BenchError::ReferenceUnavailable {
            chrom: chrom.to_string(),
            start,
            end,
        };
        let len = match &self.contigs {
            Contigs::Loaded(sequences) => sequences.get(chrom).map(|seq| seq.len() as u64),
            Contigs::Indexed { lengths, .. } => lengths.get(chrom).copied(),
        }
        .ok_or_else(unavailable)?;
        if start > len || start > end {
            return Err(unavailable());
        }
        let end = end.min(len);
        if start == end {
            return Ok(String::new());
        }

        let bases = match &self.contigs {
            Contigs::Loaded(sequences) => sequences
                .get(chrom)
                .map(|seq| seq[start as usize..end as usize].to_vec())
                .ok_or_else(unavailable)?,
            Contigs::Indexed { reader, .. } => {
                let first = Position::new(start as usize + 1).ok_or_else(unavailable)?;
                let last = Position::new(end as usize).ok_or_else(unavailable)?;
                let region = Region::new(chrom, first..=last);
                let mut reader = reader.lock().map_err(|_| unavailable())?;
                let record = reader.query(&region).map_err(|_| unavailable())?;
                record.sequence().as_ref().to_ascii_uppercase()
            }
        };
        String::from_utf8(bases).map_err(|_| unavailable())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    const FASTA: &str = ">chr1 test contig\nACGTacgt\nNNNN\n>chr2\nGGGG\n";

    #[test]
    fn test_load_and_fetch() {
        let reference = FastaReference::from_reader(FASTA.as_bytes()).unwrap();
        assert_eq!(reference.len(), 2);
        assert_eq!(reference.fetch("chr1", 0, 4).unwrap(), "ACGT");
        assert_eq!(reference.fetch("chr1", 4, 10).unwrap(), "ACGTNN");
        assert_eq!(reference.fetch("chr2", 0, 4).unwrap(), "GGGG");
    }

    #[test]
    fn test_fetch_clamps_end() {
        let reference = FastaReference::from_reader(FASTA.as_bytes()).unwrap();
        assert_eq!(reference.fetch("chr2", 2, 100).unwrap(), "GG");
        assert_eq!(reference.fetch("chr2", 4, 10).unwrap(), "");
    }

    #[test]
    fn test_fetch_unavailable() {
        let reference = FastaReference::from_reader(FASTA.as_bytes()).unwrap();
        assert!(matches!(
            reference.fetch("chrX", 0, 4),
            Err(BenchError::ReferenceUnavailable { .. })
        ));
        assert!(reference.fetch("chr2", 10, 20).is_err());
    }

    #[test]
    fn test_sequence_before_header() {
        assert!(FastaReference::from_reader("ACGT\n>chr1\nA\n".as_bytes()).is_err());
    }

    #[test]
    fn test_indexed_fetch() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ref.fa");
        let mut fasta = File::create(&path).unwrap();
        fasta.write_all(b">chr1\nACGTacgt\nNNNN\n>chr2\nGGGG\n").unwrap();
        // name, length, offset, line bases, line width
        std::fs::write(
            dir.path().join("ref.fa.fai"),
            "chr1\t12\t6\t8\t9\nchr2\t4\t26\t4\t5\n",
        )
        .unwrap();

        let reference = FastaReference::from_path(&path).unwrap();
        assert_eq!(reference.len(), 2);
        assert!(matches!(reference.contigs, Contigs::Indexed { .. }));
        assert_eq!(reference.fetch("chr1", 4, 10).unwrap(), "ACGTNN");
        assert_eq!(reference.fetch("chr1", 10, 100).unwrap(), "NN");
        assert_eq!(reference.fetch("chr2", 1, 3).unwrap(), "GG");
        assert!(reference.fetch("chrX", 0, 1).is_err());
    }
}
