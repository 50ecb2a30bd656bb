//! Streaming BED reader for region files.
//!
//! Only the first three columns are interpreted; extra columns are ignored.

use crate::error::{BenchError, Result};
use crate::input::open_input;
use crate::interval::Interval;
use std::io::BufRead;
use std::path::Path;

/// A streaming BED file reader.
pub struct BedReader<R: BufRead> {
    reader: R,
    line_number: usize,
    buffer: String,
}

impl BedReader<Box<dyn BufRead + Send>> {
    /// Open a plain or gzip compressed BED file from a path.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(open_input(path)?))
    }
}

impl<R: BufRead> BedReader<R> {
    /// Create a new BED reader from any buffered source.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line_number: 0,
            buffer: String::with_capacity(1024),
        }
    }

    /// Read the next region.
    pub fn read_interval(&mut self) -> Result<Option<Interval>> {
        loop {
            self.buffer.clear();
            let bytes_read = self.reader.read_line(&mut self.buffer)?;
            if bytes_read == 0 {
                return Ok(None);
            }
            self.line_number += 1;

            // Skip empty lines and comments
            let line = self.buffer.trim();
            if line.is_empty()
                || line.starts_with('#')
                || line.starts_with("track")
                || line.starts_with("browser")
            {
                continue;
            }

            return self.parse_line(line).map(Some);
        }
    }

    fn parse_line(&self, line: &str) -> Result<Interval> {
        let mut fields = line.split('\t');
        let (Some(chrom), Some(start), Some(end)) = (fields.next(), fields.next(), fields.next())
        else {
            return Err(BenchError::Parse {
                line: self.line_number,
                message: "Expected at least 3 fields".to_string(),
            });
        };

        let start = self.parse_position(start, "start")?;
        let end = self.parse_position(end, "end")?;
        if start > end {
            return Err(BenchError::Parse {
                line: self.line_number,
                message: format!("Start ({}) > end ({})", start, end),
            });
        }

        Ok(Interval::new(chrom, start, end))
    }

    fn parse_position(&self, s: &str, field_name: &str) -> Result<u64> {
        s.parse().map_err(|_| BenchError::Parse {
            line: self.line_number,
            message: format!("Invalid {} position: '{}'", field_name, s),
        })
    }

    /// Get an iterator over all regions.
    pub fn intervals(self) -> BedIntervalIter<R> {
        BedIntervalIter { reader: self }
    }
}

/// Iterator over BED regions.
pub struct BedIntervalIter<R: BufRead> {
    reader: BedReader<R>,
}

impl<R: BufRead> Iterator for BedIntervalIter<R> {
    type Item = Result<Interval>;

    fn next(&mut self) -> Option<Self::Item> {
        self.reader.read_interval().transpose()
    }
}

/// Read all regions from a BED file.
pub fn read_intervals<P: AsRef<Path>>(path: P) -> Result<Vec<Interval>> {
    BedReader::from_path(path)?.intervals().collect()
}

/// Parse regions from a string.
pub fn parse_intervals(content: &str) -> Result<Vec<Interval>> {
    BedReader::new(content.as_bytes()).intervals().collect()
}
