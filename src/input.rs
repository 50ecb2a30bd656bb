//! Opening plain or gzip/bgzip compressed text inputs.

use crate::error::Result;
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Read buffer size for input files.
const INPUT_BUFFER_SIZE: usize = 256 * 1024;

/// Open a text file, transparently decompressing gzip or bgzip content.
///
/// Compression is detected from the gzip magic bytes rather than the file
/// extension. `MultiGzDecoder` handles the concatenated members that bgzip
/// writes.
pub fn open_input<P: AsRef<Path>>(path: P) -> Result<Box<dyn BufRead + Send>> {
    let file = File::open(path.as_ref())?;
    let mut reader = BufReader::with_capacity(INPUT_BUFFER_SIZE, file);
    if has_gzip_magic(reader.fill_buf()?) {
        Ok(Box::new(BufReader::with_capacity(
            INPUT_BUFFER_SIZE,
            MultiGzDecoder::new(reader),
        )))
    } else {
        Ok(Box::new(reader))
    }
}

/// True when the file starts with the gzip magic bytes.
pub fn is_gzipped<P: AsRef<Path>>(path: P) -> Result<bool> {
    let mut reader = BufReader::with_capacity(2, File::open(path.as_ref())?);
    Ok(has_gzip_magic(reader.fill_buf()?))
}

#[inline]
fn has_gzip_magic(head: &[u8]) -> bool {
    head.len() >= 2 && head[0] == 0x1f && head[1] == 0x8b
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::{Read, Write};
    use tempfile::NamedTempFile;

    #[test]
    fn test_plain_input() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "chr1\t100\t200\n").unwrap();
        file.flush().unwrap();

        let mut content = String::new();
        open_input(file.path())
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "chr1\t100\t200\n");
        assert!(!is_gzipped(file.path()).unwrap());
    }

    #[test]
    fn test_gzip_input() {
        let mut file = NamedTempFile::new().unwrap();
        {
            let mut encoder = GzEncoder::new(&mut file, Compression::default());
            encoder.write_all(b"chr1\t100\t200\n").unwrap();
            encoder.finish().unwrap();
        }
        file.flush().unwrap();

        let mut content = String::new();
        open_input(file.path())
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "chr1\t100\t200\n");
        assert!(is_gzipped(file.path()).unwrap());
    }
}
