//! Chunked access to raw record bytes

use crate::error::{CountError, Result};
use crate::types::config::DEFAULT_CHUNK_RECORDS;
use crate::types::record::RECORD_SIZE;
use crate::utils::file_utils::{FileBytes, read_binary_file_mmap};
use std::path::Path;

/// Something that hands out raw records one chunk at a time
pub trait ChunkSource {
    /// The next chunk of whole records. An empty chunk means the source is exhausted.
    fn grab_chunk(&mut self) -> Result<&[u8]>;
}

/// Reads fixed-size records out of a byte buffer, `chunk_records` at a time
pub struct RecordReader<B> {
    bytes: B,
    position: usize,
    end: usize,
    chunk_bytes: usize,
}

/// A memory-mapped SPC file
pub type SpcFile = RecordReader<FileBytes>;

impl RecordReader<FileBytes> {
    /// Memory map an SPC file for chunked reading
    pub fn open(path: impl AsRef<Path>, chunk_records: usize) -> Result<Self> {
        let path = path.as_ref();
        let bytes = read_binary_file_mmap(path).map_err(|source| CountError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!("Opened {} ({} bytes)", path.display(), bytes.as_ref().len());
        Ok(Self::new(bytes, chunk_records))
    }
}

impl<B: AsRef<[u8]>> RecordReader<B> {
    pub fn new(bytes: B, chunk_records: usize) -> Self {
        let len = bytes.as_ref().len();
        let trailing = len % RECORD_SIZE;
        if trailing != 0 {
            tracing::warn!(
                "Ignoring {} trailing bytes that do not form a whole record",
                trailing
            );
        }
        let chunk_records = if chunk_records == 0 {
            DEFAULT_CHUNK_RECORDS
        } else {
            chunk_records
        };
        Self {
            bytes,
            position: 0,
            end: len - trailing,
            chunk_bytes: chunk_records.saturating_mul(RECORD_SIZE),
        }
    }

    /// Records not handed out yet
    pub fn remaining_records(&self) -> usize {
        (self.end - self.position) / RECORD_SIZE
    }
}

impl<B: AsRef<[u8]>> ChunkSource for RecordReader<B> {
    fn grab_chunk(&mut self) -> Result<&[u8]> {
        let start = self.position;
        let stop = self.end.min(start.saturating_add(self.chunk_bytes));
        self.position = stop;
        Ok(&self.bytes.as_ref()[start..stop])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::record::{RawRecord, encode_records};

    #[test]
    fn test_chunks_cover_whole_records() {
        let records: Vec<_> = (0..5).map(|t| RawRecord::photon(0, t)).collect();
        let mut bytes = encode_records(&records);
        bytes.extend([0xaa, 0xbb, 0xcc]);

        let mut reader = RecordReader::new(bytes, 2);
        assert_eq!(reader.remaining_records(), 5);
        let sizes: Vec<usize> = std::iter::from_fn(|| {
            let chunk = reader.grab_chunk().unwrap();
            (!chunk.is_empty()).then(|| chunk.len() / RECORD_SIZE)
        })
        .collect();
        assert_eq!(sizes, vec![2, 2, 1]);
        assert!(reader.grab_chunk().unwrap().is_empty());
    }

    #[test]
    fn test_huge_chunk_size_reads_everything() {
        let records: Vec<_> = (0..3).map(|t| RawRecord::photon(1, t)).collect();
        let mut reader = RecordReader::new(encode_records(&records), usize::MAX / 4);
        assert_eq!(reader.grab_chunk().unwrap().len(), 3 * RECORD_SIZE);
        assert!(reader.grab_chunk().unwrap().is_empty());
    }

    #[test]
    fn test_open_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.spc");
        match SpcFile::open(&path, 16) {
            Err(CountError::Open { path: reported, .. }) => assert_eq!(reported, path),
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("opening a missing file should fail"),
        }
    }

    #[test]
    fn test_open_empty_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut reader = SpcFile::open(file.path(), 16).unwrap();
        assert_eq!(reader.remaining_records(), 0);
        assert!(reader.grab_chunk().unwrap().is_empty());
    }
}
