//! The framed COUNTED output file
//!
//! Each persisted integration is one block:
//! - `CRST` followed by the number of records (u32, little-endian)
//! - per record: pattern (u16) and count (u64), little-endian
//! - `CREN`

use super::CountRateWriter;
use crate::error::Result;
use crate::parser::{CountedBlock, parse_counted_file};
use crate::types::ChannelPattern;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub const COUNTED_START: &[u8] = b"CRST";
pub const COUNTED_END: &[u8] = b"CREN";

/// Writes count-rate blocks to any byte sink
pub struct CountedFile<W: Write = BufWriter<File>> {
    sink: W,
    path: Option<PathBuf>,
}

impl CountedFile {
    /// Create (or truncate) a COUNTED file on disk
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path)?;
        Ok(Self {
            sink: BufWriter::new(file),
            path: Some(path.to_path_buf()),
        })
    }
}

impl<W: Write> CountedFile<W> {
    pub fn from_writer(sink: W) -> Self {
        Self { sink, path: None }
    }

    pub fn into_inner(self) -> W {
        self.sink
    }
}

impl<W: Write + Send + Sync> CountRateWriter for CountedFile<W> {
    fn write_start_count_rates(&mut self, count: usize) -> Result<()> {
        // at most 65535 nonzero patterns
        let count = count as u32;
        self.sink.write_all(COUNTED_START)?;
        self.sink.write_all(&count.to_le_bytes())?;
        Ok(())
    }

    fn write_count_rate(&mut self, pattern: ChannelPattern, count: u64) -> Result<()> {
        self.sink.write_all(&pattern.bits().to_le_bytes())?;
        self.sink.write_all(&count.to_le_bytes())?;
        Ok(())
    }

    fn write_stop_count_rates(&mut self) -> Result<()> {
        self.sink.write_all(COUNTED_END)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.sink.flush()?;
        if let Some(path) = &self.path {
            tracing::info!("Closed COUNTED file {}", path.display());
        }
        Ok(())
    }
}

/// Read back every block of a COUNTED file
pub fn read_counted_file(path: impl AsRef<Path>) -> Result<Vec<CountedBlock>> {
    let data = fs::read(path)?;
    parse_counted_file(&data)
}
