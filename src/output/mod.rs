//! Persisting finalized pattern counts

pub mod counted_file;
pub mod frame;

pub use counted_file::{CountedFile, read_counted_file};
pub use frame::{patterns_of_order, to_dataframe, write_parquet};

use crate::error::Result;
use crate::histogram::SparsePatternIndex;
use crate::types::ChannelPattern;

/// Destination for sparse count rates: a start marker carrying the number of
/// records, the records themselves, then an end marker
pub trait CountRateWriter: Send + Sync {
    fn write_start_count_rates(&mut self, count: usize) -> Result<()>;
    fn write_count_rate(&mut self, pattern: ChannelPattern, count: u64) -> Result<()>;
    fn write_stop_count_rates(&mut self) -> Result<()>;

    /// Flush anything buffered before the writer is dropped
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Write one framed block in ascending pattern order
pub fn write_sparse_index<W: CountRateWriter + ?Sized>(
    index: &SparsePatternIndex,
    writer: &mut W,
) -> Result<()> {
    writer.write_start_count_rates(index.len())?;
    for entry in index {
        writer.write_count_rate(entry.pattern, entry.count)?;
    }
    writer.write_stop_count_rates()
}
