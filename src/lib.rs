//! Coincidence counting for single-photon time-tagged event streams.
//!
//! An SPC file is a stream of timestamped, channel-tagged pulses. A
//! [`Session`] pumps it chunk by chunk, groups pulses that fall within the
//! coincidence window, and counts each group's channel pattern in a dense
//! 65536-slot histogram. Finishing an integration yields the sparse list of
//! observed patterns, which can be appended to a COUNTED file or exported as a
//! polars DataFrame.

pub mod error;
pub mod histogram;
pub mod output;
pub mod parser;
pub mod pump;
pub mod resolver;
pub mod session;
pub mod types;
pub mod utils;

#[cfg(feature = "python")]
pub mod python;

pub use error::{CountError, Result};
pub use histogram::{HistogramStore, PatternCount, SparsePatternIndex};
pub use output::{CountRateWriter, CountedFile};
pub use pump::{ChunkSource, RecordReader, RunStats, SpcFile, SplitOutcome, StreamPump};
pub use resolver::WindowResolver;
pub use session::Session;
pub use types::{ChannelPattern, RawRecord, SessionConfig};
