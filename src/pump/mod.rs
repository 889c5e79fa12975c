//! Chunk-by-chunk consumption of an event stream

pub mod source;
pub mod splitter;

pub use source::{ChunkSource, RecordReader, SpcFile};
pub use splitter::{ChannelSplit, ChannelSplitter, SplitCounters, SplitOutcome};

use crate::error::Result;
use crate::histogram::HistogramStore;
use crate::resolver::WindowResolver;

/// Statistics collected while pumping one stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub chunks: u64,
    pub records: u64,
    pub pulses: u64,
    pub markers: u64,
    pub fifo_gaps: u64,
    pub groups: u64,
    pub dropped_after_cutoff: u64,
    pub stopped_early: bool,
}

impl RunStats {
    fn absorb(&mut self, counters: SplitCounters) {
        self.records = counters.records;
        self.pulses = counters.pulses;
        self.markers = counters.markers;
        self.fifo_gaps = counters.fifo_gaps;
        self.dropped_after_cutoff = counters.dropped_after_cutoff;
    }
}

/// Pulls chunks from a source until it runs dry or the splitter says stop,
/// resolving coincidences into the histogram as it goes
pub struct StreamPump {
    splitter: ChannelSplitter,
    resolver: WindowResolver,
    split: ChannelSplit,
}

impl StreamPump {
    pub fn new(window: u64, time_cutoff: Option<u64>) -> Self {
        Self {
            splitter: ChannelSplitter::new(time_cutoff),
            resolver: WindowResolver::new(window),
            split: ChannelSplit::new(),
        }
    }

    /// Drain `source` into `histogram`.
    ///
    /// The group still open when the stream ends is counted. Groups are
    /// staged per run and only added to `histogram` once the whole stream
    /// has been read, so a failed run leaves it untouched.
    pub fn run<S: ChunkSource + ?Sized>(
        mut self,
        source: &mut S,
        histogram: &mut HistogramStore,
    ) -> Result<RunStats> {
        let mut stats = RunStats::default();
        let mut staged = HistogramStore::new();

        loop {
            let chunk = source.grab_chunk()?;
            if chunk.is_empty() {
                break;
            }
            stats.chunks += 1;

            let outcome = self.splitter.split_channels(chunk, &mut self.split)?;
            let closed = self.resolver.resolve(&self.split, &mut staged);
            stats.groups += closed;
            tracing::debug!(
                "Chunk {}: {} pulses, {} groups closed",
                stats.chunks,
                self.split.pulse_count(),
                closed
            );

            if outcome == SplitOutcome::Stop {
                stats.stopped_early = true;
                break;
            }
        }

        if self.resolver.flush(&mut staged) {
            stats.groups += 1;
        }
        histogram.merge(&staged);
        stats.absorb(self.splitter.counters());
        Ok(stats)
    }
}
