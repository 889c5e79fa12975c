//! Demultiplexing raw records into per-channel timestamp runs

use crate::error::{CountError, Result};
use crate::parser::parse_record;
use crate::types::pattern::MAX_CHANNELS;
use crate::types::record::RawRecord;
use winnow::Parser;

/// Whether the pump should keep pulling chunks after this one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitOutcome {
    Continue,
    Stop,
}

/// Timestamps of one chunk, one nondecreasing run per channel
#[derive(Debug, Clone)]
pub struct ChannelSplit {
    timestamps: [Vec<u64>; MAX_CHANNELS],
}

impl Default for ChannelSplit {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelSplit {
    pub fn new() -> Self {
        Self {
            timestamps: std::array::from_fn(|_| Vec::new()),
        }
    }

    pub fn clear(&mut self) {
        self.timestamps.iter_mut().for_each(Vec::clear);
    }

    pub fn push(&mut self, channel: u8, timestamp: u64) {
        self.timestamps[channel as usize % MAX_CHANNELS].push(timestamp);
    }

    pub fn channel(&self, channel: u8) -> &[u64] {
        &self.timestamps[channel as usize % MAX_CHANNELS]
    }

    /// Nonempty channels with their timestamps
    pub fn iter(&self) -> impl Iterator<Item = (u8, &[u64])> + '_ {
        self.timestamps
            .iter()
            .enumerate()
            .filter(|(_, ts)| !ts.is_empty())
            .map(|(channel, ts)| (channel as u8, ts.as_slice()))
    }

    pub fn pulse_count(&self) -> usize {
        self.timestamps.iter().map(Vec::len).sum()
    }
}

/// Running totals kept by the splitter over one stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SplitCounters {
    pub records: u64,
    pub pulses: u64,
    pub markers: u64,
    pub fifo_gaps: u64,
    /// Photons past the time cutoff in the chunk where it was reached.
    /// Later chunks are never read.
    pub dropped_after_cutoff: u64,
}

/// Decodes raw records and sorts photons by channel.
///
/// Splitting stops at an end-of-data marker or at the first photon later than
/// the time cutoff; nothing after that point is kept.
#[derive(Debug, Clone)]
pub struct ChannelSplitter {
    time_cutoff: Option<u64>,
    consumed: usize,
    counters: SplitCounters,
}

impl ChannelSplitter {
    pub fn new(time_cutoff: Option<u64>) -> Self {
        Self {
            time_cutoff,
            consumed: 0,
            counters: SplitCounters::default(),
        }
    }

    pub fn counters(&self) -> SplitCounters {
        self.counters
    }

    /// Fills `split` with the photons of `chunk`, replacing its previous contents
    pub fn split_channels(&mut self, chunk: &[u8], split: &mut ChannelSplit) -> Result<SplitOutcome> {
        split.clear();
        let mut input = chunk;
        while !input.is_empty() {
            let offset = self.consumed + (chunk.len() - input.len());
            let record = parse_record.parse_next(&mut input).map_err(|e| CountError::Parse {
                offset,
                message: format!("{:?}", e),
            })?;
            self.counters.records += 1;

            match record {
                RawRecord::Marker { .. } if record.is_end_of_data() => {
                    self.counters.markers += 1;
                    tracing::debug!("End of data marker at byte {}", offset);
                    self.consumed += chunk.len();
                    return Ok(SplitOutcome::Stop);
                }
                RawRecord::Marker { .. } => self.counters.markers += 1,
                RawRecord::Photon(photon) => {
                    if photon.fifo_gap {
                        self.counters.fifo_gaps += 1;
                    }
                    if self.time_cutoff.is_some_and(|cutoff| photon.timestamp > cutoff) {
                        let later_photons = std::iter::from_fn(|| parse_record.parse_next(&mut input).ok())
                            .filter(|record| matches!(record, RawRecord::Photon(_)))
                            .count();
                        self.counters.dropped_after_cutoff += 1 + later_photons as u64;
                        tracing::debug!("Time cutoff reached at timestamp {}", photon.timestamp);
                        self.consumed += chunk.len();
                        return Ok(SplitOutcome::Stop);
                    }
                    self.counters.pulses += 1;
                    split.push(photon.channel, photon.timestamp);
                }
            }
        }
        self.consumed += chunk.len();
        Ok(SplitOutcome::Continue)
    }
}
