//! Coincidence grouping of demultiplexed pulses

use crate::histogram::HistogramStore;
use crate::pump::ChannelSplit;
use crate::types::ChannelPattern;
use itertools::Itertools;

/// A coincidence group that has not been closed yet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenGroup {
    pub start: u64,
    pub pattern: ChannelPattern,
}

/// Turns time-ordered pulses into one channel pattern per coincidence group.
///
/// A group opens at the first ungrouped pulse `t0` and takes every pulse in
/// `[t0, t0 + window]`. The group still open at the end of a chunk is kept
/// and continued by the next chunk; call [`WindowResolver::flush`] once the
/// stream is done.
#[derive(Debug, Clone)]
pub struct WindowResolver {
    window: u64,
    open: Option<OpenGroup>,
}

impl WindowResolver {
    pub fn new(window: u64) -> Self {
        Self { window, open: None }
    }

    pub fn window(&self) -> u64 {
        self.window
    }

    pub fn open_group(&self) -> Option<OpenGroup> {
        self.open
    }

    /// Groups all pulses of one chunk, returning the number of groups closed
    pub fn resolve(&mut self, split: &ChannelSplit, histogram: &mut HistogramStore) -> u64 {
        split
            .iter()
            .map(|(channel, timestamps)| timestamps.iter().map(move |&t| (t, channel)))
            .kmerge_by(|a, b| a.0 < b.0)
            .map(|(timestamp, channel)| self.push(timestamp, channel, histogram) as u64)
            .sum()
    }

    /// Adds one pulse; returns whether it closed the previously open group
    pub fn push(&mut self, timestamp: u64, channel: u8, histogram: &mut HistogramStore) -> bool {
        if let Some(group) = self.open.as_mut() {
            if timestamp >= group.start && timestamp - group.start <= self.window {
                group.pattern.insert(channel);
                return false;
            }
        }

        let closed = self.flush(histogram);
        self.open = Some(OpenGroup {
            start: timestamp,
            pattern: ChannelPattern::from_channel(channel),
        });
        closed
    }

    /// Closes the open group, if any, and records its pattern
    pub fn flush(&mut self, histogram: &mut HistogramStore) -> bool {
        match self.open.take() {
            Some(group) => {
                histogram.record(group.pattern);
                true
            }
            None => false,
        }
    }
}
