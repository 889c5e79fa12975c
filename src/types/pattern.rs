//! Channel activation patterns

use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of detector channels a pattern can describe
pub const MAX_CHANNELS: usize = 16;

/// Number of distinct patterns, including the unused empty pattern
pub const PATTERN_SPACE: usize = 1 << MAX_CHANNELS;

/// The set of channels that fired together within one coincidence group.
///
/// Bit `i` is set iff channel `i` registered at least one pulse in the group.
/// The empty pattern is never counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelPattern(u16);

impl ChannelPattern {
    pub const EMPTY: ChannelPattern = ChannelPattern(0);

    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    /// Pattern with only `channel` set. Channels above 15 are masked to 4 bits.
    pub const fn from_channel(channel: u8) -> Self {
        Self(1 << (channel & 0x0f))
    }

    pub const fn bits(self) -> u16 {
        self.0
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn insert(&mut self, channel: u8) {
        self.0 |= Self::from_channel(channel).0;
    }

    pub const fn contains(self, channel: u8) -> bool {
        self.0 & Self::from_channel(channel).0 != 0
    }

    /// Coincidence order: how many channels take part
    pub const fn order(self) -> u32 {
        self.0.count_ones()
    }

    /// Channels present in the pattern, ascending
    pub fn channels(self) -> impl Iterator<Item = u8> {
        (0..MAX_CHANNELS as u8).filter(move |&ch| self.contains(ch))
    }
}

impl From<u16> for ChannelPattern {
    fn from(bits: u16) -> Self {
        Self(bits)
    }
}

impl fmt::Display for ChannelPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018b}", self.0)
    }
}
