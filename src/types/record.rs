//! Types for representing records in the SPC event stream

use bon::Builder;

/// Size of one record on disk
pub const RECORD_SIZE: usize = 8;

const MARKER_FLAG: u64 = 1 << 63;
const FIFO_GAP_FLAG: u64 = 1 << 62;
const CHANNEL_SHIFT: u32 = 56;
const CHANNEL_MASK: u64 = 0x0f;
const TIMESTAMP_MASK: u64 = (1 << CHANNEL_SHIFT) - 1;

/// Largest timestamp a record can carry
pub const MAX_TIMESTAMP: u64 = TIMESTAMP_MASK;

/// Marker code signalling the end of acquired data
pub const MARKER_END_OF_DATA: u8 = 0x01;

/// A single detector pulse:
/// - bits 0..=55: timestamp in timebins
/// - bits 56..=59: channel
/// - bit 62: FIFO gap before this record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Builder)]
pub struct Photon {
    pub channel: u8,
    pub timestamp: u64,
    #[builder(default)]
    pub fifo_gap: bool,
}

/// One 8-byte little-endian record. Bit 63 distinguishes markers from photons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawRecord {
    Photon(Photon),
    Marker { code: u8 },
}

impl RawRecord {
    pub fn photon(channel: u8, timestamp: u64) -> Self {
        RawRecord::Photon(Photon::builder().channel(channel).timestamp(timestamp).build())
    }

    pub fn end_of_data() -> Self {
        RawRecord::Marker {
            code: MARKER_END_OF_DATA,
        }
    }

    pub fn decode(word: u64) -> Self {
        if word & MARKER_FLAG != 0 {
            return RawRecord::Marker {
                code: (word & 0xff) as u8,
            };
        }
        RawRecord::Photon(Photon {
            channel: ((word >> CHANNEL_SHIFT) & CHANNEL_MASK) as u8,
            timestamp: word & TIMESTAMP_MASK,
            fifo_gap: word & FIFO_GAP_FLAG != 0,
        })
    }

    pub fn encode(&self) -> [u8; RECORD_SIZE] {
        let word = match *self {
            RawRecord::Marker { code } => MARKER_FLAG | code as u64,
            RawRecord::Photon(p) => {
                let gap = if p.fifo_gap { FIFO_GAP_FLAG } else { 0 };
                gap | ((p.channel as u64 & CHANNEL_MASK) << CHANNEL_SHIFT)
                    | (p.timestamp & TIMESTAMP_MASK)
            }
        };
        word.to_le_bytes()
    }

    pub fn is_end_of_data(&self) -> bool {
        matches!(self, RawRecord::Marker { code } if *code == MARKER_END_OF_DATA)
    }
}

/// Serialize records into the on-disk byte layout
pub fn encode_records<'a>(records: impl IntoIterator<Item = &'a RawRecord>) -> Vec<u8> {
    records.into_iter().flat_map(|r| r.encode()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_photon_fields_survive_encoding() {
        let record = RawRecord::Photon(
            Photon::builder()
                .channel(13)
                .timestamp(MAX_TIMESTAMP)
                .fifo_gap(true)
                .build(),
        );
        let word = u64::from_le_bytes(record.encode());
        assert_eq!(word >> 63, 0);
        assert_eq!(RawRecord::decode(word), record);
    }

    #[test]
    fn test_end_marker() {
        let word = u64::from_le_bytes(RawRecord::end_of_data().encode());
        let decoded = RawRecord::decode(word);
        assert!(decoded.is_end_of_data());
        assert!(!RawRecord::Marker { code: 0x02 }.is_end_of_data());
    }
}
