use crate::types::record::RawRecord;
use winnow::{Parser, binary::le_u64, error::ContextError};

/// Parses a single 8-byte little-endian SPC record
pub fn parse_record<'a>(input: &mut &'a [u8]) -> Result<RawRecord, ContextError> {
    le_u64.map(RawRecord::decode).parse_next(input)
}
