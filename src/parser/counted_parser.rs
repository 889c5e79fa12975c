//! Parser functions for COUNTED files

use crate::error::{CountError, Result};
use crate::output::counted_file::{COUNTED_END, COUNTED_START};
use crate::types::ChannelPattern;
use crate::types::pattern::PATTERN_SPACE;
use winnow::{
    Parser,
    binary::{le_u16, le_u32, le_u64},
    combinator::{preceded, repeat},
    error::ContextError,
    token::literal,
};

/// One persisted integration: the nonzero patterns and their counts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountedBlock {
    pub rates: Vec<(ChannelPattern, u64)>,
}

/// Parses a single (pattern, count) record: u16 pattern, u64 count
pub fn parse_count_rate<'a>(input: &mut &'a [u8]) -> std::result::Result<(ChannelPattern, u64), ContextError> {
    (le_u16.map(ChannelPattern::from_bits), le_u64).parse_next(input)
}

/// `CRST` followed by the number of records in the block
fn parse_start_marker<'a>(input: &mut &'a [u8]) -> std::result::Result<usize, ContextError> {
    preceded(literal(COUNTED_START), le_u32)
        .map(|count| count as usize)
        .verify(|count: &usize| *count < PATTERN_SPACE)
        .parse_next(input)
}

fn parse_end_marker<'a>(input: &mut &'a [u8]) -> std::result::Result<(), ContextError> {
    literal(COUNTED_END).void().parse_next(input)
}

/// Parses a start marker, exactly as many records as it announces, and an end marker
pub fn parse_counted_block<'a>(input: &mut &'a [u8]) -> std::result::Result<CountedBlock, ContextError> {
    let count = parse_start_marker(input)?;
    let rates: Vec<(ChannelPattern, u64)> = repeat(count, parse_count_rate).parse_next(input)?;
    parse_end_marker(input)?;
    Ok(CountedBlock { rates })
}

/// Parses every block of a COUNTED file.
///
/// A malformed block is reported at the byte where it starts.
pub fn parse_counted_file(data: &[u8]) -> Result<Vec<CountedBlock>> {
    let mut input = data;
    let mut blocks = Vec::new();
    while !input.is_empty() {
        let offset = data.len() - input.len();
        let block = parse_counted_block
            .parse_next(&mut input)
            .map_err(|e| CountError::Parse {
                offset,
                message: format!("bad counted block: {:?}", e),
            })?;
        blocks.push(block);
    }
    Ok(blocks)
}
