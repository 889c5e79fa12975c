//! Binary parsing for SPC records and COUNTED output

mod counted_parser;
mod record_parser;

// Re-export the parsing functions
pub use counted_parser::{CountedBlock, parse_count_rate, parse_counted_block, parse_counted_file};
pub use record_parser::parse_record;
