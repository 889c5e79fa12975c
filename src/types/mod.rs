//! Type definitions for the SPC event stream and counting sessions

pub mod config;
pub mod pattern;
pub mod record;

// Re-export the main types for convenience
pub use config::SessionConfig;
pub use pattern::{ChannelPattern, MAX_CHANNELS, PATTERN_SPACE};
pub use record::{Photon, RawRecord, RECORD_SIZE};
