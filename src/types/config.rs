//! Session configuration

use crate::error::{CountError, Result};
use bon::Builder;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Duration of one DPC-230 timebin in femtoseconds
pub const DEFAULT_TIMEBIN_FS: f64 = 164_610.0;

/// Records pulled from the source per chunk
pub const DEFAULT_CHUNK_RECORDS: usize = 1 << 16;

/// Settings for one counting session.
///
/// Every field is optional in JSON:
///
/// ```json
/// {"window": 5, "time_cutoff_ms": 1000, "timebin_fs": 164610.0, "chunk_records": 65536}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[serde(default)]
pub struct SessionConfig {
    /// Coincidence window in timebins
    #[builder(default)]
    pub window: u64,
    /// Integration time limit, `None` to read whole files
    pub time_cutoff_ms: Option<u64>,
    #[builder(default = DEFAULT_TIMEBIN_FS)]
    pub timebin_fs: f64,
    #[builder(default = DEFAULT_CHUNK_RECORDS)]
    pub chunk_records: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl SessionConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Reject settings the counting pipeline cannot work with
    pub fn validate(&self) -> Result<()> {
        if !(self.timebin_fs.is_finite() && self.timebin_fs > 0.0) {
            return Err(CountError::InvalidSetting {
                field: "timebin_fs",
                reason: format!("must be a positive number of femtoseconds, got {}", self.timebin_fs),
            });
        }
        Ok(())
    }

    /// The configured cutoff expressed in timebins
    pub fn time_cutoff_timebins(&self) -> Option<u64> {
        self.time_cutoff_ms
            .map(|ms| crate::utils::ms_to_timebins(ms, self.timebin_fs))
    }
}
