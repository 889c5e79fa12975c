/// Femtoseconds in one millisecond
const FS_PER_MS: f64 = 1e12;

/// Converts a duration in milliseconds to timebins of `timebin_fs` femtoseconds
pub fn ms_to_timebins(ms: u64, timebin_fs: f64) -> u64 {
    (ms as f64 * FS_PER_MS / timebin_fs) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::config::DEFAULT_TIMEBIN_FS;

    #[test]
    fn test_ms_to_timebins() {
        assert_eq!(ms_to_timebins(0, DEFAULT_TIMEBIN_FS), 0);
        // one second of DPC-230 timebins
        assert_eq!(ms_to_timebins(1000, DEFAULT_TIMEBIN_FS), 6_074_965_068);
    }
}
