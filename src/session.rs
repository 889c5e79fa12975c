//! Counting session: configuration and histogram lifecycle

use crate::error::{CountError, Result};
use crate::histogram::{HistogramStore, SparsePatternIndex};
use crate::output::{CountRateWriter, CountedFile, write_sparse_index};
use crate::pump::{ChunkSource, RunStats, SpcFile, StreamPump};
use crate::types::SessionConfig;
use crate::utils::ms_to_timebins;
use std::path::Path;

/// One integration at a time: reset, process files, finalize, persist.
///
/// Configuration changes apply to the next `process` call only.
pub struct Session {
    config: SessionConfig,
    time_cutoff: Option<u64>,
    histogram: HistogramStore,
    fifo_gaps: u64,
    output: Option<Box<dyn CountRateWriter>>,
}

impl Default for Session {
    fn default() -> Self {
        Self::with_checked_config(SessionConfig::default())
    }
}

impl Session {
    /// Start a session, rejecting a configuration that fails validation
    pub fn new(config: SessionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_checked_config(config))
    }

    fn with_checked_config(config: SessionConfig) -> Self {
        let time_cutoff = config.time_cutoff_timebins();
        Self {
            config,
            time_cutoff,
            histogram: HistogramStore::new(),
            fifo_gaps: 0,
            output: None,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn window(&self) -> u64 {
        self.config.window
    }

    /// Time cutoff in timebins, if any
    pub fn time_cutoff(&self) -> Option<u64> {
        self.time_cutoff
    }

    pub fn configure_window(&mut self, window: u64) {
        self.config.window = window;
        tracing::info!("Set the coincidence window to {} tb", window);
    }

    pub fn configure_time_cutoff(&mut self, milliseconds: u64) {
        self.config.time_cutoff_ms = Some(milliseconds);
        self.time_cutoff = Some(ms_to_timebins(milliseconds, self.config.timebin_fs));
        tracing::info!("Set the time cutoff to {} ms", milliseconds);
    }

    pub fn clear_time_cutoff(&mut self) {
        self.config.time_cutoff_ms = None;
        self.time_cutoff = None;
        tracing::info!("Cleared the time cutoff");
    }

    /// Prepare for a new integration
    pub fn begin_session(&mut self) {
        self.histogram.reset();
        self.fifo_gaps = 0;
    }

    /// Count the coincidences of one SPC file into the current integration.
    ///
    /// If the file cannot be opened nothing is touched.
    pub fn process(&mut self, path: impl AsRef<Path>) -> Result<RunStats> {
        let mut source = SpcFile::open(path.as_ref(), self.config.chunk_records)?;
        let stats = self.process_source(&mut source)?;
        tracing::info!(
            "Processed {}: {} pulses in {} groups",
            path.as_ref().display(),
            stats.pulses,
            stats.groups
        );
        Ok(stats)
    }

    pub fn process_source<S: ChunkSource + ?Sized>(&mut self, source: &mut S) -> Result<RunStats> {
        let pump = StreamPump::new(self.config.window, self.time_cutoff);
        let stats = pump.run(source, &mut self.histogram)?;
        self.fifo_gaps += stats.fifo_gaps;
        if stats.fifo_gaps > 0 {
            tracing::warn!("{} FIFO gaps in this stream", stats.fifo_gaps);
        }
        Ok(stats)
    }

    /// Start appending integrations to a COUNTED file
    pub fn open_output(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let file = CountedFile::create(path.as_ref())?;
        tracing::info!("Opened COUNTED file {}", path.as_ref().display());
        self.attach_output(Box::new(file))
    }

    /// Use `writer` for persisted integrations, closing any previous output
    pub fn attach_output(&mut self, writer: Box<dyn CountRateWriter>) -> Result<()> {
        if let Some(mut previous) = self.output.take() {
            tracing::warn!("Replacing the open output; closing it first");
            previous.finish()?;
        }
        self.output = Some(writer);
        Ok(())
    }

    pub fn has_output(&self) -> bool {
        self.output.is_some()
    }

    /// Freeze the integration into its sparse index, optionally writing it out.
    ///
    /// The index is built even when persisting fails; asking to persist
    /// without an attached output returns [`CountError::NoOutputOpen`] after
    /// finalizing, and the index stays available through `sparse_index`.
    pub fn end_session(&mut self, persist: bool) -> Result<&SparsePatternIndex> {
        let index = self.histogram.finalize()?;
        if persist {
            let writer = self.output.as_deref_mut().ok_or(CountError::NoOutputOpen)?;
            write_sparse_index(index, writer)?;
        }
        tracing::info!(
            "Integration finished with {} nonzero patterns",
            index.len()
        );
        Ok(index)
    }

    /// Release the sparse index and close the output.
    ///
    /// Returns [`CountError::NoOutputOpen`] if there was nothing to close.
    pub fn close_output(&mut self) -> Result<()> {
        self.histogram.release_sparse_index();
        let mut writer = self.output.take().ok_or(CountError::NoOutputOpen)?;
        writer.finish()
    }

    pub fn histogram(&self) -> &HistogramStore {
        &self.histogram
    }

    pub fn sparse_index(&self) -> Option<&SparsePatternIndex> {
        self.histogram.sparse_index()
    }

    /// FIFO gaps seen since the last reset
    pub fn fifo_gaps(&self) -> u64 {
        self.fifo_gaps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::histogram::PatternCount;
    use crate::output::read_counted_file;
    use crate::pump::RecordReader;
    use crate::types::ChannelPattern;
    use crate::types::record::{Photon, RawRecord, encode_records};
    use std::fs;

    fn entry(bits: u16, count: u64) -> PatternCount {
        PatternCount {
            pattern: ChannelPattern::from_bits(bits),
            count,
        }
    }

    fn write_spc(dir: &Path, name: &str, records: &[RawRecord]) -> std::path::PathBuf {
        let path = dir.join(name);
        fs::write(&path, encode_records(records)).unwrap();
        path
    }

    #[test]
    fn test_end_to_end_example() {
        let dir = tempfile::tempdir().unwrap();
        let spc = write_spc(
            dir.path(),
            "run.spc",
            &[
                RawRecord::photon(0, 10),
                RawRecord::photon(1, 12),
                RawRecord::photon(0, 30),
            ],
        );
        let counted = dir.path().join("run.counted");

        let mut session = Session::default();
        session.configure_window(5);
        session.open_output(&counted).unwrap();
        session.begin_session();
        let stats = session.process(&spc).unwrap();
        assert_eq!(stats.pulses, 3);
        assert_eq!(stats.groups, 2);

        let index = session.end_session(true).unwrap();
        assert_eq!(index.as_slice(), &[entry(1, 1), entry(3, 1)]);
        session.close_output().unwrap();

        let blocks = read_counted_file(&counted).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(
            blocks[0].rates,
            vec![
                (ChannelPattern::from_bits(1), 1),
                (ChannelPattern::from_bits(3), 1)
            ]
        );
    }

    #[test]
    fn test_empty_stream() {
        let dir = tempfile::tempdir().unwrap();
        let spc = write_spc(dir.path(), "empty.spc", &[]);

        let mut session = Session::default();
        session.begin_session();
        let stats = session.process(&spc).unwrap();
        assert_eq!(stats, RunStats::default());
        assert!(session.histogram().counts().iter().all(|&c| c == 0));
        assert!(session.end_session(false).unwrap().is_empty());
    }

    #[test]
    fn test_open_failure_leaves_state() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = Session::new(SessionConfig::builder().window(5).build()).unwrap();
        session
            .process_source(&mut RecordReader::new(
                encode_records(&[RawRecord::photon(4, 1)]),
                8,
            ))
            .unwrap();

        let err = session.process(dir.path().join("nope.spc")).unwrap_err();
        assert!(matches!(err, CountError::Open { .. }));
        assert!(err.is_recoverable());
        assert_eq!(session.histogram().count(ChannelPattern::from_channel(4)), 1);
    }

    #[test]
    fn test_close_without_output() {
        let mut session = Session::default();
        session.process_source(&mut RecordReader::new(
            encode_records(&[RawRecord::photon(0, 1)]),
            8,
        ))
        .unwrap();
        session.end_session(false).unwrap();
        assert!(session.sparse_index().is_some());

        assert!(matches!(session.close_output(), Err(CountError::NoOutputOpen)));
        assert!(session.sparse_index().is_none());
        assert_eq!(session.histogram().total_groups(), 1);
    }

    #[test]
    fn test_persist_without_output() {
        let mut session = Session::default();
        session
            .process_source(&mut RecordReader::new(
                encode_records(&[RawRecord::photon(2, 5), RawRecord::photon(3, 5)]),
                8,
            ))
            .unwrap();
        assert!(matches!(
            session.end_session(true),
            Err(CountError::NoOutputOpen)
        ));
        let index = session.sparse_index().unwrap();
        assert_eq!(index.as_slice(), &[entry(0b1100, 1)]);
    }

    #[test]
    fn test_rejects_zero_timebin() {
        let config = SessionConfig::builder().timebin_fs(0.0).time_cutoff_ms(10).build();
        assert!(matches!(
            Session::new(config),
            Err(CountError::InvalidSetting { field: "timebin_fs", .. })
        ));
    }

    #[test]
    fn test_session_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Session>();
    }

    #[test]
    fn test_configuration_is_forward_only() {
        let records = [
            RawRecord::photon(0, 0),
            RawRecord::photon(1, 3),
            RawRecord::photon(2, 2_000),
        ];
        let mut session = Session::new(SessionConfig::builder().timebin_fs(1e9).build()).unwrap();
        session.process_source(&mut RecordReader::new(encode_records(&records), 2)).unwrap();
        assert_eq!(session.histogram().count(ChannelPattern::from_bits(0b001)), 1);

        // 1 ms of 1 us timebins
        session.configure_window(3);
        session.configure_time_cutoff(1);
        assert_eq!(session.time_cutoff(), Some(1_000));
        session.begin_session();
        let stats = session
            .process_source(&mut RecordReader::new(encode_records(&records), 2))
            .unwrap();
        assert!(stats.stopped_early);
        assert_eq!(session.histogram().count(ChannelPattern::from_bits(0b011)), 1);
        assert_eq!(session.histogram().count(ChannelPattern::from_bits(0b100)), 0);

        session.clear_time_cutoff();
        assert_eq!(session.time_cutoff(), None);
    }

    #[test]
    fn test_integrations_append_to_one_file() {
        let dir = tempfile::tempdir().unwrap();
        let first = write_spc(
            dir.path(),
            "a.spc",
            &[RawRecord::photon(0, 1), RawRecord::photon(2, 2)],
        );
        let second = write_spc(dir.path(), "b.spc", &[RawRecord::photon(5, 7)]);
        let counted = dir.path().join("rates.counted");

        let mut session = Session::new(SessionConfig::builder().window(1).build()).unwrap();
        session.open_output(&counted).unwrap();
        for spc in [&first, &second] {
            session.begin_session();
            session.process(spc).unwrap();
            session.end_session(true).unwrap();
        }
        session.close_output().unwrap();

        let blocks = read_counted_file(&counted).unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].rates, vec![(ChannelPattern::from_bits(0b101), 1)]);
        assert_eq!(blocks[1].rates, vec![(ChannelPattern::from_bits(0b100000), 1)]);
    }

    #[test]
    fn test_fifo_gaps_accumulate_until_reset() {
        let gap = RawRecord::Photon(Photon::builder().channel(0).timestamp(9).fifo_gap(true).build());
        let mut session = Session::default();
        for _ in 0..2 {
            session
                .process_source(&mut RecordReader::new(encode_records(&[gap]), 4))
                .unwrap();
        }
        assert_eq!(session.fifo_gaps(), 2);
        session.begin_session();
        assert_eq!(session.fifo_gaps(), 0);
    }
}
