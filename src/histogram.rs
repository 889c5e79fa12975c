//! Dense pattern histogram and its sparse extraction

use crate::error::{CountError, Result};
use crate::types::pattern::{ChannelPattern, PATTERN_SPACE};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// A pattern observed at least once, with its count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternCount {
    pub pattern: ChannelPattern,
    pub count: u64,
}

/// The nonzero slots of a histogram in strictly ascending pattern order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SparsePatternIndex {
    entries: Vec<PatternCount>,
}

impl SparsePatternIndex {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PatternCount> {
        self.entries.iter()
    }

    pub fn as_slice(&self) -> &[PatternCount] {
        &self.entries
    }

    /// Count recorded for `pattern`, if it was observed
    pub fn get(&self, pattern: ChannelPattern) -> Option<u64> {
        self.entries
            .binary_search_by_key(&pattern, |entry| entry.pattern)
            .ok()
            .map(|i| self.entries[i].count)
    }

    /// Number of coincidence groups represented
    pub fn total_count(&self) -> u64 {
        self.entries.iter().map(|entry| entry.count).sum()
    }
}

impl<'a> IntoIterator for &'a SparsePatternIndex {
    type Item = &'a PatternCount;
    type IntoIter = std::slice::Iter<'a, PatternCount>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Counts of every channel pattern over the full 16-bit pattern space.
///
/// Accumulation is O(1) per group into a fixed dense array; sparsity is only
/// materialized by [`HistogramStore::finalize`].
#[derive(Debug, Clone)]
pub struct HistogramStore {
    counts: Array1<u64>,
    nonzero_pattern_count: usize,
    sparse: Option<SparsePatternIndex>,
}

impl Default for HistogramStore {
    fn default() -> Self {
        Self::new()
    }
}

impl HistogramStore {
    pub fn new() -> Self {
        Self {
            counts: Array1::zeros(PATTERN_SPACE),
            nonzero_pattern_count: 0,
            sparse: None,
        }
    }

    /// Zero every slot and drop any sparse index
    pub fn reset(&mut self) {
        self.counts.fill(0);
        self.nonzero_pattern_count = 0;
        self.sparse = None;
    }

    /// Count one coincidence group. The empty pattern is ignored.
    pub fn record(&mut self, pattern: ChannelPattern) {
        if pattern.is_empty() {
            tracing::trace!("Ignoring empty activation pattern");
            return;
        }
        let slot = &mut self.counts[pattern.index()];
        if *slot == 0 {
            self.nonzero_pattern_count += 1;
        }
        *slot += 1;
    }

    /// Add every count of `other` into this histogram
    pub fn merge(&mut self, other: &HistogramStore) {
        for (slot, &added) in self.counts.iter_mut().zip(other.counts.iter()) {
            if added == 0 {
                continue;
            }
            if *slot == 0 {
                self.nonzero_pattern_count += 1;
            }
            *slot += added;
        }
    }

    pub fn count(&self, pattern: ChannelPattern) -> u64 {
        self.counts[pattern.index()]
    }

    pub fn nonzero_pattern_count(&self) -> usize {
        self.nonzero_pattern_count
    }

    /// Total number of groups counted since the last reset
    pub fn total_groups(&self) -> u64 {
        self.counts.sum()
    }

    /// Dense view of all 65536 slots
    pub fn counts(&self) -> &Array1<u64> {
        &self.counts
    }

    /// Build the sparse index from scratch, replacing any previous one.
    ///
    /// On allocation failure the dense counts are left as they were and no
    /// sparse index is available.
    pub fn finalize(&mut self) -> Result<&SparsePatternIndex> {
        self.sparse = None;

        let nonzero = self.nonzero_pattern_count;
        let mut entries = Vec::new();
        entries
            .try_reserve_exact(nonzero)
            .map_err(|source| CountError::Allocation {
                patterns: nonzero,
                source,
            })?;

        entries.extend(
            self.counts
                .iter()
                .enumerate()
                .filter(|&(_, &count)| count > 0)
                .map(|(bits, &count)| PatternCount {
                    pattern: ChannelPattern::from_bits(bits as u16),
                    count,
                }),
        );
        debug_assert_eq!(entries.len(), nonzero);

        Ok(&*self.sparse.insert(SparsePatternIndex { entries }))
    }

    pub fn sparse_index(&self) -> Option<&SparsePatternIndex> {
        self.sparse.as_ref()
    }

    /// Drop the sparse index storage, keeping the dense counts
    pub fn release_sparse_index(&mut self) -> Option<SparsePatternIndex> {
        self.sparse.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(bits: u16) -> ChannelPattern {
        ChannelPattern::from_bits(bits)
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut store = HistogramStore::new();
        for bits in [1, 3, 3, 0xffff] {
            store.record(pattern(bits));
        }
        store.finalize().unwrap();

        store.reset();
        store.reset();
        assert!(store.counts().iter().all(|&c| c == 0));
        assert_eq!(store.nonzero_pattern_count(), 0);
        assert!(store.sparse_index().is_none());
        assert!(store.finalize().unwrap().is_empty());
    }

    #[test]
    fn test_empty_pattern_never_counted() {
        let mut store = HistogramStore::new();
        store.record(ChannelPattern::EMPTY);
        store.record(pattern(4));
        assert_eq!(store.count(ChannelPattern::EMPTY), 0);
        let index = store.finalize().unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(index.get(ChannelPattern::EMPTY), None);
    }

    #[test]
    fn test_sparse_matches_dense() {
        let mut store = HistogramStore::new();
        let recorded = [0x8000, 5, 1, 5, 0x00f0, 1, 1];
        for bits in recorded {
            store.record(pattern(bits));
        }
        assert_eq!(store.nonzero_pattern_count(), 4);

        let index = store.finalize().unwrap().clone();
        assert_eq!(index.len(), 4);
        assert!(
            index
                .as_slice()
                .windows(2)
                .all(|w| w[0].pattern < w[1].pattern)
        );
        for (bits, &count) in store.counts().iter().enumerate() {
            let p = pattern(bits as u16);
            if count > 0 {
                assert_eq!(index.get(p), Some(count));
            } else {
                assert_eq!(index.get(p), None);
            }
        }
        assert_eq!(index.total_count(), recorded.len() as u64);
        assert_eq!(store.total_groups(), recorded.len() as u64);
    }

    #[test]
    fn test_finalize_recomputes() {
        let mut store = HistogramStore::new();
        store.record(pattern(2));
        assert_eq!(store.finalize().unwrap().len(), 1);

        store.record(pattern(2));
        store.record(pattern(9));
        let index = store.finalize().unwrap();
        assert_eq!(
            index.as_slice(),
            &[
                PatternCount {
                    pattern: pattern(2),
                    count: 2
                },
                PatternCount {
                    pattern: pattern(9),
                    count: 1
                },
            ]
        );
    }

    #[test]
    fn test_merge_adds_counts() {
        let mut store = HistogramStore::new();
        store.record(pattern(1));
        let mut run = HistogramStore::new();
        run.record(pattern(1));
        run.record(pattern(6));
        run.record(pattern(6));

        store.merge(&run);
        assert_eq!(store.count(pattern(1)), 2);
        assert_eq!(store.count(pattern(6)), 2);
        assert_eq!(store.nonzero_pattern_count(), 2);
        assert_eq!(store.total_groups(), 5);
    }

    #[test]
    fn test_finalize_with_nothing_recorded() {
        let mut store = HistogramStore::new();
        let index = store.finalize().unwrap();
        assert!(index.is_empty());
        assert_eq!(index.total_count(), 0);
    }

    #[test]
    fn test_sparse_index_serializes_as_list() {
        let mut store = HistogramStore::new();
        store.record(pattern(3));
        let json = serde_json::to_string(store.finalize().unwrap()).unwrap();
        assert_eq!(json, r#"[{"pattern":3,"count":1}]"#);
    }
}
