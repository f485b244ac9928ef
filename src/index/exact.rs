//! Exhaustive cosine scan for small deployments.

use super::{Scored, VectorSearcher, dot, normalize};
use crate::stores::EmbeddingRecord;

struct Entry {
    record: EmbeddingRecord,
    unit: Vec<f32>,
    ordinal: u64,
}

/// Brute-force searcher: every query scores every record.
///
/// Perfect recall, linear query cost. The right choice while the corpus is
/// small; swap in [`super::NswIndex`] once full scans start to hurt.
#[derive(Default)]
pub struct ExactIndex {
    entries: Vec<Entry>,
    next_ordinal: u64,
}

impl ExactIndex {
    /// Creates an empty searcher.
    pub fn new() -> Self {
        Self::default()
    }
}

impl VectorSearcher for ExactIndex {
    fn insert(&mut self, record: EmbeddingRecord) {
        let unit = normalize(&record.vector);
        let ordinal = self.next_ordinal;
        self.next_ordinal += 1;
        self.entries.push(Entry {
            record,
            unit,
            ordinal,
        });
    }

    fn remove_resource(&mut self, resource_id: &str) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|entry| entry.record.resource_id != resource_id);
        before - self.entries.len()
    }

    fn search(&self, query: &[f32], k: usize) -> Vec<(EmbeddingRecord, f32)> {
        if k == 0 || self.entries.is_empty() {
            return Vec::new();
        }
        let unit = normalize(query);
        let mut scored: Vec<Scored> = self
            .entries
            .iter()
            .enumerate()
            .map(|(slot, entry)| Scored {
                similarity: dot(&unit, &entry.unit),
                ordinal: entry.ordinal,
                slot,
            })
            .collect();
        scored.sort_unstable_by(|a, b| b.cmp(a));
        scored
            .into_iter()
            .take(k)
            .map(|s| (self.entries[s.slot].record.clone(), s.similarity))
            .collect()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
