//! Navigable small-world graph for approximate nearest-neighbor search.
//!
//! The graph is built incrementally: each inserted vector runs a best-first
//! beam search from the entry node over `ef_construction` candidates, links
//! itself bidirectionally to the `max_degree` nearest, and over-full
//! neighbor lists are pruned back to the closest `max_degree`. Queries run
//! the same beam search with a width of `ef_search` (raised to `k` when `k`
//! is larger), so recall and latency are tunable per deployment without
//! touching call sites.
//!
//! Removal unlinks the node everywhere and relinks its former neighbors
//! pairwise while capacity allows, keeping the region navigable; the entry
//! point falls back to the oldest live node. All orderings go through
//! [`Scored`], so results are deterministic: descending similarity, equal
//! scores broken toward the earlier-inserted record.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use super::{Scored, VectorSearcher, dot, normalize};
use crate::stores::EmbeddingRecord;

/// Construction and search parameters for [`NswIndex`].
///
/// These are configuration, not per-call arguments; changing them means
/// rebuilding the graph from the store.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct NswConfig {
    /// Maximum neighbors kept per node. Higher improves recall at the cost
    /// of memory and insert time.
    pub max_degree: usize,
    /// Beam width while inserting; governs how carefully each new vector is
    /// placed in the graph.
    pub ef_construction: usize,
    /// Beam width while searching; raised to `k` when a query asks for more.
    pub ef_search: usize,
}

impl Default for NswConfig {
    fn default() -> Self {
        Self {
            max_degree: 16,
            ef_construction: 100,
            ef_search: 64,
        }
    }
}

struct Node {
    record: EmbeddingRecord,
    /// L2-normalized copy of the record's vector; all zeros when the vector
    /// has zero norm.
    unit: Vec<f32>,
    neighbors: Vec<usize>,
    ordinal: u64,
}

/// Single-layer navigable small-world graph.
pub struct NswIndex {
    config: NswConfig,
    /// Slot-addressed nodes; removed slots stay `None` and are never reused,
    /// so a slot index identifies one record for the index's lifetime.
    nodes: Vec<Option<Node>>,
    entry: Option<usize>,
    next_ordinal: u64,
    len: usize,
}

impl NswIndex {
    /// Creates an empty graph with the given parameters.
    pub fn new(config: NswConfig) -> Self {
        Self {
            config,
            nodes: Vec::new(),
            entry: None,
            next_ordinal: 0,
            len: 0,
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &NswConfig {
        &self.config
    }

    fn score(&self, slot: usize, query_unit: &[f32]) -> Option<Scored> {
        let node = self.nodes.get(slot)?.as_ref()?;
        Some(Scored {
            similarity: dot(query_unit, &node.unit),
            ordinal: node.ordinal,
            slot,
        })
    }

    /// Best-first traversal from the entry node, keeping the `ef` best
    /// candidates seen. Returns them sorted best-first.
    fn beam_search(&self, query_unit: &[f32], ef: usize) -> Vec<Scored> {
        let Some(entry) = self.entry else {
            return Vec::new();
        };
        let Some(start) = self.score(entry, query_unit) else {
            return Vec::new();
        };
        let ef = ef.max(1);

        let mut visited = FxHashSet::default();
        visited.insert(entry);

        let mut candidates = BinaryHeap::new();
        candidates.push(start);
        let mut results: BinaryHeap<Reverse<Scored>> = BinaryHeap::new();
        results.push(Reverse(start));

        while let Some(current) = candidates.pop() {
            if results.len() >= ef {
                if let Some(Reverse(worst)) = results.peek() {
                    if current < *worst {
                        break;
                    }
                }
            }
            let Some(node) = self.nodes.get(current.slot).and_then(Option::as_ref) else {
                continue;
            };
            for &neighbor in &node.neighbors {
                if !visited.insert(neighbor) {
                    continue;
                }
                let Some(scored) = self.score(neighbor, query_unit) else {
                    continue;
                };
                if results.len() < ef {
                    candidates.push(scored);
                    results.push(Reverse(scored));
                } else if let Some(Reverse(worst)) = results.peek() {
                    if scored > *worst {
                        candidates.push(scored);
                        results.pop();
                        results.push(Reverse(scored));
                    }
                }
            }
        }

        let mut out: Vec<Scored> = results.into_iter().map(|item| item.0).collect();
        out.sort_unstable_by(|a, b| b.cmp(a));
        out
    }

    /// Re-sorts `slot`'s neighbor list by proximity and cuts it back to
    /// `max_degree`.
    fn prune_neighbors(&mut self, slot: usize) {
        let (unit, neighbors) = match self.nodes.get(slot).and_then(Option::as_ref) {
            Some(node) if node.neighbors.len() > self.config.max_degree => {
                (node.unit.clone(), node.neighbors.clone())
            }
            _ => return,
        };

        let mut scored: Vec<Scored> = neighbors
            .iter()
            .filter_map(|&neighbor| self.score(neighbor, &unit))
            .collect();
        scored.sort_unstable_by(|a, b| b.cmp(a));
        scored.truncate(self.config.max_degree);
        let kept: Vec<usize> = scored.into_iter().map(|s| s.slot).collect();

        if let Some(node) = self.nodes[slot].as_mut() {
            node.neighbors = kept;
        }
    }

    fn link_if_capacity(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        let has_room = |node: Option<&Node>, other: usize| {
            node.is_some_and(|n| {
                n.neighbors.len() < self.config.max_degree && !n.neighbors.contains(&other)
            })
        };
        let a_ok = has_room(self.nodes.get(a).and_then(Option::as_ref), b);
        let b_ok = has_room(self.nodes.get(b).and_then(Option::as_ref), a);
        if a_ok && b_ok {
            if let Some(node) = self.nodes[a].as_mut() {
                node.neighbors.push(b);
            }
            if let Some(node) = self.nodes[b].as_mut() {
                node.neighbors.push(a);
            }
        }
    }

    fn oldest_live_slot(&self) -> Option<usize> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(slot, node)| node.as_ref().map(|n| (n.ordinal, slot)))
            .min()
            .map(|(_, slot)| slot)
    }

    fn detach(&mut self, slot: usize) {
        let Some(node) = self.nodes[slot].take() else {
            return;
        };
        self.len -= 1;

        // Pruning makes edges mildly asymmetric, so incoming links can come
        // from nodes outside our own neighbor list; scrub them all.
        for other in self.nodes.iter_mut().flatten() {
            other.neighbors.retain(|&n| n != slot);
        }

        let former: Vec<usize> = node
            .neighbors
            .iter()
            .copied()
            .filter(|&n| self.nodes.get(n).is_some_and(Option::is_some))
            .collect();
        for i in 0..former.len() {
            for j in (i + 1)..former.len() {
                self.link_if_capacity(former[i], former[j]);
            }
        }

        if self.entry == Some(slot) {
            self.entry = self.oldest_live_slot();
        }
    }
}

impl VectorSearcher for NswIndex {
    fn insert(&mut self, record: EmbeddingRecord) {
        let unit = normalize(&record.vector);
        let ordinal = self.next_ordinal;
        self.next_ordinal += 1;
        let slot = self.nodes.len();

        let neighbors: Vec<usize> = if self.entry.is_some() {
            let beam = self.config.ef_construction.max(self.config.max_degree);
            self.beam_search(&unit, beam)
                .into_iter()
                .take(self.config.max_degree)
                .map(|scored| scored.slot)
                .collect()
        } else {
            Vec::new()
        };

        self.nodes.push(Some(Node {
            record,
            unit,
            neighbors: neighbors.clone(),
            ordinal,
        }));
        self.len += 1;
        if self.entry.is_none() {
            self.entry = Some(slot);
        }

        for neighbor in neighbors {
            if let Some(node) = self.nodes[neighbor].as_mut() {
                node.neighbors.push(slot);
            }
            self.prune_neighbors(neighbor);
        }
    }

    fn remove_resource(&mut self, resource_id: &str) -> usize {
        let targets: Vec<usize> = self
            .nodes
            .iter()
            .enumerate()
            .filter_map(|(slot, node)| {
                node.as_ref()
                    .filter(|n| n.record.resource_id == resource_id)
                    .map(|_| slot)
            })
            .collect();
        for &slot in &targets {
            self.detach(slot);
        }
        targets.len()
    }

    fn search(&self, query: &[f32], k: usize) -> Vec<(EmbeddingRecord, f32)> {
        if k == 0 || self.len == 0 {
            return Vec::new();
        }
        let unit = normalize(query);
        let ef = self.config.ef_search.max(k);
        self.beam_search(&unit, ef)
            .into_iter()
            .take(k)
            .filter_map(|scored| {
                self.nodes
                    .get(scored.slot)
                    .and_then(Option::as_ref)
                    .map(|node| (node.record.clone(), scored.similarity))
            })
            .collect()
    }

    fn len(&self) -> usize {
        self.len
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::ExactIndex;

    fn record(id: &str, resource_id: &str, vector: Vec<f32>) -> EmbeddingRecord {
        EmbeddingRecord {
            id: id.to_string(),
            resource_id: resource_id.to_string(),
            content: format!("chunk {id}"),
            vector,
        }
    }

    #[test]
    fn empty_index_returns_empty_results() {
        let index = NswIndex::new(NswConfig::default());
        assert!(index.search(&[1.0, 0.0], 5).is_empty());
        assert!(index.is_empty());
    }

    #[test]
    fn results_descend_and_ties_break_by_insertion_order() {
        let mut index = NswIndex::new(NswConfig::default());
        index.insert(record("first", "a", vec![1.0, 0.0, 0.0]));
        index.insert(record("second", "b", vec![1.0, 0.0, 0.0]));
        index.insert(record("other", "c", vec![0.0, 1.0, 0.0]));

        let hits = index.search(&[1.0, 0.0, 0.0], 3);
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].0.id, "first");
        assert_eq!(hits[1].0.id, "second");
        assert_eq!(hits[2].0.id, "other");
        assert!(hits[0].1 >= hits[1].1 && hits[1].1 >= hits[2].1);
    }

    #[test]
    fn remove_resource_detaches_every_record() {
        let mut index = NswIndex::new(NswConfig::default());
        index.insert(record("a1", "a", vec![1.0, 0.0]));
        index.insert(record("a2", "a", vec![0.9, 0.1]));
        index.insert(record("b1", "b", vec![0.0, 1.0]));

        let removed = index.remove_resource("a");
        assert_eq!(removed, 2);
        assert_eq!(index.len(), 1);

        let hits = index.search(&[1.0, 0.0], 3);
        assert!(hits.iter().all(|(rec, _)| rec.resource_id != "a"));
    }

    #[test]
    fn entry_point_survives_removal_of_first_insert() {
        let mut index = NswIndex::new(NswConfig::default());
        index.insert(record("a1", "a", vec![1.0, 0.0]));
        index.insert(record("b1", "b", vec![0.0, 1.0]));
        index.insert(record("c1", "c", vec![0.5, 0.5]));

        index.remove_resource("a");
        let hits = index.search(&[0.0, 1.0], 2);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].0.id, "b1");
    }

    #[test]
    fn removing_everything_empties_the_graph() {
        let mut index = NswIndex::new(NswConfig::default());
        index.insert(record("a1", "a", vec![1.0, 0.0]));
        index.insert(record("a2", "a", vec![0.0, 1.0]));
        assert_eq!(index.remove_resource("a"), 2);
        assert!(index.is_empty());
        assert!(index.search(&[1.0, 0.0], 1).is_empty());
    }

    #[test]
    fn matches_exact_scan_when_beam_covers_the_corpus() {
        // With max_degree and the beam widths at or above the corpus size,
        // the graph is complete and the beam visits every node, so graph
        // search must agree with the exhaustive scan exactly.
        let dimension = 8;
        let corpus: Vec<Vec<f32>> = (0..50)
            .map(|i| {
                (0..dimension)
                    .map(|j| ((i * 31 + j * 17) % 97) as f32 / 97.0)
                    .collect()
            })
            .collect();

        let mut nsw = NswIndex::new(NswConfig {
            max_degree: 64,
            ef_construction: 100,
            ef_search: 100,
        });
        let mut exact = ExactIndex::new();
        for (i, vector) in corpus.iter().enumerate() {
            let rec = record(&format!("r{i}"), &format!("res{i}"), vector.clone());
            nsw.insert(rec.clone());
            exact.insert(rec);
        }

        let query: Vec<f32> = corpus[25].iter().map(|v| v + 0.01).collect();
        let nsw_hits = nsw.search(&query, 5);
        let exact_hits = exact.search(&query, 5);

        let nsw_ids: Vec<&str> = nsw_hits.iter().map(|(r, _)| r.id.as_str()).collect();
        let exact_ids: Vec<&str> = exact_hits.iter().map(|(r, _)| r.id.as_str()).collect();
        assert_eq!(nsw_ids, exact_ids);
    }

    #[test]
    fn zero_norm_query_scores_zero_everywhere() {
        let mut index = NswIndex::new(NswConfig::default());
        index.insert(record("a1", "a", vec![1.0, 0.0]));
        let hits = index.search(&[0.0, 0.0], 1);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].1, 0.0);
    }
}
