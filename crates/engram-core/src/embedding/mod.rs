//! Embedding store (C2): insert/delete/KNN over a `(id, vector)` index,
//! cosine distance.
//!
//! The teacher backs this with `usearch`'s HNSW index
//! (`search::vector::VectorIndex`) — an *approximate* nearest-neighbor
//! structure. Spec §5/§8.2 require byte-identical, deterministic recall for
//! an unchanged bank snapshot; an approximate index cannot guarantee that
//! across rebuilds or incremental churn. This module keeps the teacher's
//! `VectorIndex` API surface (`add`/`remove`/`contains`/`search`/`stats`)
//! but backs it with an exact brute-force cosine scan over an in-memory
//! `Vec<(String, Vec<f32>)>`, loaded from `node_embeddings` at startup and
//! kept in sync on every write. Same contract, same module boundary — a
//! deliberate teacher-dependency drop, recorded in `DESIGN.md`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VectorIndexError {
    #[error("dimension mismatch: index expects {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VectorIndexStats {
    pub len: usize,
    pub dimensions: usize,
}

/// One vector index per embedding-owner kind (memories, entities, ...).
pub struct VectorIndex {
    dimensions: Option<usize>,
    vectors: Vec<(String, Vec<f32>)>,
    position: HashMap<String, usize>,
}

impl VectorIndex {
    pub fn new() -> Self {
        Self {
            dimensions: None,
            vectors: Vec::new(),
            position: HashMap::new(),
        }
    }

    /// Rebuild the index from a full snapshot, as loaded from
    /// `Storage::load_memory_embeddings_by_bank` at startup, one bank's rows at a time.
    pub fn from_rows(rows: Vec<(String, Vec<f32>)>) -> Self {
        let mut index = Self::new();
        for (id, vector) in rows {
            // Startup load trusts the persisted rows; a corrupt row would
            // already have failed to decode in `Storage::load_memory_embeddings_by_bank`.
            let _ = index.add(&id, &vector);
        }
        index
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions.unwrap_or(0)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.position.contains_key(key)
    }

    pub fn add(&mut self, key: &str, vector: &[f32]) -> Result<(), VectorIndexError> {
        if let Some(dim) = self.dimensions {
            if vector.len() != dim {
                return Err(VectorIndexError::DimensionMismatch {
                    expected: dim,
                    actual: vector.len(),
                });
            }
        } else {
            self.dimensions = Some(vector.len());
        }
        if let Some(&idx) = self.position.get(key) {
            self.vectors[idx].1 = vector.to_vec();
        } else {
            self.position.insert(key.to_string(), self.vectors.len());
            self.vectors.push((key.to_string(), vector.to_vec()));
        }
        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> bool {
        if let Some(idx) = self.position.remove(key) {
            self.vectors.swap_remove(idx);
            if let Some((moved_key, _)) = self.vectors.get(idx) {
                self.position.insert(moved_key.clone(), idx);
            }
            true
        } else {
            false
        }
    }

    /// Exact cosine KNN: returns up to `k` `(id, score)` pairs sorted by
    /// score descending, `score = 1 - cosine_distance` (spec §4.3.1).
    pub fn search(&self, query: &[f32], k: usize) -> Vec<(String, f32)> {
        let mut scored: Vec<(String, f32)> = self
            .vectors
            .iter()
            .map(|(id, v)| (id.clone(), cosine_similarity(query, v)))
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then(a.0.cmp(&b.0)));
        scored.truncate(k);
        scored
    }

    pub fn stats(&self) -> VectorIndexStats {
        VectorIndexStats {
            len: self.len(),
            dimensions: self.dimensions(),
        }
    }
}

impl Default for VectorIndex {
    fn default() -> Self {
        Self::new()
    }
}

/// Cosine similarity in `[-1, 1]`; `0.0` for a degenerate (zero-norm or
/// mismatched-length) pair rather than `NaN`, so downstream scoring never
/// has to special-case it.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_ranks_closest_first() {
        let mut index = VectorIndex::new();
        index.add("a", &[1.0, 0.0]).unwrap();
        index.add("b", &[0.0, 1.0]).unwrap();
        index.add("c", &[0.9, 0.1]).unwrap();
        let results = index.search(&[1.0, 0.0], 2);
        assert_eq!(results[0].0, "a");
        assert_eq!(results[1].0, "c");
    }

    #[test]
    fn dimension_mismatch_is_rejected() {
        let mut index = VectorIndex::new();
        index.add("a", &[1.0, 0.0]).unwrap();
        assert!(index.add("b", &[1.0, 0.0, 0.0]).is_err());
    }

    #[test]
    fn remove_then_contains_is_false() {
        let mut index = VectorIndex::new();
        index.add("a", &[1.0, 0.0]).unwrap();
        assert!(index.remove("a"));
        assert!(!index.contains("a"));
    }

    #[test]
    fn deterministic_across_repeated_searches() {
        let mut index = VectorIndex::new();
        for i in 0..50 {
            index.add(&format!("id{i}"), &[i as f32, (50 - i) as f32]).unwrap();
        }
        let a = index.search(&[25.0, 25.0], 5);
        let b = index.search(&[25.0, 25.0], 5);
        assert_eq!(a, b);
    }
}
