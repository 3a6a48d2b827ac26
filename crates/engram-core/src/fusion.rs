//! Reciprocal Rank Fusion (C6).
//!
//! For each input list's id at 0-based rank `r`, contributes `1/(K+r+1)` to
//! that id's fused score (spec §4.4). The teacher's `search::hybrid::
//! reciprocal_rank_fusion` uses `1/(k + rank)` with no `+1`, which gives the
//! top result `1/60` instead of `1/61` — that off-by-one is corrected here;
//! this is *not* the teacher's formula ported verbatim, it is the spec's.

use std::collections::{HashMap, HashSet};

use crate::retrieval::Candidate;

#[derive(Debug, Clone)]
pub struct FusedCandidate {
    pub id: String,
    pub rrf_score: f32,
    pub sources: HashSet<&'static str>,
}

/// Merge any number of ranked candidate lists into one scored list, sorted
/// by score DESC and truncated to `limit`. Stable for identical inputs
/// (spec §4.4: "Determinism: stable for identical input lists").
pub fn reciprocal_rank_fusion(lists: &[Vec<Candidate>], k: f32, limit: usize) -> Vec<FusedCandidate> {
    let mut scores: HashMap<String, f32> = HashMap::new();
    let mut sources: HashMap<String, HashSet<&'static str>> = HashMap::new();

    for list in lists {
        for (rank, candidate) in list.iter().enumerate() {
            *scores.entry(candidate.id.clone()).or_default() += 1.0 / (k + rank as f32 + 1.0);
            sources.entry(candidate.id.clone()).or_default().insert(candidate.source);
        }
    }

    let mut fused: Vec<FusedCandidate> = scores
        .into_iter()
        .map(|(id, rrf_score)| FusedCandidate {
            sources: sources.remove(&id).unwrap_or_default(),
            id,
            rrf_score,
        })
        .collect();
    fused.sort_by(|a, b| b.rrf_score.partial_cmp(&a.rrf_score).unwrap_or(std::cmp::Ordering::Equal).then(a.id.cmp(&b.id)));
    fused.truncate(limit);
    fused
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cand(id: &str, score: f32, source: &'static str) -> Candidate {
        Candidate { id: id.to_string(), score, source }
    }

    /// Spec §8.4 S2: semantic=[a,b,c], fulltext=[b,d,a], K=60.
    /// score(a)=1/61+1/63, score(b)=1/62+1/61, score(c)=1/63, score(d)=1/62.
    /// Ranking: b, a, d, c.
    #[test]
    fn s2_rrf_worked_example() {
        let semantic = vec![cand("a", 0.9, "semantic"), cand("b", 0.8, "semantic"), cand("c", 0.7, "semantic")];
        let fulltext = vec![cand("b", 0.9, "fulltext"), cand("d", 0.8, "fulltext"), cand("a", 0.7, "fulltext")];
        let fused = reciprocal_rank_fusion(&[semantic, fulltext], 60.0, 10);

        let by_id: HashMap<&str, f32> = fused.iter().map(|c| (c.id.as_str(), c.rrf_score)).collect();
        let eps = 1e-6;
        assert!((by_id["a"] - (1.0 / 61.0 + 1.0 / 63.0)).abs() < eps);
        assert!((by_id["b"] - (1.0 / 62.0 + 1.0 / 61.0)).abs() < eps);
        assert!((by_id["c"] - (1.0 / 63.0)).abs() < eps);
        assert!((by_id["d"] - (1.0 / 62.0)).abs() < eps);

        let order: Vec<&str> = fused.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(order, vec!["b", "a", "d", "c"]);
    }

    #[test]
    fn multi_list_ids_outrank_single_list_ids_at_same_best_rank() {
        let list1 = vec![cand("x", 1.0, "semantic")];
        let list2 = vec![cand("x", 1.0, "fulltext"), cand("y", 1.0, "graph")];
        let fused = reciprocal_rank_fusion(&[list1, list2], 60.0, 10);
        assert_eq!(fused[0].id, "x");
    }

    #[test]
    fn sum_identity_holds_for_arbitrary_lists() {
        let l1 = vec![cand("a", 1.0, "semantic"), cand("b", 1.0, "semantic")];
        let l2 = vec![cand("b", 1.0, "fulltext"), cand("a", 1.0, "fulltext")];
        let fused = reciprocal_rank_fusion(&[l1, l2], 60.0, 10);
        for c in &fused {
            // both ids appear at rank 0 and 1 across the two lists
            let expected = 1.0 / 61.0 + 1.0 / 62.0;
            assert!((c.rrf_score - expected).abs() < 1e-6);
        }
    }
}
