//! Cognitive mode (spec §4.5.2, ACT-R-inspired).
//!
//! `probe = clamp(semantic_similarity,0,1)^1.35`.
//! `base = encoding_strength * ln(1+access_count) * exp(-Δt/τ)`, `τ = 7
//! days`, `base = 0` when `last_accessed` is null.
//! `source_activation = clamp(0.7*probe + 0.3*base, 0, 1)`.
//! `spread = 1 - exp(-Σ edge_weight * source_activation_neighbor)` over
//! neighbors already present in the candidate pool.
//! `cognitive = 0.5*probe + 0.35*base + 0.15*spread`; `combined = cognitive
//! + wm_boost`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::config::CognitiveWeights;
use crate::fusion::FusedCandidate;
use crate::model::MemoryUnit;
use crate::scoring::ScoredCandidate;

#[allow(clippy::too_many_arguments)]
pub fn score_cognitive(
    fused: &[FusedCandidate],
    memories: &HashMap<String, MemoryUnit>,
    semantic_scores: &HashMap<String, f32>,
    neighbor_edges: &HashMap<String, Vec<(String, f32)>>,
    wm_boosts: &HashMap<String, f32>,
    weights: CognitiveWeights,
    now: DateTime<Utc>,
) -> Vec<ScoredCandidate> {
    if fused.is_empty() {
        return Vec::new();
    }

    // Pass 1: probe, base, source activation for every candidate.
    let mut probe_of: HashMap<String, f32> = HashMap::new();
    let mut base_of: HashMap<String, f32> = HashMap::new();
    let mut activation_of: HashMap<String, f32> = HashMap::new();

    for c in fused {
        let Some(memory) = memories.get(&c.id) else { continue };
        let similarity = semantic_scores.get(&c.id).copied().unwrap_or(0.0);
        let probe = similarity.clamp(0.0, 1.0).powf(weights.probe_exponent);

        let base = match memory.last_accessed {
            None => 0.0,
            Some(last) => {
                let delta_secs = (now - last).num_milliseconds().max(0) as f64 / 1000.0;
                let decay = (-delta_secs / weights.tau_secs).exp() as f32;
                memory.encoding_strength * (1.0 + memory.access_count as f32).ln() * decay
            }
        };

        let activation = (weights.activation_probe_weight * probe + weights.activation_base_weight * base).clamp(0.0, 1.0);

        probe_of.insert(c.id.clone(), probe);
        base_of.insert(c.id.clone(), base);
        activation_of.insert(c.id.clone(), activation);
    }

    // Pass 2: spread, from neighbors already present in the candidate pool.
    fused
        .iter()
        .filter_map(|c| {
            if !memories.contains_key(&c.id) {
                return None;
            }
            let probe = probe_of.get(&c.id).copied().unwrap_or(0.0);
            let base = base_of.get(&c.id).copied().unwrap_or(0.0);

            let spread_sum: f32 = neighbor_edges
                .get(&c.id)
                .map(|edges| {
                    edges
                        .iter()
                        .map(|(neighbor, weight)| weight * activation_of.get(neighbor).copied().unwrap_or(0.0))
                        .sum()
                })
                .unwrap_or(0.0);
            let spread = 1.0 - (-spread_sum).exp();

            let cognitive = weights.probe * probe + weights.base * base + weights.spread * spread;
            let wm_boost = wm_boosts.get(&c.id).copied().unwrap_or(0.0);

            Some(ScoredCandidate {
                id: c.id.clone(),
                sources: c.sources.clone(),
                combined: cognitive + wm_boost,
                probe: Some(probe),
                base: Some(base),
                spread: Some(spread),
                wm_boost: Some(wm_boost),
                rrf_norm: None,
                ce_norm: None,
                temporal: None,
                recency: None,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FactType;
    use chrono::Duration;
    use std::collections::HashSet;

    fn memory(id: &str, access_count: u32, last_accessed: Option<DateTime<Utc>>) -> MemoryUnit {
        MemoryUnit {
            id: id.to_string(),
            bank_id: "bank".into(),
            content: "x".into(),
            source_text: None,
            gist: None,
            fact_type: FactType::World,
            confidence: 1.0,
            occurred_start: None,
            occurred_end: None,
            mentioned_at: None,
            event_date: None,
            created_at: Utc::now(),
            access_count,
            last_accessed,
            encoding_strength: 1.0,
            tags: None,
            document_id: None,
            chunk_id: None,
            source_memory_ids: None,
            scope_profile: None,
            scope_project: None,
        }
    }

    /// spec §8.1: base(c) = 0 for every candidate with last_accessed = null.
    #[test]
    fn base_is_zero_when_never_accessed() {
        let now = Utc::now();
        let fused = vec![FusedCandidate { id: "a".into(), rrf_score: 1.0, sources: HashSet::new() }];
        let mut memories = HashMap::new();
        memories.insert("a".to_string(), memory("a", 0, None));
        let mut semantic = HashMap::new();
        semantic.insert("a".to_string(), 0.5);
        let scored = score_cognitive(&fused, &memories, &semantic, &HashMap::new(), &HashMap::new(), CognitiveWeights::default(), now);
        assert_eq!(scored[0].base, Some(0.0));
    }

    /// spec §8.4 S4: identical semantic similarity, A accessed recently and
    /// repeatedly, B never accessed — A must precede B with a strictly
    /// greater cognitive score.
    #[test]
    fn s4_recently_accessed_candidate_outranks_unaccessed_twin() {
        let now = Utc::now();
        let fused = vec![
            FusedCandidate { id: "a".into(), rrf_score: 1.0, sources: HashSet::new() },
            FusedCandidate { id: "b".into(), rrf_score: 1.0, sources: HashSet::new() },
        ];
        let mut memories = HashMap::new();
        memories.insert("a".to_string(), memory("a", 10, Some(now - Duration::seconds(1))));
        memories.insert("b".to_string(), memory("b", 0, None));
        let mut semantic = HashMap::new();
        semantic.insert("a".to_string(), 0.5);
        semantic.insert("b".to_string(), 0.5);
        let mut scored = score_cognitive(&fused, &memories, &semantic, &HashMap::new(), &HashMap::new(), CognitiveWeights::default(), now);
        scored.sort_by(|x, y| y.combined.partial_cmp(&x.combined).unwrap());
        assert_eq!(scored[0].id, "a");
        assert!(scored[0].combined > scored[1].combined);
    }
}
