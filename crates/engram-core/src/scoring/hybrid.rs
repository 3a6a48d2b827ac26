//! Hybrid mode (spec §4.5.1, default).
//!
//! `score_i = 0.6*ce_i + 0.2*rrf_norm_i + 0.1*temporal_i + 0.1*recency_i`.
//! The cross-encoder dominates when present, RRF carries strategy
//! diversity, temporal and recency encode freshness.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::config::HybridWeights;
use crate::fusion::FusedCandidate;
use crate::model::MemoryUnit;
use crate::scoring::ScoredCandidate;

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// `rerank_scores`, if provided, must have already been validated to match
/// `fused` 1:1 by the caller (spec §4.5.3 — a length mismatch is a fatal
/// invariant violation raised before scoring is reached).
pub fn score_hybrid(
    fused: &[FusedCandidate],
    memories: &HashMap<String, MemoryUnit>,
    temporal_scores: &HashMap<String, f32>,
    rerank_scores: Option<&HashMap<String, f32>>,
    weights: HybridWeights,
    now: DateTime<Utc>,
) -> Vec<ScoredCandidate> {
    if fused.is_empty() {
        return Vec::new();
    }
    let rrf_min = fused.iter().map(|c| c.rrf_score).fold(f32::INFINITY, f32::min);
    let rrf_max = fused.iter().map(|c| c.rrf_score).fold(f32::NEG_INFINITY, f32::max);
    let rrf_span = rrf_max - rrf_min;

    fused
        .iter()
        .filter_map(|c| {
            let memory = memories.get(&c.id)?;
            let rrf_norm = if rrf_span == 0.0 { 0.5 } else { ((c.rrf_score - rrf_min) / rrf_span).clamp(0.0, 1.0) };
            let temporal = temporal_scores.get(&c.id).copied().unwrap_or(0.5);
            let days_since = (now - memory.anchor()).num_milliseconds() as f32 / 86_400_000.0;
            let recency = (1.0 - days_since / 365.0).max(0.1).clamp(0.1, 1.0);
            let ce_norm = rerank_scores
                .and_then(|m| m.get(&c.id).copied())
                .map(sigmoid)
                .unwrap_or(rrf_norm);

            let combined = weights.cross_encoder * ce_norm
                + weights.rrf_norm * rrf_norm
                + weights.temporal * temporal
                + weights.recency * recency;

            Some(ScoredCandidate {
                id: c.id.clone(),
                sources: c.sources.clone(),
                combined,
                probe: None,
                base: None,
                spread: None,
                wm_boost: None,
                rrf_norm: Some(rrf_norm),
                ce_norm: Some(ce_norm),
                temporal: Some(temporal),
                recency: Some(recency),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FactType;
    use std::collections::HashSet;

    fn memory(id: &str, anchor: DateTime<Utc>) -> MemoryUnit {
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
            created_at: anchor,
            access_count: 0,
            last_accessed: None,
            encoding_strength: 1.0,
            tags: None,
            document_id: None,
            chunk_id: None,
            source_memory_ids: None,
            scope_profile: None,
            scope_project: None,
        }
    }

    #[test]
    fn zero_rrf_span_falls_back_to_midpoint_norm() {
        let now = Utc::now();
        let fused = vec![
            FusedCandidate { id: "a".into(), rrf_score: 0.5, sources: HashSet::new() },
            FusedCandidate { id: "b".into(), rrf_score: 0.5, sources: HashSet::new() },
        ];
        let mut memories = HashMap::new();
        memories.insert("a".to_string(), memory("a", now));
        memories.insert("b".to_string(), memory("b", now));
        let scored = score_hybrid(&fused, &memories, &HashMap::new(), None, HybridWeights::default(), now);
        for c in &scored {
            assert_eq!(c.rrf_norm, Some(0.5));
        }
    }

    #[test]
    fn missing_memory_row_is_skipped() {
        let now = Utc::now();
        let fused = vec![FusedCandidate { id: "ghost".into(), rrf_score: 1.0, sources: HashSet::new() }];
        let scored = score_hybrid(&fused, &HashMap::new(), &HashMap::new(), None, HybridWeights::default(), now);
        assert!(scored.is_empty());
    }
}
