//! Recall tracing (C14, spec §4.12): a side-effect-free accumulator that
//! mirrors `recall`'s phases without influencing them.
//!
//! Grounded in the teacher's `tracing` crate usage throughout
//! `storage::sqlite` and `search::hybrid` (structured `tracing::debug!`
//! spans) — here reified into a plain, serializable struct so a host can
//! also render it, rather than only emitting it to a subscriber.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::fusion::FusedCandidate;
use crate::scoring::ScoredCandidate;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalTrace {
    pub method: String,
    pub duration_ms: u128,
    pub count: usize,
    pub top_ranks: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseTrace {
    pub phase: String,
    pub duration_ms: u128,
    pub details: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateTrace {
    pub id: String,
    pub rank: usize,
    pub sources: Vec<String>,
    pub rrf_score: f32,
    pub rrf_normalized: Option<f32>,
    pub ce_norm: Option<f32>,
    pub temporal: Option<f32>,
    pub recency: Option<f32>,
    pub combined: f32,
    pub probe: Option<f32>,
    pub base: Option<f32>,
    pub spread: Option<f32>,
    pub wm_boost: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecallTrace {
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub query: String,
    pub max_tokens: Option<usize>,
    pub temporal_constraint: Option<String>,
    pub retrieval: Vec<RetrievalTrace>,
    pub phase_metrics: Vec<PhaseTrace>,
    pub candidates: Vec<CandidateTrace>,
    pub selected_memory_ids: Vec<String>,
    pub total_duration_ms: u128,
}

/// Builder accumulated during `recall`; finalized into [`RecallTrace`] via
/// [`RecallTraceBuilder::finish`]. Never read from by scoring or fusion —
/// tracing is strictly downstream.
pub struct RecallTraceBuilder {
    started_at: chrono::DateTime<chrono::Utc>,
    start: std::time::Instant,
    query: String,
    max_tokens: Option<usize>,
    temporal_constraint: Option<String>,
    retrieval: Vec<RetrievalTrace>,
    phase_metrics: Vec<PhaseTrace>,
}

impl RecallTraceBuilder {
    pub fn new(query: &str, max_tokens: Option<usize>) -> Self {
        Self {
            started_at: chrono::Utc::now(),
            start: std::time::Instant::now(),
            query: query.to_string(),
            max_tokens,
            temporal_constraint: None,
            retrieval: Vec::new(),
            phase_metrics: Vec::new(),
        }
    }

    pub fn set_temporal_constraint(&mut self, constraint: Option<String>) {
        self.temporal_constraint = constraint;
    }

    pub fn record_retrieval(&mut self, method: &str, duration: Duration, ids: &[String]) {
        self.retrieval.push(RetrievalTrace {
            method: method.to_string(),
            duration_ms: duration.as_millis(),
            count: ids.len(),
            top_ranks: ids.iter().take(5).cloned().collect(),
        });
    }

    pub fn record_phase(&mut self, phase: &str, duration: Duration, details: Option<String>) {
        self.phase_metrics.push(PhaseTrace {
            phase: phase.to_string(),
            duration_ms: duration.as_millis(),
            details,
        });
    }

    pub fn finish(self, fused: &[FusedCandidate], scored: &[ScoredCandidate], selected_memory_ids: Vec<String>) -> RecallTrace {
        let rrf_by_id: std::collections::HashMap<&str, f32> = fused.iter().map(|c| (c.id.as_str(), c.rrf_score)).collect();
        let candidates = scored
            .iter()
            .enumerate()
            .map(|(rank, c)| CandidateTrace {
                id: c.id.clone(),
                rank,
                sources: c.sources.iter().map(|s| s.to_string()).collect(),
                rrf_score: rrf_by_id.get(c.id.as_str()).copied().unwrap_or(0.0),
                rrf_normalized: c.rrf_norm,
                ce_norm: c.ce_norm,
                temporal: c.temporal,
                recency: c.recency,
                combined: c.combined,
                probe: c.probe,
                base: c.base,
                spread: c.spread,
                wm_boost: c.wm_boost,
            })
            .collect();

        RecallTrace {
            started_at: self.started_at,
            query: self.query,
            max_tokens: self.max_tokens,
            temporal_constraint: self.temporal_constraint,
            retrieval: self.retrieval,
            phase_metrics: self.phase_metrics,
            candidates,
            selected_memory_ids,
            total_duration_ms: self.start.elapsed().as_millis(),
        }
    }
}
