//! Combined scorer (C7): hybrid (default) and cognitive (ACT-R-inspired)
//! modes over the fused candidate set (spec §4.5).

pub mod cognitive;
pub mod hybrid;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScoringMode {
    #[default]
    Hybrid,
    Cognitive,
}

/// A fused candidate after scoring, immediately before location boost (C9).
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub id: String,
    pub sources: HashSet<&'static str>,
    pub combined: f32,
    // Present only in cognitive mode; kept for tracing (C14).
    pub probe: Option<f32>,
    pub base: Option<f32>,
    pub spread: Option<f32>,
    pub wm_boost: Option<f32>,
    // Present only in hybrid mode; kept for tracing (C14).
    pub rrf_norm: Option<f32>,
    pub ce_norm: Option<f32>,
    pub temporal: Option<f32>,
    pub recency: Option<f32>,
}

/// Deterministic tie-break: `(combined DESC, id ASC)` (spec §4.5.2,
/// §8.1 quantified invariant).
pub fn sort_deterministic(candidates: &mut [ScoredCandidate]) {
    candidates.sort_by(|a, b| {
        b.combined
            .partial_cmp(&a.combined)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.id.cmp(&b.id))
    });
}
