//! Tunable constants surfaced as configuration rather than hardcoded
//! literals (spec §9, "Ambiguities" / resolved in `DESIGN.md`).

use serde::{Deserialize, Serialize};

/// A meta-path step: walk edges of `link_type` in `direction`, multiplying
/// the frontier score by `decay` at each hop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaPathStep {
    pub link_type: String,
    pub direction: Direction,
    pub decay: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Forward,
    Backward,
    Both,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaPath {
    pub name: String,
    pub steps: Vec<MetaPathStep>,
    pub weight: f32,
}

/// Weights for the hybrid scorer (spec §4.5.1).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HybridWeights {
    pub cross_encoder: f32,
    pub rrf_norm: f32,
    pub temporal: f32,
    pub recency: f32,
}

impl Default for HybridWeights {
    fn default() -> Self {
        Self {
            cross_encoder: 0.6,
            rrf_norm: 0.2,
            temporal: 0.1,
            recency: 0.1,
        }
    }
}

/// Weights for the cognitive scorer (spec §4.5.2).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CognitiveWeights {
    pub probe: f32,
    pub base: f32,
    pub spread: f32,
    /// Probe exponent (applied to clamped semantic similarity).
    pub probe_exponent: f32,
    /// ACT-R decay time constant, in seconds.
    pub tau_secs: f64,
    /// Weight of `probe` inside source activation feeding spreading.
    pub activation_probe_weight: f32,
    pub activation_base_weight: f32,
}

impl Default for CognitiveWeights {
    fn default() -> Self {
        Self {
            probe: 0.5,
            base: 0.35,
            spread: 0.15,
            probe_exponent: 1.35,
            tau_secs: 7.0 * 86_400.0,
            activation_probe_weight: 0.7,
            activation_base_weight: 0.3,
        }
    }
}

/// Top-level knobs for the engine. Constructed with [`EngineConfig::default`]
/// and overridden selectively; passed into `Storage::new` / `recall`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// RRF fusion constant K (spec §4.4).
    pub rrf_k: f32,
    pub hybrid_weights: HybridWeights,
    pub cognitive_weights: CognitiveWeights,
    /// Working-memory per-session capacity (spec §4.6).
    pub working_memory_capacity: usize,
    /// Working-memory decay window, milliseconds.
    pub working_memory_decay_window_ms: i64,
    /// Working-memory boost scale (max possible boost).
    pub working_memory_boost_scale: f32,
    /// Location boost: direct-association bonus.
    pub location_direct_boost: f32,
    /// Location boost: familiarity-decay cap.
    pub location_familiarity_cap: f32,
    /// Location boost: co-access cap.
    pub location_coaccess_cap: f32,
    /// Entity-frequency filter threshold: entities mentioned more than this
    /// many times are treated as too generic to seed a graph walk.
    pub entity_frequency_threshold: u32,
    /// Minimum edge weight a causal link must carry to participate in
    /// meta-path aggregation.
    pub causal_weight_threshold: f32,
    /// Meta-paths exercised by the graph strategy (spec §4.3.3 defaults).
    pub meta_paths: Vec<MetaPath>,
    /// Max edges fetched per batch when expanding a frontier.
    pub graph_batch_size: usize,
    /// Max candidates drawn from each retrieval strategy before fusion.
    pub candidate_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rrf_k: 60.0,
            hybrid_weights: HybridWeights::default(),
            cognitive_weights: CognitiveWeights::default(),
            working_memory_capacity: 40,
            working_memory_decay_window_ms: 15 * 60 * 1000,
            working_memory_boost_scale: 0.2,
            location_direct_boost: 0.12,
            location_familiarity_cap: 0.10,
            location_coaccess_cap: 0.08,
            entity_frequency_threshold: 500,
            causal_weight_threshold: 0.3,
            graph_batch_size: 500,
            candidate_limit: 200,
            meta_paths: default_meta_paths(),
        }
    }
}

fn step(link_type: &str, direction: Direction, decay: f32) -> MetaPathStep {
    MetaPathStep {
        link_type: link_type.to_string(),
        direction,
        decay,
    }
}

/// The eight default meta-paths enumerated in spec §4.3.3.
fn default_meta_paths() -> Vec<MetaPath> {
    use Direction::*;
    vec![
        MetaPath {
            name: "entity".into(),
            steps: vec![step("entity", Both, 0.6)],
            weight: 1.0,
        },
        MetaPath {
            name: "semantic".into(),
            steps: vec![step("semantic", Both, 0.7)],
            weight: 0.8,
        },
        MetaPath {
            name: "causes_causes".into(),
            steps: vec![step("causes", Forward, 0.6), step("causes", Forward, 0.6)],
            weight: 1.2,
        },
        MetaPath {
            name: "caused_by_caused_by".into(),
            steps: vec![
                step("caused_by", Forward, 0.6),
                step("caused_by", Forward, 0.6),
            ],
            weight: 1.2,
        },
        MetaPath {
            name: "entity_causes".into(),
            steps: vec![step("entity", Both, 0.6), step("causes", Forward, 0.6)],
            weight: 0.9,
        },
        MetaPath {
            name: "semantic_entity".into(),
            steps: vec![step("semantic", Both, 0.7), step("entity", Both, 0.6)],
            weight: 0.7,
        },
        MetaPath {
            name: "enables".into(),
            steps: vec![step("enables", Forward, 0.6)],
            weight: 1.0,
        },
        MetaPath {
            name: "prevents".into(),
            steps: vec![step("prevents", Forward, 0.6)],
            weight: 1.0,
        },
    ]
}
