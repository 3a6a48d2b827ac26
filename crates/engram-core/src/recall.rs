//! Recall orchestration (spec §6.1/§6.2): C4 → C5 → C6 → C7 → C9 → C10 →
//! C11 → C12 → C13, with C14 tracing threaded throughout.
//!
//! The four retrieval strategies are dispatched together with
//! `tokio::join!` (spec §5: "all four dispatched, awaited together") —
//! each is synchronous under the hood (SQL and in-memory KNN are
//! non-suspending per spec §5), so this buys the *shape* of cooperative
//! dispatch the teacher's async MCP handlers use, not true parallel CPU
//! work; a future host fronting remote storage could make the strategies
//! genuinely suspend without changing this call shape.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use chrono::Utc;

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::fusion::reciprocal_rank_fusion;
use crate::hydration::{hydrate, HydrationOptions};
use crate::location::location_boost;
use crate::model::{Chunk, Entity, FactType, LinkType, MemoryUnit, Scope, ScopeMode};
use crate::packer::{pack, PackResult, PackedMode};
use crate::retrieval::{fulltext_search, graph_search, semantic_search, temporal_search, Candidate};
use crate::scoring::cognitive::score_cognitive;
use crate::scoring::hybrid::score_hybrid;
use crate::scoring::{sort_deterministic, ScoringMode};
use crate::storage::Storage;
use crate::tags::TagsMatch;
use crate::temporal::extract_time_range;
use crate::traits::{Embedder, Reranker};
use crate::trace::RecallTrace;
use crate::trace::RecallTraceBuilder;
use crate::working_memory::WorkingMemory;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalMethod {
    Semantic,
    Fulltext,
    Graph,
    Temporal,
}

#[derive(Debug, Clone)]
pub struct RecallOptions {
    pub limit: usize,
    pub methods: Vec<RetrievalMethod>,
    pub tags: Option<Vec<String>>,
    pub tags_match: TagsMatch,
    pub fact_types: Option<Vec<FactType>>,
    pub min_confidence: f32,
    pub entities: Option<Vec<String>>,
    pub time_range: Option<(i64, i64)>,
    pub max_tokens: Option<usize>,
    pub token_budget: Option<usize>,
    pub mode: ScoringMode,
    pub session_id: Option<String>,
    pub scope: Scope,
    pub scope_mode: ScopeMode,
    pub include_entities: bool,
    pub include_chunks: bool,
    pub max_entity_tokens: Option<usize>,
    pub max_chunk_tokens: Option<usize>,
    pub enable_trace: bool,
}

impl Default for RecallOptions {
    fn default() -> Self {
        Self {
            limit: 10,
            methods: vec![RetrievalMethod::Semantic, RetrievalMethod::Fulltext, RetrievalMethod::Graph, RetrievalMethod::Temporal],
            tags: None,
            tags_match: TagsMatch::Any,
            fact_types: None,
            min_confidence: 0.0,
            entities: None,
            time_range: None,
            max_tokens: None,
            token_budget: None,
            mode: ScoringMode::Hybrid,
            session_id: None,
            scope: Scope::default(),
            scope_mode: ScopeMode::default(),
            include_entities: false,
            include_chunks: false,
            max_entity_tokens: None,
            max_chunk_tokens: None,
            enable_trace: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecallResult {
    pub memories: Vec<MemoryUnit>,
    pub query: String,
    pub entities: Option<Vec<Entity>>,
    pub chunks: Option<Vec<Chunk>>,
    pub pack: Option<PackResult>,
    pub trace: Option<RecallTrace>,
}

fn truncate_chars(s: &str, max_tokens: usize) -> String {
    let cap = max_tokens.saturating_mul(4);
    if s.chars().count() > cap {
        s.chars().take(cap).collect()
    } else {
        s.to_string()
    }
}

/// Neighbor edges among `node_ids` across every link type, for cognitive
/// mode's spreading-activation term (spec §4.5.2). Restricted to the
/// candidate pool already present, as the spec requires.
fn neighbor_edges_within(
    storage: &Storage,
    node_ids: &[String],
    batch_size: usize,
    causal_weight_threshold: f32,
) -> Result<HashMap<String, Vec<(String, f32)>>> {
    let node_set: HashSet<&str> = node_ids.iter().map(String::as_str).collect();
    let mut edges: HashMap<String, Vec<(String, f32)>> = HashMap::new();
    for link_type in [
        LinkType::Semantic,
        LinkType::Temporal,
        LinkType::Entity,
        LinkType::CausedBy,
        LinkType::Causes,
        LinkType::Enables,
        LinkType::Prevents,
    ] {
        let min_weight = link_type.is_causal().then_some(causal_weight_threshold);
        let fetched = storage.edges_for_frontier(link_type, node_ids, batch_size, min_weight)?;
        for (source, target, weight) in fetched {
            if node_set.contains(source.as_str()) && node_set.contains(target.as_str()) {
                edges.entry(source.clone()).or_default().push((target.clone(), weight));
                edges.entry(target).or_default().push((source, weight));
            }
        }
    }
    Ok(edges)
}

#[allow(clippy::too_many_arguments)]
pub async fn recall(
    storage: &Storage,
    config: &EngineConfig,
    vector_index: &crate::embedding::VectorIndex,
    working_memory: &mut WorkingMemory,
    embedder: &dyn Embedder,
    reranker: Option<&dyn Reranker>,
    bank_id: &str,
    query: &str,
    options: &RecallOptions,
) -> Result<RecallResult> {
    let now = Utc::now();
    let mut trace = options.enable_trace.then(|| RecallTraceBuilder::new(query, options.max_tokens));

    let time_range = options.time_range.or_else(|| extract_time_range(query, now).map(|r| (r.from, r.to)));
    if let Some(t) = trace.as_mut() {
        t.set_temporal_constraint(time_range.map(|(f, to)| format!("{f}..{to}")));
    }

    let candidate_limit = config.candidate_limit.max(options.limit);

    let temporal_enabled = options.methods.contains(&RetrievalMethod::Temporal);
    let temporal_started = Instant::now();
    let temporal_candidates = match time_range {
        Some((from, to)) if temporal_enabled => temporal_search(storage, bank_id, from, to, candidate_limit)?,
        _ => Vec::new(),
    };
    if let Some(t) = trace.as_mut() {
        let ids: Vec<String> = temporal_candidates.iter().map(|c| c.id.clone()).collect();
        t.record_retrieval("temporal", temporal_started.elapsed(), &ids);
    }
    let temporal_seed_ids: Vec<String> = temporal_candidates.iter().map(|c| c.id.clone()).collect();

    let semantic_enabled = options.methods.contains(&RetrievalMethod::Semantic);
    let fulltext_enabled = options.methods.contains(&RetrievalMethod::Fulltext);
    let graph_enabled = options.methods.contains(&RetrievalMethod::Graph);

    let semantic_started = Instant::now();
    let fulltext_started = Instant::now();
    let graph_started = Instant::now();

    let (semantic_result, fulltext_result, graph_result) = tokio::join!(
        async {
            if semantic_enabled {
                semantic_search(vector_index, embedder, query, candidate_limit)
            } else {
                Ok(Vec::new())
            }
        },
        async {
            if fulltext_enabled {
                fulltext_search(storage, bank_id, query, candidate_limit)
            } else {
                Ok(Vec::new())
            }
        },
        async {
            if graph_enabled {
                graph_search(storage, config, bank_id, query, &temporal_seed_ids, candidate_limit)
            } else {
                Ok(Vec::new())
            }
        },
    );

    // Spec §4.13: each strategy is independent; an error downgrades to an
    // empty list rather than failing the whole recall.
    let semantic_candidates: Vec<Candidate> = semantic_result.unwrap_or_default();
    let fulltext_candidates: Vec<Candidate> = fulltext_result.unwrap_or_default();
    let graph_candidates: Vec<Candidate> = graph_result.unwrap_or_default();

    if let Some(t) = trace.as_mut() {
        let ids = |c: &[Candidate]| c.iter().map(|x| x.id.clone()).collect::<Vec<_>>();
        t.record_retrieval("semantic", semantic_started.elapsed(), &ids(&semantic_candidates));
        t.record_retrieval("fulltext", fulltext_started.elapsed(), &ids(&fulltext_candidates));
        t.record_retrieval("graph", graph_started.elapsed(), &ids(&graph_candidates));
    }

    let lists = vec![semantic_candidates, fulltext_candidates, graph_candidates, temporal_candidates];
    let fusion_started = Instant::now();
    let fused = reciprocal_rank_fusion(&lists, config.rrf_k, candidate_limit);
    if let Some(t) = trace.as_mut() {
        t.record_phase("fusion", fusion_started.elapsed(), Some(format!("{} candidates", fused.len())));
    }

    if fused.is_empty() {
        let trace_result = trace.map(|t| t.finish(&[], &[], Vec::new()));
        return Ok(RecallResult {
            memories: Vec::new(),
            query: query.to_string(),
            entities: options.include_entities.then(Vec::new),
            chunks: options.include_chunks.then(Vec::new),
            pack: None,
            trace: trace_result,
        });
    }

    let fused_ids: Vec<String> = fused.iter().map(|c| c.id.clone()).collect();
    let memories_by_id: HashMap<String, MemoryUnit> = storage
        .get_memories_by_ids(bank_id, &fused_ids)?
        .into_iter()
        .map(|m| (m.id.clone(), m))
        .collect();

    let scoring_started = Instant::now();
    let mut scored = match options.mode {
        ScoringMode::Hybrid => {
            let temporal_scores: HashMap<String, f32> = lists_score_map(&lists, "temporal");
            let rerank_scores = match reranker {
                Some(r) => {
                    let docs: Vec<String> = fused_ids
                        .iter()
                        .map(|id| memories_by_id.get(id).map(|m| m.content.clone()).unwrap_or_default())
                        .collect();
                    let scores = r.rerank(query, &docs)?;
                    if scores.len() != fused_ids.len() {
                        return Err(EngineError::InvariantViolation(format!(
                            "reranker returned {} scores for {} documents",
                            scores.len(),
                            fused_ids.len()
                        )));
                    }
                    Some(fused_ids.iter().cloned().zip(scores).collect::<HashMap<_, _>>())
                }
                None => None,
            };
            score_hybrid(&fused, &memories_by_id, &temporal_scores, rerank_scores.as_ref(), config.hybrid_weights, now)
        }
        ScoringMode::Cognitive => {
            let semantic_scores: HashMap<String, f32> = lists_score_map(&lists, "semantic");
            let neighbor_edges = neighbor_edges_within(storage, &fused_ids, config.graph_batch_size, config.causal_weight_threshold)?;
            let wm_boosts: HashMap<String, f32> = match &options.session_id {
                Some(session_id) => fused_ids
                    .iter()
                    .map(|id| (id.clone(), working_memory.get_boost(bank_id, session_id, id, now.timestamp_millis())))
                    .collect(),
                None => HashMap::new(),
            };
            score_cognitive(&fused, &memories_by_id, &semantic_scores, &neighbor_edges, &wm_boosts, config.cognitive_weights, now)
        }
    };
    if let Some(t) = trace.as_mut() {
        t.record_phase("scoring", scoring_started.elapsed(), None);
    }

    // Location boost (C9), applied after scoring, re-sorted with the same
    // deterministic tie-break (spec §4.7).
    let query_paths = crate::location::detect_location_signals(query);
    if !query_paths.is_empty() {
        let location_started = Instant::now();
        let max_coaccess = storage.max_coaccess_strength(bank_id)?;
        for candidate in scored.iter_mut() {
            let boost = location_boost(storage, config, bank_id, &candidate.id, &query_paths, max_coaccess, now)?;
            candidate.combined += boost;
        }
        if let Some(t) = trace.as_mut() {
            t.record_phase("location_boost", location_started.elapsed(), None);
        }
    }

    sort_deterministic(&mut scored);

    if let Some(session_id) = &options.session_id {
        let ids: Vec<String> = scored.iter().map(|c| c.id.clone()).collect();
        working_memory.touch(bank_id, session_id, &ids, now.timestamp_millis());
    }

    let ranked_ids: Vec<String> = scored.iter().map(|c| c.id.clone()).collect();

    let hydration_started = Instant::now();
    let hydration_options = HydrationOptions {
        min_confidence: options.min_confidence,
        fact_types: options.fact_types.clone(),
        tags: options.tags.clone(),
        tags_match: options.tags_match,
        entity_names: options.entities.clone(),
        scope: options.scope.clone(),
        scope_mode: options.scope_mode,
        max_tokens: options.max_tokens,
        limit: options.limit,
    };
    let hydrated = hydrate(storage, bank_id, &ranked_ids, &hydration_options)?;
    if let Some(t) = trace.as_mut() {
        t.record_phase("hydration", hydration_started.elapsed(), Some(format!("{} accepted", hydrated.len())));
    }

    let (final_memories, pack_result) = match options.token_budget {
        Some(budget) => {
            let pack_started = Instant::now();
            let result = pack(&hydrated, budget);
            if let Some(t) = trace.as_mut() {
                t.record_phase("packing", pack_started.elapsed(), Some(format!("{} packed, overflow={}", result.packed.len(), result.overflow)));
            }
            let by_id: HashMap<&str, &crate::hydration::HydratedMemory> = hydrated.iter().map(|h| (h.memory.id.as_str(), h)).collect();
            let memories: Vec<MemoryUnit> = result
                .packed
                .iter()
                .filter_map(|p| {
                    let hydrated_memory = by_id.get(p.memory_id.as_str())?;
                    let mut memory = hydrated_memory.memory.clone();
                    if p.mode == PackedMode::Gist {
                        memory.content = memory.gist.clone().unwrap_or(memory.content);
                    }
                    Some(memory)
                })
                .collect();
            (memories, Some(result))
        }
        None => (hydrated.iter().map(|h| h.memory.clone()).collect(), None),
    };

    let selected_ids: Vec<String> = final_memories.iter().map(|m| m.id.clone()).collect();
    storage.touch_access(&selected_ids, now)?;

    let entities = options.include_entities.then(|| {
        let mut seen = HashSet::new();
        hydrated
            .iter()
            .flat_map(|h| h.entities.iter().cloned())
            .filter(|e| seen.insert(e.id.clone()))
            .map(|mut e| {
                if let Some(cap) = options.max_entity_tokens {
                    e.name = truncate_chars(&e.name, cap);
                }
                e
            })
            .collect::<Vec<_>>()
    });

    let chunks = if options.include_chunks {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for memory in &final_memories {
            if let Some(chunk_id) = &memory.chunk_id {
                if seen.insert(chunk_id.clone()) {
                    if let Ok(mut chunk) = storage.get_chunk(chunk_id) {
                        if let Some(cap) = options.max_chunk_tokens {
                            chunk.content = truncate_chars(&chunk.content, cap);
                        }
                        out.push(chunk);
                    }
                }
            }
        }
        Some(out)
    } else {
        None
    };

    let trace_result = trace.map(|t| t.finish(&fused, &scored, selected_ids));

    Ok(RecallResult {
        memories: final_memories,
        query: query.to_string(),
        entities,
        chunks,
        pack: pack_result,
        trace: trace_result,
    })
}

fn lists_score_map(lists: &[Vec<Candidate>], source: &str) -> HashMap<String, f32> {
    lists
        .iter()
        .flatten()
        .filter(|c| c.source == source)
        .map(|c| (c.id.clone(), c.score))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FactType;

    struct IdentityEmbedder;
    impl Embedder for IdentityEmbedder {
        fn embed(&self, text: &str) -> Result<Vec<f32>> {
            Ok(vec![text.len() as f32, 1.0])
        }
    }

    fn seed_memory(storage: &Storage, bank_id: &str, content: &str) -> MemoryUnit {
        let memory = MemoryUnit {
            id: crate::model::new_id(),
            bank_id: bank_id.to_string(),
            content: content.to_string(),
            source_text: None,
            gist: None,
            fact_type: FactType::World,
            confidence: 1.0,
            occurred_start: None,
            occurred_end: None,
            mentioned_at: None,
            event_date: None,
            created_at: Utc::now(),
            access_count: 0,
            last_accessed: None,
            encoding_strength: 1.0,
            tags: None,
            document_id: None,
            chunk_id: None,
            source_memory_ids: None,
            scope_profile: None,
            scope_project: None,
        };
        storage.insert_memory(&memory).unwrap();
        memory
    }

    #[tokio::test]
    async fn empty_bank_returns_empty_memories() {
        let storage = Storage::open_in_memory().unwrap();
        let bank = storage.create_bank("demo", None).unwrap();
        let config = EngineConfig::default();
        let index = crate::embedding::VectorIndex::new();
        let mut wm = WorkingMemory::new();
        let result = recall(&storage, &config, &index, &mut wm, &IdentityEmbedder, None, &bank.id, "anything", &RecallOptions::default())
            .await
            .unwrap();
        assert!(result.memories.is_empty());
    }

    #[tokio::test]
    async fn fulltext_hit_is_returned() {
        let storage = Storage::open_in_memory().unwrap();
        let bank = storage.create_bank("demo", None).unwrap();
        seed_memory(&storage, &bank.id, "the quick brown fox");
        let config = EngineConfig::default();
        let index = crate::embedding::VectorIndex::new();
        let mut wm = WorkingMemory::new();
        let result = recall(&storage, &config, &index, &mut wm, &IdentityEmbedder, None, &bank.id, "fox", &RecallOptions::default())
            .await
            .unwrap();
        assert_eq!(result.memories.len(), 1);
    }
}
