//! Hydration pipeline (C11, spec §4.9): batch-load ranked candidates and
//! their entities, then filter in rank order.
//!
//! Grounded in the teacher's batch-fetch shape already reused in
//! `Storage::get_memories_by_ids` (avoids N+1 the same way the teacher's
//! `get_memory_subgraph` avoids per-edge round trips).

use std::collections::HashMap;

use crate::error::Result;
use crate::model::{Entity, FactType, MemoryUnit, Scope, ScopeMode};
use crate::scope::passes_scope;
use crate::storage::Storage;
use crate::tags::{matches_tags, TagsMatch};

#[derive(Debug, Clone)]
pub struct HydrationOptions {
    pub min_confidence: f32,
    pub fact_types: Option<Vec<FactType>>,
    pub tags: Option<Vec<String>>,
    pub tags_match: TagsMatch,
    /// Candidate must be linked to at least one of these entity names
    /// (case-insensitive), when set.
    pub entity_names: Option<Vec<String>>,
    pub scope: Scope,
    pub scope_mode: ScopeMode,
    /// Per-memory content cap, in characters ≈ `max_tokens * 4`. When a
    /// memory's content exceeds the cap, it is truncated in place — this
    /// is distinct from the gist-substitution packer (C12), which works
    /// across the whole accepted set against a shared budget.
    pub max_tokens: Option<usize>,
    pub limit: usize,
}

impl Default for HydrationOptions {
    fn default() -> Self {
        Self {
            min_confidence: 0.0,
            fact_types: None,
            tags: None,
            tags_match: TagsMatch::Any,
            entity_names: None,
            scope: Scope::default(),
            scope_mode: ScopeMode::default(),
            max_tokens: None,
            limit: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HydratedMemory {
    pub memory: MemoryUnit,
    pub entities: Vec<Entity>,
}

fn truncate_to_tokens(memory: &mut MemoryUnit, max_tokens: usize) {
    let cap_chars = max_tokens.saturating_mul(4);
    if memory.content.chars().count() > cap_chars {
        memory.content = memory.content.chars().take(cap_chars).collect();
    }
}

/// Batch-load `ranked_ids` (preserving their order) and their linked
/// entities, then walk rank order applying `min_confidence`, `fact_types`,
/// the tag filter (§4.1), the entity-name filter, the scope filter (§4.8),
/// and the per-memory token cap, stopping once `options.limit` distinct
/// memories have been accepted (spec §4.9).
pub fn hydrate(storage: &Storage, bank_id: &str, ranked_ids: &[String], options: &HydrationOptions) -> Result<Vec<HydratedMemory>> {
    if ranked_ids.is_empty() {
        return Ok(Vec::new());
    }

    let rows = storage.get_memories_by_ids(bank_id, ranked_ids)?;
    let mut by_id: HashMap<String, MemoryUnit> = rows.into_iter().map(|m| (m.id.clone(), m)).collect();

    let junctions = storage.entity_links_for_memories(ranked_ids)?;
    let entity_ids: Vec<String> = {
        let mut seen = std::collections::HashSet::new();
        junctions
            .iter()
            .map(|(_, entity_id)| entity_id.clone())
            .filter(|id| seen.insert(id.clone()))
            .collect()
    };
    let entity_rows = storage.get_entities_by_ids(&entity_ids)?;
    let entities_by_id: HashMap<String, Entity> = entity_rows.into_iter().map(|e| (e.id.clone(), e)).collect();

    let mut entities_for_memory: HashMap<String, Vec<Entity>> = HashMap::new();
    for (memory_id, entity_id) in &junctions {
        if let Some(entity) = entities_by_id.get(entity_id) {
            entities_for_memory.entry(memory_id.clone()).or_default().push(entity.clone());
        }
    }

    let mut accepted = Vec::with_capacity(options.limit);
    for id in ranked_ids {
        if accepted.len() >= options.limit {
            break;
        }
        let Some(mut memory) = by_id.remove(id) else { continue };
        let entities = entities_for_memory.remove(id).unwrap_or_default();

        if memory.confidence < options.min_confidence {
            continue;
        }
        if let Some(types) = &options.fact_types {
            if !types.contains(&memory.fact_type) {
                continue;
            }
        }
        if let Some(filter_tags) = &options.tags {
            let memory_tags = memory.tags.clone().unwrap_or_default();
            if !matches_tags(&memory_tags, filter_tags, options.tags_match) {
                continue;
            }
        }
        if let Some(names) = &options.entity_names {
            if !names.is_empty() {
                let has_match = entities.iter().any(|e| names.iter().any(|n| n.eq_ignore_ascii_case(&e.name) || n.eq_ignore_ascii_case(&e.canonical_name)));
                if !has_match {
                    continue;
                }
            }
        }
        if !passes_scope(memory.scope_profile.as_deref(), memory.scope_project.as_deref(), &options.scope, options.scope_mode) {
            continue;
        }
        if let Some(max_tokens) = options.max_tokens {
            truncate_to_tokens(&mut memory, max_tokens);
        }

        accepted.push(HydratedMemory { memory, entities });
    }

    Ok(accepted)
}
