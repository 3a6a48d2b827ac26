//! Graph strategy (spec §4.3.3): typed meta-path forward push, the form
//! chosen as canonical over the alternative link-expansion-with-fact-type
//! rules implementation (spec §9, "Ambiguities" — only one graph
//! implementation ships, see `DESIGN.md`).
//!
//! Grounded in the batched-fetch style of the teacher's
//! `Storage::get_memory_subgraph` depth-bounded BFS: an edge cache records,
//! per `(link_type, node)`, the set of edges touching that node and a
//! "fully loaded" flag, so the walker only queries the database for nodes
//! it hasn't already pulled.

use std::collections::{HashMap, HashSet};

use crate::config::{Direction, EngineConfig};
use crate::error::Result;
use crate::model::LinkType;
use crate::retrieval::Candidate;
use crate::storage::Storage;

struct EdgeCache<'a> {
    storage: &'a Storage,
    batch_size: usize,
    causal_weight_threshold: f32,
    loaded: HashSet<(LinkType, String)>,
    // node -> (neighbor, weight, is_outbound_from_node)
    edges: HashMap<(LinkType, String), Vec<(String, f32, bool)>>,
}

impl<'a> EdgeCache<'a> {
    fn new(storage: &'a Storage, batch_size: usize, causal_weight_threshold: f32) -> Self {
        Self {
            storage,
            batch_size,
            causal_weight_threshold,
            loaded: HashSet::new(),
            edges: HashMap::new(),
        }
    }

    /// Ensure every node in `frontier` has its `link_type` edges loaded,
    /// fetching only the nodes not yet marked fully loaded.
    fn ensure_loaded(&mut self, link_type: LinkType, frontier: &[String]) -> Result<()> {
        let to_fetch: Vec<String> = frontier
            .iter()
            .filter(|id| !self.loaded.contains(&(link_type, (*id).clone())))
            .cloned()
            .collect();
        if to_fetch.is_empty() {
            return Ok(());
        }
        let min_weight = link_type.is_causal().then_some(self.causal_weight_threshold);
        let fetched = self.storage.edges_for_frontier(link_type, &to_fetch, self.batch_size, min_weight)?;
        for (source, target, weight) in fetched {
            self.edges
                .entry((link_type, source.clone()))
                .or_default()
                .push((target.clone(), weight, true));
            self.edges
                .entry((link_type, target))
                .or_default()
                .push((source, weight, false));
        }
        for id in to_fetch {
            self.loaded.insert((link_type, id));
        }
        Ok(())
    }

    /// Neighbors of `node` reachable via one step of `direction` over
    /// `link_type`, already loaded by a prior [`EdgeCache::ensure_loaded`].
    fn neighbors(&self, link_type: LinkType, node: &str, direction: Direction) -> Vec<(String, f32)> {
        self.edges
            .get(&(link_type, node.to_string()))
            .map(|edges| {
                edges
                    .iter()
                    .filter(|(_, _, outbound)| match direction {
                        Direction::Forward => *outbound,
                        Direction::Backward => !*outbound,
                        Direction::Both => true,
                    })
                    .map(|(neighbor, weight, _)| (neighbor.clone(), *weight))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Walk one meta-path from `seeds`, returning `node -> path score` (spec
/// §4.3.3 step 2: `new_score = frontier_score * edge_weight * step_decay`,
/// max across multiple routes to the same neighbor within this path).
fn walk_meta_path(
    cache: &mut EdgeCache,
    seeds: &HashMap<String, f32>,
    path: &crate::config::MetaPath,
) -> Result<HashMap<String, f32>> {
    let mut frontier = seeds.clone();
    for step in &path.steps {
        let Some(link_type) = LinkType::parse(&step.link_type) else {
            continue;
        };
        let frontier_ids: Vec<String> = frontier.keys().cloned().collect();
        cache.ensure_loaded(link_type, &frontier_ids)?;

        let mut next: HashMap<String, f32> = HashMap::new();
        for (node, score) in &frontier {
            for (neighbor, weight) in cache.neighbors(link_type, node, step.direction) {
                let propagated = score * weight * step.decay;
                let entry = next.entry(neighbor).or_insert(0.0);
                if propagated > *entry {
                    *entry = propagated;
                }
            }
        }
        frontier = next;
        if frontier.is_empty() {
            break;
        }
    }
    Ok(frontier)
}

/// `(bank_id, query, candidate_limit)` graph retrieval. `temporal_seeds`, if
/// non-empty, are merged into the initial frontier per spec §4.3.3 step 1's
/// alternative seeding path (a caller-supplied temporal seed set).
pub fn graph_search(
    storage: &Storage,
    config: &EngineConfig,
    bank_id: &str,
    query: &str,
    temporal_seeds: &[String],
    limit: usize,
) -> Result<Vec<Candidate>> {
    let entities = storage.find_entities_in_query(bank_id, query, config.entity_frequency_threshold)?;

    let mut seeds: HashMap<String, f32> = HashMap::new();
    for entity in &entities {
        for memory_id in storage.memories_for_entity(&entity.id)? {
            seeds.insert(memory_id, 1.0);
        }
    }
    for id in temporal_seeds {
        seeds.entry(id.clone()).or_insert(1.0);
    }
    if seeds.is_empty() {
        return Ok(Vec::new());
    }

    let mut cache = EdgeCache::new(storage, config.graph_batch_size, config.causal_weight_threshold);
    let mut aggregate: HashMap<String, f32> = HashMap::new();
    for (id, score) in &seeds {
        aggregate.insert(id.clone(), *score);
    }

    for path in &config.meta_paths {
        let path_scores = walk_meta_path(&mut cache, &seeds, path)?;
        for (node, score) in path_scores {
            *aggregate.entry(node).or_insert(0.0) += score * path.weight;
        }
    }

    let max_score = aggregate.values().cloned().fold(0.0_f32, f32::max);
    let mut results: Vec<Candidate> = aggregate
        .into_iter()
        .map(|(id, score)| Candidate {
            id,
            score: if max_score > 0.0 { score / max_score } else { 0.0 },
            source: "graph",
        })
        .collect();
    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal).then(a.id.cmp(&b.id)));
    results.truncate(limit);
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FactType, MemoryLink, MemoryUnit};
    use chrono::Utc;

    fn seed_memory(storage: &Storage, bank_id: &str, content: &str) -> String {
        let id = crate::model::new_id();
        storage
            .insert_memory(&MemoryUnit {
                id: id.clone(),
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
            })
            .unwrap();
        id
    }

    #[test]
    fn no_matching_entity_yields_empty() {
        let storage = Storage::open_in_memory().unwrap();
        let bank = storage.create_bank("demo", None).unwrap();
        let config = EngineConfig::default();
        let results = graph_search(&storage, &config, &bank.id, "nothing matches", &[], 10).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn entity_seed_propagates_through_causal_edge() {
        let storage = Storage::open_in_memory().unwrap();
        let bank = storage.create_bank("demo", None).unwrap();
        let a = seed_memory(&storage, &bank.id, "alpha");
        let b = seed_memory(&storage, &bank.id, "beta");
        let entity = storage.upsert_entity(&bank.id, "rust", "topic").unwrap();
        storage.link_memory_entity(&a, &entity.id).unwrap();
        storage
            .insert_link(&MemoryLink {
                id: crate::model::new_id(),
                bank_id: bank.id.clone(),
                source_id: a.clone(),
                target_id: b.clone(),
                link_type: crate::model::LinkType::Causes,
                weight: 1.0,
                created_at: Utc::now(),
            })
            .unwrap();
        let config = EngineConfig::default();
        let results = graph_search(&storage, &config, &bank.id, "tell me about rust", &[], 10).unwrap();
        let ids: Vec<&str> = results.iter().map(|c| c.id.as_str()).collect();
        assert!(ids.contains(&a.as_str()));
    }
}
