//! Ingestion (`retain`, spec §6.1): turn raw content into persisted
//! memories, entities, and within-batch causal links, using the external
//! [`Extractor`] collaborator for the actual fact extraction.
//!
//! Grounded in the teacher's `memory::ingest` persistence shape (insert
//! row, upsert entities, link) — generalized to the spec's tagged
//! `FactType` union and `caused_by_indices` back-references instead of
//! the teacher's single flat fact shape.

use std::collections::HashMap;

use chrono::Utc;

use crate::embedding::VectorIndex;
use crate::error::Result;
use crate::model::{Entity, LinkType, MemoryLink, MemoryUnit, Scope};
use crate::traits::{Embedder, Extractor};

#[derive(Debug, Clone, Default)]
pub struct RetainOptions {
    pub tags: Option<Vec<String>>,
    pub scope: Scope,
}

#[derive(Debug, Clone)]
pub struct RetainResult {
    pub memories: Vec<MemoryUnit>,
    pub entities: Vec<Entity>,
    pub links: Vec<MemoryLink>,
}

pub fn retain(
    storage: &crate::storage::Storage,
    vector_index: &mut VectorIndex,
    embedder: &dyn Embedder,
    extractor: &dyn Extractor,
    bank_id: &str,
    content: &str,
    options: &RetainOptions,
) -> Result<RetainResult> {
    let facts = extractor.extract(content)?;
    let now = Utc::now();

    let mut memories: Vec<MemoryUnit> = Vec::with_capacity(facts.len());
    let mut entities_by_id: HashMap<String, Entity> = HashMap::new();
    let mut links: Vec<MemoryLink> = Vec::new();

    for fact in &facts {
        let tags = if fact.tags.is_empty() { options.tags.clone() } else { Some(fact.tags.clone()) };
        let memory = MemoryUnit {
            id: crate::model::new_id(),
            bank_id: bank_id.to_string(),
            content: fact.content.clone(),
            source_text: Some(content.to_string()),
            gist: None,
            fact_type: fact.fact_type,
            confidence: fact.confidence,
            occurred_start: fact.occurred_start,
            occurred_end: fact.occurred_end,
            mentioned_at: fact.mentioned_at,
            event_date: None,
            created_at: now,
            access_count: 0,
            last_accessed: None,
            encoding_strength: 1.0,
            tags,
            document_id: None,
            chunk_id: None,
            source_memory_ids: None,
            scope_profile: options.scope.profile.clone(),
            scope_project: options.scope.project.clone(),
        };
        storage.insert_memory(&memory)?;

        let embedding = embedder.embed(&memory.content)?;
        storage.store_embedding("memory", &memory.id, &embedding)?;
        vector_index.add(&memory.id, &embedding).ok();

        for entity_name in &fact.entities {
            let entity = storage.upsert_entity(bank_id, entity_name, "unknown")?;
            storage.link_memory_entity(&memory.id, &entity.id)?;
            entities_by_id.insert(entity.id.clone(), entity);
        }

        for &target_index in &fact.caused_by_indices {
            if let Some(target) = memories.get(target_index) {
                let link = MemoryLink {
                    id: crate::model::new_id(),
                    bank_id: bank_id.to_string(),
                    source_id: memory.id.clone(),
                    target_id: target.id.clone(),
                    link_type: LinkType::CausedBy,
                    weight: fact.confidence,
                    created_at: now,
                };
                storage.insert_link(&link)?;
                links.push(link);
            }
        }

        memories.push(memory);
    }

    Ok(RetainResult {
        memories,
        entities: entities_by_id.into_values().collect(),
        links,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FactType;
    use crate::traits::ExtractedFact;

    struct StubEmbedder;
    impl Embedder for StubEmbedder {
        fn embed(&self, text: &str) -> Result<Vec<f32>> {
            Ok(vec![text.len() as f32, 1.0])
        }
    }

    struct StubExtractor;
    impl Extractor for StubExtractor {
        fn extract(&self, _content: &str) -> Result<Vec<ExtractedFact>> {
            Ok(vec![
                ExtractedFact {
                    content: "first fact".into(),
                    fact_type: FactType::Observation,
                    confidence: 0.9,
                    occurred_start: None,
                    occurred_end: None,
                    mentioned_at: None,
                    entities: vec!["rust".into()],
                    tags: vec![],
                    caused_by_indices: vec![],
                },
                ExtractedFact {
                    content: "second fact, caused by the first".into(),
                    fact_type: FactType::Observation,
                    confidence: 0.9,
                    occurred_start: None,
                    occurred_end: None,
                    mentioned_at: None,
                    entities: vec![],
                    tags: vec![],
                    caused_by_indices: vec![0],
                },
            ])
        }
    }

    #[test]
    fn within_batch_causal_link_references_already_persisted_memory() {
        let storage = crate::storage::Storage::open_in_memory().unwrap();
        let bank = storage.create_bank("demo", None).unwrap();
        let mut index = VectorIndex::new();
        let result = retain(&storage, &mut index, &StubEmbedder, &StubExtractor, &bank.id, "raw text", &RetainOptions::default()).unwrap();
        assert_eq!(result.memories.len(), 2);
        assert_eq!(result.links.len(), 1);
        assert_eq!(result.links[0].target_id, result.memories[0].id);
        assert_eq!(result.entities.len(), 1);
    }
}
