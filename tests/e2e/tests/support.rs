//! Shared end-to-end test support: an in-memory `Engine` wired to
//! deterministic stub collaborators, so these tests exercise the real
//! cross-module pipeline (storage -> retrieval -> fusion -> scoring ->
//! boosts -> hydration -> packing -> write-through) without a network
//! call or model load.

#![allow(dead_code)]

use engram_core::config::EngineConfig;
use engram_core::model::FactType;
use engram_core::traits::ExtractedFact;
use engram_core::{Embedder, Engine, Extractor, Result, RetainOptions};

/// A word-overlap "embedding": one dimension per distinct token seen so
/// far, count-valued. Crude, but gives semantically-similar strings a
/// higher cosine similarity than unrelated ones, which is all these tests
/// need from the injected `Embedder` (spec §1 treats the real embedder as
/// an external collaborator).
pub struct WordBagEmbedder;

impl Embedder for WordBagEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        const DIM: usize = 256;
        let mut vector = vec![0f32; DIM];
        for token in text.to_lowercase().split_whitespace() {
            let mut hash: u32 = 2166136261;
            for b in token.bytes() {
                hash ^= b as u32;
                hash = hash.wrapping_mul(16777619);
            }
            vector[(hash as usize) % DIM] += 1.0;
        }
        Ok(vector)
    }
}

/// One fact per `retain` call, tagged with whatever the caller passed in
/// `RetainOptions`. Stands in for the out-of-scope LLM extractor.
pub struct SingleFactExtractor;

impl Extractor for SingleFactExtractor {
    fn extract(&self, content: &str) -> Result<Vec<ExtractedFact>> {
        Ok(vec![ExtractedFact {
            content: content.to_string(),
            fact_type: FactType::World,
            confidence: 0.9,
            occurred_start: None,
            occurred_end: None,
            mentioned_at: None,
            entities: Vec::new(),
            tags: Vec::new(),
            caused_by_indices: Vec::new(),
        }])
    }
}

pub fn build_engine() -> Engine {
    Engine::new_in_memory(
        EngineConfig::default(),
        Box::new(WordBagEmbedder),
        Box::new(SingleFactExtractor),
        None,
    )
    .expect("in-memory engine")
}

pub fn ingest(engine: &Engine, bank_id: &str, content: &str, tags: &[&str]) -> String {
    let options = RetainOptions {
        tags: if tags.is_empty() { None } else { Some(tags.iter().map(|t| t.to_string()).collect()) },
        scope: Default::default(),
    };
    let result = engine.retain(bank_id, content, &options).expect("retain");
    result.memories[0].id.clone()
}
