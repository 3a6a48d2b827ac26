//! Thin host library wiring `engram-core`'s injected collaborators
//! (`Embedder`, `Extractor`) to stand-ins the CLI can run without a real
//! model or LLM call — spec §1 marks both "out of scope: external
//! collaborators". These are demo implementations only, never the
//! production contract.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use engram_core::{EngineError, ExtractedFact, Extractor, Result};
use engram_core::model::FactType;

/// A deterministic, model-free stand-in for a real embedder: hashes
/// whitespace-separated tokens into a fixed-width bag-of-hashed-features
/// vector, L2-normalized. Good enough to exercise KNN search end-to-end;
/// not a semantic embedding.
pub struct HashEmbedder {
    dimensions: usize,
}

impl HashEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(64)
    }
}

impl engram_core::Embedder for HashEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0f32; self.dimensions];
        for token in text.split_whitespace().map(|t| t.to_lowercase()) {
            let mut hasher = DefaultHasher::new();
            token.hash(&mut hasher);
            let bucket = (hasher.finish() as usize) % self.dimensions;
            vector[bucket] += 1.0;
        }
        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in vector.iter_mut() {
                *x /= norm;
            }
        }
        Ok(vector)
    }
}

/// A single-fact extractor: treats the whole input as one `world` fact
/// with caller-supplied tags. Stands in for the LLM fact-extraction
/// collaborator spec §1 places out of scope — `retain` needs *an*
/// `Extractor` to call, this is the simplest one that satisfies the trait.
pub struct PassthroughExtractor {
    pub fact_type: FactType,
    pub confidence: f32,
}

impl Default for PassthroughExtractor {
    fn default() -> Self {
        Self {
            fact_type: FactType::World,
            confidence: 0.8,
        }
    }
}

impl Extractor for PassthroughExtractor {
    fn extract(&self, content: &str) -> Result<Vec<ExtractedFact>> {
        if content.trim().is_empty() {
            return Err(EngineError::InvariantViolation("cannot extract facts from empty content".into()));
        }
        Ok(vec![ExtractedFact {
            content: content.trim().to_string(),
            fact_type: self.fact_type,
            confidence: self.confidence,
            occurred_start: None,
            occurred_end: None,
            mentioned_at: None,
            entities: Vec::new(),
            tags: Vec::new(),
            caused_by_indices: Vec::new(),
        }])
    }
}
