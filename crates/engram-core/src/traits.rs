//! Injected collaborators the retrieval core treats as external (spec §1):
//! embedding generation, LLM fact-extraction, and cross-encoder reranking.
//! None of these are implemented against a real model here — callers supply
//! an implementation (or a test double).

use crate::error::Result;
use crate::model::FactType;

/// `embed(text) -> vector`. Implementations must be deterministic for a
/// fixed model/version so recall stays reproducible (spec §5).
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// A single fact the external extractor produced. The engine's contract is
/// only on this post-parse schema (spec §9, "Dynamic extraction results") —
/// an unknown `fact_type` is rejected at parse time by [`FactType::parse`],
/// never guessed at.
#[derive(Debug, Clone)]
pub struct ExtractedFact {
    pub content: String,
    pub fact_type: FactType,
    pub confidence: f32,
    pub occurred_start: Option<chrono::DateTime<chrono::Utc>>,
    pub occurred_end: Option<chrono::DateTime<chrono::Utc>>,
    pub mentioned_at: Option<chrono::DateTime<chrono::Utc>>,
    pub entities: Vec<String>,
    pub tags: Vec<String>,
    /// Within-batch causal back-references: indices into the same
    /// extraction batch this fact was `caused_by` (spec §3: "within-batch
    /// `caused_by` links have `target_index < current_index`").
    pub caused_by_indices: Vec<usize>,
}

/// LLM fact-extraction (prompt engineering, JSON contracts) — out of scope;
/// modeled as an injected trait.
pub trait Extractor: Send + Sync {
    fn extract(&self, content: &str) -> Result<Vec<ExtractedFact>>;
}

/// `rerank(query, docs) -> scores`. A length mismatch between `docs` and
/// the returned scores is a fatal invariant violation (spec §4.5.3), raised
/// by the caller after invoking this trait, not by the trait itself.
pub trait Reranker: Send + Sync {
    fn rerank(&self, query: &str, docs: &[String]) -> Result<Vec<f32>>;
}
