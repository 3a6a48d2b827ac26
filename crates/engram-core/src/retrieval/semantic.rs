//! Semantic strategy (spec §4.3.1): embed the query once, KNN search a
//! memory vector index. Score = `1 - cosine_distance`. No tag filter at
//! this stage — post-filtering happens during hydration.
//!
//! Bank isolation (spec §3) is enforced by the caller, not in here: the
//! engine façade keeps one `VectorIndex` per bank and passes in only the
//! index for the bank being recalled against, so this function never sees
//! another bank's vectors to accidentally leak.

use crate::embedding::VectorIndex;
use crate::error::Result;
use crate::retrieval::Candidate;
use crate::traits::Embedder;

pub fn semantic_search(
    index: &VectorIndex,
    embedder: &dyn Embedder,
    query: &str,
    limit: usize,
) -> Result<Vec<Candidate>> {
    if query.trim().is_empty() || index.is_empty() {
        return Ok(Vec::new());
    }
    let query_vec = embedder.embed(query)?;
    Ok(index
        .search(&query_vec, limit)
        .into_iter()
        .map(|(id, score)| Candidate { id, score, source: "semantic" })
        .collect())
}
