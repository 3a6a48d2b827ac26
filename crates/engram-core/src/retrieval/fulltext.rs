//! Fulltext strategy (spec §4.3.2): a BM25 query against the porter-stemmed
//! FTS index. Scores are normalized by taking the minimum (most negative)
//! BM25 rank in the result set and re-scaling to `[0,1]` where 1 = best.

use crate::error::Result;
use crate::retrieval::Candidate;
use crate::storage::Storage;

pub fn fulltext_search(storage: &Storage, bank_id: &str, query: &str, limit: usize) -> Result<Vec<Candidate>> {
    if query.trim().is_empty() {
        return Ok(Vec::new());
    }
    let hits = storage.fts_search(bank_id, query, limit)?;
    if hits.is_empty() {
        return Ok(Vec::new());
    }
    // SQLite's bm25() is more negative for a better match; the best rank in
    // the result set is therefore the minimum.
    let best = hits.iter().map(|(_, r)| *r).fold(f64::INFINITY, f64::min);
    Ok(hits
        .into_iter()
        .map(|(id, rank)| {
            let score = if best == 0.0 {
                1.0
            } else {
                ((-rank).max(0.0) / (-best).max(f64::EPSILON)) as f32
            };
            Candidate { id, score: score.clamp(0.0, 1.0), source: "fulltext" }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FactType, MemoryUnit};

    fn seed(storage: &Storage, bank_id: &str, content: &str) {
        let now = chrono::Utc::now();
        storage
            .insert_memory(&MemoryUnit {
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
                created_at: now,
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
    }

    #[test]
    fn empty_query_returns_no_candidates() {
        let storage = Storage::open_in_memory().unwrap();
        let bank = storage.create_bank("demo", None).unwrap();
        seed(&storage, &bank.id, "hello world");
        assert!(fulltext_search(&storage, &bank.id, "", 10).unwrap().is_empty());
    }

    #[test]
    fn scores_are_in_unit_range() {
        let storage = Storage::open_in_memory().unwrap();
        let bank = storage.create_bank("demo", None).unwrap();
        seed(&storage, &bank.id, "the quick brown fox jumps");
        seed(&storage, &bank.id, "a fox in the henhouse");
        let results = fulltext_search(&storage, &bank.id, "fox", 10).unwrap();
        assert_eq!(results.len(), 2);
        for c in &results {
            assert!(c.score >= 0.0 && c.score <= 1.0);
        }
    }
}
