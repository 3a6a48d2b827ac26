//! Temporal strategy (spec §4.3.4): memories whose event window overlaps
//! `[from, to]`, scored by anchor instant normalized against the min/max
//! anchor in the result set, ordered by anchor DESC.

use crate::error::Result;
use crate::retrieval::Candidate;
use crate::storage::Storage;

pub fn temporal_search(storage: &Storage, bank_id: &str, from: i64, to: i64, limit: usize) -> Result<Vec<Candidate>> {
    let mut rows = storage.temporal_candidates(bank_id, from, to)?;
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    rows.sort_by(|a, b| b.anchor().cmp(&a.anchor()).then(a.id.cmp(&b.id)));
    rows.truncate(limit);

    let anchors: Vec<i64> = rows.iter().map(|m| m.anchor().timestamp_millis()).collect();
    let min_anchor = *anchors.iter().min().unwrap();
    let max_anchor = *anchors.iter().max().unwrap();
    let span = (max_anchor - min_anchor) as f32;

    Ok(rows
        .into_iter()
        .map(|m| {
            let anchor = m.anchor().timestamp_millis();
            let score = if span == 0.0 {
                1.0
            } else {
                (anchor - min_anchor) as f32 / span
            };
            Candidate { id: m.id, score, source: "temporal" }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FactType, MemoryUnit};
    use chrono::{Duration, Utc};

    fn seed(storage: &Storage, bank_id: &str, occurred: chrono::DateTime<Utc>) -> String {
        let id = crate::model::new_id();
        storage
            .insert_memory(&MemoryUnit {
                id: id.clone(),
                bank_id: bank_id.to_string(),
                content: "x".into(),
                source_text: None,
                gist: None,
                fact_type: FactType::World,
                confidence: 1.0,
                occurred_start: Some(occurred),
                occurred_end: Some(occurred),
                mentioned_at: None,
                event_date: None,
                created_at: occurred,
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
    fn memories_with_no_anchor_are_excluded() {
        let storage = Storage::open_in_memory().unwrap();
        let bank = storage.create_bank("demo", None).unwrap();
        let now = Utc::now();
        storage
            .insert_memory(&MemoryUnit {
                id: crate::model::new_id(),
                bank_id: bank.id.clone(),
                content: "no anchor".into(),
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
        let results = temporal_search(&storage, &bank.id, 0, now.timestamp_millis() + 1, 10).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn most_recent_anchor_scores_highest() {
        let storage = Storage::open_in_memory().unwrap();
        let bank = storage.create_bank("demo", None).unwrap();
        let base = Utc::now() - Duration::days(10);
        let older = seed(&storage, &bank.id, base);
        let newer = seed(&storage, &bank.id, base + Duration::days(5));
        let from = (base - Duration::days(1)).timestamp_millis();
        let to = (base + Duration::days(6)).timestamp_millis();
        let results = temporal_search(&storage, &bank.id, from, to, 10).unwrap();
        assert_eq!(results[0].id, newer);
        assert_eq!(results[1].id, older);
        assert!(results[0].score > results[1].score);
    }
}
