//! Token-budget packer (C12, spec §4.10): gist-first greedy packing of
//! the accepted, scored memory set against a shared token budget.
//!
//! The teacher has no token-budget concept (it returns full rows
//! unconditionally) — this is new engineering, greedy with a gist
//! fallback; see `DESIGN.md`.

use crate::hydration::HydratedMemory;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackedMode {
    Full,
    Gist,
}

#[derive(Debug, Clone)]
pub struct PackedMemory {
    pub memory_id: String,
    pub mode: PackedMode,
    pub tokens: usize,
}

#[derive(Debug, Clone)]
pub struct PackResult {
    pub packed: Vec<PackedMemory>,
    pub total_tokens_used: usize,
    pub budget_remaining: usize,
    pub overflow: bool,
}

fn approx_tokens(s: &str) -> usize {
    s.chars().count().div_ceil(4)
}

/// `candidates` must already be sorted by combined score DESC (the caller
/// owns ranking; this function only packs). Prefers full content; when
/// the remaining budget can't fit a candidate's full content, substitutes
/// its gist if that fits, otherwise skips it and keeps scanning
/// lower-scored candidates (spec §4.10).
pub fn pack(candidates: &[HydratedMemory], token_budget: usize) -> PackResult {
    let mut remaining = token_budget;
    let mut packed = Vec::with_capacity(candidates.len());
    let mut overflow = false;

    for candidate in candidates {
        let full_tokens = approx_tokens(&candidate.memory.content);
        if full_tokens <= remaining {
            remaining -= full_tokens;
            packed.push(PackedMemory {
                memory_id: candidate.memory.id.clone(),
                mode: PackedMode::Full,
                tokens: full_tokens,
            });
            continue;
        }

        let gist_tokens = candidate.memory.gist.as_deref().map(approx_tokens).unwrap_or(usize::MAX);
        if gist_tokens <= remaining {
            remaining -= gist_tokens;
            packed.push(PackedMemory {
                memory_id: candidate.memory.id.clone(),
                mode: PackedMode::Gist,
                tokens: gist_tokens,
            });
        } else {
            overflow = true;
        }
    }

    PackResult {
        total_tokens_used: token_budget - remaining,
        budget_remaining: remaining,
        overflow,
        packed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FactType, MemoryUnit};
    use chrono::Utc;

    fn hydrated(id: &str, content_chars: usize, gist_chars: Option<usize>) -> HydratedMemory {
        HydratedMemory {
            memory: MemoryUnit {
                id: id.to_string(),
                bank_id: "bank".into(),
                content: "x".repeat(content_chars),
                source_text: None,
                gist: gist_chars.map(|n| "g".repeat(n)),
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
            },
            entities: Vec::new(),
        }
    }

    #[test]
    fn prefers_full_content_when_it_fits() {
        let candidates = vec![hydrated("a", 40, Some(8))];
        let result = pack(&candidates, 20);
        assert_eq!(result.packed[0].mode, PackedMode::Full);
    }

    #[test]
    fn substitutes_gist_when_full_does_not_fit() {
        let candidates = vec![hydrated("a", 400, Some(8))];
        let result = pack(&candidates, 20);
        assert_eq!(result.packed[0].mode, PackedMode::Gist);
        assert_eq!(result.packed[0].tokens, 2);
    }

    #[test]
    fn skips_and_continues_when_neither_fits() {
        let candidates = vec![hydrated("a", 4000, None), hydrated("b", 4, None)];
        let result = pack(&candidates, 10);
        assert!(result.overflow);
        assert_eq!(result.packed.len(), 1);
        assert_eq!(result.packed[0].memory_id, "b");
    }

    #[test]
    fn reports_budget_remaining() {
        let candidates = vec![hydrated("a", 40, None)];
        let result = pack(&candidates, 100);
        assert_eq!(result.total_tokens_used, 10);
        assert_eq!(result.budget_remaining, 90);
        assert!(!result.overflow);
    }
}
