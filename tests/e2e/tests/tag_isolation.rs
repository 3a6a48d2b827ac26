//! Spec §8.4 S1 — tag isolation: recall with `tags=["user-a"],
//! tags_match=any_strict` against a bank holding a `user-a`-tagged memory,
//! a `user-b`-tagged memory, and an untagged memory must return only the
//! `user-a` memory.

#[path = "support.rs"]
mod support;

use engram_core::tags::TagsMatch;
use engram_core::RecallOptions;

#[tokio::test]
async fn s1_tag_isolation_returns_only_matching_memory() {
    let engine = support::build_engine();
    let bank = engine.create_bank("s1").unwrap();

    let a_id = support::ingest(&engine, &bank.id, "alpha project kickoff notes", &["user-a"]);
    support::ingest(&engine, &bank.id, "beta project kickoff notes", &["user-b"]);
    support::ingest(&engine, &bank.id, "general kickoff notes", &[]);

    let options = RecallOptions {
        tags: Some(vec!["user-a".to_string()]),
        tags_match: TagsMatch::AnyStrict,
        limit: 10,
        ..RecallOptions::default()
    };

    let result = engine.recall(&bank.id, "kickoff notes", &options).await.unwrap();

    assert_eq!(result.memories.len(), 1);
    assert_eq!(result.memories[0].id, a_id);
    for memory in &result.memories {
        let tags = memory.tags.clone().unwrap_or_default();
        assert!(!tags.is_empty());
        assert!(tags.contains(&"user-a".to_string()));
    }
}

#[tokio::test]
async fn any_strict_excludes_untagged_even_with_empty_filter_semantics_elsewhere() {
    let engine = support::build_engine();
    let bank = engine.create_bank("s1b").unwrap();
    support::ingest(&engine, &bank.id, "untagged memory about rivers", &[]);

    let options = RecallOptions {
        tags: Some(vec!["user-a".to_string()]),
        tags_match: TagsMatch::AnyStrict,
        limit: 10,
        ..RecallOptions::default()
    };
    let result = engine.recall(&bank.id, "rivers", &options).await.unwrap();
    assert!(result.memories.is_empty());
}
