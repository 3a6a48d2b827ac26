//! Spec §8.3 boundary behaviors exercised at the `Engine::recall` level:
//! an empty query with no temporal signal, `limit = 0`, and a token
//! budget too small for even the smallest candidate's gist.

#[path = "support.rs"]
mod support;

use engram_core::RecallOptions;

#[tokio::test]
async fn empty_query_with_no_temporal_signal_does_not_error() {
    let engine = support::build_engine();
    let bank = engine.create_bank("boundary-empty-query").unwrap();
    support::ingest(&engine, &bank.id, "a memory with no bearing on the query", &[]);

    let options = RecallOptions {
        limit: 10,
        ..RecallOptions::default()
    };
    let result = engine.recall(&bank.id, "", &options).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn zero_limit_returns_no_memories_and_skips_write_through() {
    let engine = support::build_engine();
    let bank = engine.create_bank("boundary-zero-limit").unwrap();
    let id = support::ingest(&engine, &bank.id, "a memory that should not be selected", &[]);

    let options = RecallOptions {
        limit: 0,
        ..RecallOptions::default()
    };
    let result = engine.recall(&bank.id, "memory", &options).await.unwrap();
    assert!(result.memories.is_empty());

    // Confirm write-through really was skipped: a follow-up recall with a
    // normal limit should still show the memory untouched.
    let follow_up = engine
        .recall(&bank.id, "memory", &RecallOptions { limit: 10, ..RecallOptions::default() })
        .await
        .unwrap();
    let memory = follow_up.memories.iter().find(|m| m.id == id).unwrap();
    assert_eq!(memory.access_count, 0);
}

#[tokio::test]
async fn token_budget_smaller_than_the_smallest_gist_overflows_with_nothing_packed() {
    let engine = support::build_engine();
    let bank = engine.create_bank("boundary-tiny-budget").unwrap();
    support::ingest(
        &engine,
        &bank.id,
        "this memory's content is comfortably longer than a one token budget could ever hold",
        &[],
    );

    let options = RecallOptions {
        limit: 10,
        token_budget: Some(1),
        ..RecallOptions::default()
    };
    let result = engine.recall(&bank.id, "memory content budget", &options).await.unwrap();

    assert!(result.memories.is_empty());
    let pack = result.pack.expect("packing was requested");
    assert!(pack.overflow);
    assert!(pack.packed.is_empty());
}
