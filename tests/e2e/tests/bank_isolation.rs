//! Spec §3 bank isolation: two banks sharing one `Engine`/`Storage`, each
//! holding content that word-overlap-embeds near the other's query. A
//! `recall(bank_id=A, ...)` call must never surface bank B's memories
//! through the semantic channel (or any other channel).

#[path = "support.rs"]
mod support;

use engram_core::RecallOptions;

#[tokio::test]
async fn recall_never_crosses_bank_boundaries() {
    let engine = support::build_engine();
    let bank_a = engine.create_bank("isolation-a").unwrap();
    let bank_b = engine.create_bank("isolation-b").unwrap();

    let a_id = support::ingest(&engine, &bank_a.id, "submarine reactor coolant pressure log", &[]);
    let b_id = support::ingest(&engine, &bank_b.id, "submarine reactor coolant pressure log", &[]);

    let options = RecallOptions {
        limit: 10,
        ..RecallOptions::default()
    };

    let from_a = engine.recall(&bank_a.id, "submarine reactor coolant pressure", &options).await.unwrap();
    let ids_a: Vec<&str> = from_a.memories.iter().map(|m| m.id.as_str()).collect();
    assert!(ids_a.contains(&a_id.as_str()));
    assert!(!ids_a.contains(&b_id.as_str()), "bank A recall leaked bank B's memory: {ids_a:?}");

    let from_b = engine.recall(&bank_b.id, "submarine reactor coolant pressure", &options).await.unwrap();
    let ids_b: Vec<&str> = from_b.memories.iter().map(|m| m.id.as_str()).collect();
    assert!(ids_b.contains(&b_id.as_str()));
    assert!(!ids_b.contains(&a_id.as_str()), "bank B recall leaked bank A's memory: {ids_b:?}");
}

#[tokio::test]
async fn empty_bank_recall_is_unaffected_by_a_populated_sibling() {
    let engine = support::build_engine();
    let populated = engine.create_bank("isolation-populated").unwrap();
    let empty = engine.create_bank("isolation-empty").unwrap();

    support::ingest(&engine, &populated.id, "lighthouse keeper logbook entry", &[]);

    let options = RecallOptions {
        limit: 10,
        ..RecallOptions::default()
    };
    let result = engine.recall(&empty.id, "lighthouse keeper logbook", &options).await.unwrap();
    assert!(result.memories.is_empty());
}
