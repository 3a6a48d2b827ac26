//! Spec §8.4 S5 — location boost promotion: 15 near-identical memories,
//! the tenth uniquely associated with `src/target/specific-file.ts`.
//! Before that association exists, a query naming the path ranks the
//! tenth memory outside the top 5 (nothing about its content sets it
//! apart). After `record_location` links it to the path, an identical
//! recall call must promote it into the top 5.

#[path = "support.rs"]
mod support;

use engram_core::RecallOptions;

const PATH: &str = "src/target/specific-file.ts";
const QUERY: &str = "What does src/target/specific-file.ts do?";

#[tokio::test]
async fn s5_location_boost_promotes_previously_excluded_memory() {
    let engine = support::build_engine();
    let bank = engine.create_bank("s5").unwrap();

    let mut ids = Vec::new();
    for n in 1..=15 {
        let id = support::ingest(
            &engine,
            &bank.id,
            &format!("Deployment pipeline step {n} handles queue processing"),
            &[],
        );
        ids.push(id);
    }
    let tenth = ids[9].clone();

    let options = RecallOptions {
        limit: 5,
        ..RecallOptions::default()
    };

    let baseline = engine.recall(&bank.id, QUERY, &options).await.unwrap();
    let baseline_ids: Vec<&str> = baseline.memories.iter().map(|m| m.id.as_str()).collect();
    assert!(
        !baseline_ids.contains(&tenth.as_str()),
        "tenth memory should not rank in the top 5 before any location association: {baseline_ids:?}"
    );

    engine
        .record_location(&bank.id, PATH, &tenth, Some("session-1"), None, None)
        .unwrap();

    let boosted = engine.recall(&bank.id, QUERY, &options).await.unwrap();
    let boosted_ids: Vec<&str> = boosted.memories.iter().map(|m| m.id.as_str()).collect();
    assert!(
        boosted_ids.contains(&tenth.as_str()),
        "tenth memory should be promoted into the top 5 once associated with the mentioned path: {boosted_ids:?}"
    );
}
