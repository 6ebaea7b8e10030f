// tests/ledger_dedup.rs
//
// Dedup properties across ledger reloads.

use news_herald::ingest::types::Candidate;
use news_herald::ledger::{title_key, Ledger};

fn cand(id: &str, title: &str) -> Candidate {
    Candidate::new(id, title, format!("https://src.test/{id}"))
}

#[test]
fn idempotent_ingestion() {
    let dir = tempfile::tempdir().unwrap();
    let mut ledger = Ledger::open(dir.path().join("seen.json"));
    let c = cand("bn-1", "Binance Will List FooCoin (FOO)");

    assert_eq!(ledger.filter_new(vec![c.clone()]), vec![c.clone()]);

    ledger.mark_seen(&[c.clone()]);
    assert!(ledger.filter_new(vec![c.clone(), c]).is_empty());
}

#[test]
fn same_event_from_two_sources_is_seen_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("seen.json");
    let mut ledger = Ledger::open(&path);

    let from_api = cand("binance-991", "Binance Will List FooCoin (FOO)!");
    let from_rss = cand("rss-4f1a9c0d2e3b4a5c", "binance will list foocoin foo");
    assert_eq!(title_key(&from_api.title), title_key(&from_rss.title));

    ledger.mark_seen(&[from_api]);

    // Survives a restart.
    let reopened = Ledger::open(&path);
    assert!(reopened.filter_new(vec![from_rss]).is_empty());
}

#[test]
fn filter_keeps_input_order_of_new_candidates() {
    let dir = tempfile::tempdir().unwrap();
    let mut ledger = Ledger::open(dir.path().join("seen.json"));
    ledger.mark_seen(&[cand("b", "Second headline")]);

    let out = ledger.filter_new(vec![
        cand("c", "Third headline"),
        cand("b", "Second headline"),
        cand("a", "First headline"),
    ]);
    let ids: Vec<&str> = out.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["c", "a"]);
}

#[test]
fn unwritable_path_keeps_in_memory_state() {
    let dir = tempfile::tempdir().unwrap();
    // A directory where the file should be makes every save fail.
    let path = dir.path().join("seen.json");
    std::fs::create_dir(&path).unwrap();

    let mut ledger = Ledger::open(&path);
    let c = cand("bn-7", "Maintenance notice");
    ledger.mark_seen(&[c.clone()]);

    assert!(!ledger.is_new(&c));
    assert_eq!(ledger.stats().total_processed, 1);
}
