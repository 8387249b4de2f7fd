// tests/ledger_prune.rs
use finpost_bot::ledger::SeenLedger;

#[test]
fn seen_after_mark_then_expired_after_retention() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = SeenLedger::with_limits(dir.path().join("seen.json"), 7, 1000);

    let t0 = 1_000_000u64;
    ledger.mark_seen_at("story-a", t0);
    assert!(ledger.is_seen("story-a"));

    // Advance past max_age_days and prune.
    ledger.prune_at(t0 + 8 * 86_400);
    assert!(!ledger.is_seen("story-a"));
}

#[test]
fn size_never_exceeds_max_items() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = SeenLedger::with_limits(dir.path().join("seen.json"), 7, 10);

    let t0 = 1_000_000u64;
    for i in 0..50 {
        ledger.mark_seen_at(&format!("id-{i}"), t0 + i);
        assert!(ledger.len() <= 10, "cap violated at insert {i}");
    }
    // Oldest-seen entries were evicted first.
    assert!(!ledger.is_seen("id-0"));
    assert!(ledger.is_seen("id-49"));
}

#[test]
fn ledger_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("seen.json");
    {
        let ledger = SeenLedger::open(&path);
        ledger.mark_seen("persisted");
    }
    let reopened = SeenLedger::open(&path);
    assert!(reopened.is_seen("persisted"));
}

#[test]
fn missing_file_is_an_empty_ledger() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = SeenLedger::open(dir.path().join("nope.json"));
    assert!(ledger.is_empty());
}
