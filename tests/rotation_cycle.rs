// tests/rotation_cycle.rs
use finpost_bot::rotation::{RotationKind, RotationStore};

#[test]
fn sixteen_calls_cover_every_index_then_wrap() {
    let dir = tempfile::tempdir().unwrap();
    let store = RotationStore::open(dir.path().join("rotation.json"));

    let seen: Vec<usize> = (0..16)
        .map(|_| store.next_index(RotationKind::Rubric, 16))
        .collect();
    assert_eq!(seen, (0..16).collect::<Vec<_>>());
    assert_eq!(store.next_index(RotationKind::Rubric, 16), 0);
}

#[test]
fn rotation_position_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rotation.json");
    {
        let store = RotationStore::open(&path);
        assert_eq!(store.next_index(RotationKind::News, 3), 0);
        assert_eq!(store.next_index(RotationKind::News, 3), 1);
    }
    let reopened = RotationStore::open(&path);
    assert_eq!(reopened.next_index(RotationKind::News, 3), 2);
    assert_eq!(reopened.next_index(RotationKind::News, 3), 0);
}

#[test]
fn corrupt_state_defaults_to_zero() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rotation.json");
    std::fs::write(&path, "{{{not json").unwrap();
    let store = RotationStore::open(&path);
    assert_eq!(store.next_index(RotationKind::Rubric, 16), 0);
    assert_eq!(store.next_index(RotationKind::News, 3), 0);
}
