// tests/fingerprint_canonical.rs
use finpost_bot::fingerprint::{canonicalize, fingerprint};

#[test]
fn tracking_params_and_fragment_do_not_matter() {
    let variants = [
        "https://example.com/a/b?id=1",
        "https://example.com/a/b?id=1&utm_source=tg",
        "https://example.com/a/b?utm_campaign=x&id=1&fbclid=abc",
        "https://EXAMPLE.com/a/b?id=1#section-2",
        "https://example.com/a/b?gclid=z&id=1&yclid=9",
    ];
    let canon = canonicalize(variants[0]);
    for v in &variants[1..] {
        assert_eq!(canonicalize(v), canon, "diverged for {v}");
    }
}

#[test]
fn param_order_is_normalized() {
    assert_eq!(
        canonicalize("https://a.ru/p?z=1&a=2"),
        canonicalize("https://a.ru/p?a=2&z=1")
    );
}

#[test]
fn fingerprint_is_deterministic() {
    for _ in 0..10 {
        assert_eq!(
            fingerprint("ЦБ снизил ставку", "https://a.ru/x?utm_source=y"),
            fingerprint("ЦБ снизил ставку", "https://a.ru/x")
        );
    }
}

#[test]
fn titles_differing_only_in_punctuation_collide() {
    assert_eq!(
        fingerprint("Рынок вырос!", ""),
        fingerprint("рынок  вырос", "")
    );
}

#[test]
fn different_stories_get_different_fingerprints() {
    assert_ne!(
        fingerprint("BTC hits new high", "https://a.ru/btc"),
        fingerprint("ETH hits new high", "https://a.ru/eth")
    );
}
