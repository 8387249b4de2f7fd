//! Story identity: URL canonicalization and deterministic fingerprints.
//!
//! Two copies of the same story routinely arrive with different tracking
//! query strings or without a link at all; everything downstream (the seen
//! ledger, anti-repeat selection) keys off the fingerprint computed here.

use once_cell::sync::OnceCell;
use regex::Regex;
use sha2::{Digest, Sha256};

/// Query parameter keys dropped during canonicalization (case-insensitive
/// prefix match).
const TRACKING_PREFIXES: &[&str] = &["utm_", "fbclid", "gclid", "yclid", "ref", "_openstat"];

fn is_tracking_param(key: &str) -> bool {
    let k = key.to_ascii_lowercase();
    TRACKING_PREFIXES.iter().any(|p| k.starts_with(p))
}

/// Canonical form of a story link: fragment stripped, scheme and host
/// lowercased, non-tracking query params re-serialized in sorted order.
/// Returns an empty string for an empty/blank input.
pub fn canonicalize(link: &str) -> String {
    let link = link.trim();
    if link.is_empty() {
        return String::new();
    }

    // Fragment never identifies a distinct story.
    let link = link.split('#').next().unwrap_or(link);

    let (head, query) = match link.split_once('?') {
        Some((h, q)) => (h, Some(q)),
        None => (link, None),
    };

    // scheme://host/path — lowercase scheme+host, keep path as-is.
    let head = match head.split_once("://") {
        Some((scheme, rest)) => {
            let (host, path) = match rest.split_once('/') {
                Some((h, p)) => (h, format!("/{p}")),
                None => (rest, String::new()),
            };
            format!(
                "{}://{}{}",
                scheme.to_ascii_lowercase(),
                host.to_ascii_lowercase(),
                path
            )
        }
        None => head.to_string(),
    };

    let mut params: Vec<&str> = query
        .unwrap_or_default()
        .split('&')
        .filter(|p| !p.is_empty())
        .filter(|p| {
            let key = p.split('=').next().unwrap_or(p);
            !is_tracking_param(key)
        })
        .collect();
    params.sort_unstable();

    // Trailing slash on a bare path is not significant.
    let head = head.trim_end_matches('/').to_string();

    if params.is_empty() {
        head
    } else {
        format!("{}?{}", head, params.join("&"))
    }
}

/// Title normalization for link-less stories: lowercase, collapsed
/// whitespace, punctuation stripped outside letters/digits.
pub fn normalize_title(title: &str) -> String {
    static RE_JUNK: OnceCell<Regex> = OnceCell::new();
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_junk = RE_JUNK.get_or_init(|| Regex::new(r"[^\p{L}\p{N}\s]").expect("junk regex"));
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").expect("ws regex"));

    let lowered = title.to_lowercase();
    let stripped = re_junk.replace_all(&lowered, "");
    re_ws.replace_all(stripped.trim(), " ").to_string()
}

/// Deterministic short identifier for a story. Prefers the canonical link;
/// falls back to the normalized title. Collision-tolerant by contract: the
/// ledger only needs "same story" equality, not cryptographic uniqueness.
pub fn fingerprint(title: &str, link: &str) -> String {
    let canon = canonicalize(link);
    let basis = if canon.is_empty() {
        normalize_title(title)
    } else {
        canon
    };
    let digest = Sha256::digest(basis.as_bytes());
    // 8 bytes of the digest is plenty for a 1000-entry ledger.
    digest[..8].iter().map(|b| format!("{b:02x}")).collect()
}
