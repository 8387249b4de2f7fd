// src/feeds/mod.rs
pub mod on_this_day;
pub mod rss;

use metrics::counter;
use once_cell::sync::OnceCell;
use regex::Regex;
use tracing::warn;

/// One story as fetched from a feed. Ephemeral: candidates live for a single
/// selection pass and are never persisted individually.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryCandidate {
    pub title: String,
    pub summary: String,
    /// May be empty; fingerprinting falls back to the title then.
    pub link: String,
    /// Unix seconds. Falls back to fetch time when the feed omits it.
    pub published_at: u64,
}

/// Normalize feed text: decode entities, strip tags, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").expect("tag regex"));
    out = re_tags.replace_all(&out, " ").to_string();

    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").expect("ws regex"));
    out = re_ws.replace_all(&out, " ").to_string();

    out.trim().to_string()
}

/// Items taken from the head of each feed per fetch.
pub const PER_SOURCE_CAP: usize = 5;

/// Fetch candidates for every source URL of a topic. Individual source
/// failures are logged and skipped; this never fails as a whole.
pub async fn collect_candidates(http: &reqwest::Client, sources: &[String]) -> Vec<StoryCandidate> {
    let mut out = Vec::new();
    for url in sources {
        match rss::fetch(http, url).await {
            Ok(items) => out.extend(items.into_iter().take(PER_SOURCE_CAP)),
            Err(e) => {
                warn!(error = ?e, source = %url, "feed fetch failed, skipping source");
                counter!("feed_fetch_errors_total").increment(1);
            }
        }
    }
    counter!("feed_candidates_total").increment(out.len() as u64);
    out
}
