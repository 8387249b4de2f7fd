// src/feeds/on_this_day.rs
//! "This day in history" source: Wikimedia on-this-day feed, queried in
//! Russian first with an English fallback.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use tracing::warn;

const LANGS: &[&str] = &["ru", "en"];

#[derive(Debug, Clone)]
pub struct HistoryEvent {
    pub year: i32,
    pub text: String,
    pub extract: Option<String>,
    pub link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Feed {
    #[serde(default)]
    events: Vec<RawEvent>,
}
#[derive(Debug, Deserialize)]
struct RawEvent {
    year: Option<i32>,
    text: String,
    #[serde(default)]
    pages: Vec<Page>,
}
#[derive(Debug, Deserialize)]
struct Page {
    extract: Option<String>,
    content_urls: Option<ContentUrls>,
}
#[derive(Debug, Deserialize)]
struct ContentUrls {
    desktop: Option<DesktopUrls>,
}
#[derive(Debug, Deserialize)]
struct DesktopUrls {
    page: Option<String>,
}

async fn fetch_lang(
    http: &reqwest::Client,
    lang: &str,
    month: u32,
    day: u32,
) -> Result<Vec<HistoryEvent>> {
    let url = format!(
        "https://api.wikimedia.org/feed/v1/wikipedia/{lang}/onthisday/events/{month:02}/{day:02}"
    );
    let feed: Feed = http
        .get(&url)
        .send()
        .await
        .with_context(|| format!("GET {url}"))?
        .error_for_status()
        .context("on-this-day http status")?
        .json()
        .await
        .context("parsing on-this-day json")?;

    Ok(feed
        .events
        .into_iter()
        .filter_map(|e| {
            let year = e.year?;
            let first_page = e.pages.into_iter().next();
            let (extract, link) = match first_page {
                Some(p) => (
                    p.extract,
                    p.content_urls.and_then(|c| c.desktop).and_then(|d| d.page),
                ),
                None => (None, None),
            };
            Some(HistoryEvent {
                year,
                text: e.text,
                extract,
                link,
            })
        })
        .collect())
}

/// Fetch events for a calendar day, trying the primary language first and
/// falling back to the secondary one.
pub async fn fetch_events(
    http: &reqwest::Client,
    month: u32,
    day: u32,
) -> Result<Vec<HistoryEvent>> {
    for lang in LANGS {
        match fetch_lang(http, lang, month, day).await {
            Ok(events) if !events.is_empty() => return Ok(events),
            Ok(_) => warn!(lang, "on-this-day feed returned no events"),
            Err(e) => warn!(error = ?e, lang, "on-this-day fetch failed"),
        }
    }
    Err(anyhow!("no on-this-day events for {month:02}/{day:02}"))
}

const FINANCE_KEYWORDS: &[&str] = &[
    "банк", "рубл", "валют", "бирж", "акци", "кризис", "инфляц", "налог", "золот", "доллар",
    "евро", "деньг", "эконом", "финанс", "bank", "currency", "stock", "market", "crisis",
    "inflation", "tax", "gold", "dollar", "money", "econom", "financ",
];

/// Keyword heuristic keeping only finance-flavored events.
pub fn is_financial(event: &HistoryEvent) -> bool {
    let hay = match &event.extract {
        Some(x) => format!("{} {}", event.text, x).to_lowercase(),
        None => event.text.to_lowercase(),
    };
    FINANCE_KEYWORDS.iter().any(|k| hay.contains(k))
}
