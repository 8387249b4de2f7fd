// src/feeds/rss.rs
//! RSS 2.0 parsing for topic sources (RBC, TASS, Interfax, Forklog, Finam...).

use anyhow::{Context, Result};
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use serde::Deserialize;
use time::{format_description::well_known::Rfc2822, OffsetDateTime, UtcOffset};

use super::{normalize_text, StoryCandidate};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}
#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}
#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

fn parse_rfc2822_to_unix(ts: &str) -> Option<u64> {
    OffsetDateTime::parse(ts, &Rfc2822)
        .ok()
        .map(|dt| dt.to_offset(UtcOffset::UTC).unix_timestamp())
        .and_then(|x| u64::try_from(x).ok())
}

/// Parse one RSS document into candidates. `fetched_at` substitutes for a
/// missing or unparseable `pubDate`.
pub fn parse_items(xml: &str, fetched_at: u64) -> Result<Vec<StoryCandidate>> {
    let t0 = std::time::Instant::now();
    let xml_clean = scrub_html_entities_for_xml(xml);
    let rss: Rss = from_str(&xml_clean).context("parsing rss xml")?;

    let mut out = Vec::with_capacity(rss.channel.item.len());
    for it in rss.channel.item {
        let title = normalize_text(it.title.as_deref().unwrap_or_default());
        if title.is_empty() {
            continue;
        }
        let summary = normalize_text(it.description.as_deref().unwrap_or_default());
        let published_at = it
            .pub_date
            .as_deref()
            .and_then(parse_rfc2822_to_unix)
            .unwrap_or(fetched_at);

        out.push(StoryCandidate {
            title,
            summary,
            link: it.link.unwrap_or_default().trim().to_string(),
            published_at,
        });
    }

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("feed_parse_ms").record(ms);
    counter!("feed_items_total").increment(out.len() as u64);
    Ok(out)
}

/// Fetch a feed URL and parse its items.
pub async fn fetch(http: &reqwest::Client, url: &str) -> Result<Vec<StoryCandidate>> {
    let body = http
        .get(url)
        .send()
        .await
        .with_context(|| format!("GET {url}"))?
        .text()
        .await
        .context("reading feed body")?;
    let now = chrono::Utc::now().timestamp().max(0) as u64;
    parse_items(&body, now)
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&laquo;", "\"")
        .replace("&raquo;", "\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel>
  <title>Тест</title>
  <item>
    <title>BTC обновил максимум</title>
    <link>https://example.ru/btc?utm_source=rss</link>
    <pubDate>Tue, 25 Aug 2026 10:00:00 +0300</pubDate>
    <description>&lt;p&gt;Биткоин вырос на&nbsp;5%&lt;/p&gt;</description>
  </item>
  <item>
    <title>Без даты</title>
    <link>https://example.ru/nodate</link>
  </item>
</channel></rss>"#;

    #[test]
    fn parses_items_and_falls_back_on_missing_date() {
        let items = parse_items(FIXTURE, 12345).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "BTC обновил максимум");
        assert_eq!(items[0].summary, "Биткоин вырос на 5%");
        assert!(items[0].published_at > 1_700_000_000);
        assert_eq!(items[1].published_at, 12345);
    }
}
