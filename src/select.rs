//! Story selector: candidates -> one unseen, newsworthy story -> fact string.
//!
//! Ranking is delegated to the text model at zero temperature; any ranking
//! failure falls back deterministically to the freshest candidate. The seen
//! ledger is only written after the final pick is committed.

use metrics::counter;
use tracing::{info, warn};

use crate::ai::{TextGenerator, TextRequest};
use crate::feeds::StoryCandidate;
use crate::fingerprint::fingerprint;
use crate::ledger::SeenLedger;

/// Sentinel fact when no source yielded any candidate at all.
pub const NO_NEWS: &str = "Нет актуальных новостей по теме.";

/// Stories older than this are only used when nothing fresher exists.
pub const LOOKBACK_HOURS: u64 = 48;

/// Summary cap inside the fact string.
const SUMMARY_CAP: usize = 300;

const RANK_SYSTEM: &str = "Ты — выпускающий редактор финансовых новостей. \
Выбери самую значимую новость для канала: влияние на рынок, свежесть, масштаб. \
Ответь строго: номер новости, затем тире и краткое обоснование.";

/// Ask the model for the single best candidate index (1-based in the prompt).
/// Returns `None` on any failure; the caller falls back to recency.
async fn rank_with_model(
    gen: &dyn TextGenerator,
    candidates: &[StoryCandidate],
) -> Option<usize> {
    let listing = candidates
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{}. {}", i + 1, c.title))
        .collect::<Vec<_>>()
        .join("\n");
    let req = TextRequest {
        system: RANK_SYSTEM.to_string(),
        user: format!("Новости:\n{listing}\n\nКакая новость самая значимая?"),
        temperature: 0.0,
        max_tokens: 60,
    };
    let reply = gen.generate(&req).await?;
    parse_rank_reply(&reply, candidates.len())
}

/// Leading integer of the reply, validated against the candidate count.
fn parse_rank_reply(reply: &str, total: usize) -> Option<usize> {
    let digits: String = reply
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    let n: usize = digits.parse().ok()?;
    if (1..=total).contains(&n) {
        Some(n - 1)
    } else {
        None
    }
}

fn truncate_with_ellipsis(s: &str, cap: usize) -> String {
    if s.chars().count() <= cap {
        return s.to_string();
    }
    let cut: String = s.chars().take(cap).collect();
    format!("{cut}...")
}

fn fact_string(c: &StoryCandidate) -> String {
    if c.summary.is_empty() {
        c.title.clone()
    } else {
        format!("{}: {}", c.title, truncate_with_ellipsis(&c.summary, SUMMARY_CAP))
    }
}

/// Choose one story from pre-fetched candidates and commit it to the ledger.
/// `now` is unix seconds, injectable for tests.
pub async fn choose_story(
    gen: &dyn TextGenerator,
    ledger: &SeenLedger,
    candidates: Vec<StoryCandidate>,
    now: u64,
) -> String {
    if candidates.is_empty() {
        counter!("select_no_candidates_total").increment(1);
        return NO_NEWS.to_string();
    }

    // Lookback window; if nothing is fresh, fall back to all of them.
    let lookback = LOOKBACK_HOURS * 3600;
    let mut pool: Vec<StoryCandidate> = candidates
        .iter()
        .filter(|c| now.saturating_sub(c.published_at) <= lookback)
        .cloned()
        .collect();
    if pool.is_empty() {
        pool = candidates;
    }

    let ranked = match rank_with_model(gen, &pool).await {
        Some(i) => i,
        None => {
            counter!("select_rank_fallback_total").increment(1);
            // Deterministic fallback: the most recently published.
            pool.iter()
                .enumerate()
                .max_by_key(|(_, c)| c.published_at)
                .map(|(i, _)| i)
                .unwrap_or(0)
        }
    };

    // Anti-repeat pass over the remaining pool, recency-descending.
    let mut chosen = pool[ranked].clone();
    let mut fp = fingerprint(&chosen.title, &chosen.link);
    if ledger.is_seen(&fp) {
        let mut by_recency: Vec<&StoryCandidate> = pool.iter().collect();
        by_recency.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        match by_recency
            .into_iter()
            .find(|c| !ledger.is_seen(&fingerprint(&c.title, &c.link)))
        {
            Some(fresh) => {
                chosen = fresh.clone();
                fp = fingerprint(&chosen.title, &chosen.link);
            }
            None => {
                // Accepted tradeoff: repeating beats silencing the channel.
                warn!(title = %chosen.title, "all candidates already seen, repeating");
                counter!("select_repeat_total").increment(1);
            }
        }
    }

    ledger.mark_seen(&fp);
    info!(title = %chosen.title, "story selected");
    fact_string(&chosen)
}

/// Fetch candidates for a topic's sources and choose a story.
pub async fn pick_story(
    http: &reqwest::Client,
    gen: &dyn TextGenerator,
    ledger: &SeenLedger,
    sources: &[String],
) -> String {
    let candidates = crate::feeds::collect_candidates(http, sources).await;
    let now = chrono::Utc::now().timestamp().max(0) as u64;
    choose_story(gen, ledger, candidates, now).await
}
