//! The per-cycle pipeline: select/compose -> fit caption -> illustrate ->
//! publish, with early exits and no cross-cycle retry.
//!
//! Three variants exist: a rotated rubric post, a rotated news-theme post,
//! and a "this day in history" post. All three run over the same shared
//! `Services` and may be fired concurrently by the scheduler and the manual
//! trigger; the only shared mutable state (ledger, rotation) is internally
//! mutex-guarded.

use std::str::FromStr;
use std::sync::Arc;

use anyhow::Result;
use chrono::{Datelike, FixedOffset, Utc};
use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use tracing::{info, warn};

use crate::ai::{DynImageGenerator, DynTextGenerator};
use crate::caption;
use crate::compose::{self, ComposeError};
use crate::feeds::on_this_day;
use crate::fingerprint::fingerprint;
use crate::illustrate::{self, Style};
use crate::ledger::SeenLedger;
use crate::rotation::{RotationKind, RotationStore};
use crate::select;
use crate::telegram::TelegramPublisher;
use crate::topics::TopicCatalog;

/// Everything a cycle needs, shared behind `Arc` with the HTTP surface.
pub struct Services {
    pub text_gen: DynTextGenerator,
    pub image_gen: DynImageGenerator,
    pub publisher: Arc<TelegramPublisher>,
    pub ledger: Arc<SeenLedger>,
    pub rotation: Arc<RotationStore>,
    pub topics: Arc<TopicCatalog>,
    pub http: reqwest::Client,
    pub rubric_style: Style,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    Rubric,
    News,
    History,
}

impl FromStr for Variant {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rubric" => Ok(Self::Rubric),
            "news" => Ok(Self::News),
            "history" => Ok(Self::History),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Published,
    /// Early exit with the stage that produced no output.
    Skipped(&'static str),
}

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("posts_published_total", "Posts delivered to the channel.");
        describe_counter!("posts_skipped_total", "Cycles that early-exited without a post.");
        describe_counter!("pipeline_errors_total", "Cycles that ended in a delivery error.");
        describe_counter!("feed_fetch_errors_total", "Feed sources that failed to fetch.");
        describe_counter!("select_rank_fallback_total", "Rankings that fell back to recency.");
        describe_counter!("select_repeat_total", "Stories republished because all were seen.");
    });
}

/// The channel's timezone. Moscow has been fixed UTC+3 since 2014.
pub fn channel_tz() -> FixedOffset {
    FixedOffset::east_opt(3 * 3600).expect("UTC+3 offset")
}

const RU_MONTHS: [&str; 12] = [
    "января", "февраля", "марта", "апреля", "мая", "июня", "июля", "августа", "сентября",
    "октября", "ноября", "декабря",
];

fn today_human() -> String {
    let now = Utc::now().with_timezone(&channel_tz());
    format!(
        "{} {} {}",
        now.day(),
        RU_MONTHS[now.month0() as usize],
        now.year()
    )
}

/// Shared tail of every variant: caption fit, illustration, delivery.
async fn finish_post(
    services: &Services,
    post: compose::ComposedPost,
    style: Style,
) -> Result<CycleOutcome> {
    let text_gen = services.text_gen.as_ref();
    let caption = caption::fit_caption(text_gen, &post.raw_text).await;

    let Some(image_url) =
        illustrate::request_illustration(services.image_gen.as_ref(), &post.headline, style).await
    else {
        counter!("posts_skipped_total").increment(1);
        return Ok(CycleOutcome::Skipped("no image"));
    };

    match services.publisher.publish(&caption, &image_url).await {
        Ok(()) => {
            counter!("posts_published_total").increment(1);
            Ok(CycleOutcome::Published)
        }
        Err(e) => {
            counter!("pipeline_errors_total").increment(1);
            Err(e)
        }
    }
}

async fn run_rubric(services: &Services) -> Result<CycleOutcome> {
    let idx = services
        .rotation
        .next_index(RotationKind::Rubric, services.topics.rubrics.len());
    let rubric = &services.topics.rubrics[idx];
    info!(rubric = %rubric, "composing rubric post");

    let prompt = format!(
        "Создай структурированный и интересный Telegram-пост по рубрике: {rubric}."
    );
    let post = match compose::compose_default(services.text_gen.as_ref(), &prompt).await {
        Ok(p) => p,
        Err(ComposeError::ConstraintUnmet) => {
            warn!(rubric = %rubric, "composer never met the length ceiling");
            counter!("posts_skipped_total").increment(1);
            return Ok(CycleOutcome::Skipped("length ceiling never met"));
        }
    };

    finish_post(services, post, services.rubric_style).await
}

async fn run_news(services: &Services) -> Result<CycleOutcome> {
    let idx = services
        .rotation
        .next_index(RotationKind::News, services.topics.news_themes.len());
    let theme = &services.topics.news_themes[idx];
    info!(theme = %theme, "composing news post");

    let sources = services.topics.sources_for(theme);
    let fact = select::pick_story(
        &services.http,
        services.text_gen.as_ref(),
        &services.ledger,
        sources,
    )
    .await;
    let fact = cap_chars(&fact, 500);

    let prompt = format!(
        "Составь актуальный Telegram-пост по теме: {theme}. Дата: {}. \
Содержание новости: {fact}. Сделай пост живым, структурным, не более 990 символов. \
Вставь подзаголовок-зацеп. В конце — вопрос подписчику.",
        today_human()
    );
    let post = match compose::compose_default(services.text_gen.as_ref(), &prompt).await {
        Ok(p) => p,
        Err(ComposeError::ConstraintUnmet) => {
            warn!(theme = %theme, "composer never met the length ceiling");
            counter!("posts_skipped_total").increment(1);
            return Ok(CycleOutcome::Skipped("length ceiling never met"));
        }
    };

    finish_post(services, post, Style::News).await
}

async fn run_history(services: &Services) -> Result<CycleOutcome> {
    let today = Utc::now().with_timezone(&channel_tz());
    let events = match on_this_day::fetch_events(&services.http, today.month(), today.day()).await
    {
        Ok(ev) => ev,
        Err(e) => {
            warn!(error = ?e, "no usable on-this-day events");
            counter!("posts_skipped_total").increment(1);
            return Ok(CycleOutcome::Skipped("no history events"));
        }
    };

    // First finance-flavored event not seen within the retention window.
    let chosen = events.iter().filter(|e| on_this_day::is_financial(e)).find(|e| {
        let fp = fingerprint(&e.text, e.link.as_deref().unwrap_or_default());
        !services.ledger.is_seen(&fp)
    });
    let Some(event) = chosen else {
        counter!("posts_skipped_total").increment(1);
        return Ok(CycleOutcome::Skipped("no unseen financial event"));
    };
    let fp = fingerprint(&event.text, event.link.as_deref().unwrap_or_default());
    services.ledger.mark_seen(&fp);

    let mut fact = format!("{} год — {}", event.year, event.text);
    if let Some(extract) = &event.extract {
        fact = format!("{fact} {}", cap_chars(extract, 300));
    }

    let prompt = format!(
        "Составь Telegram-пост в рубрику «Этот день в истории финансов». Дата: {}. \
Событие: {}. Свяжи событие с сегодняшним днём, сделай пост живым и структурным, \
не более 990 символов. В конце — вопрос подписчику.",
        today_human(),
        cap_chars(&fact, 500)
    );
    let post = match compose::compose_default(services.text_gen.as_ref(), &prompt).await {
        Ok(p) => p,
        Err(ComposeError::ConstraintUnmet) => {
            warn!("composer never met the length ceiling");
            counter!("posts_skipped_total").increment(1);
            return Ok(CycleOutcome::Skipped("length ceiling never met"));
        }
    };

    finish_post(services, post, Style::News).await
}

/// Run one cycle of the given variant.
pub async fn run_variant(services: &Services, variant: Variant) -> Result<CycleOutcome> {
    ensure_metrics_described();
    match variant {
        Variant::Rubric => run_rubric(services).await,
        Variant::News => run_news(services).await,
        Variant::History => run_history(services).await,
    }
}

fn cap_chars(s: &str, cap: usize) -> String {
    if s.chars().count() <= cap {
        s.to_string()
    } else {
        let cut: String = s.chars().take(cap).collect();
        format!("{cut}...")
    }
}
