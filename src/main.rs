//! Financial-channel autopilot — Binary Entrypoint
//! Boots the Axum HTTP server and the posting scheduler on Shuttle.

use std::sync::Arc;

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use finpost_bot::ai::{OpenAiImage, OpenAiText};
use finpost_bot::api::{create_router, ApiState};
use finpost_bot::config::Config;
use finpost_bot::ledger::SeenLedger;
use finpost_bot::metrics::Metrics;
use finpost_bot::pipeline::{run_variant, Services, Variant};
use finpost_bot::rotation::RotationStore;
use finpost_bot::scheduler::spawn_schedule;
use finpost_bot::telegram::TelegramPublisher;
use finpost_bot::topics::TopicCatalog;

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - FINPOST_DEV_LOG=1
fn enable_dev_tracing() {
    let dev_flag = std::env::var("FINPOST_DEV_LOG")
        .ok()
        .is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("finpost=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    enable_dev_tracing();

    let config = Config::from_env().expect("Failed to load runtime config");
    let metrics = Metrics::init();

    let http = reqwest::Client::builder()
        .user_agent("finpost-bot/0.1")
        .connect_timeout(std::time::Duration::from_secs(4))
        .timeout(std::time::Duration::from_secs(20))
        .build()
        .expect("reqwest client");

    let services = Arc::new(Services {
        text_gen: Arc::new(OpenAiText::new(None)),
        image_gen: Arc::new(OpenAiImage::new(None)),
        publisher: Arc::new(TelegramPublisher::new(
            config.telegram_token.clone(),
            config.channel_id.clone(),
        )),
        ledger: Arc::new(SeenLedger::open(&config.ledger_path)),
        rotation: Arc::new(RotationStore::open(&config.rotation_path)),
        topics: Arc::new(TopicCatalog::load()),
        http,
        rubric_style: config.rubric_style,
    });

    spawn_schedule(services.clone());

    // One rubric post at startup, matching the channel's bootstrap habit.
    {
        let services = services.clone();
        tokio::spawn(async move {
            if let Err(e) = run_variant(&services, Variant::Rubric).await {
                tracing::warn!(error = ?e, "startup rubric post failed");
            }
        });
    }

    let state = ApiState {
        services,
        trigger_token: config.trigger_token.clone(),
    };
    let router = create_router(state).merge(metrics.router());

    Ok(router.into())
}
