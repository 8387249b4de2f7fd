// tests/api_http.rs
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use tower::ServiceExt; // for `oneshot` (tower 0.5 with features=["util"])

use finpost_bot::ai::{FixedImage, FixedText};
use finpost_bot::api::{create_router, ApiState};
use finpost_bot::illustrate::Style;
use finpost_bot::ledger::SeenLedger;
use finpost_bot::pipeline::Services;
use finpost_bot::rotation::RotationStore;
use finpost_bot::telegram::TelegramPublisher;
use finpost_bot::topics::TopicCatalog;

fn test_app(dir: &tempfile::TempDir, image_url: Option<String>) -> Router {
    let services = Arc::new(Services {
        text_gen: Arc::new(FixedText::new("💰 Заголовок\n\nКороткий пост")),
        image_gen: Arc::new(FixedImage::new(image_url)),
        publisher: Arc::new(TelegramPublisher::new(
            "test-token".to_string(),
            "@test".to_string(),
        )),
        ledger: Arc::new(SeenLedger::open(dir.path().join("seen.json"))),
        rotation: Arc::new(RotationStore::open(dir.path().join("rotation.json"))),
        topics: Arc::new(TopicCatalog::default()),
        http: reqwest::Client::new(),
        rubric_style: Style::Rubric,
    });
    create_router(ApiState {
        services,
        trigger_token: Some("s3cret".to_string()),
    })
}

async fn body_string(resp: axum::response::Response) -> String {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn health_is_ok() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(&dir, None);
    let resp = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_string(resp).await, "ok");
}

#[tokio::test]
async fn trigger_rejects_bad_token() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(&dir, None);
    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/trigger?type=rubric&token=wrong")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn trigger_rejects_unknown_type() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(&dir, None);
    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/trigger?type=digest&token=s3cret")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn trigger_reports_skip_when_no_image_is_produced() {
    // Full rubric cycle with mocks: compose succeeds, the image collaborator
    // fails, so the cycle must skip instead of publishing textless.
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(&dir, None);
    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/trigger?type=rubric&token=s3cret")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_string(resp).await.starts_with("skipped"));
}
