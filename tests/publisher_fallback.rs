// tests/publisher_fallback.rs
//
// Drives the publisher against a loopback Bot API: the first sendPhoto (by
// URL) is rejected with the retryable "failed to get HTTP URL content"
// class, after which the publisher must download the image itself and
// re-send it as a multipart upload.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Router,
};

use finpost_bot::telegram::TelegramPublisher;

#[derive(Clone)]
struct BotApi {
    hits: Arc<AtomicUsize>,
    content_types: Arc<Mutex<Vec<String>>>,
    /// Description returned for the first sendPhoto call.
    first_rejection: &'static str,
}

async fn send_photo(State(api): State<BotApi>, headers: HeaderMap) -> (StatusCode, String) {
    let n = api.hits.fetch_add(1, Ordering::SeqCst);
    let ct = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    api.content_types.lock().unwrap().push(ct);

    if n == 0 {
        (
            StatusCode::BAD_REQUEST,
            format!(r#"{{"ok":false,"description":"{}"}}"#, api.first_rejection),
        )
    } else {
        (StatusCode::OK, r#"{"ok":true,"result":{}}"#.to_string())
    }
}

async fn image() -> ([(header::HeaderName, &'static str); 1], Vec<u8>) {
    ([(header::CONTENT_TYPE, "image/png")], vec![0x89, 0x50, 0x4e, 0x47])
}

async fn spawn_bot_api(api: BotApi) -> String {
    let app = Router::new()
        .route("/bottest-token/sendPhoto", post(send_photo))
        .route("/img.png", get(image))
        .with_state(api);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn url_rejection_falls_back_to_multipart_reupload() {
    let api = BotApi {
        hits: Arc::new(AtomicUsize::new(0)),
        content_types: Arc::new(Mutex::new(Vec::new())),
        first_rejection: "Bad Request: failed to get HTTP URL content",
    };
    let base = spawn_bot_api(api.clone()).await;

    let publisher = TelegramPublisher::new("test-token".to_string(), "@chan".to_string())
        .with_api_base(base.clone());

    publisher
        .publish("подпись", &format!("{base}/img.png"))
        .await
        .expect("fallback delivery should succeed");

    assert_eq!(api.hits.load(Ordering::SeqCst), 2);
    let types = api.content_types.lock().unwrap();
    assert!(types[0].starts_with("application/json"), "got: {}", types[0]);
    assert!(
        types[1].starts_with("multipart/form-data"),
        "got: {}",
        types[1]
    );
}

#[tokio::test]
async fn terminal_rejection_is_not_retried() {
    let api = BotApi {
        hits: Arc::new(AtomicUsize::new(0)),
        content_types: Arc::new(Mutex::new(Vec::new())),
        first_rejection: "Bad Request: message caption is too long",
    };
    let base = spawn_bot_api(api.clone()).await;

    let publisher = TelegramPublisher::new("test-token".to_string(), "@chan".to_string())
        .with_api_base(base.clone());

    let err = publisher
        .publish("подпись", &format!("{base}/img.png"))
        .await
        .expect_err("terminal rejection must end the cycle");

    assert!(err.to_string().contains("caption is too long"));
    assert_eq!(api.hits.load(Ordering::SeqCst), 1);
}
