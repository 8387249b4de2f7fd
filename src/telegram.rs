//! Publisher: deliver (caption, image URL) to the channel via the Telegram
//! Bot API.
//!
//! Fast path sends the image by URL and lets Telegram fetch it. A known
//! class of rejections ("can't fetch the remote content") is retried once by
//! downloading the bytes ourselves and re-sending as a multipart upload.
//! Everything else is terminal for the cycle.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::{info, warn};

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug)]
pub enum SendError {
    /// Telegram could not fetch the photo URL; retryable by re-upload.
    UrlFetchRejected(String),
    /// Anything else; the cycle ends here.
    Terminal(String),
}

#[derive(Debug, Deserialize)]
struct ApiReply {
    ok: bool,
    description: Option<String>,
}

/// Rejection descriptions that mean "Telegram failed to fetch the URL".
fn is_url_fetch_rejection(description: &str) -> bool {
    let d = description.to_ascii_lowercase();
    d.contains("failed to get http url content")
        || d.contains("wrong file identifier/http url specified")
        || d.contains("wrong type of the web page content")
}

fn classify(description: String) -> SendError {
    if is_url_fetch_rejection(&description) {
        SendError::UrlFetchRejected(description)
    } else {
        SendError::Terminal(description)
    }
}

pub struct TelegramPublisher {
    http: reqwest::Client,
    api_base: String,
    token: String,
    chat_id: String,
}

impl TelegramPublisher {
    pub fn new(token: String, chat_id: String) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("finpost-bot/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(30))
            .build()
            .expect("reqwest client");
        Self {
            http,
            api_base: "https://api.telegram.org".to_string(),
            token,
            chat_id,
        }
    }

    /// Point at a different API host (tests).
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_base, self.token)
    }

    async fn read_reply(resp: reqwest::Response) -> std::result::Result<(), SendError> {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        if status.is_success() {
            return Ok(());
        }
        match serde_json::from_str::<ApiReply>(&body) {
            Ok(r) if !r.ok => Err(classify(r.description.unwrap_or_else(|| body.clone()))),
            _ => Err(SendError::Terminal(format!("http {status}: {body}"))),
        }
    }

    /// sendPhoto with a remote URL as the photo reference.
    async fn send_photo_by_url(
        &self,
        caption: &str,
        photo_url: &str,
    ) -> std::result::Result<(), SendError> {
        let resp = self
            .http
            .post(self.method_url("sendPhoto"))
            .json(&serde_json::json!({
                "chat_id": self.chat_id,
                "photo": photo_url,
                "caption": caption,
                "parse_mode": "MarkdownV2",
            }))
            .send()
            .await
            .map_err(|e| SendError::Terminal(format!("sendPhoto request failed: {e}")))?;
        Self::read_reply(resp).await
    }

    /// sendPhoto with the image bytes attached as multipart.
    async fn send_photo_bytes(
        &self,
        caption: &str,
        bytes: Vec<u8>,
    ) -> std::result::Result<(), SendError> {
        let part = Part::bytes(bytes)
            .file_name("post.png")
            .mime_str("image/png")
            .map_err(|e| SendError::Terminal(format!("building photo part: {e}")))?;
        let form = Form::new()
            .text("chat_id", self.chat_id.clone())
            .text("caption", caption.to_string())
            .text("parse_mode", "MarkdownV2")
            .part("photo", part);
        let resp = self
            .http
            .post(self.method_url("sendPhoto"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| SendError::Terminal(format!("sendPhoto upload failed: {e}")))?;
        Self::read_reply(resp).await
    }

    async fn download_image(&self, url: &str) -> Result<Vec<u8>> {
        let resp = self
            .http
            .get(url)
            .timeout(DOWNLOAD_TIMEOUT)
            .send()
            .await
            .with_context(|| format!("downloading image {url}"))?
            .error_for_status()
            .context("image download status")?;
        Ok(resp.bytes().await.context("reading image bytes")?.to_vec())
    }

    /// Deliver the post: URL fast path, then download-and-upload fallback
    /// for the retryable rejection class.
    pub async fn publish(&self, caption: &str, image_url: &str) -> Result<()> {
        match self.send_photo_by_url(caption, image_url).await {
            Ok(()) => {
                info!("post published");
                Ok(())
            }
            Err(SendError::UrlFetchRejected(desc)) => {
                warn!(reason = %desc, "telegram rejected photo url, re-uploading bytes");
                let bytes = self.download_image(image_url).await?;
                match self.send_photo_bytes(caption, bytes).await {
                    Ok(()) => {
                        info!("post published via re-upload");
                        Ok(())
                    }
                    Err(SendError::UrlFetchRejected(d) | SendError::Terminal(d)) => {
                        Err(anyhow!("sendPhoto re-upload rejected: {d}"))
                    }
                }
            }
            Err(SendError::Terminal(desc)) => Err(anyhow!("sendPhoto rejected: {desc}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_fetch_rejections_are_retryable() {
        assert!(matches!(
            classify("Bad Request: failed to get HTTP URL content".into()),
            SendError::UrlFetchRejected(_)
        ));
        assert!(matches!(
            classify("Bad Request: wrong type of the web page content".into()),
            SendError::UrlFetchRejected(_)
        ));
    }

    #[test]
    fn other_errors_are_terminal() {
        assert!(matches!(
            classify("Bad Request: message caption is too long".into()),
            SendError::Terminal(_)
        ));
    }
}
