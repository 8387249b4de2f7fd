// src/config.rs
//! Env-backed runtime configuration. `.env` is loaded by the entrypoint
//! (dotenvy) before this runs.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::illustrate::Style;

#[derive(Debug, Clone)]
pub struct Config {
    pub telegram_token: String,
    /// Channel target, e.g. "@my_channel" or a numeric chat id.
    pub channel_id: String,
    /// Shared secret for the manual trigger endpoint; unset means ungated.
    pub trigger_token: Option<String>,
    pub ledger_path: PathBuf,
    pub rotation_path: PathBuf,
    /// Which illustration variant rubric posts use (news posts always use
    /// the news variant).
    pub rubric_style: Style,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let telegram_token =
            std::env::var("TELEGRAM_TOKEN").context("TELEGRAM_TOKEN is not set")?;
        let channel_id = std::env::var("CHANNEL_ID").context("CHANNEL_ID is not set")?;
        let trigger_token = std::env::var("TRIGGER_TOKEN").ok().filter(|t| !t.is_empty());

        let ledger_path = std::env::var("SEEN_LEDGER_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("state/seen.json"));
        let rotation_path = std::env::var("ROTATION_STATE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("state/rotation.json"));

        let rubric_style = match std::env::var("ILLUSTRATION_RUBRIC_STYLE").as_deref() {
            Ok("news") => Style::News,
            _ => Style::Rubric,
        };

        Ok(Self {
            telegram_token,
            channel_id,
            trigger_token,
            ledger_path,
            rotation_path,
            rubric_style,
        })
    }
}
