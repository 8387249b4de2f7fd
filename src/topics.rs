//! Editorial catalogs: the fixed rubric rotation, the news-theme rotation,
//! and the RSS sources behind each theme.
//!
//! Defaults are compiled in; a TOML file (env `TOPICS_CONFIG_PATH`, fallback
//! `config/topics.toml`) can override any of the three tables.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::warn;

const ENV_PATH: &str = "TOPICS_CONFIG_PATH";
const DEFAULT_PATH: &str = "config/topics.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct TopicCatalog {
    pub rubrics: Vec<String>,
    pub news_themes: Vec<String>,
    pub sources: HashMap<String, Vec<String>>,
}

impl Default for TopicCatalog {
    fn default() -> Self {
        let rubrics = [
            "Финсовет дня",
            "Финликбез",
            "Личный финменеджмент",
            "Деньги в цифрах",
            "Кейс / Разбор",
            "Психология денег",
            "Финансовая ошибка",
            "Продукт недели",
            "Инвест-горизонт",
            "Миф недели",
            "Путь к 1 млн",
            "Финансовая привычка",
            "Вопрос — ответ",
            "Excel / Таблица",
            "Финансовая цитата",
            "Инструмент недели",
        ]
        .map(String::from)
        .to_vec();

        let news_themes = [
            "Финансовые новости России",
            "Новости криптовалют",
            "Новости фондовых рынков (Россия и США)",
        ]
        .map(String::from)
        .to_vec();

        let mut sources = HashMap::new();
        sources.insert(
            "Финансовые новости России".to_string(),
            vec![
                "https://rssexport.rbc.ru/rbcnews/news/20/full.rss".to_string(),
                "https://tass.ru/rss/v2.xml?rubric=ekonomika".to_string(),
                "https://www.interfax.ru/rss.asp".to_string(),
            ],
        );
        sources.insert(
            "Новости криптовалют".to_string(),
            vec![
                "https://forklog.com/feed/".to_string(),
                "https://bitnovosti.com/feed/".to_string(),
            ],
        );
        sources.insert(
            "Новости фондовых рынков (Россия и США)".to_string(),
            vec![
                "https://rssexport.rbc.ru/rbcnews/news/21/full.rss".to_string(),
                "https://www.finam.ru/rss/news.rss".to_string(),
            ],
        );

        Self {
            rubrics,
            news_themes,
            sources,
        }
    }
}

impl TopicCatalog {
    /// Load from env-pointed or default TOML path; missing file or parse
    /// error falls back to the compiled-in catalog.
    pub fn load() -> Self {
        let path = std::env::var(ENV_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_PATH));
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(c) => c,
            Err(e) => {
                warn!(error = ?e, path = %path.display(), "topics config unusable, using defaults");
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let s = fs::read_to_string(path)
            .with_context(|| format!("reading topics config {}", path.display()))?;
        let cat: TopicCatalog = toml::from_str(&s).context("parsing topics toml")?;
        anyhow::ensure!(!cat.rubrics.is_empty(), "topics config has no rubrics");
        anyhow::ensure!(!cat.news_themes.is_empty(), "topics config has no news themes");
        Ok(cat)
    }

    /// Source URLs for a news theme (empty slice if unknown).
    pub fn sources_for(&self, theme: &str) -> &[String] {
        self.sources.get(theme).map(Vec::as_slice).unwrap_or(&[])
    }
}
