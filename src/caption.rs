//! Caption fitter: raw composed text -> Telegram MarkdownV2 caption within
//! the hard 1024-character limit.
//!
//! Overflow is resolved by asking the model for progressively shorter
//! rewrites, never by truncating: a hard cut mid-markup risks unterminated
//! formatting and a rejected sendPhoto call.

use once_cell::sync::OnceCell;
use regex::Regex;
use tracing::warn;

use crate::ai::{TextGenerator, TextRequest};
use crate::compose::SYSTEM_PROMPT;

/// Telegram's hard caption limit for media messages.
pub const CAPTION_LIMIT: usize = 1024;

/// Raw-text ceilings for the shrinking regeneration loop.
const SHRINK_TARGETS: &[usize] = &[940, 900, 860];

/// Plain-language subheading labels and their canonical emoji.
const SUBHEADINGS: &[(&str, &str)] = &[
    ("Аналитика", "📊"),
    ("Прогноз", "📈"),
    ("Вывод", "📌"),
    ("Шаги", "🧠"),
    ("Что делать", "💸"),
];

// ------------------------------------------------------------
// Tidy passes over raw text
// ------------------------------------------------------------

/// Remove the model's "Подсчёт: N символов" self-audit trailer if present.
pub fn strip_count_trailer(text: &str) -> String {
    static RE: OnceCell<Regex> = OnceCell::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"(?im)^\s*[—–-]*\s*подсч[её]т\s*:.*$").expect("trailer regex")
    });
    re.replace_all(text, "").trim_end().to_string()
}

/// Turn bare "Аналитика: ..." style lines into the canonical
/// "**📊 Аналитика:** ..." form. Lines already bold are left alone.
pub fn normalize_subheadings(text: &str) -> String {
    let mut out = Vec::new();
    for line in text.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("**") {
            out.push(line.to_string());
            continue;
        }
        let mut replaced = None;
        for (label, emoji) in SUBHEADINGS {
            let lower = trimmed.to_lowercase();
            let label_lower = label.to_lowercase();
            if let Some(rest) = lower.strip_prefix(&label_lower) {
                let rest = rest.trim_start();
                if rest.is_empty() || rest.starts_with(':') {
                    // Recover the original-cased remainder after the label.
                    let tail = trimmed[label.len()..]
                        .trim_start()
                        .trim_start_matches(':')
                        .trim_start();
                    replaced = Some(if tail.is_empty() {
                        format!("**{emoji} {label}:**")
                    } else {
                        format!("**{emoji} {label}:** {tail}")
                    });
                    break;
                }
            }
        }
        out.push(replaced.unwrap_or_else(|| line.to_string()));
    }
    out.join("\n")
}

/// Exactly one blank line before and after each bold subheading line;
/// collapse other blank runs.
pub fn shape_blank_lines(text: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    for line in text.lines() {
        let is_bold = line.trim_start().starts_with("**");
        if is_bold {
            while out.last().is_some_and(|l| l.trim().is_empty()) {
                out.pop();
            }
            if !out.is_empty() {
                out.push(String::new());
            }
            out.push(line.trim_end().to_string());
            out.push(String::new());
        } else {
            if line.trim().is_empty() && out.last().is_none_or(|l| l.trim().is_empty()) {
                continue;
            }
            out.push(line.trim_end().to_string());
        }
    }
    while out.last().is_some_and(|l| l.trim().is_empty()) {
        out.pop();
    }
    out.join("\n")
}

// ------------------------------------------------------------
// Markup translation: segments, then escape-or-wrap
// ------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Plain(String),
    Bold(String),
}

/// Split raw text into plain and `**bold**` runs. An unterminated opener is
/// dropped and its tail kept as plain text, so output markers always balance.
pub fn parse_segments(text: &str) -> Vec<Segment> {
    let mut out = Vec::new();
    let mut rest = text;
    loop {
        match rest.find("**") {
            Some(start) => match rest[start + 2..].find("**") {
                Some(end_rel) => {
                    if start > 0 {
                        out.push(Segment::Plain(rest[..start].to_string()));
                    }
                    out.push(Segment::Bold(rest[start + 2..start + 2 + end_rel].to_string()));
                    rest = &rest[start + 2 + end_rel + 2..];
                }
                None => {
                    let mut tail = String::with_capacity(rest.len());
                    tail.push_str(&rest[..start]);
                    tail.push_str(&rest[start + 2..]);
                    if !tail.is_empty() {
                        out.push(Segment::Plain(tail));
                    }
                    return out;
                }
            },
            None => {
                if !rest.is_empty() {
                    out.push(Segment::Plain(rest.to_string()));
                }
                return out;
            }
        }
    }
}

/// Escape every character MarkdownV2 treats as markup.
pub fn escape_markdown_v2(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(
            c,
            '\\' | '_' | '*' | '[' | ']' | '(' | ')' | '~' | '`' | '>' | '#' | '+' | '-' | '='
                | '|' | '{' | '}' | '.' | '!'
        ) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Two-pass transform: escape plain runs first, then wrap bold runs in `*`.
/// Escaping never sees inserted markers, so intentional formatting is never
/// double-escaped.
pub fn to_markdown_v2(text: &str) -> String {
    parse_segments(text)
        .into_iter()
        .map(|seg| match seg {
            Segment::Plain(p) => escape_markdown_v2(&p),
            Segment::Bold(b) => format!("*{}*", escape_markdown_v2(&b)),
        })
        .collect()
}

/// The full raw-to-caption rendering: tidy passes then markup translation.
pub fn render_caption(raw: &str) -> String {
    let tidy = shape_blank_lines(&normalize_subheadings(&strip_count_trailer(raw)));
    to_markdown_v2(&tidy)
}

fn caption_len(s: &str) -> usize {
    s.chars().count()
}

// ------------------------------------------------------------
// Fitting loop
// ------------------------------------------------------------

/// Render `raw` and, if the result exceeds the caption limit, drive a
/// bounded regeneration loop at shrinking ceilings. If every attempt stays
/// over the limit, the shortest attempt is returned as a documented
/// last resort.
pub async fn fit_caption(gen: &dyn TextGenerator, raw: &str) -> String {
    let rendered = render_caption(raw);
    if caption_len(&rendered) <= CAPTION_LIMIT {
        return rendered;
    }

    let mut best = rendered;
    for &target in SHRINK_TARGETS {
        let req = TextRequest {
            system: SYSTEM_PROMPT.to_string(),
            user: format!(
                "Сократи этот пост до не более {target} символов. Сохрани заголовок, \
подзаголовки жирным шрифтом и финальный вопрос подписчику. Текст:\n{raw}"
            ),
            temperature: 0.7,
            max_tokens: 300,
        };
        let Some(shorter) = gen.generate(&req).await else {
            warn!(target, provider = gen.name(), "caption regeneration failed");
            continue;
        };
        let candidate = render_caption(&shorter);
        let len = caption_len(&candidate);
        if len <= CAPTION_LIMIT {
            return candidate;
        }
        warn!(target, len, "regenerated caption still over limit");
        if len < caption_len(&best) {
            best = candidate;
        }
    }

    warn!(
        len = caption_len(&best),
        limit = CAPTION_LIMIT,
        "caption regeneration exhausted, using shortest attempt"
    );
    best
}
