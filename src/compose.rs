//! Post composer: turns a rubric name or a news fact into structured
//! Russian post text under a hard length ceiling.
//!
//! The ceiling is enforced here, not trusted from the model: the prompt asks
//! for <=990 characters, attempts are accepted up to 1015, and after five
//! misses the cycle is abandoned with `ConstraintUnmet`.

use tracing::warn;

use crate::ai::{TextGenerator, TextRequest};

pub const MAX_ATTEMPTS: usize = 5;
/// Ceiling stated inside the prompt.
pub const PROMPT_CEILING: usize = 990;
/// Ceiling actually accepted (the model often lands a little over).
pub const ACCEPT_CEILING: usize = 1015;

/// Lines starting with one of these glyphs are treated as the headline.
pub const HEADLINE_MARKERS: &[char] = &['📊', '📈', '📉', '💰', '🏦', '💸', '🧠', '📌'];

pub const SYSTEM_PROMPT: &str = "Ты — финансовый редактор Telegram-канала. Пиши живо, структурно и современно. \
Пост обязательно должен включать следующие блоки: \
1) заголовок с эмодзи, \
2) подзаголовок-зацеп с эмодзи — интригующий крючок (вопрос или фраза, до 50 символов), \
3) краткое вступление, \
4) подзаголовки с эмодзи и жирным шрифтом, \
5) аналитика и прогноз, \
6) итоговый вывод. \
В конце — ненавязчивый, естественно встроенный вопрос к подписчику. \
Примеры зацепов:\n\
— 🤔 Случайность или сигнал?\n\
— 📉 Временное падение или начало тренда?\n\
— 💸 Деньги есть — уверенности нет?\n\
— 📊 Новый тренд или всплеск?\n\
Не используй решётки #. Используй только жирный шрифт для подзаголовков. \
Не используй эмодзи в теле текста, только в заголовках. \
СТРОГО: Ответ не должен превышать 990 символов. Перед финальным ответом подсчитай длину и убедись, что она <=990. Если больше — сократи.";

/// Composed text plus its already-identified headline, so downstream steps
/// never re-derive the headline by scanning lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedPost {
    pub raw_text: String,
    pub headline: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeError {
    /// The model never produced text within the ceiling.
    ConstraintUnmet,
}

/// First line starting with a headline marker, else the literal first line.
pub fn extract_headline(text: &str) -> String {
    text.lines()
        .find(|l| {
            l.trim_start()
                .chars()
                .next()
                .is_some_and(|c| HEADLINE_MARKERS.contains(&c))
        })
        .or_else(|| text.lines().next())
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// Request post text until it fits `ceiling` (chars) or attempts run out.
/// Provider soft-failures burn an attempt like an oversized reply does.
pub async fn compose(
    gen: &dyn TextGenerator,
    user_prompt: &str,
    ceiling: usize,
) -> Result<ComposedPost, ComposeError> {
    for attempt in 1..=MAX_ATTEMPTS {
        let req = TextRequest {
            system: SYSTEM_PROMPT.to_string(),
            user: user_prompt.to_string(),
            temperature: 0.7,
            max_tokens: 300,
        };
        let Some(content) = gen.generate(&req).await else {
            warn!(attempt, provider = gen.name(), "text generation failed");
            continue;
        };
        let content = content.replace("###", "").trim().to_string();
        let len = content.chars().count();
        if len <= ceiling {
            let headline = extract_headline(&content);
            return Ok(ComposedPost {
                raw_text: content,
                headline,
            });
        }
        warn!(attempt, len, ceiling, "composed text over ceiling");
    }
    Err(ComposeError::ConstraintUnmet)
}

/// Compose with the default acceptance ceiling.
pub async fn compose_default(
    gen: &dyn TextGenerator,
    user_prompt: &str,
) -> Result<ComposedPost, ComposeError> {
    compose(gen, user_prompt, ACCEPT_CEILING).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headline_prefers_marker_line() {
        let text = "Вступление без эмодзи\n💰 Финсовет дня\nтело";
        assert_eq!(extract_headline(text), "💰 Финсовет дня");
    }

    #[test]
    fn headline_falls_back_to_first_line() {
        let text = "Просто первая строка\nвторая";
        assert_eq!(extract_headline(text), "Просто первая строка");
    }

    #[tokio::test]
    async fn accepts_first_fitting_attempt() {
        let gen = crate::ai::FixedText::new("💰 Короткий пост");
        let post = compose_default(&gen, "Создай пост").await.unwrap();
        assert_eq!(post.headline, "💰 Короткий пост");
        assert_eq!(gen.calls(), 1);
    }
}
