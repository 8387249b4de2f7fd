//! Illustration requester: headline -> image-generation prompt -> one
//! square image URL.
//!
//! Vocabulary sampling keeps consecutive illustrations from looking
//! identical; the negative constraint keeps embedded text and clipart out.

use rand::seq::IndexedRandom;
use tracing::warn;

use crate::ai::ImageGenerator;
use crate::compose::HEADLINE_MARKERS;

/// Which visual variant to render. Rubric posts historically flip-flopped
/// between the two; the choice is configuration, not a hardcoded default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Rubric,
    News,
}

const CAMERA: &[&str] = &[
    "крупный план",
    "вид сверху",
    "изометрическая перспектива",
    "средний план",
];
const LIGHTING: &[&str] = &[
    "мягкий рассеянный свет",
    "контрастное студийное освещение",
    "тёплое боковое освещение",
    "холодная подсветка",
];
const MOOD: &[&str] = &[
    "спокойное деловое настроение",
    "динамика и рост",
    "сосредоточенность",
    "уверенный оптимизм",
];
const ENVIRONMENT: &[&str] = &[
    "минималистичный фон",
    "рабочий стол аналитика",
    "абстрактное пространство с графиками",
    "современный офис",
];
const METAPHOR: &[&str] = &[
    "стрелка роста",
    "монеты и купюры",
    "растущий график",
    "весы и баланс",
    "ракета",
    "компас",
];

const NEGATIVE: &str = "Без текста, цифр и логотипов на изображении. Не плоский 2D-клипарт.";

/// Strip leading marker emoji (and whitespace) from a headline.
pub fn strip_markers(headline: &str) -> String {
    headline
        .trim_matches(|c: char| HEADLINE_MARKERS.contains(&c) || c.is_whitespace())
        .to_string()
}

/// Build the generation prompt for a headline. Random phrase sampling is the
/// only nondeterminism; everything else is fixed per style.
pub fn build_prompt(headline: &str, style: Style) -> String {
    let topic = strip_markers(headline);
    let mut rng = rand::rng();
    let camera = CAMERA.choose(&mut rng).copied().unwrap_or(CAMERA[0]);
    let lighting = LIGHTING.choose(&mut rng).copied().unwrap_or(LIGHTING[0]);
    let mood = MOOD.choose(&mut rng).copied().unwrap_or(MOOD[0]);
    let environment = ENVIRONMENT
        .choose(&mut rng)
        .copied()
        .unwrap_or(ENVIRONMENT[0]);
    let metaphor = METAPHOR.choose(&mut rng).copied().unwrap_or(METAPHOR[0]);

    match style {
        Style::Rubric => format!(
            "Минималистичная иллюстрация в деловом стиле на тему: «{topic}». \
Визуальная метафора: {metaphor}. {camera}, {lighting}, {mood}, {environment}. \
Цветовая палитра — тёмно-зелёный, светло-зелёный и нейтральные светлые оттенки. \
Стиль — чистый, современный, как в финансовом Telegram-канале. {NEGATIVE}"
        ),
        Style::News => format!(
            "Современная иллюстрация в стиле постера для делового Telegram-канала. \
Тема: «{topic}». Визуальная метафора: {metaphor}. {camera}, {lighting}, {mood}, {environment}. \
Цветовая гамма — мягкие тени, глубокий фон, зелёные и нейтральные оттенки. \
Стиль — иллюстративный, чистый, как обложка к новостной статье. {NEGATIVE}"
        ),
    }
}

/// Request one square illustration; `None` means "skip this post".
pub async fn request_illustration(
    gen: &dyn ImageGenerator,
    headline: &str,
    style: Style,
) -> Option<String> {
    let prompt = build_prompt(headline, style);
    let url = gen.generate(&prompt).await;
    if url.is_none() {
        warn!(headline, provider = gen.name(), "illustration generation failed");
    }
    url
}
