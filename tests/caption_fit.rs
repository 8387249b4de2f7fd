// tests/caption_fit.rs
use finpost_bot::ai::{FixedText, ScriptedText};
use finpost_bot::caption::{fit_caption, render_caption, CAPTION_LIMIT};

fn count_unescaped_stars(s: &str) -> usize {
    let mut n = 0;
    let mut prev_backslash = false;
    for c in s.chars() {
        if c == '*' && !prev_backslash {
            n += 1;
        }
        prev_backslash = c == '\\' && !prev_backslash;
    }
    n
}

#[tokio::test]
async fn first_successful_regeneration_wins() {
    // Rendered original is 1100 chars against the 1024 limit; the first
    // rewrite lands at 1000 and must be returned without further retries.
    let raw = "а".repeat(1100);
    let gen = ScriptedText::new(vec!["б".repeat(1000), "в".repeat(900)]);

    let caption = fit_caption(&gen, &raw).await;
    assert_eq!(caption.chars().count(), 1000);
    assert!(caption.starts_with('б'));
    assert_eq!(gen.calls(), 1);
}

#[tokio::test]
async fn fitting_text_skips_regeneration_entirely() {
    let gen = FixedText::new("unused");
    let caption = fit_caption(&gen, "💰 Короткий пост\n\nтекст").await;
    assert!(caption.chars().count() <= CAPTION_LIMIT);
    assert_eq!(gen.calls(), 0);
}

#[tokio::test]
async fn exhausted_retries_return_shortest_attempt() {
    let raw = "а".repeat(1200);
    // Every rewrite still exceeds the limit; the shortest one must win and
    // all three shrink targets must be tried.
    let gen = ScriptedText::new(vec!["б".repeat(1090), "в".repeat(1030), "г".repeat(1060)]);

    let caption = fit_caption(&gen, &raw).await;
    assert_eq!(caption.chars().count(), 1030);
    assert!(caption.starts_with('в'));
    assert_eq!(gen.calls(), 3);
}

#[tokio::test]
async fn markers_stay_balanced_even_on_malformed_input() {
    let gen = FixedText::new("unused");
    let raw = "💰 Пост\n\n**📊 Аналитика:** рост на 5%\n\nи **хвост без закрытия";
    let caption = fit_caption(&gen, raw).await;
    assert_eq!(count_unescaped_stars(&caption) % 2, 0);
}

#[test]
fn rendered_output_is_valid_markdown_v2() {
    let raw = "💰 Заголовок\nАналитика: цена 1.5% (рост!)\nВывод: держим курс";
    let md = render_caption(raw);
    // Subheadings became bold, specials in plain runs are escaped.
    assert!(md.contains("*📊 Аналитика:*"));
    assert!(md.contains("*📌 Вывод:*"));
    assert!(md.contains("1\\.5%"));
    assert_eq!(count_unescaped_stars(&md) % 2, 0);
}
