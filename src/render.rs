use crate::content_client::{NewsResponse, NewsSource, PatternItem, PatternsResponse};
use crate::domain::subscription_items::SubscriptionItems;

pub const SUBJECT: &str = "WallyLog — 최근 업데이트 받기";

/// Email produced for one subscriber. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedContent {
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// Generated content fetched for a dispatch, if the subscriber asked for it.
#[derive(Debug, Clone, Default)]
pub struct Supplements {
    pub patterns: Option<PatternsResponse>,
    pub news: Option<NewsResponse>,
}

pub fn render_content(items: Option<&SubscriptionItems>, supplements: &Supplements) -> RenderedContent {
    let items = items.map(SubscriptionItems::joined).unwrap_or_default();
    let intro = format!(
        "안녕하세요!\n\nWallyLog에서 선택하신 항목({})의 최신 소식입니다.\n\n간단한 포인트 중심으로 전해드립니다.",
        items
    );

    let mut text = intro.clone();
    let mut html = format!(
        "<div style=\"font-family: system-ui, -apple-system, Roboto, 'Noto Sans KR', 'Segoe UI', \
         'Helvetica Neue', Arial; color: #0f172a;\"><h2>{}</h2><p>{}</p>",
        escape_html(SUBJECT),
        escape_html(&intro).replace('\n', "<br/>")
    );

    if let Some(patterns) = &supplements.patterns {
        text.push_str("\n\n[오늘의 영어 패턴]");
        html.push_str("<h3>오늘의 영어 패턴</h3>");
        for pattern in &patterns.patterns {
            text.push_str(&pattern_text(pattern));
            html.push_str(&pattern_card(pattern));
        }
    }

    if let Some(news) = &supplements.news {
        text.push_str("\n\n[오늘의 IT 뉴스]");
        html.push_str("<h3>오늘의 IT 뉴스</h3>");
        for source in &news.sources {
            text.push_str(&news_text(source));
            html.push_str(&news_card(source));
        }
    }

    html.push_str(
        "<hr/><small>구독 해지/관리: GitHub 이슈에서 상태를 변경하거나 관리자에게 문의하세요.</small></div>",
    );

    RenderedContent {
        subject: String::from(SUBJECT),
        text,
        html,
    }
}

fn pattern_text(pattern: &PatternItem) -> String {
    let mut text = format!("\n\n- {}\n  {}", pattern.pattern, pattern.meaning);
    if let Some(example) = pattern.examples.first() {
        text.push_str(&format!(
            "\n  예) {}\n      {}",
            example.sentence, example.translation
        ));
    }
    text
}

fn pattern_card(pattern: &PatternItem) -> String {
    let example = pattern
        .examples
        .first()
        .map(|example| {
            format!(
                "<p style=\"margin: 8px 0 0;\">{}<br/><span style=\"color: #64748b;\">{}</span></p>",
                escape_html(&example.sentence),
                escape_html(&example.translation)
            )
        })
        .unwrap_or_default();

    format!(
        "<div style=\"border: 1px solid #e2e8f0; border-radius: 12px; padding: 16px; margin: 12px 0;\">\
         <strong>{}</strong><p style=\"margin: 4px 0 0;\">{}</p>{}</div>",
        escape_html(&pattern.pattern),
        escape_html(&pattern.meaning),
        example
    )
}

fn news_text(source: &NewsSource) -> String {
    format!(
        "\n\n- {}\n  {}\n  {}",
        source.title.korean(),
        source.summary.korean(),
        source.url
    )
}

fn news_card(source: &NewsSource) -> String {
    let link = if is_web_url(&source.url) {
        format!(
            "<a href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\">원문 보기</a>",
            escape_html(&source.url)
        )
    } else {
        String::new()
    };

    format!(
        "<div style=\"border: 1px solid #e2e8f0; border-radius: 12px; padding: 16px; margin: 12px 0;\">\
         <strong>{}</strong><p style=\"margin: 4px 0 8px;\">{}</p>{}</div>",
        escape_html(source.title.korean()),
        escape_html(source.summary.korean()),
        link
    )
}

// Generated links only get an anchor when they point at a web page.
fn is_web_url(url: &str) -> bool {
    let url = url.trim_start().to_ascii_lowercase();
    url.starts_with("https://") || url.starts_with("http://")
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
