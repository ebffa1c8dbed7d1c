//! Structural signal extraction.
//!
//! All knowledge of the site's markup lives here. Each helper evaluates one
//! read-only script on the page and decodes the result into a typed record;
//! the heuristics that consume those records stay pure.

use serde::de::DeserializeOwned;

use crate::app::Result;
use crate::domain::{PostText, Reply, ScannedPost};
use crate::scraper::BrowserPage;

/// Any rendered post container.
pub const POST_SELECTOR: &str = r#"article[data-testid="tweet"]"#;

/// Video player inside the focused post, used for placeholder screenshots.
pub const VIDEO_PLAYER_SELECTOR: &str =
    r#"article[data-testid="tweet"] [data-testid="videoPlayer"]"#;

/// Wraps a script body with `main`, the post whose permalink is the current page.
macro_rules! on_main_post {
    ($body:literal) => {
        concat!(
            r#"(() => {
                const articles = Array.from(document.querySelectorAll('article[data-testid="tweet"]'));
                const path = window.location.pathname.split('/').slice(0, 4).join('/');
                const permalinkOf = (href, path) => href === path || href.startsWith(path + '/');
                const main = articles.find(a =>
                    Array.from(a.querySelectorAll('a[href*="/status/"]')).some(l =>
                        l.querySelector('time') && permalinkOf(l.getAttribute('href'), path))
                ) || articles[0] || null;
            "#,
            $body,
            "})()"
        )
    };
}

/// Every post container currently rendered in the timeline.
pub const SCAN_TIMELINE_SCRIPT: &str = r#"(() => {
    const has = (root, sel) => root.querySelector(sel) !== null;
    return Array.from(document.querySelectorAll('article[data-testid="tweet"]')).map(article => {
        const time = article.querySelector('a[href*="/status/"] time');
        const link = time ? time.closest('a') : article.querySelector('a[href*="/status/"]');
        const textEl = article.querySelector('[data-testid="tweetText"]');
        const nameEl = article.querySelector('[data-testid="User-Name"] span');
        return {
            href: link ? link.getAttribute('href') : '',
            text: textEl ? textEl.innerText : '',
            images: Array.from(article.querySelectorAll('[data-testid="tweetPhoto"] img'))
                .map(img => img.src)
                .filter(src => src.includes('/media/')),
            authorName: nameEl ? nameEl.innerText : null,
            timestamp: time ? time.getAttribute('datetime') : null,
            hasVideo: has(article, '[data-testid="videoPlayer"], [data-testid="videoComponent"], video'),
            hasPoll: has(article, '[data-testid="cardPoll"]'),
            hasCard: has(article, '[data-testid="card.wrapper"]'),
            hasTruncation: has(article, '[data-testid="tweet-text-show-more-link"]'),
        };
    }).filter(post => post.href);
})()"#;

/// Author, timestamp and body of the focused post.
pub const READ_POST_SCRIPT: &str = on_main_post!(
    r#"
    if (!main) { return null; }
    const textEl = main.querySelector('[data-testid="tweetText"]');
    const nameEl = main.querySelector('[data-testid="User-Name"] span');
    const handleLink = main.querySelector('[data-testid="User-Name"] a[href^="/"]');
    const time = main.querySelector('time');
    return {
        authorName: nameEl ? nameEl.innerText : null,
        handle: handleLink ? handleLink.getAttribute('href').replace(/^\//, '') : '',
        timestamp: time ? time.getAttribute('datetime') : null,
        body: textEl ? textEl.innerText : '',
    };
    "#
);

/// Clicks the "show more replies" style controls once; returns how many were clicked.
pub const EXPAND_REPLIES_SCRIPT: &str = r#"(() => {
    const pattern = /^(show more replies|show replies|show additional replies|show probable spam)/i;
    const buttons = Array.from(document.querySelectorAll('[role="button"], button'))
        .filter(b => pattern.test((b.innerText || '').trim()));
    buttons.forEach(b => b.click());
    return buttons.length;
})()"#;

/// Every rendered reply below the focused post.
pub const COLLECT_REPLIES_SCRIPT: &str = on_main_post!(
    r#"
    return articles.filter(a => a !== main).map(a => {
        const textEl = a.querySelector('[data-testid="tweetText"]');
        const handleLink = a.querySelector('[data-testid="User-Name"] a[href^="/"]');
        const time = a.querySelector('time');
        return {
            handle: handleLink ? handleLink.getAttribute('href').replace(/^\//, '') : '',
            text: textEl ? textEl.innerText : '',
            timestamp: time ? time.getAttribute('datetime') : null,
        };
    });
    "#
);

/// Media images of the focused post only; avatars and banners are excluded.
pub const MAIN_IMAGES_SCRIPT: &str = on_main_post!(
    r#"
    if (!main) { return []; }
    return Array.from(main.querySelectorAll('[data-testid="tweetPhoto"] img'))
        .map(img => img.src)
        .filter(src => src.includes('/media/'));
    "#
);

pub const HAS_VIDEO_SCRIPT: &str = on_main_post!(
    r#"
    if (!main) { return false; }
    return main.querySelector('[data-testid="videoPlayer"], [data-testid="videoComponent"], video') !== null;
    "#
);

/// Start the focused post's video so the player requests its segments.
pub const START_PLAYBACK_SCRIPT: &str = on_main_post!(
    r#"
    if (!main) { return false; }
    const video = main.querySelector('video');
    if (video) {
        video.muted = true;
        const played = video.play();
        if (played && played.catch) { played.catch(() => {}); }
        return true;
    }
    const button = main.querySelector('[data-testid="playButton"]');
    if (button) { button.click(); return true; }
    return false;
    "#
);

fn decode<T: DeserializeOwned + Default>(value: serde_json::Value) -> Result<T> {
    if value.is_null() {
        return Ok(T::default());
    }
    Ok(serde_json::from_value(value)?)
}

pub async fn scan_timeline(page: &dyn BrowserPage) -> Result<Vec<ScannedPost>> {
    decode(page.evaluate(SCAN_TIMELINE_SCRIPT).await?)
}

/// Read the focused post. `url` and `replies` are left for the caller.
pub async fn read_post(page: &dyn BrowserPage) -> Result<PostText> {
    decode(page.evaluate(READ_POST_SCRIPT).await?)
}

pub async fn expand_replies(page: &dyn BrowserPage) -> Result<usize> {
    decode(page.evaluate(EXPAND_REPLIES_SCRIPT).await?)
}

pub async fn collect_replies(page: &dyn BrowserPage) -> Result<Vec<Reply>> {
    decode(page.evaluate(COLLECT_REPLIES_SCRIPT).await?)
}

pub async fn main_image_urls(page: &dyn BrowserPage) -> Result<Vec<String>> {
    decode(page.evaluate(MAIN_IMAGES_SCRIPT).await?)
}

pub async fn has_video(page: &dyn BrowserPage) -> Result<bool> {
    decode(page.evaluate(HAS_VIDEO_SCRIPT).await?)
}

pub async fn start_playback(page: &dyn BrowserPage) -> Result<bool> {
    decode(page.evaluate(START_PLAYBACK_SCRIPT).await?)
}
