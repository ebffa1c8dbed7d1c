//! Timeline link discovery.
//!
//! Scrolls a lazily rendered profile timeline, collecting each post link once.
//! Simple posts (text and images only) are saved straight from the timeline;
//! everything else is left for the [`PostExtractor`](super::PostExtractor).

use std::time::Duration;

use tracing::{debug, info, warn};
use url::Url;

use crate::app::{HarvestError, Result};
use crate::domain::{DiscoveredLink, LinkSet, PostRef, PostStatus, PostText, ScannedPost};
use crate::harvest::config::HarvestConfig;
use crate::harvest::content::ContentWriter;
use crate::scraper::{dom, BrowserPage};
use crate::store::ResumeGuard;

/// Pixels scrolled between attempts at finding the first post.
const NUDGE_PIXELS: i64 = 300;

#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    /// Stop once this many unique posts were seen, checked after each scan; 0 = unlimited
    pub max_posts: usize,
    /// Stop as soon as this many links were collected; 0 = unlimited
    pub max_links: usize,
    /// Save simple posts while scanning
    pub download: bool,
    pub scroll_settle: Duration,
    /// Scan cycles without new links before the feed is considered exhausted
    pub stable_cycles: usize,
    pub initial_wait_retries: usize,
    pub initial_wait_timeout: Duration,
}

impl DiscoveryOptions {
    pub fn from_config(config: &HarvestConfig, element_timeout: Duration) -> Self {
        Self {
            max_posts: config.max_posts,
            max_links: config.max_links,
            download: config.download,
            scroll_settle: config.scroll_settle(),
            stable_cycles: config.stable_cycles.max(1),
            initial_wait_retries: config.initial_wait_retries.max(1),
            initial_wait_timeout: element_timeout,
        }
    }
}

pub struct LinkDiscovery {
    writer: ContentWriter,
    options: DiscoveryOptions,
}

impl LinkDiscovery {
    pub fn new(writer: ContentWriter, options: DiscoveryOptions) -> Self {
        Self { writer, options }
    }

    /// Walk the profile timeline at `profile_url`.
    ///
    /// Fails with [`HarvestError::NoContent`] when no post ever renders.
    pub async fn discover(&self, page: &dyn BrowserPage, profile_url: &str) -> Result<LinkSet> {
        let base = Url::parse(profile_url)?;

        info!(url = %profile_url, "Opening profile");
        match page.goto(profile_url).await {
            Err(e) if e.is_transient() => {
                warn!(url = %profile_url, "Navigation incomplete, continuing: {}", e)
            }
            other => other?,
        }

        self.wait_for_first_post(page, profile_url).await?;

        let mut links = LinkSet::new();
        let mut stable = 0;
        let mut cycle = 0;

        loop {
            cycle += 1;
            let before = links.len();

            let scanned = match dom::scan_timeline(page).await {
                Ok(posts) => posts,
                Err(e) => {
                    warn!(cycle, "Timeline scan failed: {}", e);
                    Vec::new()
                }
            };

            for item in &scanned {
                let post = match PostRef::from_href(&base, &item.href) {
                    Ok(post) => post,
                    Err(e) => {
                        debug!(href = %item.href, "Ignoring link: {}", e);
                        continue;
                    }
                };
                if links.contains(&post.url) {
                    continue;
                }

                let simple = item.features.is_simple();
                let saved = simple && self.options.download && self.save_simple(&post, item).await;
                debug!(url = %post.url, simple, saved, "Discovered post");
                links.insert(DiscoveredLink {
                    url: post.url,
                    simple,
                    saved,
                });

                if self.options.max_links > 0 && links.len() >= self.options.max_links {
                    info!(links = links.len(), "Link limit reached");
                    return Ok(links);
                }
            }

            let grown = links.len() - before;
            debug!(cycle, new = grown, total = links.len(), "Scan cycle finished");

            if self.options.max_posts > 0 && links.len() >= self.options.max_posts {
                info!(posts = links.len(), "Post limit reached");
                break;
            }

            if grown == 0 {
                stable += 1;
                if stable >= self.options.stable_cycles {
                    info!(cycles = stable, "No new posts, end of timeline");
                    break;
                }
            } else {
                stable = 0;
            }

            if let Err(e) = page.scroll_viewport().await {
                warn!(cycle, "Scroll failed: {}", e);
            }
            tokio::time::sleep(self.options.scroll_settle).await;
        }

        info!(
            links = links.len(),
            saved = links.saved_count(),
            "Discovery finished"
        );
        Ok(links)
    }

    async fn wait_for_first_post(&self, page: &dyn BrowserPage, url: &str) -> Result<()> {
        let attempts = self.options.initial_wait_retries;

        for attempt in 1..=attempts {
            match page
                .wait_for(dom::POST_SELECTOR, self.options.initial_wait_timeout)
                .await
            {
                Ok(true) => return Ok(()),
                Ok(false) => warn!(attempt, "No posts rendered yet"),
                Err(e) => warn!(attempt, "Waiting for posts failed: {}", e),
            }
            if let Err(e) = page.scroll_by(NUDGE_PIXELS).await {
                debug!(attempt, "Nudge scroll failed: {}", e);
            }
        }

        Err(HarvestError::NoContent(format!(
            "no posts appeared on {} after {} attempts",
            url, attempts
        )))
    }

    async fn save_simple(&self, post: &PostRef, item: &ScannedPost) -> bool {
        match self.try_save_simple(post, item).await {
            Ok(()) => true,
            Err(e) => {
                warn!(post_id = %post.post_id, "Failed to save post from timeline: {}", e);
                false
            }
        }
    }

    async fn try_save_simple(&self, post: &PostRef, item: &ScannedPost) -> Result<()> {
        let archive = self.writer.archive();
        if ResumeGuard::new(archive).check(post).await?.should_skip() {
            debug!(post_id = %post.post_id, "Already saved");
            return Ok(());
        }

        let mut status = PostStatus::new(&post.post_id);
        self.writer
            .write_text(post, &PostText::from_scan(post, item))
            .await?;
        status.text = true;
        status.advance();
        archive.write_status(post, &status).await?;

        status.images = self.writer.save_images(post, &item.images).await;
        status.finish();
        archive.write_status(post, &status).await
    }
}
