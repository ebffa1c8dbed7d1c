//! Per-post extraction.
//!
//! [`PostExtractor::extract`] never returns an error: every failure becomes a
//! [`PostOutcome`] plus, where useful, a placeholder artifact next to the post.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::app::{HarvestError, Result};
use crate::domain::{PostRef, PostStatus, PostText};
use crate::harvest::content::ContentWriter;
use crate::harvest::rate_limit::RateLimitMonitor;
use crate::harvest::segments::SegmentCollector;
use crate::harvest::video::{VideoOutcome, VideoReconstructor};
use crate::scraper::{dom, BrowserPage};
use crate::store::{Artifact, ResumeGuard};

const REPLY_SETTLE: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostOutcome {
    Processed,
    /// Skipped, a previous run finished this post
    AlreadyDone,
    /// Skipped, the site kept answering 429
    RateLimited,
    /// Skipped after an error
    Failed(String),
}

pub struct PostExtractor {
    writer: ContentWriter,
    /// `None` when video reconstruction is disabled
    video: Option<VideoReconstructor>,
    element_timeout: Duration,
    reply_expand_attempts: usize,
}

impl PostExtractor {
    pub fn new(
        writer: ContentWriter,
        video: Option<VideoReconstructor>,
        element_timeout: Duration,
        reply_expand_attempts: usize,
    ) -> Self {
        Self {
            writer,
            video,
            element_timeout,
            reply_expand_attempts,
        }
    }

    pub async fn extract(&self, page: &dyn BrowserPage, url: &str) -> PostOutcome {
        let post = match PostRef::parse(url) {
            Ok(post) => post,
            Err(e) => {
                error!(url = %url, "Skipping post: {}", e);
                return PostOutcome::Failed(e.to_string());
            }
        };

        match self.process(page, &post).await {
            Ok(outcome) => outcome,
            Err(HarvestError::RateLimited { reset_at, .. }) => {
                warn!(post_id = %post.post_id, "Still rate limited, skipping post");
                if let Err(e) = self.record_rate_limit(&post, reset_at).await {
                    error!(post_id = %post.post_id, "Failed to record rate limit: {}", e);
                }
                PostOutcome::RateLimited
            }
            Err(e) => {
                error!(post_id = %post.post_id, url = %post.url, "Post extraction failed: {}", e);
                PostOutcome::Failed(e.to_string())
            }
        }
    }

    async fn process(&self, page: &dyn BrowserPage, post: &PostRef) -> Result<PostOutcome> {
        let archive = self.writer.archive();

        let decision = ResumeGuard::new(archive).check(post).await?;
        if decision.should_skip() {
            info!(post_id = %post.post_id, "Already processed, skipping");
            return Ok(PostOutcome::AlreadyDone);
        }
        debug!(post_id = %post.post_id, ?decision, "Processing post");

        let mut status = PostStatus::new(&post.post_id);
        archive.write_status(post, &status).await?;

        let monitor = RateLimitMonitor::attach(page).await?;
        // autoplay starts requesting fragments while the page loads
        let capture = match &self.video {
            Some(_) => Some(SegmentCollector::attach(page).await?),
            None => None,
        };
        match page.goto(&post.url).await {
            Err(e) if e.is_transient() => {
                warn!(url = %post.url, "Navigation incomplete, continuing: {}", e)
            }
            other => other?,
        }
        monitor.settle(page).await?;

        status.text = self.save_text(page, post).await?;
        status.advance();
        archive.write_status(post, &status).await?;

        let images = match dom::main_image_urls(page).await {
            Ok(urls) => urls,
            Err(e) => {
                warn!(post_id = %post.post_id, "Failed to read images: {}", e);
                Vec::new()
            }
        };
        status.images = self.writer.save_images(post, &images).await;
        status.advance();
        archive.write_status(post, &status).await?;

        status.video = self.handle_video(page, post, capture).await?;

        status.finish();
        archive.write_status(post, &status).await?;
        archive.remove(post, Artifact::RateLimited).await?;

        info!(
            post_id = %post.post_id,
            images = status.images,
            video = status.video,
            "Post saved"
        );
        Ok(PostOutcome::Processed)
    }

    /// Returns false when only the error placeholder could be written.
    async fn save_text(&self, page: &dyn BrowserPage, post: &PostRef) -> Result<bool> {
        match self.read_text(page, post).await {
            Ok(text) => {
                self.writer.write_text(post, &text).await?;
                Ok(true)
            }
            Err(e) => {
                warn!(post_id = %post.post_id, "Failed to extract text: {}", e);
                self.writer
                    .archive()
                    .write(
                        post,
                        Artifact::Text,
                        PostText::error_placeholder(&post.url, &e.to_string()),
                    )
                    .await?;
                Ok(false)
            }
        }
    }

    async fn read_text(&self, page: &dyn BrowserPage, post: &PostRef) -> Result<PostText> {
        if !page.wait_for(dom::POST_SELECTOR, self.element_timeout).await? {
            return Err(HarvestError::Timeout(format!(
                "post element did not appear on {}",
                post.url
            )));
        }

        let mut text = dom::read_post(page).await?;
        text.url = post.url.clone();
        if text.handle.is_empty() {
            text.handle = post.author_id.clone();
        }

        for attempt in 1..=self.reply_expand_attempts {
            match dom::expand_replies(page).await {
                Ok(0) => break,
                Ok(clicked) => {
                    debug!(attempt, clicked, "Expanded replies");
                    tokio::time::sleep(REPLY_SETTLE).await;
                }
                Err(e) => {
                    debug!(attempt, "Reply expansion failed: {}", e);
                    break;
                }
            }
        }

        match dom::collect_replies(page).await {
            Ok(replies) => text.retain_author_replies(replies),
            Err(e) => debug!(post_id = %post.post_id, "Failed to collect replies: {}", e),
        }

        Ok(text)
    }

    /// Returns whether a video file was produced.
    async fn handle_video(
        &self,
        page: &dyn BrowserPage,
        post: &PostRef,
        capture: Option<SegmentCollector>,
    ) -> Result<bool> {
        let has_video = match dom::has_video(page).await {
            Ok(found) => found,
            Err(e) => {
                warn!(post_id = %post.post_id, "Video detection failed: {}", e);
                false
            }
        };
        if !has_video {
            return Ok(false);
        }

        let archive = self.writer.archive();
        let snapshot = Artifact::VideoPlayer.file_name(&post.post_id);

        let Some((reconstructor, collector)) = self.video.as_ref().zip(capture) else {
            self.save_player_snapshot(page, post).await;
            archive
                .write(
                    post,
                    Artifact::VideoInfo,
                    format!(
                        "This post contains a video.\n\
                         Video extraction is disabled; see {} for the player.\n\
                         URL: {}\n",
                        snapshot, post.url
                    ),
                )
                .await?;
            return Ok(false);
        };

        let reason = match reconstructor.reconstruct(page, post, collector).await {
            Ok(VideoOutcome::Saved(_)) => return Ok(true),
            Ok(VideoOutcome::Failed(_)) => {
                self.save_player_snapshot(page, post).await;
                return Ok(false);
            }
            Ok(VideoOutcome::NoSegments) => {
                "no video segments were captured during playback".to_string()
            }
            Err(e) => e.to_string(),
        };

        warn!(post_id = %post.post_id, "Video not saved: {}", reason);
        self.save_player_snapshot(page, post).await;
        archive
            .write(
                post,
                Artifact::VideoError,
                format!(
                    "Video reconstruction failed: {}\nSee {} for the player.\nURL: {}\n",
                    reason, snapshot, post.url
                ),
            )
            .await?;
        Ok(false)
    }

    async fn save_player_snapshot(&self, page: &dyn BrowserPage, post: &PostRef) {
        let png = match page.screenshot(dom::VIDEO_PLAYER_SELECTOR).await {
            Ok(png) => png,
            Err(e) => {
                warn!(post_id = %post.post_id, "Player screenshot failed: {}", e);
                return;
            }
        };
        if let Err(e) = self
            .writer
            .archive()
            .write(post, Artifact::VideoPlayer, png)
            .await
        {
            warn!(post_id = %post.post_id, "Failed to save player screenshot: {}", e);
        }
    }

    async fn record_rate_limit(
        &self,
        post: &PostRef,
        reset_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let archive = self.writer.archive();
        let reset = reset_at.map_or_else(|| "unknown".to_string(), |r| r.to_rfc3339());

        archive
            .write(
                post,
                Artifact::RateLimited,
                format!(
                    "Rate limited while loading this post.\nURL: {}\nReset at: {}\nRecorded: {}\n",
                    post.url,
                    reset,
                    Utc::now().to_rfc3339()
                ),
            )
            .await?;

        let mut status = archive
            .read_status(post)
            .await?
            .unwrap_or_else(|| PostStatus::new(&post.post_id));
        status.advance();
        status.rate_limited = true;
        archive.write_status(post, &status).await
    }
}
