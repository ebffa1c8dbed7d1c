use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::app::Result;
use crate::domain::PostRef;
use crate::fetcher::MediaFetcher;
use crate::harvest::mux::{concat_manifest, Muxer};
use crate::harvest::quality::{group_by_quality, select_best, SegmentGroup, Selection};
use crate::harvest::segments::SegmentCollector;
use crate::scraper::{dom, BrowserPage};
use crate::store::{Archive, Artifact};

#[derive(Debug, Clone, PartialEq)]
pub enum VideoOutcome {
    /// `{post_id}.mp4` was written
    Saved(PathBuf),
    /// The player never requested a video fragment
    NoSegments,
    /// Download or muxing failed; stream references were kept in `{post_id}-video-error.txt`
    Failed(String),
}

/// Rebuilds a segmented video from the fragments its player requests.
pub struct VideoReconstructor {
    archive: Archive,
    fetcher: Arc<dyn MediaFetcher>,
    muxer: Arc<dyn Muxer>,
    capture_window: Duration,
}

impl VideoReconstructor {
    pub fn new(
        archive: Archive,
        fetcher: Arc<dyn MediaFetcher>,
        muxer: Arc<dyn Muxer>,
        capture_window: Duration,
    ) -> Self {
        Self {
            archive,
            fetcher,
            muxer,
            capture_window,
        }
    }

    /// Download and mux the video of the post `page` is showing.
    ///
    /// `collector` must be attached before the post page is loaded: the player
    /// may start on its own and request the initialization fragment right away.
    pub async fn reconstruct(
        &self,
        page: &dyn BrowserPage,
        post: &PostRef,
        collector: SegmentCollector,
    ) -> Result<VideoOutcome> {
        match dom::start_playback(page).await {
            Ok(true) => debug!(post_id = %post.post_id, "Playback started"),
            Ok(false) => debug!(post_id = %post.post_id, "No playable element found"),
            Err(e) => warn!(post_id = %post.post_id, "Failed to start playback: {}", e),
        }

        let segments = collector.collect(self.capture_window).await;
        let groups = group_by_quality(&segments);
        let Some(selection) = select_best(&groups) else {
            info!(post_id = %post.post_id, "No video segments observed");
            return Ok(VideoOutcome::NoSegments);
        };

        info!(
            post_id = %post.post_id,
            quality = %selection.video.quality,
            video_segments = selection.video.segments.len(),
            audio_segments = selection.audio.map_or(0, |a| a.segments.len()),
            "Reconstructing video"
        );

        let scratch = self.archive.path(post, Artifact::Scratch);
        let result = self.assemble(post, &selection, &scratch).await;

        match tokio::fs::remove_dir_all(&scratch).await {
            Err(e) if e.kind() != ErrorKind::NotFound => {
                warn!(path = %scratch.display(), "Failed to remove scratch directory: {}", e)
            }
            _ => {}
        }

        match result {
            Ok(path) => {
                info!(path = %path.display(), "Video saved");
                Ok(VideoOutcome::Saved(path))
            }
            Err(e) => {
                error!(post_id = %post.post_id, "Video reconstruction failed: {}", e);
                // the muxer may have created the output before failing
                self.archive.remove(post, Artifact::Video).await?;
                let report = failure_report(post, &selection, &e.to_string());
                self.archive
                    .write(post, Artifact::VideoError, report)
                    .await?;
                Ok(VideoOutcome::Failed(e.to_string()))
            }
        }
    }

    async fn assemble(
        &self,
        post: &PostRef,
        selection: &Selection<'_>,
        scratch: &Path,
    ) -> Result<PathBuf> {
        tokio::fs::create_dir_all(scratch).await?;

        let video_manifest = self.download_group(selection.video, scratch).await?;
        let audio_manifest = match selection.audio {
            Some(group) => Some(self.download_group(group, scratch).await?),
            None => None,
        };

        let output = self.archive.path(post, Artifact::Video);
        self.muxer
            .concat(&video_manifest, audio_manifest.as_deref(), &output)
            .await?;

        Ok(output)
    }

    /// Download a group's segments into `scratch` and write its concat manifest.
    ///
    /// File names carry the capture index, so sorting them restores playback order.
    async fn download_group(&self, group: &SegmentGroup, scratch: &Path) -> Result<PathBuf> {
        let kind = group.kind.as_str();
        let mut files = Vec::with_capacity(group.segments.len());

        for (i, segment) in group.segments.iter().enumerate() {
            let name = format!("{}_{:05}.{}", kind, i, segment.extension());
            let bytes = self.fetcher.fetch(&segment.url).await?;
            tokio::fs::write(scratch.join(&name), bytes).await?;
            files.push(name);
        }

        files.sort();
        let manifest = scratch.join(format!("{kind}.txt"));
        tokio::fs::write(&manifest, concat_manifest(files.iter().map(String::as_str))).await?;
        Ok(manifest)
    }
}

fn failure_report(post: &PostRef, selection: &Selection<'_>, reason: &str) -> String {
    let mut report = format!(
        "Video reconstruction failed: {}\nURL: {}\n",
        reason, post.url
    );

    for group in std::iter::once(selection.video).chain(selection.audio) {
        report.push_str(&format!(
            "\n{} stream ({}, {} segments):\n",
            group.kind.as_str(),
            group.quality,
            group.segments.len()
        ));
        for url in group.urls() {
            report.push_str(url);
            report.push('\n');
        }
    }

    report
}
