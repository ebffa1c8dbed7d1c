//! Stream segment capture.
//!
//! The player fetches a video as many small fragments. Fragment URLs carry
//! their media kind (`/vid/` or `/aud/`) and a quality token in the path:
//!
//! ```text
//! https://video.twimg.com/amplify_video/1/vid/avc1/0/3000/1280x720/abc.m4s
//! https://video.twimg.com/amplify_video/1/aud/mp4a/0/3000/128000/def.m4s
//! ```

use std::collections::HashSet;
use std::sync::LazyLock;
use std::time::Duration;

use futures::stream::BoxStream;
use futures::StreamExt;
use regex::Regex;
use tracing::debug;

use crate::app::Result;
use crate::scraper::{BrowserPage, NetworkEvent};

#[allow(clippy::expect_used)]
static SEGMENT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://[^/]*video\.twimg\.com/.+/(vid|aud)/.+\.(m4s|mp4|ts)(\?.*)?$")
        .expect("segment regex is valid")
});

#[allow(clippy::expect_used)]
static RESOLUTION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/(\d{2,5})x(\d{2,5})/").expect("resolution regex is valid"));

#[allow(clippy::expect_used)]
static BITRATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/(\d{4,7})/[^/]+$").expect("bitrate regex is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MediaKind {
    Video,
    Audio,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Audio => "audio",
        }
    }
}

/// Rendition a segment belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QualityKey {
    Resolution { width: u32, height: u32 },
    Bitrate(u32),
    /// No quality token found in the URL
    Unknown,
}

impl QualityKey {
    pub fn pixel_area(&self) -> Option<u64> {
        match self {
            Self::Resolution { width, height } => Some(u64::from(*width) * u64::from(*height)),
            _ => None,
        }
    }
}

impl std::fmt::Display for QualityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Resolution { width, height } => write!(f, "{width}x{height}"),
            Self::Bitrate(bps) => write!(f, "{bps}bps"),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSegment {
    pub url: String,
    pub kind: MediaKind,
    pub quality: QualityKey,
}

impl StreamSegment {
    /// Classify a request URL; `None` when it is not a stream fragment.
    pub fn classify(url: &str) -> Option<Self> {
        let caps = SEGMENT_PATTERN.captures(url)?;
        let kind = match caps.get(1)?.as_str() {
            "vid" => MediaKind::Video,
            _ => MediaKind::Audio,
        };
        let path = url.split('?').next().unwrap_or(url);

        Some(Self {
            url: url.to_string(),
            kind,
            quality: quality_key(path, kind),
        })
    }

    /// File extension of the fragment, used for scratch file names.
    pub fn extension(&self) -> &str {
        self.url
            .split('?')
            .next()
            .and_then(|p| p.rsplit_once('.'))
            .map(|(_, ext)| ext)
            .unwrap_or("m4s")
    }
}

fn quality_key(path: &str, kind: MediaKind) -> QualityKey {
    match kind {
        MediaKind::Video => RESOLUTION_PATTERN
            .captures(path)
            .and_then(|c| {
                let width = c.get(1)?.as_str().parse().ok()?;
                let height = c.get(2)?.as_str().parse().ok()?;
                Some(QualityKey::Resolution { width, height })
            })
            .unwrap_or(QualityKey::Unknown),
        MediaKind::Audio => BITRATE_PATTERN
            .captures(path)
            .and_then(|c| c.get(1)?.as_str().parse().ok())
            .map(QualityKey::Bitrate)
            .unwrap_or(QualityKey::Unknown),
    }
}

/// Collects stream fragments from a page's network traffic.
pub struct SegmentCollector {
    events: BoxStream<'static, NetworkEvent>,
    seen: HashSet<String>,
    segments: Vec<StreamSegment>,
}

impl SegmentCollector {
    /// Start recording the page's requests; nothing is read until [`collect`](Self::collect).
    pub async fn attach(page: &dyn BrowserPage) -> Result<Self> {
        Ok(Self::new(page.network_events().await?))
    }

    pub fn new(events: BoxStream<'static, NetworkEvent>) -> Self {
        Self {
            events,
            seen: HashSet::new(),
            segments: Vec::new(),
        }
    }

    /// Observe traffic for `window`, then return fragments in request order.
    ///
    /// Repeated requests for the same URL are kept once.
    pub async fn collect(mut self, window: Duration) -> Vec<StreamSegment> {
        let deadline = tokio::time::sleep(window);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = &mut deadline => break,
                event = self.events.next() => match event {
                    Some(NetworkEvent::Request { url }) => self.observe(&url),
                    Some(NetworkEvent::Response { .. }) => {}
                    None => break,
                },
            }
        }

        debug!(segments = self.segments.len(), "Segment capture finished");
        self.segments
    }

    fn observe(&mut self, url: &str) {
        if self.seen.contains(url) {
            return;
        }
        if let Some(segment) = StreamSegment::classify(url) {
            self.seen.insert(url.to_string());
            self.segments.push(segment);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIDEO_720: &str =
        "https://video.twimg.com/amplify_video/1/vid/avc1/0/3000/1280x720/aaa.m4s";
    const AUDIO: &str = "https://video.twimg.com/amplify_video/1/aud/mp4a/0/3000/128000/bbb.m4s";

    #[test]
    fn test_classify_video_segment() {
        let segment = StreamSegment::classify(VIDEO_720).unwrap();
        assert_eq!(segment.kind, MediaKind::Video);
        assert_eq!(
            segment.quality,
            QualityKey::Resolution {
                width: 1280,
                height: 720
            }
        );
        assert_eq!(segment.extension(), "m4s");
    }

    #[test]
    fn test_classify_audio_segment() {
        let segment = StreamSegment::classify(AUDIO).unwrap();
        assert_eq!(segment.kind, MediaKind::Audio);
        assert_eq!(segment.quality, QualityKey::Bitrate(128000));
    }

    #[test]
    fn test_classify_rejects_other_traffic() {
        assert!(StreamSegment::classify("https://x.com/i/api/graphql/abc").is_none());
        assert!(StreamSegment::classify(
            "https://video.twimg.com/amplify_video/1/pl/abc.m3u8?tag=14"
        )
        .is_none());
        assert!(StreamSegment::classify("https://pbs.twimg.com/media/abc.jpg").is_none());
    }

    #[test]
    fn test_missing_quality_token_is_unknown() {
        let segment =
            StreamSegment::classify("https://video.twimg.com/tweet_video/vid/abc.mp4").unwrap();
        assert_eq!(segment.quality, QualityKey::Unknown);
        assert_eq!(segment.extension(), "mp4");
    }

    #[tokio::test(start_paused = true)]
    async fn test_collector_dedupes_and_keeps_order() {
        let (tx, rx) = futures::channel::mpsc::unbounded();
        for url in [VIDEO_720, AUDIO, VIDEO_720, "https://x.com/other"] {
            tx.unbounded_send(NetworkEvent::Request { url: url.into() })
                .unwrap();
        }

        let segments = SegmentCollector::new(rx.boxed())
            .collect(Duration::from_secs(5))
            .await;

        let urls: Vec<_> = segments.iter().map(|s| s.url.as_str()).collect();
        assert_eq!(urls, vec![VIDEO_720, AUDIO]);
        drop(tx);
    }
}
