use std::sync::Arc;

use tracing::warn;

use crate::app::error::Result;
use crate::config::Config;
use crate::fetcher::{HttpFetcher, MediaFetcher};
use crate::harvest::{
    ContentWriter, DiscoveryOptions, FfmpegMuxer, LinkDiscovery, Muxer, PostExtractor,
    VideoReconstructor,
};
use crate::scraper::{ChromeSession, KeepAlive};
use crate::store::Archive;

pub struct AppContext {
    pub config: Config,
    pub session: Arc<ChromeSession>,
    pub writer: ContentWriter,
    pub muxer: Arc<FfmpegMuxer>,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        let fetcher: Arc<dyn MediaFetcher> =
            Arc::new(HttpFetcher::new(config.scraper.user_agent())?);
        Self::with_fetcher(config, fetcher)
    }

    pub fn with_fetcher(config: Config, fetcher: Arc<dyn MediaFetcher>) -> Result<Self> {
        let archive = Archive::new(&config.harvest.output_dir);
        std::fs::create_dir_all(archive.root())?;

        let session = Arc::new(ChromeSession::new(config.scraper.clone()));
        let muxer = Arc::new(FfmpegMuxer::new(&config.video.ffmpeg_path));

        Ok(Self {
            config,
            session,
            writer: ContentWriter::new(archive, fetcher),
            muxer,
        })
    }

    pub fn archive(&self) -> &Archive {
        self.writer.archive()
    }

    pub fn discovery(&self) -> LinkDiscovery {
        LinkDiscovery::new(
            self.writer.clone(),
            DiscoveryOptions::from_config(&self.config.harvest, self.config.scraper.element_timeout()),
        )
    }

    pub fn extractor(&self) -> PostExtractor {
        let video = self.config.video.enabled.then(|| {
            let muxer: Arc<dyn Muxer> = self.muxer.clone();
            VideoReconstructor::new(
                self.archive().clone(),
                self.writer.fetcher().clone(),
                muxer,
                self.config.video.capture_window(),
            )
        });

        PostExtractor::new(
            self.writer.clone(),
            video,
            self.config.scraper.element_timeout(),
            self.config.harvest.reply_expand_attempts,
        )
    }

    /// Start the session refresh task, unless disabled in the config.
    pub fn keep_alive(&self) -> Option<KeepAlive> {
        let interval = self.config.scraper.keepalive_interval()?;
        Some(KeepAlive::spawn(self.session.clone(), interval))
    }

    /// Turn video reconstruction off when the muxer cannot be run.
    pub async fn check_muxer(&mut self) {
        if self.config.video.enabled && !self.muxer.is_available().await {
            warn!(
                ffmpeg = %self.config.video.ffmpeg_path.display(),
                "Muxer not found, videos will get placeholders instead"
            );
            self.config.video.enabled = false;
        }
    }
}
