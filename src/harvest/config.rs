use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Limits and pacing for a harvesting run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    /// Root of the archive tree (default: ./output)
    pub output_dir: PathBuf,

    /// Stop discovery after this many unique posts, 0 = unlimited
    pub max_posts: usize,

    /// Return at most this many links, 0 = unlimited
    pub max_links: usize,

    /// Save simple posts while discovering (default: true)
    pub download: bool,

    /// Pause between successfully processed posts in seconds (default: 5)
    pub pacing_secs: u64,

    /// Wait after each scroll in milliseconds (default: 2000)
    pub scroll_settle_ms: u64,

    /// Scroll cycles without new links before discovery stops (default: 3)
    pub stable_cycles: usize,

    /// Attempts at finding the first post on the profile (default: 3)
    pub initial_wait_retries: usize,

    /// Clicks on "show replies" controls per post (default: 3)
    pub reply_expand_attempts: usize,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./output"),
            max_posts: 0,
            max_links: 0,
            download: true,
            pacing_secs: 5,
            scroll_settle_ms: 2000,
            stable_cycles: 3,
            initial_wait_retries: 3,
            reply_expand_attempts: 3,
        }
    }
}

impl HarvestConfig {
    pub fn pacing(&self) -> Duration {
        Duration::from_secs(self.pacing_secs)
    }

    pub fn scroll_settle(&self) -> Duration {
        Duration::from_millis(self.scroll_settle_ms)
    }
}

/// Segmented video reconstruction
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    /// Reconstruct videos; when false only a placeholder is written (default: true)
    pub enabled: bool,

    /// How long to observe the player's traffic in seconds (default: 10)
    pub capture_secs: u64,

    /// Muxer executable (default: ffmpeg from PATH)
    pub ffmpeg_path: PathBuf,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capture_secs: 10,
            ffmpeg_path: PathBuf::from("ffmpeg"),
        }
    }
}

impl VideoConfig {
    pub fn capture_window(&self) -> Duration {
        Duration::from_secs(self.capture_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_harvest_defaults() {
        let config = HarvestConfig::default();
        assert_eq!(config.max_posts, 0);
        assert_eq!(config.max_links, 0);
        assert!(config.download);
        assert_eq!(config.stable_cycles, 3);
        assert_eq!(config.pacing(), Duration::from_secs(5));
        assert_eq!(config.scroll_settle(), Duration::from_millis(2000));
    }

    #[test]
    fn test_video_defaults() {
        let config = VideoConfig::default();
        assert!(config.enabled);
        assert_eq!(config.capture_window(), Duration::from_secs(10));
        assert_eq!(config.ffmpeg_path, PathBuf::from("ffmpeg"));
    }
}
