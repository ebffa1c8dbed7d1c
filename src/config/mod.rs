//! Configuration management for the harvester.
//!
//! Configuration is read from `~/.config/harvester/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is created.

use crate::harvest::{HarvestConfig, VideoConfig};
use crate::scraper::ScraperConfig;
use serde::Deserialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Main configuration struct.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scraper: ScraperConfig,
    pub harvest: HarvestConfig,
    pub video: VideoConfig,
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with comments.
    /// If the config file exists but is invalid, returns an error.
    /// Missing fields in the config file will use default values.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
            return Ok(Self::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path, which must exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Get the default config file path: `~/.config/harvester/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("harvester").join("config.toml"))
    }

    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    /// Generate the default config file content with comments.
    fn default_config_content() -> String {
        r##"# Harvester Configuration

[scraper]
# Run the browser without a visible window.
# Set to false for the first run so you can log in; the session is kept
# in the profile directory afterwards.
headless = true

# Chrome/Chromium executable (default: auto-detect)
# chrome_path = "/usr/bin/chromium"

# Persistent browser profile holding the logged-in session
# (default: <data dir>/harvester/chrome-profile)
# profile_dir = "/home/me/.local/share/harvester/chrome-profile"

# Page load timeout in seconds
navigation_timeout_secs = 30

# How long to wait for a post element in seconds
element_timeout_secs = 10

# Wait time after page load for dynamic content (milliseconds)
wait_after_load_ms = 1500

viewport_width = 1280
viewport_height = 900

# Minutes between session refreshes during long runs (0 disables)
keepalive_interval_mins = 20
refresh_url = "https://x.com/home"

[harvest]
# Root of the archive: <output_dir>/<author>/<post id>...
output_dir = "./output"

# Stop discovery after this many posts (0 = unlimited)
max_posts = 0

# Return at most this many links (0 = unlimited)
max_links = 0

# Save text/image-only posts straight from the timeline
download = true

# Pause between processed posts in seconds
pacing_secs = 5

# Wait after each scroll (milliseconds)
scroll_settle_ms = 2000

# Scrolls without new posts before the timeline counts as exhausted
stable_cycles = 3

# Attempts at finding the first post on a profile
initial_wait_retries = 3

# Clicks on "show replies" controls per post
reply_expand_attempts = 3

[video]
# Rebuild segmented videos; when false a placeholder is written instead
enabled = true

# Seconds to record the player's traffic
capture_secs = 10

ffmpeg_path = "ffmpeg"
"##
        .to_string()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}
