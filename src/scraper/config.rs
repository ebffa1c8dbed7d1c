use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the automated browser session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// Whether to run the browser in headless mode (default: true)
    pub headless: bool,

    /// Path to the Chrome/Chromium executable (default: auto-detect)
    pub chrome_path: Option<PathBuf>,

    /// Persistent profile directory holding the logged-in session
    /// (default: `<data_dir>/harvester/chrome-profile`)
    pub profile_dir: Option<PathBuf>,

    /// Navigation timeout in seconds (default: 30)
    pub navigation_timeout_secs: u64,

    /// Element wait timeout in seconds (default: 10)
    pub element_timeout_secs: u64,

    /// Wait time after page load for dynamic content in milliseconds (default: 1500)
    pub wait_after_load_ms: u64,

    /// Browser window width (default: 1280)
    pub viewport_width: u32,

    /// Browser window height (default: 900)
    pub viewport_height: u32,

    /// User agent string to use
    pub user_agent: Option<String>,

    /// Minutes between session refreshes during long runs, 0 disables (default: 20)
    pub keepalive_interval_mins: u64,

    /// Page opened to keep the session warm
    pub refresh_url: String,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            headless: true,
            chrome_path: None,
            profile_dir: None,
            navigation_timeout_secs: 30,
            element_timeout_secs: 10,
            wait_after_load_ms: 1500,
            viewport_width: 1280,
            viewport_height: 900,
            user_agent: Some(
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                    .to_string(),
            ),
            keepalive_interval_mins: 20,
            refresh_url: "https://x.com/home".to_string(),
        }
    }
}

impl ScraperConfig {
    /// Get the navigation timeout as a Duration
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    /// Get the element wait timeout as a Duration
    pub fn element_timeout(&self) -> Duration {
        Duration::from_secs(self.element_timeout_secs)
    }

    /// Get the wait time after load as a Duration
    pub fn wait_after_load(&self) -> Duration {
        Duration::from_millis(self.wait_after_load_ms)
    }

    /// Keep-alive interval, if enabled
    pub fn keepalive_interval(&self) -> Option<Duration> {
        (self.keepalive_interval_mins > 0)
            .then(|| Duration::from_secs(self.keepalive_interval_mins * 60))
    }

    /// Resolve the profile directory, falling back to the platform data dir
    pub fn resolved_profile_dir(&self) -> Option<PathBuf> {
        self.profile_dir
            .clone()
            .or_else(|| dirs::data_dir().map(|d| d.join("harvester").join("chrome-profile")))
    }

    pub fn user_agent(&self) -> &str {
        self.user_agent.as_deref().unwrap_or(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        let config = ScraperConfig::default();
        assert!(config.headless);
        assert_eq!(config.navigation_timeout_secs, 30);
        assert_eq!(config.element_timeout_secs, 10);
        assert_eq!(config.wait_after_load_ms, 1500);
        assert!(config.chrome_path.is_none());
        assert!(config.user_agent.is_some());
    }

    #[test]
    fn test_durations() {
        let config = ScraperConfig::default();
        assert_eq!(config.navigation_timeout(), Duration::from_secs(30));
        assert_eq!(config.element_timeout(), Duration::from_secs(10));
        assert_eq!(config.wait_after_load(), Duration::from_millis(1500));
    }

    #[test]
    fn test_keepalive_interval_disabled_at_zero() {
        let mut config = ScraperConfig::default();
        assert_eq!(config.keepalive_interval(), Some(Duration::from_secs(1200)));
        config.keepalive_interval_mins = 0;
        assert_eq!(config.keepalive_interval(), None);
    }

    #[test]
    fn test_explicit_profile_dir_wins() {
        let config = ScraperConfig {
            profile_dir: Some(PathBuf::from("/tmp/profile")),
            ..Default::default()
        };
        assert_eq!(
            config.resolved_profile_dir(),
            Some(PathBuf::from("/tmp/profile"))
        );
    }
}
