use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams, EventRequestWillBeSent, EventResponseReceived, Headers,
};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::Page;
use futures::stream::BoxStream;
use futures::StreamExt;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::app::{HarvestError, Result};
use crate::scraper::config::ScraperConfig;
use crate::scraper::{BrowserPage, NetworkEvent, SessionRefresh};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Authenticated browsing context backed by a persistent Chrome profile.
///
/// The browser is launched lazily on first use and lives until [`release`](Self::release).
pub struct ChromeSession {
    config: ScraperConfig,
    browser: Mutex<Option<Browser>>,
}

impl ChromeSession {
    pub fn new(config: ScraperConfig) -> Self {
        Self {
            config,
            browser: Mutex::new(None),
        }
    }

    async fn launch(&self) -> Result<Browser> {
        let mut builder = BrowserConfig::builder()
            .window_size(self.config.viewport_width, self.config.viewport_height)
            .request_timeout(self.config.navigation_timeout())
            .no_sandbox()
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-software-rasterizer")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--autoplay-policy=no-user-gesture-required");

        if !self.config.headless {
            builder = builder.with_head();
        }

        if let Some(ref chrome_path) = self.config.chrome_path {
            builder = builder.chrome_executable(chrome_path);
        }

        if let Some(profile_dir) = self.config.resolved_profile_dir() {
            std::fs::create_dir_all(&profile_dir)?;
            builder = builder.user_data_dir(profile_dir);
        }

        let browser_config = builder
            .build()
            .map_err(|e| HarvestError::Browser(format!("Failed to build browser config: {}", e)))?;

        let (browser, mut handler) = Browser::launch(browser_config).await.map_err(|e| {
            HarvestError::Browser(format!(
                "Failed to launch browser: {}. Is Chrome or Chromium installed and in PATH?",
                e
            ))
        })?;

        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Browser handler error: {e}");
                }
            }
        });

        info!(headless = self.config.headless, "Browser launched");
        Ok(browser)
    }

    async fn new_page(&self, url: &str) -> Result<Page> {
        let mut guard = self.browser.lock().await;
        if guard.is_none() {
            *guard = Some(self.launch().await?);
        }

        let browser = guard
            .as_ref()
            .ok_or_else(|| HarvestError::Browser("Browser not initialized".into()))?;

        let page = browser
            .new_page(url)
            .await
            .map_err(|e| HarvestError::Browser(format!("Failed to create page: {}", e)))?;

        if let Some(ref ua) = self.config.user_agent {
            page.set_user_agent(ua)
                .await
                .map_err(|e| HarvestError::Browser(format!("Failed to set user agent: {}", e)))?;
        }

        Ok(page)
    }

    /// Open a blank page in the logged-in context.
    pub async fn acquire_page(&self) -> Result<ChromePage> {
        let page = self.new_page("about:blank").await?;

        page.execute(EnableParams::default())
            .await
            .map_err(|e| HarvestError::Browser(format!("Failed to enable network events: {}", e)))?;

        Ok(ChromePage {
            page,
            navigation_timeout: self.config.navigation_timeout(),
            wait_after_load: self.config.wait_after_load(),
        })
    }

    /// Shut the browser down. The profile directory keeps the session for the next run.
    pub async fn release(&self) {
        let mut guard = self.browser.lock().await;
        if let Some(mut browser) = guard.take() {
            if let Err(e) = browser.close().await {
                error!("Failed to close browser: {e}");
                return;
            }
            let _ = browser.wait().await;
            info!("Browser shutdown complete");
        }
    }
}

#[async_trait]
impl SessionRefresh for ChromeSession {
    async fn refresh(&self) -> Result<()> {
        let page = self.new_page(&self.config.refresh_url).await?;
        tokio::time::sleep(self.config.wait_after_load()).await;
        if let Err(e) = page.close().await {
            warn!("Failed to close refresh page: {e}");
        }
        Ok(())
    }
}

/// A single chromiumoxide tab.
pub struct ChromePage {
    page: Page,
    navigation_timeout: Duration,
    wait_after_load: Duration,
}

impl ChromePage {
    pub async fn close(self) {
        if let Err(e) = self.page.close().await {
            warn!("Failed to close page: {e}");
        }
    }

    async fn settle<F, T, E>(&self, what: &str, fut: F) -> Result<()>
    where
        F: std::future::Future<Output = std::result::Result<T, E>>,
        E: std::fmt::Display,
    {
        match tokio::time::timeout(self.navigation_timeout, fut).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(HarvestError::Browser(format!("{} failed: {}", what, e))),
            Err(_) => return Err(HarvestError::Timeout(what.to_string())),
        }
        tokio::time::sleep(self.wait_after_load).await;
        Ok(())
    }
}

#[async_trait]
impl BrowserPage for ChromePage {
    async fn goto(&self, url: &str) -> Result<()> {
        debug!(url, "Navigating");
        self.settle(&format!("navigation to {}", url), self.page.goto(url))
            .await
    }

    async fn reload(&self) -> Result<()> {
        self.settle("reload", self.page.reload()).await
    }

    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<bool> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.page.find_element(selector).await.is_ok() {
                return Ok(true);
            }
            if tokio::time::Instant::now() >= deadline {
                debug!(selector, "Timed out waiting for selector");
                return Ok(false);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn scroll_viewport(&self) -> Result<()> {
        self.evaluate("window.scrollBy(0, window.innerHeight); true")
            .await
            .map(|_| ())
    }

    async fn scroll_by(&self, pixels: i64) -> Result<()> {
        self.evaluate(&format!("window.scrollBy(0, {pixels}); true"))
            .await
            .map(|_| ())
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value> {
        self.page
            .evaluate(script)
            .await
            .map_err(|e| HarvestError::Browser(format!("Script execution failed: {}", e)))?
            .into_value()
            .map_err(|e| HarvestError::Browser(format!("Failed to parse result: {:?}", e)))
    }

    async fn screenshot(&self, selector: &str) -> Result<Vec<u8>> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|e| HarvestError::Browser(format!("No element for {}: {}", selector, e)))?;

        element
            .screenshot(CaptureScreenshotFormat::Png)
            .await
            .map_err(|e| HarvestError::Browser(format!("Failed to capture screenshot: {}", e)))
    }

    async fn network_events(&self) -> Result<BoxStream<'static, NetworkEvent>> {
        let requests = self
            .page
            .event_listener::<EventRequestWillBeSent>()
            .await
            .map_err(|e| HarvestError::Browser(format!("Failed to observe requests: {}", e)))?
            .map(|event| NetworkEvent::Request {
                url: event.request.url.clone(),
            });

        let responses = self
            .page
            .event_listener::<EventResponseReceived>()
            .await
            .map_err(|e| HarvestError::Browser(format!("Failed to observe responses: {}", e)))?
            .map(|event| NetworkEvent::Response {
                url: event.response.url.clone(),
                status: u16::try_from(event.response.status).unwrap_or_default(),
                headers: header_map(&event.response.headers),
            });

        Ok(futures::stream::select(requests, responses).boxed())
    }
}

fn header_map(headers: &Headers) -> HashMap<String, String> {
    match serde_json::to_value(headers) {
        Ok(serde_json::Value::Object(map)) => map
            .into_iter()
            .filter_map(|(k, v)| v.as_str().map(|s| (k.to_lowercase(), s.to_string())))
            .collect(),
        _ => HashMap::new(),
    }
}
