//! Browser automation layer.
//!
//! Everything above this module talks to a rendered page through the
//! [`BrowserPage`] capability trait, so the harvesting logic never depends on
//! chromiumoxide directly.
//!
//! # Architecture
//!
//! ```text
//! ChromeSession (persistent profile) → ChromePage: BrowserPage → dom helpers → typed records
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use harvester::scraper::{ChromeSession, ScraperConfig};
//!
//! let session = ChromeSession::new(ScraperConfig::default());
//! let page = session.acquire_page().await?;
//! page.goto("https://x.com/rustlang").await?;
//! let posts = harvester::scraper::dom::scan_timeline(&page).await?;
//! ```

mod background;
mod chrome;
mod config;
pub mod dom;

pub use background::{KeepAlive, SessionRefresh};
pub use chrome::{ChromePage, ChromeSession};
pub use config::ScraperConfig;

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::app::Result;

/// Network traffic observed on a page.
#[derive(Debug, Clone, PartialEq)]
pub enum NetworkEvent {
    Request {
        url: String,
    },
    Response {
        url: String,
        status: u16,
        /// Header names are lowercased
        headers: HashMap<String, String>,
    },
}

/// Capabilities the harvester needs from an automated browser page.
#[async_trait]
pub trait BrowserPage: Send + Sync {
    /// Navigate and wait for the load to complete
    async fn goto(&self, url: &str) -> Result<()>;

    /// Reload the current document
    async fn reload(&self) -> Result<()>;

    /// Wait until `selector` matches a rendered element.
    ///
    /// Returns `Ok(false)` when the timeout elapses first.
    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<bool>;

    /// Scroll down by one viewport height
    async fn scroll_viewport(&self) -> Result<()>;

    /// Scroll down by a fixed number of pixels
    async fn scroll_by(&self, pixels: i64) -> Result<()>;

    /// Evaluate a read-only expression over the rendered document
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value>;

    /// PNG snapshot of the first element matching `selector`
    async fn screenshot(&self, selector: &str) -> Result<Vec<u8>>;

    /// Subscribe to requests and responses issued from now on.
    ///
    /// Events are buffered until the stream is read.
    async fn network_events(&self) -> Result<BoxStream<'static, NetworkEvent>>;
}
