//! Rate-limit monitoring.
//!
//! A monitor is attached to the page before navigating. It buffers the page's
//! responses and, when asked to [`settle`](RateLimitMonitor::settle), looks for
//! HTTP 429s. When the server says when the quota resets, the monitor sleeps
//! until then and reloads the page so the caller can carry on.

use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use futures::stream::BoxStream;
use futures::{FutureExt, StreamExt};
use tracing::{info, warn};

use crate::app::{HarvestError, Result};
use crate::scraper::{BrowserPage, NetworkEvent};

const TOO_MANY_REQUESTS: u16 = 429;
const REMAINING_HEADER: &str = "x-rate-limit-remaining";
const RESET_HEADER: &str = "x-rate-limit-reset";

/// Upper bound on a single wait, whatever the server asks for.
pub const MAX_WAIT: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitHit {
    pub url: String,
    pub remaining: Option<u64>,
    pub reset_at: Option<DateTime<Utc>>,
}

impl RateLimitHit {
    /// Build a hit from a response, if it is a 429.
    pub fn from_event(event: &NetworkEvent) -> Option<Self> {
        let NetworkEvent::Response {
            url,
            status,
            headers,
        } = event
        else {
            return None;
        };

        if *status != TOO_MANY_REQUESTS {
            return None;
        }

        Some(Self {
            url: url.clone(),
            remaining: headers
                .get(REMAINING_HEADER)
                .and_then(|v| v.trim().parse().ok()),
            reset_at: headers
                .get(RESET_HEADER)
                .and_then(|v| v.trim().parse::<i64>().ok())
                .and_then(|secs| Utc.timestamp_opt(secs, 0).single()),
        })
    }
}

/// How long to wait for a reset at `reset_at`; `None` when it is not in the future.
pub fn wait_duration(reset_at: DateTime<Utc>, now: DateTime<Utc>) -> Option<Duration> {
    let wait = (reset_at - now).to_std().ok()?;
    (!wait.is_zero()).then(|| wait.min(MAX_WAIT))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitStatus {
    /// No 429 seen
    Clear,
    /// Waited for the reset and reloaded
    Waited(Duration),
    /// 429 seen without a usable reset hint; continuing anyway
    Unhinted,
}

pub struct RateLimitMonitor {
    events: Mutex<BoxStream<'static, NetworkEvent>>,
}

impl RateLimitMonitor {
    /// Start observing the page's responses.
    pub async fn attach(page: &dyn BrowserPage) -> Result<Self> {
        Ok(Self::new(page.network_events().await?))
    }

    pub fn new(events: BoxStream<'static, NetworkEvent>) -> Self {
        Self {
            events: Mutex::new(events),
        }
    }

    /// Drain buffered events without waiting and return the 429s among them.
    fn drain_hits(&self) -> Vec<RateLimitHit> {
        let mut hits = Vec::new();
        let Ok(mut events) = self.events.lock() else {
            return hits;
        };

        while let Some(Some(event)) = events.next().now_or_never() {
            if let Some(hit) = RateLimitHit::from_event(&event) {
                hits.push(hit);
            }
        }
        hits
    }

    /// Handle any rate limiting observed since the last call.
    ///
    /// Fails with [`HarvestError::RateLimited`] only if the page is still
    /// limited after waiting for the advertised reset.
    pub async fn settle(&self, page: &dyn BrowserPage) -> Result<RateLimitStatus> {
        let hits = self.drain_hits();
        if hits.is_empty() {
            return Ok(RateLimitStatus::Clear);
        }

        for hit in &hits {
            warn!(
                url = %hit.url,
                remaining = ?hit.remaining,
                reset_at = ?hit.reset_at,
                "Rate limited (HTTP 429)"
            );
        }

        let Some(last) = hits.iter().rev().find_map(|h| h.reset_at.map(|r| (h, r))) else {
            warn!("No reset time provided, continuing without waiting");
            return Ok(RateLimitStatus::Unhinted);
        };

        let (hit, reset_at) = last;
        let Some(wait) = wait_duration(reset_at, Utc::now()) else {
            info!("Rate limit reset time already passed, continuing");
            return Ok(RateLimitStatus::Unhinted);
        };

        warn!(wait_secs = wait.as_secs(), "Waiting for rate limit reset");
        tokio::time::sleep(wait).await;

        page.reload().await?;

        if let Some(again) = self.drain_hits().into_iter().next() {
            return Err(HarvestError::RateLimited {
                url: again.url,
                reset_at: again.reset_at,
            });
        }

        info!(url = %hit.url, "Resumed after rate limit");
        Ok(RateLimitStatus::Waited(wait))
    }
}
