//! In-memory stand-ins for the browser, HTTP and muxer collaborators.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use futures::channel::mpsc::{unbounded, UnboundedSender};
use futures::stream::BoxStream;
use futures::StreamExt;

use crate::app::{HarvestError, Result};
use crate::domain::ScannedPost;
use crate::fetcher::MediaFetcher;
use crate::harvest::mux::Muxer;
use crate::scraper::{dom, BrowserPage, NetworkEvent};

pub fn rate_limited_response(reset_epoch: Option<i64>) -> NetworkEvent {
    let mut headers = HashMap::new();
    headers.insert("x-rate-limit-remaining".to_string(), "0".to_string());
    if let Some(reset) = reset_epoch {
        headers.insert("x-rate-limit-reset".to_string(), reset.to_string());
    }
    NetworkEvent::Response {
        url: "https://x.com/i/api/graphql/TweetDetail".into(),
        status: 429,
        headers,
    }
}

pub fn scanned(href: &str, text: &str, images: &[&str]) -> ScannedPost {
    ScannedPost {
        href: href.to_string(),
        text: text.to_string(),
        images: images.iter().map(|s| s.to_string()).collect(),
        ..Default::default()
    }
}

#[derive(Default)]
struct PageState {
    scripts: HashMap<String, serde_json::Value>,
    feed: Vec<Vec<ScannedPost>>,
    position: usize,
    wait_results: VecDeque<bool>,
    on_goto: Vec<NetworkEvent>,
    on_goto_url: HashMap<String, Vec<NetworkEvent>>,
    on_reload: Vec<NetworkEvent>,
    on_play: Vec<NetworkEvent>,
    subscribers: Vec<UnboundedSender<NetworkEvent>>,
    goto_error: Option<String>,
    gotos: Vec<String>,
    reloads: usize,
    scrolls: usize,
    nudges: usize,
    screenshots: usize,
    evaluations: HashMap<String, usize>,
}

/// Scriptable page.
///
/// With a feed configured, the timeline scan returns only the posts "rendered"
/// at the current scroll position, and each viewport scroll moves one page down.
#[derive(Default)]
pub struct FakePage {
    state: Mutex<PageState>,
}

impl FakePage {
    pub fn new() -> Self {
        Self::default()
    }

    fn with(self, f: impl FnOnce(&mut PageState)) -> Self {
        f(&mut self.state.lock().unwrap());
        self
    }

    pub fn with_script(self, script: &str, value: serde_json::Value) -> Self {
        self.with(|s| {
            s.scripts.insert(script.to_string(), value);
        })
    }

    pub fn with_feed(self, pages: Vec<Vec<ScannedPost>>) -> Self {
        self.with(|s| s.feed = pages)
    }

    /// Results for successive `wait_for` calls; afterwards the feed decides.
    pub fn with_wait_results(self, results: &[bool]) -> Self {
        self.with(|s| s.wait_results = results.iter().copied().collect())
    }

    pub fn on_goto(self, events: Vec<NetworkEvent>) -> Self {
        self.with(|s| s.on_goto = events)
    }

    /// Events emitted only when navigating to `url`, after the `on_goto` ones.
    pub fn on_goto_url(self, url: &str, events: Vec<NetworkEvent>) -> Self {
        self.with(|s| {
            s.on_goto_url.insert(url.to_string(), events);
        })
    }

    pub fn on_reload(self, events: Vec<NetworkEvent>) -> Self {
        self.with(|s| s.on_reload = events)
    }

    pub fn on_play(self, events: Vec<NetworkEvent>) -> Self {
        self.with(|s| s.on_play = events)
    }

    pub fn failing_goto(self, message: &str) -> Self {
        self.with(|s| s.goto_error = Some(message.to_string()))
    }

    pub fn goto_urls(&self) -> Vec<String> {
        self.state.lock().unwrap().gotos.clone()
    }

    pub fn reload_count(&self) -> usize {
        self.state.lock().unwrap().reloads
    }

    pub fn scroll_count(&self) -> usize {
        self.state.lock().unwrap().scrolls
    }

    pub fn nudge_count(&self) -> usize {
        self.state.lock().unwrap().nudges
    }

    pub fn screenshot_count(&self) -> usize {
        self.state.lock().unwrap().screenshots
    }

    pub fn evaluation_count(&self, script: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .evaluations
            .get(script)
            .copied()
            .unwrap_or(0)
    }

    fn emit(state: &mut PageState, events: Vec<NetworkEvent>) {
        state.subscribers.retain(|tx| !tx.is_closed());
        for event in events {
            for tx in &state.subscribers {
                let _ = tx.unbounded_send(event.clone());
            }
        }
    }

    fn visible(state: &PageState) -> Vec<ScannedPost> {
        if state.feed.is_empty() {
            return Vec::new();
        }
        let index = state.position.min(state.feed.len() - 1);
        state.feed[index].clone()
    }
}

#[async_trait]
impl BrowserPage for FakePage {
    async fn goto(&self, url: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.gotos.push(url.to_string());
        if let Some(message) = state.goto_error.clone() {
            return Err(HarvestError::Browser(message));
        }
        let mut events = state.on_goto.clone();
        events.extend(state.on_goto_url.get(url).cloned().unwrap_or_default());
        Self::emit(&mut state, events);
        Ok(())
    }

    async fn reload(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.reloads += 1;
        let events = std::mem::take(&mut state.on_reload);
        Self::emit(&mut state, events);
        Ok(())
    }

    async fn wait_for(&self, selector: &str, _timeout: Duration) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        if let Some(result) = state.wait_results.pop_front() {
            return Ok(result);
        }
        if selector == dom::POST_SELECTOR && !state.feed.is_empty() {
            return Ok(!Self::visible(&state).is_empty());
        }
        Ok(true)
    }

    async fn scroll_viewport(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.scrolls += 1;
        state.position += 1;
        Ok(())
    }

    async fn scroll_by(&self, _pixels: i64) -> Result<()> {
        self.state.lock().unwrap().nudges += 1;
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value> {
        let mut state = self.state.lock().unwrap();
        *state.evaluations.entry(script.to_string()).or_default() += 1;

        if script == dom::SCAN_TIMELINE_SCRIPT && !state.feed.is_empty() {
            return Ok(serde_json::to_value(Self::visible(&state))?);
        }
        if script == dom::START_PLAYBACK_SCRIPT {
            let events = std::mem::take(&mut state.on_play);
            Self::emit(&mut state, events);
        }

        Ok(state
            .scripts
            .get(script)
            .cloned()
            .unwrap_or(serde_json::Value::Null))
    }

    async fn screenshot(&self, _selector: &str) -> Result<Vec<u8>> {
        self.state.lock().unwrap().screenshots += 1;
        Ok(b"\x89PNG fake".to_vec())
    }

    async fn network_events(&self) -> Result<BoxStream<'static, NetworkEvent>> {
        let (tx, rx) = unbounded();
        self.state.lock().unwrap().subscribers.push(tx);
        Ok(rx.boxed())
    }
}

/// Returns `bytes:<url>` for every URL except those marked as failing.
#[derive(Default)]
pub struct FakeFetcher {
    failing: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, url: &str) -> Self {
        self.failing.insert(url.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaFetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.calls.lock().unwrap().push(url.to_string());
        if self.failing.contains(url) {
            return Err(HarvestError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                format!("fetch failed: {url}"),
            )));
        }
        Ok(format!("bytes:{url}").into_bytes())
    }
}

/// Records each call and the manifests it was given; writes the output on success.
#[derive(Default)]
pub struct FakeMuxer {
    fail: bool,
    /// Write the output before failing, as `ffmpeg -y` does on bad input
    partial_output: bool,
    calls: Mutex<Vec<(String, Option<String>, PathBuf)>>,
}

impl FakeMuxer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn failing_after_output() -> Self {
        Self {
            fail: true,
            partial_output: true,
            ..Default::default()
        }
    }

    /// (video manifest contents, audio manifest contents, output path) per call
    pub fn calls(&self) -> Vec<(String, Option<String>, PathBuf)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Muxer for FakeMuxer {
    async fn concat(
        &self,
        video_manifest: &Path,
        audio_manifest: Option<&Path>,
        output: &Path,
    ) -> Result<()> {
        let video = tokio::fs::read_to_string(video_manifest).await?;
        let audio = match audio_manifest {
            Some(path) => Some(tokio::fs::read_to_string(path).await?),
            None => None,
        };
        self.calls
            .lock()
            .unwrap()
            .push((video, audio, output.to_path_buf()));

        if self.partial_output {
            tokio::fs::write(output, b"trunc").await?;
        }
        if self.fail {
            return Err(HarvestError::Muxer("ffmpeg exited with 1".into()));
        }
        tokio::fs::write(output, b"muxed").await?;
        Ok(())
    }
}
