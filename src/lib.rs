//! # Harvester
//!
//! Archives a profile timeline's posts (text, images and video) into a local
//! directory tree.
//!
//! ## Architecture
//!
//! ```text
//! ChromeSession → LinkDiscovery → BatchRunner → PostExtractor → Archive
//! ```
//!
//! - [`scraper`]: browser session and the [`BrowserPage`](scraper::BrowserPage) capability
//! - [`harvest`]: discovery loop, per-post extraction, video reconstruction
//! - [`store`]: on-disk layout, status records and resume decisions
//!
//! ## Quick Start
//!
//! ```bash
//! # Log in once with a visible browser; the session is kept in the profile dir
//! harvester --headed links https://x.com/rustlang --max-links 5
//!
//! # Archive a profile
//! harvester profile https://x.com/rustlang --max-posts 200
//!
//! # Archive single posts
//! harvester post https://x.com/rustlang/status/1234567890
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together the browser
/// session, archive, fetcher and muxer.
pub mod app;

/// Command-line interface using clap.
///
/// - `profile <url>` - Discover and archive a profile
/// - `links <url>` - Print discovered post links
/// - `post <url>...` - Archive individual posts
pub mod cli;

/// Configuration loaded from `~/.config/harvester/config.toml`.
pub mod config;

/// Core domain models.
///
/// - [`PostRef`](domain::PostRef): post identity parsed from its URL
/// - [`ScannedPost`](domain::ScannedPost): a post as rendered in the timeline
/// - [`PostStatus`](domain::PostStatus): per-post progress record
pub mod domain;

/// Media downloads.
///
/// - [`MediaFetcher`](fetcher::MediaFetcher): async trait for fetching bytes
/// - [`HttpFetcher`](fetcher::HttpFetcher): reqwest-based implementation
pub mod fetcher;

/// Discovery and extraction pipeline.
pub mod harvest;

/// Browser automation via chromiumoxide.
pub mod scraper;

/// Filesystem archive.
pub mod store;

#[cfg(test)]
pub(crate) mod testing;
