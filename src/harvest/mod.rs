//! Discovery and extraction pipeline.
//!
//! ```text
//! LinkDiscovery ──simple posts──→ ContentWriter
//!       │
//!       └─remaining links─→ BatchRunner → PostExtractor ─→ ContentWriter
//!                                               ├─ RateLimitMonitor
//!                                               └─ VideoReconstructor → Muxer
//! ```

pub mod batch;
mod config;
pub mod content;
pub mod discovery;
pub mod extractor;
pub mod mux;
pub mod quality;
pub mod rate_limit;
pub mod segments;
pub mod video;

pub use batch::{BatchRunner, BatchSummary};
pub use config::{HarvestConfig, VideoConfig};
pub use content::ContentWriter;
pub use discovery::{DiscoveryOptions, LinkDiscovery};
pub use extractor::{PostExtractor, PostOutcome};
pub use mux::{FfmpegMuxer, Muxer};
pub use rate_limit::RateLimitMonitor;
pub use video::{VideoOutcome, VideoReconstructor};
