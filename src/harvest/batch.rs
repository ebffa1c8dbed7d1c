use std::fmt;
use std::time::Duration;

use tracing::info;

use crate::harvest::extractor::{PostExtractor, PostOutcome};
use crate::scraper::BrowserPage;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub processed: usize,
    /// Already done in an earlier run
    pub skipped: usize,
    pub rate_limited: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn record(&mut self, outcome: &PostOutcome) {
        match outcome {
            PostOutcome::Processed => self.processed += 1,
            PostOutcome::AlreadyDone => self.skipped += 1,
            PostOutcome::RateLimited => self.rate_limited += 1,
            PostOutcome::Failed(_) => self.failed += 1,
        }
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} processed, {} skipped, {} rate limited, {} failed",
            self.processed, self.skipped, self.rate_limited, self.failed
        )
    }
}

/// Runs the extractor over a list of posts, one at a time.
pub struct BatchRunner<'a> {
    extractor: &'a PostExtractor,
    pacing: Duration,
}

impl<'a> BatchRunner<'a> {
    pub fn new(extractor: &'a PostExtractor, pacing: Duration) -> Self {
        Self { extractor, pacing }
    }

    /// Process every URL in order.
    ///
    /// Pacing follows processed posts only; skipped and failed posts move
    /// straight on to the next one.
    pub async fn run<S: AsRef<str>>(&self, page: &dyn BrowserPage, urls: &[S]) -> BatchSummary {
        let mut summary = BatchSummary::default();
        let total = urls.len();

        for (i, url) in urls.iter().enumerate() {
            let url = url.as_ref();
            info!("[{}/{}] {}", i + 1, total, url);

            let outcome = self.extractor.extract(page, url).await;
            summary.record(&outcome);

            if outcome == PostOutcome::Processed && i + 1 < total && !self.pacing.is_zero() {
                tokio::time::sleep(self.pacing).await;
            }
        }

        info!(%summary, "Batch finished");
        summary
    }
}
