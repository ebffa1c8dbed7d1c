use tracing::debug;

use crate::app::Result;
use crate::domain::PostRef;
use crate::store::Archive;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeDecision {
    /// Nothing recorded for this post yet
    Fresh,
    /// A previous run stopped part way; process it again
    Resume,
    /// Already handled, skip
    Done,
}

impl ResumeDecision {
    pub fn should_skip(&self) -> bool {
        *self == Self::Done
    }
}

/// Decides whether a post still needs processing.
///
/// The status record is authoritative. Posts written without one (older
/// trees) fall back to artifact sniffing, where any artifact counts as done.
pub struct ResumeGuard<'a> {
    archive: &'a Archive,
}

impl<'a> ResumeGuard<'a> {
    pub fn new(archive: &'a Archive) -> Self {
        Self { archive }
    }

    pub async fn check(&self, post: &PostRef) -> Result<ResumeDecision> {
        if let Some(status) = self.archive.read_status(post).await? {
            let decision = if status.is_done() {
                ResumeDecision::Done
            } else {
                ResumeDecision::Resume
            };
            debug!(post_id = %post.post_id, state = ?status.state, "Status record found");
            return Ok(decision);
        }

        if self.archive.has_artifacts(post).await? {
            debug!(post_id = %post.post_id, "Artifacts found without status record");
            return Ok(ResumeDecision::Done);
        }

        Ok(ResumeDecision::Fresh)
    }
}
