use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessState {
    Pending,
    Partial,
    Done,
}

/// Per-post progress record, rewritten after each extraction step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostStatus {
    pub post_id: String,
    pub state: ProcessState,
    pub text: bool,
    pub images: usize,
    pub video: bool,
    pub rate_limited: bool,
    pub updated_at: DateTime<Utc>,
}

impl PostStatus {
    pub fn new(post_id: impl Into<String>) -> Self {
        Self {
            post_id: post_id.into(),
            state: ProcessState::Pending,
            text: false,
            images: 0,
            video: false,
            rate_limited: false,
            updated_at: Utc::now(),
        }
    }

    pub fn is_done(&self) -> bool {
        self.state == ProcessState::Done
    }

    /// Record a finished sub-step; the post stays partial until `finish`.
    pub fn advance(&mut self) {
        self.state = ProcessState::Partial;
        self.updated_at = Utc::now();
    }

    pub fn finish(&mut self) {
        self.state = ProcessState::Done;
        self.rate_limited = false;
        self.updated_at = Utc::now();
    }
}
