use serde::{Deserialize, Serialize};
use url::Url;

use crate::app::{HarvestError, Result};

/// Identity of a post, taken from its canonical `/<author>/status/<id>` path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PostRef {
    pub author_id: String,
    pub post_id: String,
    /// Canonical URL with any trailing `/photo/1`, `/analytics`, query or fragment dropped
    pub url: String,
}

impl PostRef {
    /// Parse an absolute post URL.
    pub fn parse(raw: &str) -> Result<Self> {
        let url = Url::parse(raw).map_err(|_| HarvestError::InvalidPostUrl(raw.to_string()))?;
        Self::from_url(&url).ok_or_else(|| HarvestError::InvalidPostUrl(raw.to_string()))
    }

    /// Resolve a (possibly relative) href found on a rendered page.
    pub fn from_href(base: &Url, href: &str) -> Result<Self> {
        let url = base
            .join(href)
            .map_err(|_| HarvestError::InvalidPostUrl(href.to_string()))?;
        Self::from_url(&url).ok_or_else(|| HarvestError::InvalidPostUrl(href.to_string()))
    }

    fn from_url(url: &Url) -> Option<Self> {
        let host = url.host_str()?;
        let mut segments = url.path_segments()?.filter(|s| !s.is_empty());

        let author = segments.next()?;
        if segments.next()? != "status" {
            return None;
        }
        let id = segments.next()?;

        if author.is_empty() || id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }

        Some(Self {
            author_id: author.to_string(),
            post_id: id.to_string(),
            url: format!("{}://{}/{}/status/{}", url.scheme(), host, author, id),
        })
    }
}

/// Structural markers observed on a rendered post.
///
/// Presence of any marker element is definitive; so is its absence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PostFeatures {
    pub has_video: bool,
    pub has_poll: bool,
    pub has_card: bool,
    pub has_truncation: bool,
}

impl PostFeatures {
    /// A post is simple when its inline text and images are its whole content.
    pub fn is_simple(&self) -> bool {
        !self.has_video && !self.has_poll && !self.has_card && !self.has_truncation
    }
}

/// One post container as read from the timeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScannedPost {
    pub href: String,
    pub text: String,
    pub images: Vec<String>,
    pub author_name: Option<String>,
    pub timestamp: Option<String>,
    #[serde(flatten)]
    pub features: PostFeatures,
}

/// A reply inside the post's thread.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Reply {
    pub handle: String,
    pub text: String,
    pub timestamp: Option<String>,
}

/// Text content of a post, ready to be written to `{post_id}.txt`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PostText {
    pub author_name: Option<String>,
    pub handle: String,
    pub timestamp: Option<String>,
    pub url: String,
    pub body: String,
    pub replies: Vec<Reply>,
}

impl PostText {
    /// Build post text from a timeline scan, without visiting the post's own page.
    pub fn from_scan(post: &PostRef, scanned: &ScannedPost) -> Self {
        Self {
            author_name: scanned.author_name.clone(),
            handle: post.author_id.clone(),
            timestamp: scanned.timestamp.clone(),
            url: post.url.clone(),
            body: scanned.text.clone(),
            replies: Vec::new(),
        }
    }

    /// Keep only the replies written by the root post's own account.
    pub fn retain_author_replies(&mut self, replies: Vec<Reply>) {
        let handle = normalize_handle(&self.handle);
        self.replies = replies
            .into_iter()
            .filter(|r| normalize_handle(&r.handle) == handle && !r.text.trim().is_empty())
            .collect();
    }

    pub fn render(&self) -> String {
        let mut out = String::new();

        match &self.author_name {
            Some(name) if !name.is_empty() => {
                out.push_str(&format!("Author: {} (@{})\n", name, self.handle))
            }
            _ => out.push_str(&format!("Author: @{}\n", self.handle)),
        }
        out.push_str(&format!(
            "Date: {}\n",
            self.timestamp.as_deref().unwrap_or("unknown")
        ));
        out.push_str(&format!("URL: {}\n\n", self.url));
        out.push_str(self.body.trim());
        out.push('\n');

        if !self.replies.is_empty() {
            out.push_str(&format!("\n--- Thread replies by @{} ---\n", self.handle));
            for reply in &self.replies {
                out.push_str(&format!(
                    "\n[{}]\n{}\n",
                    reply.timestamp.as_deref().unwrap_or("unknown"),
                    reply.text.trim()
                ));
            }
        }

        out
    }

    /// Text written in place of the post when extraction fails.
    pub fn error_placeholder(url: &str, message: &str) -> String {
        format!("Error extracting post text: {}\nURL: {}\n", message, url)
    }
}

fn normalize_handle(handle: &str) -> String {
    handle.trim().trim_start_matches('@').to_lowercase()
}
