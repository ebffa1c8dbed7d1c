//! Filesystem archive.
//!
//! Every post lives under `{root}/{author_id}/` with artifacts named after its
//! post id:
//!
//! ```text
//! {post_id}.txt
//! {post_id}-{n}.{jpg|png|gif}
//! {post_id}.mp4
//! {post_id}-video-info.txt
//! {post_id}-video-error.txt
//! {post_id}-video-player.png
//! {post_id}-rate-limited.txt
//! {post_id}-temp/
//! ```
//!
//! Progress records are kept apart from the artifacts, in
//! `{root}/{author_id}/.status/{post_id}.json`.

pub mod resume;

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::app::Result;
use crate::domain::{PostRef, PostStatus};

pub use resume::{ResumeDecision, ResumeGuard};

const STATUS_DIR: &str = ".status";
const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "png", "gif"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    Text,
    /// 1-based position of the image in the post
    Image { index: usize, ext: &'static str },
    Video,
    VideoInfo,
    VideoError,
    VideoPlayer,
    RateLimited,
    /// Per-post scratch directory for stream segments
    Scratch,
}

impl Artifact {
    pub fn file_name(&self, post_id: &str) -> String {
        match self {
            Self::Text => format!("{post_id}.txt"),
            Self::Image { index, ext } => format!("{post_id}-{index}.{ext}"),
            Self::Video => format!("{post_id}.mp4"),
            Self::VideoInfo => format!("{post_id}-video-info.txt"),
            Self::VideoError => format!("{post_id}-video-error.txt"),
            Self::VideoPlayer => format!("{post_id}-video-player.png"),
            Self::RateLimited => format!("{post_id}-rate-limited.txt"),
            Self::Scratch => format!("{post_id}-temp"),
        }
    }
}

/// Whether `name` is one of the artifacts that mark `post_id` as handled.
///
/// The scratch directory does not count.
pub fn is_artifact_name(name: &str, post_id: &str) -> bool {
    let Some(rest) = name.strip_prefix(post_id) else {
        return false;
    };

    match rest {
        ".txt" | ".mp4" | "-video-info.txt" | "-video-error.txt" | "-video-player.png"
        | "-rate-limited.txt" => true,
        _ => rest
            .strip_prefix('-')
            .and_then(|r| r.split_once('.'))
            .is_some_and(|(n, ext)| {
                !n.is_empty()
                    && n.chars().all(|c| c.is_ascii_digit())
                    && IMAGE_EXTENSIONS.contains(&ext)
            }),
    }
}

/// Output tree rooted at the configured output directory.
#[derive(Debug, Clone)]
pub struct Archive {
    root: PathBuf,
}

impl Archive {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn author_dir(&self, post: &PostRef) -> PathBuf {
        self.root.join(&post.author_id)
    }

    pub fn path(&self, post: &PostRef, artifact: Artifact) -> PathBuf {
        self.author_dir(post).join(artifact.file_name(&post.post_id))
    }

    fn status_path(&self, post: &PostRef) -> PathBuf {
        self.author_dir(post)
            .join(STATUS_DIR)
            .join(format!("{}.json", post.post_id))
    }

    /// Write an artifact, creating the author directory when needed.
    pub async fn write(
        &self,
        post: &PostRef,
        artifact: Artifact,
        contents: impl AsRef<[u8]>,
    ) -> Result<PathBuf> {
        let path = self.path(post, artifact);
        tokio::fs::create_dir_all(self.author_dir(post)).await?;
        tokio::fs::write(&path, contents).await?;
        Ok(path)
    }

    pub async fn remove(&self, post: &PostRef, artifact: Artifact) -> Result<()> {
        match tokio::fs::remove_file(self.path(post, artifact)).await {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    /// Whether any artifact for this post exists on disk.
    pub async fn has_artifacts(&self, post: &PostRef) -> Result<bool> {
        let mut entries = match tokio::fs::read_dir(self.author_dir(post)).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            if let Some(name) = entry.file_name().to_str() {
                if is_artifact_name(name, &post.post_id) {
                    return Ok(true);
                }
            }
        }

        Ok(false)
    }

    pub async fn read_status(&self, post: &PostRef) -> Result<Option<PostStatus>> {
        match tokio::fs::read(self.status_path(post)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Replace the status record atomically (write to a temp file, then rename).
    pub async fn write_status(&self, post: &PostRef, status: &PostStatus) -> Result<()> {
        let path = self.status_path(post);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(status)?).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ProcessState;
    use tempfile::TempDir;

    fn post() -> PostRef {
        PostRef::parse("https://x.com/alice/status/100").unwrap()
    }

    #[test]
    fn test_artifact_file_names() {
        let id = "100";
        assert_eq!(Artifact::Text.file_name(id), "100.txt");
        assert_eq!(
            Artifact::Image { index: 2, ext: "png" }.file_name(id),
            "100-2.png"
        );
        assert_eq!(Artifact::Video.file_name(id), "100.mp4");
        assert_eq!(Artifact::VideoInfo.file_name(id), "100-video-info.txt");
        assert_eq!(Artifact::VideoError.file_name(id), "100-video-error.txt");
        assert_eq!(Artifact::VideoPlayer.file_name(id), "100-video-player.png");
        assert_eq!(Artifact::RateLimited.file_name(id), "100-rate-limited.txt");
        assert_eq!(Artifact::Scratch.file_name(id), "100-temp");
    }

    #[test]
    fn test_is_artifact_name() {
        assert!(is_artifact_name("100.txt", "100"));
        assert!(is_artifact_name("100-1.jpg", "100"));
        assert!(is_artifact_name("100-12.gif", "100"));
        assert!(is_artifact_name("100-rate-limited.txt", "100"));
        assert!(is_artifact_name("100-video-player.png", "100"));

        assert!(!is_artifact_name("1000.txt", "100"));
        assert!(!is_artifact_name("100-temp", "100"));
        assert!(!is_artifact_name("100-x.jpg", "100"));
        assert!(!is_artifact_name("100-1.webp", "100"));
        assert!(!is_artifact_name("10.txt", "100"));
    }

    #[tokio::test]
    async fn test_has_artifacts_missing_dir() {
        let dir = TempDir::new().unwrap();
        let archive = Archive::new(dir.path());
        assert!(!archive.has_artifacts(&post()).await.unwrap());
    }

    #[tokio::test]
    async fn test_has_artifacts_ignores_other_posts() {
        let dir = TempDir::new().unwrap();
        let archive = Archive::new(dir.path());
        let other = PostRef::parse("https://x.com/alice/status/1001").unwrap();

        archive.write(&other, Artifact::Text, "other").await.unwrap();
        assert!(!archive.has_artifacts(&post()).await.unwrap());

        archive
            .write(&post(), Artifact::Image { index: 1, ext: "jpg" }, b"img")
            .await
            .unwrap();
        assert!(archive.has_artifacts(&post()).await.unwrap());
    }

    #[tokio::test]
    async fn test_status_written_atomically_and_read_back() {
        let dir = TempDir::new().unwrap();
        let archive = Archive::new(dir.path());
        assert!(archive.read_status(&post()).await.unwrap().is_none());

        let mut status = PostStatus::new("100");
        status.text = true;
        status.advance();
        archive.write_status(&post(), &status).await.unwrap();

        let read = archive.read_status(&post()).await.unwrap().unwrap();
        assert_eq!(read.state, ProcessState::Partial);
        assert!(read.text);

        let status_dir = dir.path().join("alice").join(".status");
        let names: Vec<_> = std::fs::read_dir(status_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["100.json"]);
    }

    #[tokio::test]
    async fn test_remove_missing_is_ok() {
        let dir = TempDir::new().unwrap();
        let archive = Archive::new(dir.path());
        archive.remove(&post(), Artifact::RateLimited).await.unwrap();
    }
}
