use std::sync::Arc;

use tracing::{debug, warn};

use crate::app::Result;
use crate::domain::{PostRef, PostText};
use crate::fetcher::{image_extension, upgrade_image_url, MediaFetcher};
use crate::store::{Archive, Artifact};

/// Writes post text and images into the archive.
#[derive(Clone)]
pub struct ContentWriter {
    archive: Archive,
    fetcher: Arc<dyn MediaFetcher>,
}

impl ContentWriter {
    pub fn new(archive: Archive, fetcher: Arc<dyn MediaFetcher>) -> Self {
        Self { archive, fetcher }
    }

    pub fn archive(&self) -> &Archive {
        &self.archive
    }

    pub fn fetcher(&self) -> &Arc<dyn MediaFetcher> {
        &self.fetcher
    }

    pub async fn write_text(&self, post: &PostRef, text: &PostText) -> Result<()> {
        self.archive
            .write(post, Artifact::Text, text.render())
            .await?;
        Ok(())
    }

    /// Download images one after another, named by their 1-based position.
    ///
    /// A failed image is logged and skipped; its number is not reused.
    /// Returns how many images were saved.
    pub async fn save_images(&self, post: &PostRef, urls: &[String]) -> usize {
        let mut saved = 0;

        for (i, raw) in urls.iter().enumerate() {
            let url = upgrade_image_url(raw);
            let artifact = Artifact::Image {
                index: i + 1,
                ext: image_extension(&url),
            };

            let bytes = match self.fetcher.fetch(&url).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(post_id = %post.post_id, url = %url, "Failed to download image: {}", e);
                    continue;
                }
            };

            match self.archive.write(post, artifact, bytes).await {
                Ok(path) => {
                    debug!(path = %path.display(), "Saved image");
                    saved += 1;
                }
                Err(e) => warn!(post_id = %post.post_id, "Failed to write image: {}", e),
            }
        }

        saved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeFetcher;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_images_numbered_by_position() {
        let dir = TempDir::new().unwrap();
        let fetcher = Arc::new(
            FakeFetcher::new().failing("https://pbs.twimg.com/media/b?format=jpg&name=orig"),
        );
        let writer = ContentWriter::new(Archive::new(dir.path()), fetcher.clone());
        let post = PostRef::parse("https://x.com/alice/status/5").unwrap();

        let saved = writer
            .save_images(
                &post,
                &[
                    "https://pbs.twimg.com/media/a?format=png&name=small".into(),
                    "https://pbs.twimg.com/media/b?format=jpg&name=small".into(),
                    "https://pbs.twimg.com/media/c?format=jpg&name=360x360".into(),
                ],
            )
            .await;

        assert_eq!(saved, 2);
        let author = dir.path().join("alice");
        assert!(author.join("5-1.png").exists());
        assert!(!author.join("5-2.jpg").exists());
        assert!(author.join("5-3.jpg").exists());
        assert_eq!(fetcher.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_write_text_renders_post() {
        let dir = TempDir::new().unwrap();
        let writer = ContentWriter::new(Archive::new(dir.path()), Arc::new(FakeFetcher::new()));
        let post = PostRef::parse("https://x.com/alice/status/5").unwrap();
        let text = PostText {
            handle: "alice".into(),
            url: post.url.clone(),
            body: "hi".into(),
            ..Default::default()
        };

        writer.write_text(&post, &text).await.unwrap();
        let written = std::fs::read_to_string(dir.path().join("alice/5.txt")).unwrap();
        assert!(written.contains("URL: https://x.com/alice/status/5"));
        assert!(written.contains("hi"));
    }
}
