use crate::app::{AppContext, Result};
use crate::domain::LinkSet;
use crate::harvest::{BatchRunner, BatchSummary, LinkDiscovery, PostExtractor};
use crate::scraper::{BrowserPage, ChromePage, KeepAlive};

/// Discover a profile's posts, then extract the ones discovery could not save.
pub async fn harvest_profile(ctx: &AppContext, url: &str) -> Result<()> {
    let (page, keep_alive) = open(ctx).await?;
    let result = run_profile(
        &page,
        &ctx.discovery(),
        &ctx.extractor(),
        ctx.config.harvest.pacing(),
        url,
    )
    .await;
    close(ctx, page, keep_alive).await;

    let (links, summary) = result?;
    println!(
        "Found {} posts, {} saved from the timeline",
        links.len(),
        links.saved_count()
    );
    println!("Extraction: {}", summary);
    Ok(())
}

pub async fn list_links(ctx: &AppContext, url: &str) -> Result<()> {
    let (page, keep_alive) = open(ctx).await?;
    let result = ctx.discovery().discover(&page, url).await;
    close(ctx, page, keep_alive).await;

    let links = result?;
    if links.is_empty() {
        println!("No links found");
        return Ok(());
    }
    for link in links.iter() {
        let kind = if link.simple { "simple " } else { "complex" };
        println!("{} {}", kind, link.url);
    }
    println!("\n{} links", links.len());
    Ok(())
}

pub async fn harvest_posts(ctx: &AppContext, urls: &[String]) -> Result<()> {
    let (page, keep_alive) = open(ctx).await?;
    let summary = BatchRunner::new(&ctx.extractor(), ctx.config.harvest.pacing())
        .run(&page, urls)
        .await;
    close(ctx, page, keep_alive).await;

    println!("Extraction: {}", summary);
    Ok(())
}

async fn run_profile(
    page: &dyn BrowserPage,
    discovery: &LinkDiscovery,
    extractor: &PostExtractor,
    pacing: std::time::Duration,
    url: &str,
) -> Result<(LinkSet, BatchSummary)> {
    let found = discovery.discover(page, url).await?;
    let pending = found.pending();

    let summary = if pending.is_empty() {
        BatchSummary::default()
    } else {
        BatchRunner::new(extractor, pacing).run(page, &pending).await
    };

    Ok((found, summary))
}

async fn open(ctx: &AppContext) -> Result<(ChromePage, Option<KeepAlive>)> {
    let page = ctx.session.acquire_page().await?;
    Ok((page, ctx.keep_alive()))
}

async fn close(ctx: &AppContext, page: ChromePage, keep_alive: Option<KeepAlive>) {
    if let Some(keep_alive) = keep_alive {
        keep_alive.shutdown().await;
    }
    page.close().await;
    ctx.session.release().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PostFeatures, ScannedPost};
    use crate::harvest::{ContentWriter, DiscoveryOptions, HarvestConfig};
    use crate::store::Archive;
    use crate::testing::{scanned, FakeFetcher, FakePage};
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    #[tokio::test(start_paused = true)]
    async fn test_profile_extracts_only_complex_posts() {
        let dir = TempDir::new().unwrap();
        let writer = ContentWriter::new(Archive::new(dir.path()), Arc::new(FakeFetcher::new()));
        let discovery = LinkDiscovery::new(
            writer.clone(),
            DiscoveryOptions::from_config(&HarvestConfig::default(), Duration::from_secs(10)),
        );
        let extractor = PostExtractor::new(writer, None, Duration::from_secs(10), 3);
        let poll = ScannedPost {
            features: PostFeatures {
                has_poll: true,
                ..Default::default()
            },
            ..scanned("/alice/status/2", "vote", &[])
        };
        let page = FakePage::new().with_feed(vec![vec![
            scanned("/alice/status/1", "hello", &[]),
            poll,
        ]]);

        let (found, summary) = run_profile(
            &page,
            &discovery,
            &extractor,
            Duration::from_secs(5),
            "https://x.com/alice",
        )
        .await
        .unwrap();

        assert_eq!(found.len(), 2);
        assert_eq!(summary.processed, 1);
        assert_eq!(
            page.goto_urls(),
            vec!["https://x.com/alice", "https://x.com/alice/status/2"]
        );
        assert!(dir.path().join("alice/1.txt").exists());
        assert!(dir.path().join("alice/2.txt").exists());
    }
}
