pub mod http_fetcher;

use async_trait::async_trait;
use url::Url;

use crate::app::Result;

pub use http_fetcher::HttpFetcher;

/// Downloads media bytes (images, stream segments) outside the browser.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Ask the media host for the original-size rendition.
///
/// Only URLs that already carry a `name=` size parameter are rewritten.
pub fn upgrade_image_url(raw: &str) -> String {
    let Ok(mut url) = Url::parse(raw) else {
        return raw.to_string();
    };

    if !url.query_pairs().any(|(k, _)| k == "name") {
        return raw.to_string();
    }

    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == "name" { "orig".into() } else { v };
            (k.into_owned(), v.into_owned())
        })
        .collect();

    url.query_pairs_mut().clear().extend_pairs(pairs);
    url.to_string()
}

/// File extension for an image URL, from its `format=` hint or path suffix.
pub fn image_extension(raw: &str) -> &'static str {
    let lower = raw.to_lowercase();
    if lower.contains("format=png") || lower.split('?').next().is_some_and(|p| p.ends_with(".png")) {
        "png"
    } else if lower.contains("format=gif") || lower.split('?').next().is_some_and(|p| p.ends_with(".gif")) {
        "gif"
    } else {
        "jpg"
    }
}
