use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, REFERER};
use reqwest::Client;

use crate::app::Result;
use crate::fetcher::MediaFetcher;

const DEFAULT_REFERER: &str = "https://x.com/";

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(REFERER, HeaderValue::from_static(DEFAULT_REFERER));

        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(15))
            .gzip(true)
            .brotli(true)
            .user_agent(user_agent)
            .default_headers(headers)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl MediaFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send().await?;
        response.error_for_status_ref()?;

        let body = response.bytes().await?.to_vec();
        tracing::debug!(url, bytes = body.len(), "Fetched media");
        Ok(body)
    }
}
