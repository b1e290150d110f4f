//! HTTP transport using reqwest, with User-Agent rotation.

use std::time::Duration;

use async_trait::async_trait;
use rand::seq::SliceRandom;
use reqwest::header::{ACCEPT, CONTENT_TYPE, REFERER, USER_AGENT};
use reqwest::{Client, Response};
use serde::Serialize;
use tracing::debug;

use crate::fetcher::PageFetcher;
use crate::{HltbConfig, Result, SearchError};

/// Header carrying a short-lived token credential.
pub const AUTH_TOKEN_HEADER: &str = "x-auth-token";

/// Realistic browser User-Agent strings, picked at random per request.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:133.0) Gecko/20100101 Firefox/133.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/18.1 Safari/605.1.15",
];

/// Select a random User-Agent string from the rotation list.
pub fn random_user_agent() -> &'static str {
    let mut rng = rand::thread_rng();
    USER_AGENTS
        .choose(&mut rng)
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

/// A fetcher that talks to the site over plain HTTP via reqwest.
///
/// Every request gets a fresh random User-Agent and the configured referer.
/// The timeout is applied client-wide, so a stalled request surfaces as
/// [`SearchError::Http`] rather than hanging.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    referer: String,
}

impl HttpFetcher {
    /// Creates a new `HttpFetcher` from the client configuration.
    pub fn new(config: &HltbConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;
        Ok(Self::with_client(client, &config.referer))
    }

    /// Creates an `HttpFetcher` with a custom reqwest client.
    pub fn with_client(client: Client, referer: impl Into<String>) -> Self {
        Self {
            client,
            referer: referer.into(),
        }
    }

    /// Sends a GET and returns the raw response, without checking its status.
    pub async fn get(&self, url: &str) -> Result<Response> {
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .header(USER_AGENT, random_user_agent())
            .header(REFERER, &self.referer)
            .send()
            .await?;
        Ok(response)
    }

    /// POSTs `payload` as JSON.
    ///
    /// Only transport failures are errors here; the caller decides what a
    /// non-success status means.
    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        url: &str,
        payload: &T,
        auth_token: Option<&str>,
    ) -> Result<Response> {
        debug!("POST {}", url);
        let body = serde_json::to_vec(payload)?;
        let mut request = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .header(USER_AGENT, random_user_agent())
            .header(ACCEPT, "*/*")
            .header(REFERER, &self.referer)
            .body(body);
        if let Some(token) = auth_token {
            request = request.header(AUTH_TOKEN_HEADER, token);
        }
        Ok(request.send().await?)
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let response = self.get(url).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::Status(status.as_u16()));
        }
        Ok(response.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_user_agent_returns_listed_ua() {
        let ua = random_user_agent();
        assert!(USER_AGENTS.contains(&ua));
        assert!(ua.starts_with("Mozilla/5.0"));
    }

    #[test]
    fn test_http_fetcher_new() {
        let fetcher = HttpFetcher::new(&HltbConfig::default()).unwrap();
        assert_eq!(fetcher.referer, "https://howlongtobeat.com/");
    }

    #[test]
    fn test_http_fetcher_with_client() {
        let client = Client::builder().build().unwrap();
        let fetcher = HttpFetcher::with_client(client, "http://localhost/");
        assert_eq!(fetcher.referer, "http://localhost/");
    }
}
