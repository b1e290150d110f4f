//! Search orchestration.

use std::sync::Arc;

use reqwest::Response;
use tracing::{debug, warn};
use url::Url;

use crate::credential::{default_resolvers, Credential, CredentialKind, Resolver};
use crate::fetcher::PageFetcher;
use crate::fetcher_http::HttpFetcher;
use crate::parser::ResultParser;
use crate::query::SearchRequest;
use crate::{HltbConfig, HltbEntry, Result, SearchModifier};

/// HowLongToBeat search client.
///
/// Every search discovers a fresh credential, sends the request and ranks
/// the response. Failures never surface to the caller: they are logged and
/// the search returns an empty list.
pub struct HowLongToBeat {
    config: HltbConfig,
    http: Arc<HttpFetcher>,
    resolvers: Vec<Resolver>,
    parser: ResultParser,
}

impl HowLongToBeat {
    /// Creates a client for the live site with default settings.
    pub fn new() -> Result<Self> {
        Self::with_config(HltbConfig::default())
    }

    /// Creates a client from a configuration.
    pub fn with_config(config: HltbConfig) -> Result<Self> {
        config.validate()?;
        let http = Arc::new(HttpFetcher::new(&config)?);
        let fetcher: Arc<dyn PageFetcher> = http.clone();
        let resolvers = default_resolvers(fetcher, &config)?;
        let parser = ResultParser::new(config.min_similarity)
            .with_image_url_prefix(config.image_url_prefix.clone());

        Ok(Self {
            config,
            http,
            resolvers,
            parser,
        })
    }

    /// Sets the minimum similarity a result needs to be returned.
    ///
    /// Fails with [`SearchError::Config`](crate::SearchError::Config) unless
    /// the value lies in `[0, 1]`.
    pub fn with_min_similarity(mut self, min_similarity: f64) -> Result<Self> {
        let config = self.config.clone().with_min_similarity(min_similarity);
        config.validate()?;
        self.config = config;
        self.parser = ResultParser::new(min_similarity)
            .with_image_url_prefix(self.config.image_url_prefix.clone());
        Ok(self)
    }

    /// Replaces the resolver chain. Resolvers are tried in order.
    pub fn with_resolvers(mut self, resolvers: Vec<Resolver>) -> Self {
        self.resolvers = resolvers;
        self
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &HltbConfig {
        &self.config
    }

    /// Searches for `query` and returns matches ranked by similarity.
    ///
    /// An empty query returns nothing without touching the network.
    pub async fn search(&self, query: &str, modifier: SearchModifier) -> Vec<HltbEntry> {
        self.search_page(query, modifier, 1).await
    }

    /// Like [`search`](Self::search), for a given result page (1-indexed).
    pub async fn search_page(
        &self,
        query: &str,
        modifier: SearchModifier,
        page: u32,
    ) -> Vec<HltbEntry> {
        if query.trim().is_empty() {
            return Vec::new();
        }

        match self.send_request(query, modifier, page).await {
            Some(body) => self.parser.parse(&body, query),
            None => Vec::new(),
        }
    }

    /// Discovers a credential, trying each resolver narrowly and then
    /// exhaustively before moving on to the next.
    pub async fn resolve_credential(&self) -> Option<Credential> {
        for resolver in &self.resolvers {
            if let Some(credential) = resolver.resolve(false).await {
                debug!("Resolved {:?} credential via {}", credential.kind, resolver.name());
                return Some(credential);
            }
            if resolver.supports_exhaustive() {
                if let Some(credential) = resolver.resolve(true).await {
                    debug!(
                        "Resolved {:?} credential via exhaustive {} scan",
                        credential.kind,
                        resolver.name()
                    );
                    return Some(credential);
                }
            }
        }
        None
    }

    /// Sends one search request and returns the raw response body.
    ///
    /// `None` means no credential, a failed request or a non-success status.
    pub async fn send_request(
        &self,
        query: &str,
        modifier: SearchModifier,
        page: u32,
    ) -> Option<String> {
        let Some(credential) = self.resolve_credential().await else {
            warn!("No search credential could be discovered");
            return None;
        };

        let request = SearchRequest::new(query, modifier, page);
        match credential.kind {
            CredentialKind::ApiKey => self.send_with_key(&credential, request).await,
            CredentialKind::Token => self.send_with_token(&credential, request).await,
        }
    }

    async fn send_with_key(&self, credential: &Credential, request: SearchRequest) -> Option<String> {
        let path = credential
            .endpoint_override
            .as_deref()
            .unwrap_or(self.config.search_path.as_str());
        let endpoint = self.endpoint(path)?;
        let url = format!("{}{}", endpoint, credential.key);

        match self.http.post_json(&url, &request, None).await {
            Ok(response) => read_body(response).await,
            Err(e) => {
                // Only transport failures fall back; a bad status is final.
                warn!("Search request failed: {}; retrying with key in payload", e);
                let request = request.with_user_id(credential.key.clone());
                match self.http.post_json(endpoint.as_str(), &request, None).await {
                    Ok(response) => read_body(response).await,
                    Err(e) => {
                        warn!("Error fetching search results: {}", e);
                        None
                    }
                }
            }
        }
    }

    async fn send_with_token(
        &self,
        credential: &Credential,
        request: SearchRequest,
    ) -> Option<String> {
        let endpoint = self.endpoint(&self.config.token_search_path)?;
        match self
            .http
            .post_json(endpoint.as_str(), &request, Some(credential.key.as_str()))
            .await
        {
            Ok(response) => read_body(response).await,
            Err(e) => {
                warn!("Error fetching search results: {}", e);
                None
            }
        }
    }

    fn endpoint(&self, path: &str) -> Option<Url> {
        match self.config.join(path) {
            Ok(url) => Some(url),
            Err(e) => {
                warn!("Invalid search endpoint {}: {}", path, e);
                None
            }
        }
    }
}

async fn read_body(response: Response) -> Option<String> {
    let status = response.status();
    if !status.is_success() {
        warn!("Search request returned status {}", status);
        return None;
    }
    match response.text().await {
        Ok(body) => Some(body),
        Err(e) => {
            warn!("Failed to read search response: {}", e);
            None
        }
    }
}
