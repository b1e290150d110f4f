//! Client configuration.
//!
//! [`HltbConfig`] holds the site coordinates the client talks to. It is read
//! once per search and never mutated while a search is in flight.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{Result, SearchError};

/// Configuration for the HowLongToBeat client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HltbConfig {
    /// Site root. Script sources and endpoint paths are resolved against it.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Default search path used when no endpoint override is discovered.
    #[serde(default = "default_search_path")]
    pub search_path: String,
    /// `Referer` header sent with every request.
    #[serde(default = "default_base_url")]
    pub referer: String,
    /// Prefix joined with a record's image filename.
    #[serde(default = "default_image_url_prefix")]
    pub image_url_prefix: String,
    /// Substring identifying the main application bundle among script tags.
    #[serde(default = "default_bundle_marker")]
    pub bundle_marker: String,
    /// Path of the short-lived token endpoint.
    #[serde(default = "default_token_init_path")]
    pub token_init_path: String,
    /// Search path used with a token credential.
    #[serde(default = "default_token_search_path")]
    pub token_search_path: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Minimum similarity for a result to be kept (inclusive).
    #[serde(default = "default_min_similarity")]
    pub min_similarity: f64,
}

fn default_base_url() -> String {
    "https://howlongtobeat.com/".to_string()
}

fn default_search_path() -> String {
    "api/s/".to_string()
}

fn default_image_url_prefix() -> String {
    "https://howlongtobeat.com/games/".to_string()
}

fn default_bundle_marker() -> String {
    "_app-".to_string()
}

fn default_token_init_path() -> String {
    "api/search/init".to_string()
}

fn default_token_search_path() -> String {
    "api/search".to_string()
}

fn default_timeout() -> u64 {
    60
}

fn default_min_similarity() -> f64 {
    0.5
}

impl Default for HltbConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            search_path: default_search_path(),
            referer: default_base_url(),
            image_url_prefix: default_image_url_prefix(),
            bundle_marker: default_bundle_marker(),
            token_init_path: default_token_init_path(),
            token_search_path: default_token_search_path(),
            timeout_secs: default_timeout(),
            min_similarity: default_min_similarity(),
        }
    }
}

impl HltbConfig {
    /// Points the client at another site root, e.g. a mock server.
    ///
    /// The referer follows the base URL, and a trailing slash is added so
    /// relative paths join under the root.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        self.referer = base_url.clone();
        self.base_url = base_url;
        self
    }

    /// Sets the minimum similarity threshold.
    pub fn with_min_similarity(mut self, min_similarity: f64) -> Self {
        self.min_similarity = min_similarity;
        self
    }

    /// Sets the request timeout in seconds.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Parsed [`base_url`](Self::base_url).
    pub fn base(&self) -> Result<Url> {
        Ok(Url::parse(&self.base_url)?)
    }

    /// Appends a site path to the base URL, keeping any path the base has.
    ///
    /// A single leading slash is dropped, so `/api/s/` and `api/s/` land in
    /// the same place. Absolute and protocol-relative URLs are kept as is.
    pub fn join(&self, path: &str) -> Result<Url> {
        let path = match path.strip_prefix('/') {
            Some(rest) if !rest.starts_with('/') => rest,
            _ => path,
        };
        Ok(self.base()?.join(path)?)
    }

    /// Validates this configuration.
    ///
    /// Checks:
    /// - `base_url` must parse as an absolute URL
    /// - `timeout_secs` must be greater than 0
    /// - `min_similarity` must lie in `[0, 1]`
    pub fn validate(&self) -> Result<()> {
        self.base()?;
        if self.timeout_secs == 0 {
            return Err(SearchError::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.min_similarity) {
            return Err(SearchError::Config(
                "min_similarity must be between 0 and 1".into(),
            ));
        }
        Ok(())
    }
}
