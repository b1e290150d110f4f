//! Page fetcher abstraction for retrieving markup and script text.

use async_trait::async_trait;

use crate::Result;

/// Trait for fetching the text content of a URL.
///
/// Credential discovery only needs plain GETs, so resolvers depend on this
/// trait rather than on a concrete client. Implementations must treat a
/// non-success status as an error.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches the body of the given URL as text.
    async fn fetch(&self, url: &str) -> Result<String>;
}

#[cfg(test)]
pub(crate) mod mock {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::SearchError;

    /// In-memory fetcher keyed by absolute URL; unknown URLs answer 404.
    #[derive(Default)]
    pub(crate) struct MockFetcher {
        pages: HashMap<String, String>,
        calls: AtomicUsize,
    }

    impl MockFetcher {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn with_page(mut self, url: &str, body: &str) -> Self {
            self.pages.insert(url.to_string(), body.to_string());
            self
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PageFetcher for MockFetcher {
        async fn fetch(&self, url: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.pages
                .get(url)
                .cloned()
                .ok_or(SearchError::Status(404))
        }
    }

    #[tokio::test]
    async fn test_mock_fetcher_known_and_unknown() {
        let fetcher = MockFetcher::new().with_page("https://a.test/", "hello");
        assert_eq!(fetcher.fetch("https://a.test/").await.unwrap(), "hello");
        assert!(matches!(
            fetcher.fetch("https://a.test/missing").await,
            Err(SearchError::Status(404))
        ));
        assert_eq!(fetcher.calls(), 2);
    }
}
