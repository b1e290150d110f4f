//! Discovery of the credential that authorizes a search call.
//!
//! The site has shipped two calling contracts:
//!
//! - an API key embedded in the main script bundle, sometimes with its own
//!   search endpoint, found by [`ScriptResolver`]
//! - a short-lived token handed out by an init endpoint, fetched by
//!   [`TokenResolver`]
//!
//! Both sit behind [`Resolver`]; the caller tries each in turn and uses the
//! first that yields a [`Credential`].

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use regex::Regex;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::fetcher::PageFetcher;
use crate::{HltbConfig, Result, SearchError};

/// How a credential is attached to the search call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialKind {
    /// Key appended to the search URL (or sent as the user id on fallback).
    ApiKey,
    /// Token sent in the `x-auth-token` header.
    Token,
}

/// The calling contract discovered for one search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// API key or token.
    pub key: String,
    /// Search path found next to the key, replacing the default one.
    pub endpoint_override: Option<String>,
    pub kind: CredentialKind,
}

impl Credential {
    /// A key-style credential.
    pub fn api_key(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            endpoint_override: None,
            kind: CredentialKind::ApiKey,
        }
    }

    /// A token-style credential.
    pub fn token(token: impl Into<String>) -> Self {
        Self {
            key: token.into(),
            endpoint_override: None,
            kind: CredentialKind::Token,
        }
    }

    /// Sets the endpoint override.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint_override = Some(endpoint.into());
        self
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| SearchError::Parse(format!("Failed to compile pattern: {}", e)))
}

/// One way of pulling an API key out of script source.
pub trait KeyExtractor: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Returns the key if this embedding style is present.
    fn extract(&self, script: &str) -> Option<String>;
}

/// Matches a literal `users: { id: "<key>" }` object.
pub struct UserIdKeyExtractor {
    pattern: Regex,
}

impl UserIdKeyExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            pattern: compile(r#"users\s*:\s*\{\s*id\s*:\s*"([^"]+)""#)?,
        })
    }
}

impl KeyExtractor for UserIdKeyExtractor {
    fn name(&self) -> &'static str {
        "user-id"
    }

    fn extract(&self, script: &str) -> Option<String> {
        self.pattern
            .captures(script)
            .map(|caps| caps[1].to_string())
    }
}

/// Matches `"/api/<word>/".concat("a").concat("b")...`; the key is the
/// fragments joined in order.
pub struct ConcatKeyExtractor {
    chain: Regex,
    fragment: Regex,
}

impl ConcatKeyExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            chain: compile(r#""/api/\w+/"((?:\.concat\("[^"]+"\))+)"#)?,
            fragment: compile(r#"\.concat\("([^"]+)"\)"#)?,
        })
    }
}

impl KeyExtractor for ConcatKeyExtractor {
    fn name(&self) -> &'static str {
        "concat"
    }

    fn extract(&self, script: &str) -> Option<String> {
        let chain = self.chain.captures(script)?;
        let key: String = self
            .fragment
            .captures_iter(&chain[1])
            .map(|caps| caps[1].to_string())
            .collect();
        (!key.is_empty()).then_some(key)
    }
}

/// Finds the `fetch("/api/...")` call whose concat chain spells out a key.
pub struct EndpointMatcher {
    call: Regex,
    fragment: Regex,
}

impl EndpointMatcher {
    pub fn new() -> Result<Self> {
        Ok(Self {
            call: compile(
                r#"fetch\(\s*["'](/api/[^"']*)["']((?:\s*\.concat\(\s*["'][^"']*["']\s*\))*)\s*,"#,
            )?,
            fragment: compile(r#"\.concat\(\s*["']([^"']*)["']\s*\)"#)?,
        })
    }

    /// Literal path of the first fetch call whose concatenated suffix equals `key`.
    pub fn find(&self, script: &str, key: &str) -> Option<String> {
        self.call.captures_iter(script).find_map(|caps| {
            let suffix: String = self
                .fragment
                .captures_iter(&caps[2])
                .map(|c| c[1].to_string())
                .collect();
            (suffix == key).then(|| caps[1].to_string())
        })
    }
}

/// Ordered key extractors plus endpoint matching, applied to one script.
pub struct ScriptScanner {
    extractors: Vec<Box<dyn KeyExtractor>>,
    endpoints: EndpointMatcher,
}

impl ScriptScanner {
    /// Scanner with the known embedding styles, most specific first.
    pub fn new() -> Result<Self> {
        Ok(Self {
            extractors: vec![
                Box::new(UserIdKeyExtractor::new()?),
                Box::new(ConcatKeyExtractor::new()?),
            ],
            endpoints: EndpointMatcher::new()?,
        })
    }

    /// Appends another extractor, tried after the existing ones.
    pub fn with_extractor<E: KeyExtractor + 'static>(mut self, extractor: E) -> Self {
        self.extractors.push(Box::new(extractor));
        self
    }

    /// Extracts a credential from script source.
    pub fn scan(&self, script: &str) -> Option<Credential> {
        let (name, key) = self
            .extractors
            .iter()
            .find_map(|e| e.extract(script).map(|key| (e.name(), key)))?;
        debug!("Found API key via {} pattern", name);

        match self.endpoints.find(script, &key) {
            Some(endpoint) => {
                debug!("Key is bound to endpoint {}", endpoint);
                Some(Credential::api_key(key).with_endpoint(endpoint))
            }
            None => Some(Credential::api_key(key)),
        }
    }
}

/// Discovers an API key by scraping the site's script bundles.
pub struct ScriptResolver {
    fetcher: Arc<dyn PageFetcher>,
    config: HltbConfig,
    scanner: ScriptScanner,
}

impl ScriptResolver {
    /// Creates a resolver fetching pages through `fetcher`.
    pub fn new(fetcher: Arc<dyn PageFetcher>, config: HltbConfig) -> Result<Self> {
        Ok(Self {
            fetcher,
            config,
            scanner: ScriptScanner::new()?,
        })
    }

    /// Replaces the script scanner.
    pub fn with_scanner(mut self, scanner: ScriptScanner) -> Self {
        self.scanner = scanner;
        self
    }

    /// Looks for a key in the app bundle, or in every script when `exhaustive`.
    ///
    /// Failures are logged and reported as `None`.
    pub async fn resolve(&self, exhaustive: bool) -> Option<Credential> {
        match self.discover(exhaustive).await {
            Ok(credential) => credential,
            Err(e) => {
                warn!("Failed to fetch {}: {}", self.config.base_url, e);
                None
            }
        }
    }

    async fn discover(&self, exhaustive: bool) -> Result<Option<Credential>> {
        let html = self.fetcher.fetch(&self.config.base_url).await?;
        let sources = self.script_sources(&html, exhaustive)?;
        debug!(
            "Scanning {} script(s) (exhaustive: {})",
            sources.len(),
            exhaustive
        );

        for src in sources {
            let url = match self.config.join(&src) {
                Ok(url) => url,
                Err(e) => {
                    warn!("Skipping script with bad source {}: {}", src, e);
                    continue;
                }
            };
            let script = match self.fetcher.fetch(url.as_str()).await {
                Ok(script) => script,
                Err(e) => {
                    warn!("Error fetching script {}: {}", url, e);
                    continue;
                }
            };
            if let Some(credential) = self.scanner.scan(&script) {
                return Ok(Some(credential));
            }
        }

        debug!("No API key found in scripts");
        Ok(None)
    }

    /// `src` attributes of the page's script tags, filtered to the app
    /// bundle unless `exhaustive`.
    fn script_sources(&self, html: &str, exhaustive: bool) -> Result<Vec<String>> {
        let document = Html::parse_document(html);
        let selector = Selector::parse("script[src]")
            .map_err(|e| SearchError::Parse(format!("Failed to parse selector: {:?}", e)))?;

        Ok(document
            .select(&selector)
            .filter_map(|el| el.value().attr("src"))
            .filter(|src| exhaustive || src.contains(&self.config.bundle_marker))
            .map(str::to_string)
            .collect())
    }
}

#[derive(Deserialize)]
struct InitResponse {
    token: Option<String>,
}

/// Obtains a short-lived token from the site's init endpoint.
pub struct TokenResolver {
    fetcher: Arc<dyn PageFetcher>,
    config: HltbConfig,
}

impl TokenResolver {
    pub fn new(fetcher: Arc<dyn PageFetcher>, config: HltbConfig) -> Self {
        Self { fetcher, config }
    }

    /// Requests a token. Failures are logged and reported as `None`.
    pub async fn resolve(&self) -> Option<Credential> {
        match self.request_token().await {
            Ok(Some(token)) => Some(Credential::token(token)),
            Ok(None) => {
                warn!("Init response carried no token");
                None
            }
            Err(e) => {
                warn!("Failed to obtain search token: {}", e);
                None
            }
        }
    }

    async fn request_token(&self) -> Result<Option<String>> {
        let mut url = self.config.join(&self.config.token_init_path)?;
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        url.query_pairs_mut().append_pair("t", &now.to_string());

        let body = self.fetcher.fetch(url.as_str()).await?;
        let response: InitResponse = serde_json::from_str(&body)?;
        Ok(response.token.filter(|token| !token.is_empty()))
    }
}

/// The calling contracts the site is known to use.
pub enum Resolver {
    Script(ScriptResolver),
    Token(TokenResolver),
}

impl Resolver {
    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Script(_) => "script",
            Self::Token(_) => "token",
        }
    }

    /// Resolves a credential. `exhaustive` widens a script scan to every
    /// script on the page; the token resolver ignores it.
    pub async fn resolve(&self, exhaustive: bool) -> Option<Credential> {
        match self {
            Self::Script(resolver) => resolver.resolve(exhaustive).await,
            Self::Token(resolver) => resolver.resolve().await,
        }
    }

    /// Whether a narrow attempt can be widened by an exhaustive one.
    pub fn supports_exhaustive(&self) -> bool {
        matches!(self, Self::Script(_))
    }
}

/// The default resolver chain: script keys first, then tokens.
pub fn default_resolvers(
    fetcher: Arc<dyn PageFetcher>,
    config: &HltbConfig,
) -> Result<Vec<Resolver>> {
    Ok(vec![
        Resolver::Script(ScriptResolver::new(Arc::clone(&fetcher), config.clone())?),
        Resolver::Token(TokenResolver::new(fetcher, config.clone())),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::mock::MockFetcher;

    const BASE: &str = "https://howlongtobeat.com/";

    const HOME: &str = r#"<!DOCTYPE html><html><head>
        <script src="/_next/static/chunks/framework-abc.js" defer></script>
        <script src="/_next/static/chunks/pages/_app-0123abcd.js" defer></script>
        <script>window.inline = true;</script>
        </head><body></body></html>"#;

    fn resolver(fetcher: MockFetcher) -> (Arc<MockFetcher>, ScriptResolver) {
        let fetcher = Arc::new(fetcher);
        let resolver = ScriptResolver::new(fetcher.clone(), HltbConfig::default()).unwrap();
        (fetcher, resolver)
    }

    #[test]
    fn test_user_id_extractor() {
        let extractor = UserIdKeyExtractor::new().unwrap();
        let script = r#"var o={users : { id : "4b4f0a5c9d1e" ,sortCategory:"postcount"}}"#;
        assert_eq!(extractor.extract(script).as_deref(), Some("4b4f0a5c9d1e"));
        assert!(extractor.extract("users:{name:\"x\"}").is_none());
    }

    #[test]
    fn test_concat_extractor_joins_fragments_in_order() {
        let extractor = ConcatKeyExtractor::new().unwrap();
        let script = r#"let u="/api/find/".concat("4b4f").concat("0a5c").concat("9d1e");"#;
        assert_eq!(extractor.extract(script).as_deref(), Some("4b4f0a5c9d1e"));
    }

    #[test]
    fn test_concat_extractor_ignores_unrelated_concats() {
        let extractor = ConcatKeyExtractor::new().unwrap();
        let script = r#"a.concat("zz");x="/api/s/".concat("ab").concat("cd");b.concat("yy")"#;
        assert_eq!(extractor.extract(script).as_deref(), Some("abcd"));
    }

    #[test]
    fn test_concat_extractor_requires_chain() {
        let extractor = ConcatKeyExtractor::new().unwrap();
        assert!(extractor.extract(r#"fetch("/api/s/")"#).is_none());
    }

    #[test]
    fn test_user_id_pattern_wins_over_concat() {
        let scanner = ScriptScanner::new().unwrap();
        let script = r#"x="/api/s/".concat("aa").concat("bb");y={users:{id:"static"}}"#;
        let credential = scanner.scan(script).unwrap();
        assert_eq!(credential.key, "static");
        assert_eq!(credential.kind, CredentialKind::ApiKey);
    }

    #[test]
    fn test_endpoint_bound_to_matching_key() {
        let scanner = ScriptScanner::new().unwrap();
        let script = r#"
            x="/api/lookup/".concat("ab").concat("cd");
            fetch("/api/other/".concat("zz"),{method:"POST"});
            fetch("/api/lookup/".concat("ab").concat("cd"),{method:"POST",body:b});
        "#;
        let credential = scanner.scan(script).unwrap();
        assert_eq!(credential.key, "abcd");
        assert_eq!(credential.endpoint_override.as_deref(), Some("/api/lookup/"));
    }

    #[test]
    fn test_endpoint_matcher_handles_whitespace_and_quotes() {
        let matcher = EndpointMatcher::new().unwrap();
        let script = r#"fetch( '/api/seek/' .concat( 'k1' ) .concat('k2') , opts)"#;
        assert_eq!(matcher.find(script, "k1k2").as_deref(), Some("/api/seek/"));
        assert!(matcher.find(script, "k1").is_none());
    }

    #[test]
    fn test_no_endpoint_when_no_fetch_matches() {
        let scanner = ScriptScanner::new().unwrap();
        let credential = scanner.scan(r#"q={users:{id:"abc"}};fetch("/api/s/",o)"#).unwrap();
        assert_eq!(credential.key, "abc");
        assert!(credential.endpoint_override.is_none());
    }

    #[test]
    fn test_scan_without_key() {
        let scanner = ScriptScanner::new().unwrap();
        assert!(scanner.scan("console.log('nothing here')").is_none());
    }

    struct FixedExtractor;

    impl KeyExtractor for FixedExtractor {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn extract(&self, script: &str) -> Option<String> {
            script.contains("MAGIC").then(|| "fixed-key".to_string())
        }
    }

    #[test]
    fn test_custom_extractor_tried_last() {
        let scanner = ScriptScanner::new().unwrap().with_extractor(FixedExtractor);
        assert_eq!(scanner.scan("MAGIC").unwrap().key, "fixed-key");
        assert_eq!(scanner.scan(r#"MAGIC users:{id:"first"}"#).unwrap().key, "first");
    }

    #[test]
    fn test_script_sources_filtered_to_bundle() {
        let (_, resolver) = resolver(MockFetcher::new());
        let narrow = resolver.script_sources(HOME, false).unwrap();
        assert_eq!(narrow, vec!["/_next/static/chunks/pages/_app-0123abcd.js"]);
        let all = resolver.script_sources(HOME, true).unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_resolve_from_app_bundle() {
        let fetcher = MockFetcher::new()
            .with_page(BASE, HOME)
            .with_page(
                "https://howlongtobeat.com/_next/static/chunks/pages/_app-0123abcd.js",
                r#"fetch("/api/locate/".concat("9f").concat("3c"),{method:"POST"});k="/api/locate/".concat("9f").concat("3c")"#,
            );
        let (fetcher, resolver) = resolver(fetcher);

        let credential = resolver.resolve(false).await.unwrap();
        assert_eq!(credential.key, "9f3c");
        assert_eq!(credential.endpoint_override.as_deref(), Some("/api/locate/"));
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_resolver_uses_injected_scanner() {
        let fetcher = MockFetcher::new()
            .with_page(BASE, HOME)
            .with_page(
                "https://howlongtobeat.com/_next/static/chunks/pages/_app-0123abcd.js",
                "MAGIC",
            );
        let (_, resolver) = resolver(fetcher);
        assert!(resolver.resolve(false).await.is_none());

        let resolver =
            resolver.with_scanner(ScriptScanner::new().unwrap().with_extractor(FixedExtractor));
        assert_eq!(
            resolver.resolve(false).await,
            Some(Credential::api_key("fixed-key"))
        );
    }

    #[test]
    fn test_credential_builders() {
        let credential = Credential::api_key("k").with_endpoint("/api/find/");
        assert_eq!(credential.kind, CredentialKind::ApiKey);
        assert_eq!(credential.endpoint_override.as_deref(), Some("/api/find/"));
        assert_eq!(Credential::token("t").kind, CredentialKind::Token);
    }

    #[tokio::test]
    async fn test_non_exhaustive_skips_other_scripts() {
        let fetcher = MockFetcher::new()
            .with_page(BASE, HOME)
            .with_page(
                "https://howlongtobeat.com/_next/static/chunks/framework-abc.js",
                r#"z={users:{id:"hidden"}}"#,
            );
        let (_, resolver) = resolver(fetcher);

        assert!(resolver.resolve(false).await.is_none());
        assert_eq!(resolver.resolve(true).await.unwrap().key, "hidden");
    }

    #[tokio::test]
    async fn test_failed_script_fetch_is_skipped() {
        let home = r#"<script src="/a_app-1.js"></script><script src="/b_app-2.js"></script>"#;
        let fetcher = MockFetcher::new()
            .with_page(BASE, home)
            .with_page("https://howlongtobeat.com/b_app-2.js", r#"users:{id:"second"}"#);
        let (fetcher, resolver) = resolver(fetcher);

        assert_eq!(resolver.resolve(false).await.unwrap().key, "second");
        assert_eq!(fetcher.calls(), 3);
    }

    #[tokio::test]
    async fn test_home_page_failure_yields_none() {
        let (_, resolver) = resolver(MockFetcher::new());
        assert!(resolver.resolve(true).await.is_none());
    }

    #[tokio::test]
    async fn test_absolute_script_urls_are_kept() {
        let home = r#"<script src="https://cdn.example.com/_app-9.js"></script>"#;
        let fetcher = MockFetcher::new()
            .with_page(BASE, home)
            .with_page("https://cdn.example.com/_app-9.js", r#"users:{id:"cdn"}"#);
        let (_, resolver) = resolver(fetcher);
        assert_eq!(resolver.resolve(false).await.unwrap().key, "cdn");
    }

    #[tokio::test]
    async fn test_token_resolver_reads_token() {
        struct InitFetcher;

        #[async_trait::async_trait]
        impl PageFetcher for InitFetcher {
            async fn fetch(&self, url: &str) -> Result<String> {
                assert!(url.starts_with("https://howlongtobeat.com/api/search/init?t="));
                Ok(r#"{"token":"tok-123"}"#.to_string())
            }
        }

        let resolver = TokenResolver::new(Arc::new(InitFetcher), HltbConfig::default());
        let credential = resolver.resolve().await.unwrap();
        assert_eq!(credential, Credential::token("tok-123"));
    }

    #[tokio::test]
    async fn test_token_resolver_missing_token() {
        struct EmptyInit;

        #[async_trait::async_trait]
        impl PageFetcher for EmptyInit {
            async fn fetch(&self, _url: &str) -> Result<String> {
                Ok(r#"{"other":1}"#.to_string())
            }
        }

        let resolver = TokenResolver::new(Arc::new(EmptyInit), HltbConfig::default());
        assert!(resolver.resolve().await.is_none());
    }

    #[tokio::test]
    async fn test_token_resolver_network_error() {
        let resolver = TokenResolver::new(Arc::new(MockFetcher::new()), HltbConfig::default());
        assert!(resolver.resolve().await.is_none());
    }

    #[tokio::test]
    async fn test_resolver_enum_dispatch() {
        let fetcher: Arc<dyn PageFetcher> = Arc::new(
            MockFetcher::new()
                .with_page(BASE, HOME)
                .with_page(
                    "https://howlongtobeat.com/_next/static/chunks/pages/_app-0123abcd.js",
                    r#"users:{id:"k"}"#,
                ),
        );
        let resolvers = default_resolvers(fetcher, &HltbConfig::default()).unwrap();
        assert_eq!(resolvers.len(), 2);
        assert_eq!(resolvers[0].name(), "script");
        assert!(resolvers[0].supports_exhaustive());
        assert!(!resolvers[1].supports_exhaustive());
        assert_eq!(resolvers[0].resolve(false).await.unwrap().key, "k");
        assert!(resolvers[1].resolve(false).await.is_none());
    }
}
