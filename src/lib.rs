//! # hltb-search
//!
//! A HowLongToBeat search client.
//!
//! The site publishes no stable API. Its search endpoint and the credential
//! that authorizes it live inside the client-side script bundle and change
//! shape over time. This library:
//!
//! - Discovers the current credential (embedded key or short-lived token)
//! - Sends the search with a single bounded fallback
//! - Normalizes raw records and ranks them by similarity to the query
//!
//! ## Example
//!
//! ```rust,no_run
//! use hltb_search::{HowLongToBeat, SearchModifier};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let hltb = HowLongToBeat::new()?;
//!
//!     for entry in hltb.search("Elden Ring", SearchModifier::None).await {
//!         let main = entry.main.map(|stat| stat.hours()).unwrap_or_default();
//!         println!("{} ({:.2}): {:.1}h", entry.name, entry.similarity, main);
//!     }
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod fetcher_http;
mod parser;
mod query;
mod result;
mod search;
mod similarity;

pub mod credential;
pub mod fetcher;

pub use config::HltbConfig;
pub use credential::{Credential, CredentialKind, Resolver, ScriptResolver, TokenResolver};
pub use error::{Result, SearchError};
pub use fetcher_http::{random_user_agent, HttpFetcher, AUTH_TOKEN_HEADER};
pub use parser::{parse_json_result, ResultParser, IMAGE_URL_PREFIX};
pub use query::{SearchModifier, SearchRequest, PAGE_SIZE};
pub use result::{CompletionCategory, CompletionStat, HltbEntry, PlayStyle, RawRecord};
pub use search::HowLongToBeat;
pub use similarity::similarity;
