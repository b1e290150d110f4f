//! Turns a raw search response into ranked, normalized entries.

use serde_json::Value;
use tracing::{debug, warn};

use crate::result::{CompletionCategory, HltbEntry, RawRecord};
use crate::similarity::similarity;

/// Where the site hosts cover images.
pub const IMAGE_URL_PREFIX: &str = "https://howlongtobeat.com/games/";

/// Parses a search response with the default image prefix.
///
/// Never fails: malformed JSON or a missing `data` list is logged and
/// yields an empty list.
pub fn parse_json_result(json: &str, query: &str, min_similarity: f64) -> Vec<HltbEntry> {
    ResultParser::new(min_similarity).parse(json, query)
}

/// Response parser with a similarity threshold.
#[derive(Debug, Clone)]
pub struct ResultParser {
    min_similarity: f64,
    image_url_prefix: String,
}

impl ResultParser {
    /// Creates a parser keeping entries with similarity `>= min_similarity`.
    pub fn new(min_similarity: f64) -> Self {
        Self {
            min_similarity,
            image_url_prefix: IMAGE_URL_PREFIX.to_string(),
        }
    }

    /// Sets the prefix joined with each record's image filename.
    pub fn with_image_url_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.image_url_prefix = prefix.into();
        self
    }

    /// Parses `json`, scores each record against `query`, drops records
    /// below the threshold and sorts the rest by similarity, descending.
    ///
    /// The sort is stable, so ties keep the order the site sent them in.
    pub fn parse(&self, json: &str, query: &str) -> Vec<HltbEntry> {
        let payload: Value = match serde_json::from_str(json) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Failed to parse search response: {}", e);
                return Vec::new();
            }
        };

        let records = match payload.get("data").and_then(Value::as_array) {
            Some(records) => records,
            None => {
                warn!("Search response has no data list");
                return Vec::new();
            }
        };

        let mut entries: Vec<HltbEntry> = records
            .iter()
            .filter_map(|value| match serde_json::from_value::<RawRecord>(value.clone()) {
                Ok(raw) => Some(self.normalize(value, &raw, query)),
                Err(e) => {
                    warn!("Skipping malformed search record: {}", e);
                    None
                }
            })
            .filter(|entry| entry.similarity >= self.min_similarity)
            .collect();

        entries.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        debug!(
            "Parsed {} of {} records for '{}'",
            entries.len(),
            records.len(),
            query
        );
        entries
    }

    /// Maps one record to an entry. `source` is the record as received.
    pub fn normalize(&self, source: &Value, raw: &RawRecord, query: &str) -> HltbEntry {
        let name = raw.game_name.clone().unwrap_or_default();
        let alias = raw.game_alias.clone().unwrap_or_default();
        let score = similarity(&name, query).max(similarity(&alias, query));

        let image_url = raw
            .game_image
            .as_deref()
            .filter(|image| !image.is_empty())
            .map(|image| format!("{}{}", self.image_url_prefix, image));

        HltbEntry {
            id: raw.game_id.unwrap_or_default(),
            name,
            alias,
            game_type: raw.game_type.clone().unwrap_or_default(),
            review_score: raw.review_score,
            main: raw.stat(CompletionCategory::Main),
            main_extra: raw.stat(CompletionCategory::MainExtra),
            completionist: raw.stat(CompletionCategory::Completionist),
            all_styles: raw.stat(CompletionCategory::AllStyles),
            coop: raw.stat(CompletionCategory::Coop),
            multiplayer: raw.stat(CompletionCategory::Multiplayer),
            platforms: raw.platforms(),
            release_year: raw.release_world,
            image_url,
            json: source.to_string(),
            similarity: score,
        }
    }
}
