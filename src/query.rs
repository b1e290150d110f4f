//! Search modifiers and the search request payload.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::SearchError;

/// Server-side filter applied to a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SearchModifier {
    /// No filtering.
    #[default]
    #[serde(rename = "")]
    None,
    /// Only DLC.
    #[serde(rename = "only_dlc")]
    IsolateDlc,
    /// Only mods.
    #[serde(rename = "only_mods")]
    IsolateMods,
    /// Only ROM hacks.
    #[serde(rename = "only_hacks")]
    IsolateHacks,
    /// Everything except DLC.
    #[serde(rename = "hide_dlc")]
    HideDlc,
}

impl SearchModifier {
    /// Value sent to the site.
    pub fn as_wire(&self) -> &'static str {
        match self {
            Self::None => "",
            Self::IsolateDlc => "only_dlc",
            Self::IsolateMods => "only_mods",
            Self::IsolateHacks => "only_hacks",
            Self::HideDlc => "hide_dlc",
        }
    }
}

impl fmt::Display for SearchModifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::IsolateDlc => "only-dlc",
            Self::IsolateMods => "only-mods",
            Self::IsolateHacks => "only-hacks",
            Self::HideDlc => "hide-dlc",
        };
        f.write_str(name)
    }
}

impl FromStr for SearchModifier {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "" | "none" => Ok(Self::None),
            "only-dlc" | "dlc" => Ok(Self::IsolateDlc),
            "only-mods" | "mods" => Ok(Self::IsolateMods),
            "only-hacks" | "hacks" => Ok(Self::IsolateHacks),
            "hide-dlc" => Ok(Self::HideDlc),
            other => Err(SearchError::InvalidQuery(format!(
                "unknown search modifier '{}'",
                other
            ))),
        }
    }
}

/// Results requested per page.
pub const PAGE_SIZE: u32 = 20;

/// JSON body of a search POST.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub search_type: &'static str,
    pub search_terms: Vec<String>,
    pub search_page: u32,
    pub size: u32,
    pub search_options: SearchOptions,
    pub use_cache: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchOptions {
    pub games: GameOptions,
    pub users: UserOptions,
    pub lists: ListOptions,
    pub filter: &'static str,
    pub sort: u32,
    pub randomizer: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameOptions {
    pub user_id: u64,
    pub platform: &'static str,
    pub sort_category: &'static str,
    pub range_category: &'static str,
    pub range_time: RangeTime,
    pub gameplay: Gameplay,
    pub range_year: RangeYear,
    pub modifier: SearchModifier,
}

#[derive(Debug, Clone, Serialize)]
pub struct RangeTime {
    pub min: u64,
    pub max: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Gameplay {
    pub perspective: &'static str,
    pub flow: &'static str,
    pub genre: &'static str,
    pub difficulty: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct RangeYear {
    pub min: &'static str,
    pub max: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub sort_category: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListOptions {
    pub sort_category: &'static str,
}

impl SearchRequest {
    /// Builds a games search for `query`, split into whitespace-separated terms.
    pub fn new(query: &str, modifier: SearchModifier, page: u32) -> Self {
        Self {
            search_type: "games",
            search_terms: query.split_whitespace().map(str::to_string).collect(),
            search_page: page,
            size: PAGE_SIZE,
            search_options: SearchOptions {
                games: GameOptions {
                    user_id: 0,
                    platform: "",
                    sort_category: "popular",
                    range_category: "main",
                    range_time: RangeTime { min: 0, max: 0 },
                    gameplay: Gameplay {
                        perspective: "",
                        flow: "",
                        genre: "",
                        difficulty: "",
                    },
                    range_year: RangeYear { min: "", max: "" },
                    modifier,
                },
                users: UserOptions {
                    id: None,
                    sort_category: "postcount",
                },
                lists: ListOptions {
                    sort_category: "follows",
                },
                filter: "",
                sort: 0,
                randomizer: 0,
            },
            use_cache: true,
        }
    }

    /// Carries an API key in `searchOptions.users.id`.
    pub fn with_user_id(mut self, key: impl Into<String>) -> Self {
        self.search_options.users.id = Some(key.into());
        self
    }
}
