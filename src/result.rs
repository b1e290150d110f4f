//! Raw search records and the normalized entries built from them.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One item of the `data` list as the site sends it.
///
/// Every field is optional; the site omits or nulls fields freely.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawRecord {
    #[serde(deserialize_with = "number")]
    pub game_id: Option<u64>,
    pub game_name: Option<String>,
    pub game_alias: Option<String>,
    pub game_type: Option<String>,
    pub game_image: Option<String>,
    #[serde(deserialize_with = "number")]
    pub review_score: Option<u64>,

    #[serde(deserialize_with = "truthy")]
    pub comp_lvl_sp: bool,
    #[serde(deserialize_with = "truthy")]
    pub comp_lvl_co: bool,
    #[serde(deserialize_with = "truthy")]
    pub comp_lvl_mp: bool,

    #[serde(deserialize_with = "number")]
    pub comp_main: Option<u64>,
    #[serde(deserialize_with = "number")]
    pub comp_plus: Option<u64>,
    #[serde(deserialize_with = "number")]
    pub comp_100: Option<u64>,
    #[serde(deserialize_with = "number")]
    pub comp_all: Option<u64>,
    #[serde(deserialize_with = "number")]
    pub invested_co: Option<u64>,
    #[serde(deserialize_with = "number")]
    pub invested_mp: Option<u64>,

    #[serde(deserialize_with = "number")]
    pub comp_main_count: Option<u64>,
    #[serde(deserialize_with = "number")]
    pub comp_plus_count: Option<u64>,
    #[serde(deserialize_with = "number")]
    pub comp_100_count: Option<u64>,
    #[serde(deserialize_with = "number")]
    pub comp_all_count: Option<u64>,
    #[serde(deserialize_with = "number")]
    pub invested_co_count: Option<u64>,
    #[serde(deserialize_with = "number")]
    pub invested_mp_count: Option<u64>,

    pub profile_platform: Option<String>,
    #[serde(deserialize_with = "year")]
    pub release_world: Option<i32>,
}

/// Level flags follow JavaScript truthiness: null, 0, false and "" are off.
fn truthy<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => false,
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    })
}

/// Durations, counts and scores are non-negative integers. Anything else
/// the site sends there, such as a float or a negative sentinel, is read as
/// a rounded value or ignored rather than rejecting the whole record.
fn number<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let n = match value {
        Value::Number(n) => match n.as_u64() {
            Some(n) => return Ok(Some(n)),
            None => n.as_f64(),
        },
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(n.filter(|n| n.is_finite() && *n >= 0.0)
        .map(|n| n.round() as u64))
}

/// Release year arrives as a number or a numeric string.
fn year<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_i64().and_then(|n| i32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Level flag gating one or more completion categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayStyle {
    SinglePlayer,
    Coop,
    Multiplayer,
}

/// Completion categories reported per game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionCategory {
    /// Main story.
    Main,
    /// Main story plus extras.
    MainExtra,
    /// 100%.
    Completionist,
    /// Average across all play styles.
    AllStyles,
    /// Co-op.
    Coop,
    /// Competitive multiplayer.
    Multiplayer,
}

impl CompletionCategory {
    pub const ALL: [CompletionCategory; 6] = [
        Self::Main,
        Self::MainExtra,
        Self::Completionist,
        Self::AllStyles,
        Self::Coop,
        Self::Multiplayer,
    ];

    /// The level flag deciding whether this category is meaningful.
    pub fn play_style(&self) -> PlayStyle {
        match self {
            Self::Main | Self::MainExtra | Self::Completionist | Self::AllStyles => {
                PlayStyle::SinglePlayer
            }
            Self::Coop => PlayStyle::Coop,
            Self::Multiplayer => PlayStyle::Multiplayer,
        }
    }

    /// Human label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Main => "Main Story",
            Self::MainExtra => "Main + Extra",
            Self::Completionist => "Completionist",
            Self::AllStyles => "All Styles",
            Self::Coop => "Co-Op",
            Self::Multiplayer => "Multiplayer",
        }
    }
}

/// Duration and sample count of one completion category.
///
/// Both values exist together or not at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionStat {
    /// Average time in seconds.
    pub time: u64,
    /// Number of submissions behind the average.
    pub count: u64,
}

impl CompletionStat {
    /// Time in hours.
    pub fn hours(&self) -> f64 {
        self.time as f64 / 3600.0
    }
}

impl RawRecord {
    /// Whether the given play style carries meaningful data.
    pub fn level(&self, style: PlayStyle) -> bool {
        match style {
            PlayStyle::SinglePlayer => self.comp_lvl_sp,
            PlayStyle::Coop => self.comp_lvl_co,
            PlayStyle::Multiplayer => self.comp_lvl_mp,
        }
    }

    /// The category's stat pair, present only if its level flag is truthy.
    pub fn stat(&self, category: CompletionCategory) -> Option<CompletionStat> {
        if !self.level(category.play_style()) {
            return None;
        }
        let (time, count) = match category {
            CompletionCategory::Main => (self.comp_main, self.comp_main_count),
            CompletionCategory::MainExtra => (self.comp_plus, self.comp_plus_count),
            CompletionCategory::Completionist => (self.comp_100, self.comp_100_count),
            CompletionCategory::AllStyles => (self.comp_all, self.comp_all_count),
            CompletionCategory::Coop => (self.invested_co, self.invested_co_count),
            CompletionCategory::Multiplayer => (self.invested_mp, self.invested_mp_count),
        };
        Some(CompletionStat {
            time: time.unwrap_or(0),
            count: count.unwrap_or(0),
        })
    }

    /// Platform names; empty when the site sent none.
    pub fn platforms(&self) -> Vec<String> {
        match self.profile_platform.as_deref() {
            Some(platforms) if !platforms.is_empty() => {
                platforms.split(", ").map(str::to_string).collect()
            }
            _ => Vec::new(),
        }
    }
}

/// A normalized search result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HltbEntry {
    pub id: u64,
    pub name: String,
    pub alias: String,
    pub game_type: String,
    pub review_score: Option<u64>,
    pub main: Option<CompletionStat>,
    pub main_extra: Option<CompletionStat>,
    pub completionist: Option<CompletionStat>,
    pub all_styles: Option<CompletionStat>,
    pub coop: Option<CompletionStat>,
    pub multiplayer: Option<CompletionStat>,
    pub platforms: Vec<String>,
    pub release_year: Option<i32>,
    pub image_url: Option<String>,
    /// The source record re-serialized verbatim.
    pub json: String,
    /// Closeness to the query in `[0, 1]`.
    pub similarity: f64,
}

impl HltbEntry {
    /// Stat pair for a category.
    pub fn stat(&self, category: CompletionCategory) -> Option<CompletionStat> {
        match category {
            CompletionCategory::Main => self.main,
            CompletionCategory::MainExtra => self.main_extra,
            CompletionCategory::Completionist => self.completionist,
            CompletionCategory::AllStyles => self.all_styles,
            CompletionCategory::Coop => self.coop,
            CompletionCategory::Multiplayer => self.multiplayer,
        }
    }

    /// The source record as JSON.
    pub fn raw(&self) -> Option<Value> {
        serde_json::from_str(&self.json).ok()
    }
}
