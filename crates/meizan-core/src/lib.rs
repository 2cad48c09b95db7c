//! Domain types shared across the meizan workspace: the mountain
//! reference entity, locale/season enums, explicit user preferences and
//! the soft hints mined from free text.

use serde::{Deserialize, Serialize};

pub mod select;

/// The eight canonical region labels used by the mountain table.
pub const REGIONS: [&str; 8] = [
    "北海道", "東北", "関東", "中部", "関西", "中国", "四国", "九州",
];

/// Canonical star-difficulty strings, lowest to highest.
pub const STAR_LEVELS: [&str; 5] = ["★", "★★", "★★★", "★★★★", "★★★★★"];

pub fn is_region(label: &str) -> bool {
    REGIONS.contains(&label)
}

pub fn is_star_level(label: &str) -> bool {
    STAR_LEVELS.contains(&label)
}

/// Read-only reference row from the mountain table.
///
/// `prefecture` is free text and may hold several prefectures joined by
/// `・`, `／`, `/` or `、`; `region` is one of [`REGIONS`] when present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mountain {
    pub id: String,
    pub name_en: String,
    pub name_ja: String,
    pub name_zh: String,
    pub region: String,
    #[serde(default)]
    pub prefecture: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub elevation_m: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Spring,
    Summer,
    Autumn,
    Winter,
}

impl Season {
    pub fn as_str(self) -> &'static str {
        match self {
            Season::Spring => "spring",
            Season::Summer => "summer",
            Season::Autumn => "autumn",
            Season::Winter => "winter",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Ja,
    Zh,
}

impl Locale {
    pub fn as_str(self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Ja => "ja",
            Locale::Zh => "zh",
        }
    }

    /// Language name as spelled out in the model instructions.
    pub fn language_name(self) -> &'static str {
        match self {
            Locale::En => "English",
            Locale::Ja => "Japanese",
            Locale::Zh => "Chinese",
        }
    }
}

/// Explicit filters set through UI controls. Hard constraints: the
/// selector never relaxes these.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<Season>,
}

/// Soft signals inferred from the latest user message. Lower precedence
/// than [`Preferences`] and subject to the relaxation ladder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Hints {
    pub near_tokyo: bool,
    pub near_osaka: bool,
    pub season: Option<Season>,
    pub difficulty_stars: Option<Vec<String>>,
    pub regions: Option<Vec<String>>,
}

impl Hints {
    pub fn is_empty(&self) -> bool {
        !self.near_tokyo
            && !self.near_osaka
            && self.season.is_none()
            && self.difficulty_stars.is_none()
            && self.regions.is_none()
    }
}
