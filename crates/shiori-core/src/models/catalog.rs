use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Opaque catalog identity.
///
/// Upstreams disagree on whether ids are integers or strings, so both are
/// accepted on the way in and compared by their string form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CatalogId(String);

impl CatalogId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CatalogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<i64> for CatalogId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl From<u64> for CatalogId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for CatalogId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for CatalogId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl<'de> Deserialize<'de> for CatalogId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Int(i64),
            Text(String),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Int(n) => Self(n.to_string()),
            RawId::Text(s) => Self(s),
        })
    }
}

/// Canonical genre shape. Only `slug` takes part in equality and filtering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenreTag {
    pub slug: String,
    pub name_en: Option<String>,
    pub name_fa: Option<String>,
}

impl PartialEq for GenreTag {
    fn eq(&self, other: &Self) -> bool {
        self.slug == other.slug
    }
}

impl Eq for GenreTag {}

impl GenreTag {
    /// Best display name: Persian, then English, then the slug itself.
    pub fn display_name(&self) -> &str {
        self.name_fa
            .as_deref()
            .or(self.name_en.as_deref())
            .unwrap_or(&self.slug)
    }
}

/// Next scheduled broadcast of a releasing title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiringEpisode {
    pub episode: u32,
    /// UNIX timestamp, seconds.
    pub airing_at: i64,
}

/// Canonical title record produced by every adapter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: CatalogId,
    pub title: String,
    pub image: String,
    pub featured_image: Option<String>,
    pub description: String,
    pub format: Option<String>,
    pub status: Option<String>,
    pub genres: Vec<GenreTag>,
    pub episode_count: Option<u32>,
    pub studio: Option<String>,
    pub season: Option<String>,
    pub year: Option<i32>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub average_score: Option<u32>,
    pub next_airing: Option<AiringEpisode>,
    pub is_new: Option<bool>,
    pub episode_label: Option<String>,
}

impl CatalogEntry {
    pub fn has_format(&self, format: &str) -> bool {
        self.format.as_deref() == Some(format)
    }

    pub fn shares_genre(&self, other: &CatalogEntry) -> usize {
        self.genres
            .iter()
            .filter(|g| other.genres.contains(g))
            .count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub id: CatalogId,
    pub season_number: Option<u32>,
    pub number: u32,
    pub title: String,
    pub download_link: Option<String>,
    pub subtitle_link: Option<String>,
}

impl Episode {
    /// Season number with the implicit default of 1.
    pub fn season(&self) -> u32 {
        self.season_number.unwrap_or(1)
    }
}

/// Season-level subtitle bundle, distinct from per-episode subtitles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitlePack {
    pub id: CatalogId,
    pub season_number: Option<u32>,
    pub title: Option<String>,
    pub subtitle_link: Option<String>,
}

impl SubtitlePack {
    pub fn season(&self) -> u32 {
        self.season_number.unwrap_or(1)
    }
}

/// A title plus everything the detail page shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogDetail {
    #[serde(flatten)]
    pub entry: CatalogEntry,
    pub episodes: Vec<Episode>,
    pub subtitle_packs: Vec<SubtitlePack>,
}

/// A per-episode subtitle row, keyed on `(season, episode)`.
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleLink {
    pub season_number: Option<u32>,
    pub episode_number: u32,
    pub link: String,
}

/// Attach subtitle links to episodes by `(season, episode)`.
///
/// Episodes without a matching row keep `subtitle_link` unset. When two rows
/// share a key the later one wins.
pub fn join_subtitles(mut episodes: Vec<Episode>, subtitles: &[SubtitleLink]) -> Vec<Episode> {
    let by_key: HashMap<(u32, u32), &str> = subtitles
        .iter()
        .map(|s| ((s.season_number.unwrap_or(1), s.episode_number), s.link.as_str()))
        .collect();

    for episode in &mut episodes {
        if let Some(link) = by_key.get(&(episode.season(), episode.number)) {
            episode.subtitle_link = Some((*link).to_string());
        }
    }
    episodes
}

/// Upper bound on [`synthesize_episodes`]; longer upstream counts are clamped.
pub const MAX_SYNTHESIZED_EPISODES: u32 = 5_000;

/// Placeholder episode list for titles whose episode rows are missing.
pub fn synthesize_episodes(count: u32) -> Vec<Episode> {
    if count > MAX_SYNTHESIZED_EPISODES {
        tracing::warn!(
            count,
            max = MAX_SYNTHESIZED_EPISODES,
            "clamping synthesized episode count"
        );
    }
    (1..=count.min(MAX_SYNTHESIZED_EPISODES))
        .map(|n| Episode {
            id: CatalogId::from(u64::from(n)),
            season_number: None,
            number: n,
            title: crate::view::episode_label(n),
            download_link: None,
            subtitle_link: None,
        })
        .collect()
}
