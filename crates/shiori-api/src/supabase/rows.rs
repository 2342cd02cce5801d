//! Row shapes of the relational schema.
//!
//! Every column is optional because three schema revisions are live at once;
//! a missing column is never an error.

use serde::Deserialize;
use serde_json::Value;
use shiori_core::jalali::format_air_date;
use shiori_core::models::{CatalogEntry, CatalogId, Episode, SubtitleLink, SubtitlePack};
use shiori_core::normalize::normalize_genre_field;
use shiori_core::view::episode_label;

/// Title used when a row has none.
pub const UNTITLED: &str = "بدون عنوان";

#[derive(Debug, Deserialize)]
pub struct AnimeRow {
    pub id: CatalogId,
    pub title: Option<String>,
    pub cover_image: Option<String>,
    pub image: Option<String>,
    pub featured_image: Option<String>,
    pub synopsis: Option<String>,
    pub format: Option<String>,
    pub status: Option<String>,
    pub airing_status: Option<String>,
    pub average_score: Option<f64>,
    pub episodes_count: Option<u32>,
    pub studio: Option<String>,
    pub season: Option<String>,
    pub year: Option<i32>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub is_new: Option<bool>,
    /// Many-to-many join, `[{genres: {...}}]`.
    pub anime_genres: Option<Value>,
    /// Denormalized genre column on older schemas.
    pub genres: Option<Value>,
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

impl AnimeRow {
    pub fn into_entry(self) -> CatalogEntry {
        let genres = normalize_genre_field(self.anime_genres.as_ref().or(self.genres.as_ref()));
        if genres.dropped > 0 {
            tracing::debug!(id = %self.id, dropped = genres.dropped, "row had unusable genres");
        }

        CatalogEntry {
            title: present(self.title).unwrap_or_else(|| UNTITLED.to_string()),
            image: present(self.cover_image)
                .or(present(self.image))
                .unwrap_or_default(),
            featured_image: present(self.featured_image),
            description: self.synopsis.unwrap_or_default(),
            format: present(self.format),
            status: present(self.airing_status).or(present(self.status)),
            genres: genres.tags,
            episode_count: self.episodes_count,
            studio: present(self.studio),
            season: present(self.season),
            year: self.year,
            start_date: present(self.start_date).map(|d| format_air_date(&d)),
            end_date: present(self.end_date).map(|d| format_air_date(&d)),
            average_score: self
                .average_score
                .filter(|s| s.is_finite() && *s >= 0.0)
                .map(|s| s.round().min(100.0) as u32),
            next_airing: None,
            is_new: self.is_new,
            episode_label: None,
            id: self.id,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct EpisodeRow {
    pub id: Option<CatalogId>,
    pub season_number: Option<u32>,
    pub episode_number: Option<u32>,
    pub title: Option<String>,
    pub download_link: Option<String>,
}

impl EpisodeRow {
    pub fn into_episode(self) -> Episode {
        let number = self.episode_number.unwrap_or(0);
        Episode {
            id: self
                .id
                .unwrap_or_else(|| CatalogId::from(u64::from(number))),
            season_number: self.season_number,
            number,
            title: present(self.title).unwrap_or_else(|| episode_label(number)),
            download_link: present(self.download_link),
            subtitle_link: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SubtitleRow {
    pub season_number: Option<u32>,
    pub episode_number: Option<u32>,
    pub subtitle_link: Option<String>,
}

impl SubtitleRow {
    /// Rows without an episode number or link cannot be joined.
    pub fn into_link(self) -> Option<SubtitleLink> {
        Some(SubtitleLink {
            season_number: self.season_number,
            episode_number: self.episode_number?,
            link: present(self.subtitle_link)?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct SubtitlePackRow {
    pub id: CatalogId,
    pub season_number: Option<u32>,
    pub title: Option<String>,
    pub subtitle_link: Option<String>,
}

impl From<SubtitlePackRow> for SubtitlePack {
    fn from(row: SubtitlePackRow) -> Self {
        SubtitlePack {
            id: row.id,
            season_number: row.season_number,
            title: present(row.title),
            subtitle_link: present(row.subtitle_link),
        }
    }
}

/// Decode rows one by one, skipping (and logging) the ones that don't fit.
pub fn decode_rows<T: serde::de::DeserializeOwned>(table: &str, rows: Vec<Value>) -> Vec<T> {
    rows.into_iter()
        .filter_map(|row| match serde_json::from_value(row) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                tracing::warn!(table, error = %e, "skipping undecodable row");
                None
            }
        })
        .collect()
}
