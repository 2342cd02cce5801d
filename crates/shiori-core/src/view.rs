//! View-model mappers: pure projections of [`CatalogEntry`] for the pages.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::jalali::to_persian_digits;
use crate::models::{CatalogEntry, CatalogId, GenreTag};

/// Label shown when an entry carries no episode information.
pub const DEFAULT_EPISODE_LABEL: &str = "قسمت ۱";

/// Label for films, which have no episode number.
pub const MOVIE_LABEL: &str = "فیلم";

/// Status assumed when upstream leaves it blank.
pub const DEFAULT_STATUS: &str = "RELEASING";

/// Maximum number of entries [`similar`] returns.
pub const SIMILAR_LIMIT: usize = 24;

/// `قسمت N` with N in Persian digits.
pub fn episode_label(number: u32) -> String {
    to_persian_digits(&format!("قسمت {number}"))
}

/// A named, pre-filtered subset of the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Latest,
    Popular,
    Episodes,
    Movies,
    Featured,
    Donghua,
}

impl Section {
    /// Sections with their own bucket in the cache store.
    pub const CACHED: [Section; 5] = [
        Self::Latest,
        Self::Popular,
        Self::Episodes,
        Self::Movies,
        Self::Featured,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Latest => "latest",
            Self::Popular => "popular",
            Self::Episodes => "episodes",
            Self::Movies => "movies",
            Self::Featured => "featured",
            Self::Donghua => "donghua",
        }
    }

    /// Whether entries of this format belong in the section when the
    /// backend cannot filter server-side.
    pub fn admits(self, format: Option<&str>) -> bool {
        match self {
            Self::Movies => format == Some("MOVIE"),
            Self::Donghua => format == Some("ONA (CHINESE)"),
            Self::Popular => matches!(format, Some("TV" | "ONA" | "SPECIAL" | "MOVIE")),
            Self::Latest | Self::Episodes | Self::Featured => true,
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Section {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "latest" => Ok(Self::Latest),
            "popular" => Ok(Self::Popular),
            "episodes" => Ok(Self::Episodes),
            "movies" => Ok(Self::Movies),
            "featured" => Ok(Self::Featured),
            "donghua" => Ok(Self::Donghua),
            other => Err(format!("unknown section: {other}")),
        }
    }
}

/// Format-based section filter; `None` keeps everything.
pub fn filter_section(entries: Vec<CatalogEntry>, section: Option<Section>) -> Vec<CatalogEntry> {
    match section {
        Some(section) => entries
            .into_iter()
            .filter(|e| section.admits(e.format.as_deref()))
            .collect(),
        None => entries,
    }
}

/// Case-insensitive substring match on the title. A blank query keeps everything.
pub fn filter_by_title(entries: Vec<CatalogEntry>, query: &str) -> Vec<CatalogEntry> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return entries;
    }
    entries
        .into_iter()
        .filter(|e| e.title.to_lowercase().contains(&needle))
        .collect()
}

/// Lightweight display card used by grids and the cache store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: CatalogId,
    pub title: String,
    pub image: String,
    pub episode: String,
    pub is_new: bool,
    pub description: String,
    pub genres: Vec<GenreTag>,
}

/// Row shape for list pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListItem {
    pub id: CatalogId,
    pub title: String,
    pub image: String,
    pub description: String,
    pub status: String,
    pub genres: Vec<GenreTag>,
    pub episodes: u32,
    pub is_new: bool,
    pub episode: String,
}

fn is_new(entry: &CatalogEntry) -> bool {
    entry.is_new.unwrap_or(false) || entry.next_airing.is_some_and(|n| n.episode == 1)
}

fn label(entry: &CatalogEntry) -> String {
    entry
        .episode_label
        .clone()
        .unwrap_or_else(|| DEFAULT_EPISODE_LABEL.to_string())
}

pub fn to_card(entry: &CatalogEntry) -> Card {
    Card {
        id: entry.id.clone(),
        title: entry.title.clone(),
        image: entry.image.clone(),
        episode: label(entry),
        is_new: is_new(entry),
        description: entry.description.clone(),
        genres: entry.genres.clone(),
    }
}

pub fn to_list_item(entry: &CatalogEntry) -> ListItem {
    ListItem {
        id: entry.id.clone(),
        title: entry.title.clone(),
        image: entry.image.clone(),
        description: entry.description.clone(),
        status: entry
            .status
            .clone()
            .unwrap_or_else(|| DEFAULT_STATUS.to_string()),
        genres: entry.genres.clone(),
        episodes: entry.episode_count.unwrap_or(1),
        is_new: is_new(entry),
        episode: label(entry),
    }
}

/// Entries sharing at least one genre with `target`, most overlap first,
/// then by average score.
pub fn similar(entries: &[CatalogEntry], target: &CatalogEntry) -> Vec<CatalogEntry> {
    let mut ranked: Vec<(usize, &CatalogEntry)> = entries
        .iter()
        .filter(|e| e.id != target.id)
        .map(|e| (e.shares_genre(target), e))
        .filter(|(shared, _)| *shared > 0)
        .collect();

    ranked.sort_by(|(sa, a), (sb, b)| {
        sb.cmp(sa)
            .then_with(|| b.average_score.unwrap_or(0).cmp(&a.average_score.unwrap_or(0)))
    });

    ranked
        .into_iter()
        .take(SIMILAR_LIMIT)
        .map(|(_, e)| e.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AiringEpisode;
    use crate::normalize::from_display;

    fn entry(id: i64, format: &str) -> CatalogEntry {
        CatalogEntry {
            id: id.into(),
            title: format!("Title {id}"),
            format: Some(format.to_string()),
            ..Default::default()
        }
    }

    fn with_genres(id: i64, genres: &[&str], score: u32) -> CatalogEntry {
        CatalogEntry {
            id: id.into(),
            genres: genres.iter().filter_map(|g| from_display(g)).collect(),
            average_score: Some(score),
            ..Default::default()
        }
    }

    #[test]
    fn test_list_item_defaults() {
        let item = to_list_item(&CatalogEntry::default());
        assert_eq!(item.episodes, 1);
        assert_eq!(item.episode, "قسمت ۱");
        assert_eq!(item.status, "RELEASING");
        assert!(!item.is_new);
    }

    #[test]
    fn test_card_defaults_and_labels() {
        let card = to_card(&CatalogEntry::default());
        assert_eq!(card.episode, DEFAULT_EPISODE_LABEL);

        let labelled = CatalogEntry {
            episode_label: Some(episode_label(12)),
            ..Default::default()
        };
        assert_eq!(to_card(&labelled).episode, "قسمت ۱۲");
    }

    #[test]
    fn test_is_new_derivation() {
        let explicit = CatalogEntry {
            is_new: Some(true),
            ..Default::default()
        };
        assert!(to_card(&explicit).is_new);

        let premiere = CatalogEntry {
            next_airing: Some(AiringEpisode {
                episode: 1,
                airing_at: 0,
            }),
            ..Default::default()
        };
        assert!(to_card(&premiere).is_new);

        let later = CatalogEntry {
            next_airing: Some(AiringEpisode {
                episode: 5,
                airing_at: 0,
            }),
            ..Default::default()
        };
        assert!(!to_card(&later).is_new);
    }

    #[test]
    fn test_format_filtering() {
        let entries = vec![
            entry(1, "MOVIE"),
            entry(2, "TV"),
            entry(3, "ONA (CHINESE)"),
            entry(4, "SPECIAL"),
        ];
        let ids = |section| -> Vec<String> {
            filter_section(entries.clone(), Some(section))
                .into_iter()
                .map(|e| e.id.to_string())
                .collect()
        };

        assert_eq!(ids(Section::Movies), vec!["1"]);
        assert_eq!(ids(Section::Donghua), vec!["3"]);
        assert_eq!(ids(Section::Popular), vec!["1", "2", "4"]);
        assert_eq!(filter_section(entries.clone(), None).len(), 4);
        assert_eq!(ids(Section::Latest).len(), 4);
    }

    #[test]
    fn test_filter_by_title() {
        let entries = vec![
            CatalogEntry {
                title: "Frieren: Beyond Journey's End".into(),
                ..Default::default()
            },
            CatalogEntry {
                title: "Made in Abyss".into(),
                ..Default::default()
            },
        ];
        assert_eq!(filter_by_title(entries.clone(), " JOURNEY ").len(), 1);
        assert_eq!(filter_by_title(entries.clone(), "").len(), 2);
        assert!(filter_by_title(entries, "naruto").is_empty());
    }

    #[test]
    fn test_section_parsing() {
        assert_eq!("Movies".parse::<Section>(), Ok(Section::Movies));
        assert!("anime".parse::<Section>().is_err());
        assert_eq!(Section::Episodes.to_string(), "episodes");
    }

    #[test]
    fn test_similar_ranking() {
        let target = with_genres(1, &["Action", "Drama", "Fantasy"], 80);
        let catalog = vec![
            target.clone(),
            with_genres(2, &["Action"], 95),
            with_genres(3, &["Action", "Drama"], 60),
            with_genres(4, &["Romance"], 99),
            with_genres(5, &["Fantasy"], 70),
        ];

        let ids: Vec<String> = similar(&catalog, &target)
            .into_iter()
            .map(|e| e.id.to_string())
            .collect();
        assert_eq!(ids, vec!["3", "2", "5"]);
    }
}
