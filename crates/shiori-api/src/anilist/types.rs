use serde::Deserialize;
use shiori_core::jalali::{format_air_date, to_persian_digits};
use shiori_core::models::{AiringEpisode, CatalogEntry, CatalogId, Episode};
use shiori_core::normalize::{format_title, from_display, TextLocalizer};
use shiori_core::schedule::Airing;
use shiori_core::view::episode_label;

// ── GraphQL response wrappers ────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct GraphQLResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQLErrorMessage>,
}

#[derive(Debug, Deserialize)]
pub struct GraphQLErrorMessage {
    pub message: String,
}

// ── Page / media queries ─────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct PageResponse {
    #[serde(rename = "Page")]
    pub page: PageData,
}

#[derive(Debug, Deserialize)]
pub struct PageData {
    #[serde(default)]
    pub media: Vec<AniListMedia>,
}

#[derive(Debug, Deserialize)]
pub struct MediaResponse {
    #[serde(rename = "Media")]
    pub media: Option<AniListMedia>,
}

#[derive(Debug, Deserialize)]
pub struct AniListMedia {
    pub id: u64,
    pub title: Option<AniListTitle>,
    #[serde(rename = "coverImage")]
    pub cover_image: Option<CoverImage>,
    #[serde(rename = "bannerImage")]
    pub banner_image: Option<String>,
    pub description: Option<String>,
    pub format: Option<String>,
    pub status: Option<String>,
    pub genres: Option<Vec<String>>,
    pub episodes: Option<u32>,
    #[serde(rename = "averageScore")]
    pub average_score: Option<u32>,
    pub season: Option<String>,
    #[serde(rename = "seasonYear")]
    pub season_year: Option<i32>,
    pub studios: Option<StudioConnection>,
    #[serde(rename = "startDate")]
    pub start_date: Option<FuzzyDate>,
    #[serde(rename = "endDate")]
    pub end_date: Option<FuzzyDate>,
    #[serde(rename = "nextAiringEpisode")]
    pub next_airing_episode: Option<AiringNode>,
    #[serde(rename = "airingSchedule")]
    pub airing_schedule: Option<AiringScheduleConnection>,
}

#[derive(Debug, Deserialize)]
pub struct AniListTitle {
    pub romaji: Option<String>,
    pub english: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CoverImage {
    pub large: Option<String>,
    #[serde(rename = "extraLarge")]
    pub extra_large: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StudioConnection {
    pub nodes: Option<Vec<StudioNode>>,
}

#[derive(Debug, Deserialize)]
pub struct StudioNode {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct FuzzyDate {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub day: Option<u32>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct AiringNode {
    pub episode: u32,
    #[serde(rename = "airingAt")]
    pub airing_at: i64,
}

#[derive(Debug, Deserialize)]
pub struct AiringScheduleConnection {
    #[serde(default)]
    pub nodes: Vec<AiringNode>,
}

// ── Conversions ──────────────────────────────────────────────────

impl FuzzyDate {
    /// Jalali date for complete dates, the bare year otherwise.
    pub fn to_display(&self) -> Option<String> {
        let year = self.year?;
        match (self.month, self.day) {
            (Some(m), Some(d)) => Some(format_air_date(&format!("{year:04}-{m:02}-{d:02}"))),
            _ => Some(to_persian_digits(&year.to_string())),
        }
    }
}

fn non_empty(s: &Option<String>) -> Option<&str> {
    s.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl AniListMedia {
    /// English title when present, romaji otherwise.
    pub fn display_title(&self) -> String {
        let raw = self
            .title
            .as_ref()
            .and_then(|t| non_empty(&t.english).or_else(|| non_empty(&t.romaji)))
            .unwrap_or_default();
        format_title(raw)
    }

    pub fn display_image(&self) -> String {
        self.cover_image
            .as_ref()
            .and_then(|c| c.extra_large.clone().or_else(|| c.large.clone()))
            .unwrap_or_default()
    }

    pub fn into_entry(self, localizer: &dyn TextLocalizer) -> CatalogEntry {
        let title = self.display_title();
        let image = self.display_image();
        let next_airing = self.next_airing_episode.map(|n| AiringEpisode {
            episode: n.episode,
            airing_at: n.airing_at,
        });

        CatalogEntry {
            id: CatalogId::from(self.id),
            title,
            image,
            featured_image: self.banner_image,
            description: localizer.localize(self.description.as_deref().unwrap_or_default()),
            format: self.format,
            status: self.status,
            genres: self
                .genres
                .unwrap_or_default()
                .iter()
                .filter_map(|g| from_display(g))
                .collect(),
            episode_count: self.episodes,
            studio: self
                .studios
                .and_then(|s| s.nodes)
                .and_then(|nodes| nodes.into_iter().next())
                .map(|n| n.name),
            season: self.season,
            year: self.season_year,
            start_date: self.start_date.as_ref().and_then(FuzzyDate::to_display),
            end_date: self.end_date.as_ref().and_then(FuzzyDate::to_display),
            average_score: self.average_score,
            episode_label: next_airing.map(|n| episode_label(n.episode)),
            next_airing,
            is_new: None,
        }
    }

    /// Next broadcast, for titles that have one scheduled.
    pub fn to_airing(&self) -> Option<Airing> {
        let next = self.next_airing_episode?;
        Some(Airing {
            id: CatalogId::from(self.id),
            title: self.display_title(),
            image: self.display_image(),
            episode: next.episode,
            airing_at: next.airing_at,
        })
    }

    /// Episodes synthesized from the airing schedule; no links are available.
    pub fn scheduled_episodes(&self) -> Vec<Episode> {
        self.airing_schedule
            .as_ref()
            .map(|s| {
                s.nodes
                    .iter()
                    .map(|node| Episode {
                        id: CatalogId::from(u64::from(node.episode)),
                        season_number: None,
                        number: node.episode,
                        title: episode_label(node.episode),
                        download_link: None,
                        subtitle_link: None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}
