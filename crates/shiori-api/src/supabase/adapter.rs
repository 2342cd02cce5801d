use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{Datelike, Utc};
use shiori_core::models::{
    join_subtitles, synthesize_episodes, CatalogDetail, CatalogEntry, CatalogId, Episode,
    ScheduleAvailability, ScheduleSnapshot, SubtitleLink, SubtitlePack,
};
use shiori_core::view::{filter_by_title, Section};

use super::postgrest::{PostgrestClient, TableQuery, TableSource};
use super::rows::{decode_rows, AnimeRow, EpisodeRow, SubtitlePackRow, SubtitleRow};
use crate::error::ApiError;
use crate::traits::{CatalogAdapter, MediaSeason, SectionStrategy};

const ANIME_TABLE: &str = "anime";
const EPISODES_TABLE: &str = "episodes";
const SUBTITLES_TABLE: &str = "subtitles";
const SUBTITLE_PACKS_TABLE: &str = "subtitle_packs";

/// Column sets for the `anime` table, richest schema first.
const ANIME_SELECTS: [&str; 3] = [
    "id, title, cover_image, featured_image, synopsis, format, status, airing_status,
     average_score, episodes_count, studio, season, year, start_date, end_date, created_at,
     anime_genres(genres(slug, name_en, name_fa))",
    "id, title, cover_image, featured_image, synopsis, format, status,
     average_score, episodes_count, studio, season, year, start_date, end_date, created_at,
     anime_genres(genres(slug, name_en, name_fa))",
    "*",
];

/// Relational catalog adapter over Supabase tables.
///
/// The whole `anime` table is fetched for every listing; section hints and
/// search are applied locally, which only suits a small catalog.
pub struct SupabaseAdapter<S = PostgrestClient> {
    source: S,
    /// Index into [`ANIME_SELECTS`] of the richest variant known to work.
    variant: AtomicUsize,
}

impl<S: TableSource> SupabaseAdapter<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            variant: AtomicUsize::new(0),
        }
    }

    /// Every row of the `anime` table, newest first.
    pub async fn fetch_all(&self) -> Result<Vec<CatalogEntry>, ApiError> {
        let start = self.variant.load(Ordering::Relaxed);
        let mut last_err = None;

        for (index, select) in ANIME_SELECTS.iter().enumerate().skip(start) {
            let query = TableQuery::from(ANIME_TABLE)
                .select(select)
                .order("created_at", false);
            match self.source.select(&query).await {
                Ok(rows) => {
                    if index != start {
                        tracing::info!(variant = index, "using narrower anime schema");
                        self.variant.store(index, Ordering::Relaxed);
                    }
                    let entries: Vec<CatalogEntry> = decode_rows::<AnimeRow>(ANIME_TABLE, rows)
                        .into_iter()
                        .map(AnimeRow::into_entry)
                        .collect();
                    if entries.is_empty() {
                        tracing::warn!("anime table returned no rows; check row-level security");
                    }
                    return Ok(entries);
                }
                Err(e @ ApiError::Query { .. }) => {
                    tracing::warn!(variant = index, error = %e, "anime query failed, trying narrower schema");
                    last_err = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_err.unwrap_or_else(|| ApiError::Query {
            status: 0,
            message: "no anime schema variant left to try".into(),
        }))
    }

    async fn episodes(&self, id: &CatalogId) -> Result<Vec<Episode>, ApiError> {
        let query = TableQuery::from(EPISODES_TABLE)
            .eq("anime_id", id)
            .order("episode_number", true);
        let rows = self.source.select(&query).await?;
        let mut episodes: Vec<Episode> = decode_rows::<EpisodeRow>(EPISODES_TABLE, rows)
            .into_iter()
            .map(EpisodeRow::into_episode)
            .collect();
        episodes.sort_by_key(|e| (e.season(), e.number));
        Ok(episodes)
    }

    async fn subtitles(&self, id: &CatalogId) -> Vec<SubtitleLink> {
        let query = TableQuery::from(SUBTITLES_TABLE).eq("anime_id", id);
        match self.source.select(&query).await {
            Ok(rows) => decode_rows::<SubtitleRow>(SUBTITLES_TABLE, rows)
                .into_iter()
                .filter_map(SubtitleRow::into_link)
                .collect(),
            Err(e) => {
                tracing::warn!(id = %id, error = %e, "subtitles unavailable");
                Vec::new()
            }
        }
    }

    async fn subtitle_packs(&self, id: &CatalogId) -> Vec<SubtitlePack> {
        let query = TableQuery::from(SUBTITLE_PACKS_TABLE)
            .eq("anime_id", id)
            .order("season_number", true);
        match self.source.select(&query).await {
            Ok(rows) => decode_rows::<SubtitlePackRow>(SUBTITLE_PACKS_TABLE, rows)
                .into_iter()
                .map(SubtitlePack::from)
                .collect(),
            Err(e) => {
                tracing::warn!(id = %id, error = %e, "subtitle packs unavailable");
                Vec::new()
            }
        }
    }
}

impl<S: TableSource> CatalogAdapter for SupabaseAdapter<S> {
    fn name(&self) -> &'static str {
        "supabase"
    }

    fn section_strategy(&self) -> SectionStrategy {
        SectionStrategy::Client
    }

    async fn list_cards(&self, section: Option<Section>) -> Result<Vec<CatalogEntry>, ApiError> {
        tracing::debug!(section = ?section, "listing full anime table");
        self.fetch_all().await
    }

    async fn fetch_by_id(&self, id: &CatalogId) -> Result<CatalogDetail, ApiError> {
        let entry = self
            .fetch_all()
            .await?
            .into_iter()
            .find(|e| e.id == *id)
            .ok_or_else(|| ApiError::NotFound(id.clone()))?;

        let mut episodes = self.episodes(id).await?;
        if episodes.is_empty() {
            episodes = synthesize_episodes(entry.episode_count.unwrap_or(0));
        } else {
            episodes = join_subtitles(episodes, &self.subtitles(id).await);
        }

        Ok(CatalogDetail {
            entry,
            episodes,
            subtitle_packs: self.subtitle_packs(id).await,
        })
    }

    /// No schedule table exists yet; the snapshot is an empty placeholder.
    async fn fetch_schedule(&self) -> Result<ScheduleSnapshot, ApiError> {
        let today = Utc::now();
        Ok(ScheduleSnapshot::empty(
            MediaSeason::of(&today).as_str(),
            today.year(),
            ScheduleAvailability::Placeholder,
        ))
    }

    async fn search(&self, query: &str) -> Result<Vec<CatalogEntry>, ApiError> {
        Ok(filter_by_title(self.fetch_all().await?, query))
    }
}
