//! In-memory catalog for offline development and tests.

use std::collections::BTreeMap;

use shiori_core::models::{
    synthesize_episodes, CatalogDetail, CatalogEntry, CatalogId, ScheduleAvailability,
    ScheduleItem, ScheduleSnapshot, Weekday,
};
use shiori_core::normalize::from_display;
use shiori_core::view::{episode_label, filter_by_title, Section, MOVIE_LABEL};

use crate::error::ApiError;
use crate::traits::{CatalogAdapter, SectionStrategy};

const SAMPLE_IMAGE: &str = "/assets/images/frieren-03.webp";
const SAMPLE_SYNOPSIS: &str = "شرح آزمایشی برای نمایش جایگذاری متن کارت. این متن صرفاً نمایشی است.";

pub struct MockAdapter {
    entries: Vec<CatalogEntry>,
    schedule: ScheduleSnapshot,
}

fn sample_entry(
    id: i64,
    title: &str,
    format: &str,
    status: &str,
    genres: &[&str],
    episodes: u32,
    score: u32,
) -> CatalogEntry {
    CatalogEntry {
        id: id.into(),
        title: title.to_string(),
        image: SAMPLE_IMAGE.to_string(),
        description: SAMPLE_SYNOPSIS.to_string(),
        format: Some(format.to_string()),
        status: Some(status.to_string()),
        genres: genres.iter().filter_map(|g| from_display(g)).collect(),
        episode_count: Some(episodes),
        average_score: Some(score),
        ..Default::default()
    }
}

fn slot(entry: &CatalogEntry, episode: String, time: &str, airing_at: i64) -> ScheduleItem {
    ScheduleItem {
        id: entry.id.clone(),
        title: entry.title.clone(),
        image: entry.image.clone(),
        episode,
        time: time.to_string(),
        airing_at,
    }
}

impl MockAdapter {
    pub fn new(entries: Vec<CatalogEntry>, schedule: ScheduleSnapshot) -> Self {
        Self { entries, schedule }
    }

    /// Three sample titles and a three-slot week.
    pub fn sample() -> Self {
        let frieren = CatalogEntry {
            studio: Some("MADHOUSE".into()),
            season: Some("پاییز ۱۴۰۳".into()),
            start_date: Some("۱۴۰۳/۰۷/۰۱".into()),
            is_new: Some(true),
            episode_label: Some(episode_label(1)),
            ..sample_entry(
                1,
                "Frieren: Beyond Journey's End",
                "TV",
                "RELEASING",
                &["Fantasy", "Adventure", "Drama"],
                12,
                88,
            )
        };
        let frieren_s2 = CatalogEntry {
            episode_label: Some(episode_label(24)),
            ..sample_entry(
                2,
                "Sousou no Frieren S2",
                "TV",
                "FINISHED",
                &["Action", "Fantasy"],
                24,
                90,
            )
        };
        let abyss = CatalogEntry {
            episode_label: Some(MOVIE_LABEL.into()),
            ..sample_entry(
                3,
                "Made in Abyss Movie",
                "MOVIE",
                "FINISHED",
                &["Adventure", "Drama"],
                1,
                82,
            )
        };

        // Airings in the week of 2024-01-06, Tehran time.
        let mut days: BTreeMap<Weekday, Vec<ScheduleItem>> =
            Weekday::ALL.iter().map(|d| (*d, Vec::new())).collect();
        days.insert(
            Weekday::Saturday,
            vec![slot(&frieren, episode_label(1), "۲۰:۳۰", 1_704_560_400)],
        );
        days.insert(
            Weekday::Monday,
            vec![slot(&frieren_s2, episode_label(24), "۱۸:۱۵", 1_704_725_100)],
        );
        days.insert(
            Weekday::Thursday,
            vec![slot(&abyss, MOVIE_LABEL.into(), "۲۱:۰۰", 1_704_994_200)],
        );

        let schedule = ScheduleSnapshot {
            days,
            current_season: "پاییز".into(),
            current_year: 2024,
            availability: ScheduleAvailability::Live,
        };
        Self::new(vec![frieren, frieren_s2, abyss], schedule)
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }
}

impl CatalogAdapter for MockAdapter {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn section_strategy(&self) -> SectionStrategy {
        SectionStrategy::Client
    }

    async fn list_cards(&self, _section: Option<Section>) -> Result<Vec<CatalogEntry>, ApiError> {
        Ok(self.entries.clone())
    }

    async fn fetch_by_id(&self, id: &CatalogId) -> Result<CatalogDetail, ApiError> {
        let entry = self
            .entries
            .iter()
            .find(|e| e.id == *id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(id.clone()))?;
        Ok(CatalogDetail {
            episodes: synthesize_episodes(entry.episode_count.unwrap_or(0)),
            entry,
            subtitle_packs: Vec::new(),
        })
    }

    async fn fetch_schedule(&self) -> Result<ScheduleSnapshot, ApiError> {
        Ok(self.schedule.clone())
    }

    async fn search(&self, query: &str) -> Result<Vec<CatalogEntry>, ApiError> {
        Ok(filter_by_title(self.entries.clone(), query))
    }
}
