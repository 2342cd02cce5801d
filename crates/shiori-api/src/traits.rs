//! The catalog capability shared by every upstream adapter.
//!
//! AniList, Supabase, and the in-memory mock all implement [`CatalogAdapter`],
//! so the runtime and the binary never depend on a specific backend.

use std::fmt;
use std::future::Future;

use chrono::Datelike;
use shiori_core::models::{CatalogDetail, CatalogEntry, CatalogId, ScheduleSnapshot};
use shiori_core::view::Section;

use crate::error::ApiError;

/// A read-only anime catalog.
pub trait CatalogAdapter: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Where a section hint passed to [`list_cards`](Self::list_cards) is applied.
    fn section_strategy(&self) -> SectionStrategy;

    /// Entries for a section. `None` returns the unfiltered listing used as
    /// the local search index.
    fn list_cards(
        &self,
        section: Option<Section>,
    ) -> impl Future<Output = Result<Vec<CatalogEntry>, ApiError>> + Send;

    /// One title with its episodes and subtitle packs.
    fn fetch_by_id(
        &self,
        id: &CatalogId,
    ) -> impl Future<Output = Result<CatalogDetail, ApiError>> + Send;

    /// This week's broadcasts bucketed by weekday.
    fn fetch_schedule(&self) -> impl Future<Output = Result<ScheduleSnapshot, ApiError>> + Send;

    fn search(&self, query: &str)
        -> impl Future<Output = Result<Vec<CatalogEntry>, ApiError>> + Send;
}

/// How a backend honours section hints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionStrategy {
    /// The backend issues a dedicated query per section.
    Server,
    /// The backend returns everything; callers filter by format afterwards.
    Client,
}

/// Broadcast quarter of the year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaSeason {
    Winter,
    Spring,
    Summer,
    Fall,
}

impl MediaSeason {
    /// Fixed quarterly boundaries on the zero-based Gregorian month.
    pub fn from_month0(month0: u32) -> Self {
        match month0 {
            0..=2 => Self::Winter,
            3..=5 => Self::Spring,
            6..=8 => Self::Summer,
            _ => Self::Fall,
        }
    }

    pub fn of(date: &impl Datelike) -> Self {
        Self::from_month0(date.month0())
    }

    /// AniList `MediaSeason` enum value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Winter => "WINTER",
            Self::Spring => "SPRING",
            Self::Summer => "SUMMER",
            Self::Fall => "FALL",
        }
    }

    pub fn persian_name(self) -> &'static str {
        match self {
            Self::Winter => "زمستان",
            Self::Spring => "بهار",
            Self::Summer => "تابستان",
            Self::Fall => "پاییز",
        }
    }
}

impl fmt::Display for MediaSeason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
