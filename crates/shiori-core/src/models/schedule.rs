use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::CatalogId;

/// Broadcast weekday, ordered Saturday-first like the Iranian week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    Saturday,
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Self::Saturday,
        Self::Sunday,
        Self::Monday,
        Self::Tuesday,
        Self::Wednesday,
        Self::Thursday,
        Self::Friday,
    ];

    pub fn persian_name(self) -> &'static str {
        match self {
            Self::Saturday => "شنبه",
            Self::Sunday => "یکشنبه",
            Self::Monday => "دوشنبه",
            Self::Tuesday => "سه‌شنبه",
            Self::Wednesday => "چهارشنبه",
            Self::Thursday => "پنج‌شنبه",
            Self::Friday => "جمعه",
        }
    }
}

impl From<chrono::Weekday> for Weekday {
    fn from(day: chrono::Weekday) -> Self {
        match day {
            chrono::Weekday::Sat => Self::Saturday,
            chrono::Weekday::Sun => Self::Sunday,
            chrono::Weekday::Mon => Self::Monday,
            chrono::Weekday::Tue => Self::Tuesday,
            chrono::Weekday::Wed => Self::Wednesday,
            chrono::Weekday::Thu => Self::Thursday,
            chrono::Weekday::Fri => Self::Friday,
        }
    }
}

/// One broadcast slot on the weekly schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleItem {
    pub id: CatalogId,
    pub title: String,
    pub image: String,
    pub episode: String,
    /// Local time of day, `HH:MM` in Persian digits.
    pub time: String,
    /// Raw UNIX timestamp of the airing, seconds.
    pub airing_at: i64,
}

/// Where a schedule snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleAvailability {
    /// Season-filtered query returned data.
    Live,
    /// Season-filtered query was empty; the unfiltered query was used.
    Fallback,
    /// Backend has no schedule model; every bucket is empty by construction.
    Placeholder,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleSnapshot {
    pub days: BTreeMap<Weekday, Vec<ScheduleItem>>,
    pub current_season: String,
    pub current_year: i32,
    pub availability: ScheduleAvailability,
}

impl ScheduleSnapshot {
    /// A snapshot with all seven buckets present and empty.
    pub fn empty(
        current_season: impl Into<String>,
        current_year: i32,
        availability: ScheduleAvailability,
    ) -> Self {
        Self {
            days: empty_week(),
            current_season: current_season.into(),
            current_year,
            availability,
        }
    }

    pub fn day(&self, day: Weekday) -> &[ScheduleItem] {
        self.days.get(&day).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn total(&self) -> usize {
        self.days.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn is_placeholder(&self) -> bool {
        self.availability == ScheduleAvailability::Placeholder
    }
}

pub(crate) fn empty_week() -> BTreeMap<Weekday, Vec<ScheduleItem>> {
    Weekday::ALL.iter().map(|d| (*d, Vec::new())).collect()
}
