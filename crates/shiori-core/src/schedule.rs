//! Weekly broadcast bucketing.
//!
//! The weekday and time of day come from each title's next airing timestamp
//! in the configured UTC offset, never from the wall clock.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, FixedOffset, Offset, Timelike, Utc};

use crate::jalali::to_persian_digits;
use crate::models::{empty_week, CatalogId, ScheduleItem, Weekday};
use crate::view::episode_label;

/// Iran Standard Time, +03:30.
pub const DEFAULT_UTC_OFFSET_MINUTES: i32 = 210;

/// A releasing title's next broadcast, as reported upstream.
#[derive(Debug, Clone, PartialEq)]
pub struct Airing {
    pub id: CatalogId,
    pub title: String,
    pub image: String,
    pub episode: u32,
    pub airing_at: i64,
}

/// Offset for the given minutes east of UTC, falling back to UTC when out of range.
pub fn utc_offset(minutes: i32) -> FixedOffset {
    FixedOffset::east_opt(minutes * 60).unwrap_or_else(|| {
        tracing::warn!(minutes, "invalid UTC offset, using UTC");
        Utc.fix()
    })
}

fn local_time(airing_at: i64, offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
    DateTime::from_timestamp(airing_at, 0).map(|t| t.with_timezone(&offset))
}

fn minutes_of_day(airing_at: i64, offset: FixedOffset) -> u32 {
    local_time(airing_at, offset)
        .map(|t| t.hour() * 60 + t.minute())
        .unwrap_or(0)
}

/// Bucket airings into the seven weekdays, keeping upstream order within a day.
///
/// Airings with an out-of-range timestamp are skipped.
pub fn bucket_week(
    airings: impl IntoIterator<Item = Airing>,
    offset: FixedOffset,
) -> BTreeMap<Weekday, Vec<ScheduleItem>> {
    let mut days = empty_week();
    for airing in airings {
        let Some(local) = local_time(airing.airing_at, offset) else {
            tracing::debug!(id = %airing.id, airing_at = airing.airing_at, "skipping airing with invalid timestamp");
            continue;
        };
        let item = ScheduleItem {
            id: airing.id,
            title: airing.title,
            image: airing.image,
            episode: episode_label(airing.episode),
            time: to_persian_digits(&local.format("%H:%M").to_string()),
            airing_at: airing.airing_at,
        };
        days.entry(Weekday::from(local.weekday()))
            .or_default()
            .push(item);
    }
    days
}

/// [`bucket_week`] followed by [`sort_days`].
pub fn build_week(
    airings: impl IntoIterator<Item = Airing>,
    offset: FixedOffset,
) -> BTreeMap<Weekday, Vec<ScheduleItem>> {
    let mut days = bucket_week(airings, offset);
    sort_days(&mut days, offset);
    days
}

/// Stable sort of every day by local time of day.
pub fn sort_days(days: &mut BTreeMap<Weekday, Vec<ScheduleItem>>, offset: FixedOffset) {
    for items in days.values_mut() {
        items.sort_by_key(|item| minutes_of_day(item.airing_at, offset));
    }
}

/// Move up to two shows onto Thursday when it is empty.
///
/// Donor is the busiest day holding more than two shows; its first two in
/// bucket order move, so run this before [`sort_days`]. Returns whether
/// anything moved. Independent of the bucketing; callers may skip it.
pub fn fill_empty_thursday(days: &mut BTreeMap<Weekday, Vec<ScheduleItem>>) -> bool {
    let thursday_empty = days.get(&Weekday::Thursday).map_or(true, Vec::is_empty);
    if !thursday_empty {
        return false;
    }

    // max_by_key keeps the last maximum; reverse so ties go to the earliest day.
    let donor = days
        .iter()
        .rev()
        .filter(|(_, items)| items.len() > 2)
        .max_by_key(|(_, items)| items.len())
        .map(|(day, _)| *day);

    let Some(donor) = donor else {
        return false;
    };
    let moved: Vec<ScheduleItem> = match days.get_mut(&donor) {
        Some(items) => items.drain(..2).collect(),
        None => return false,
    };
    tracing::debug!(from = ?donor, count = moved.len(), "filling empty Thursday");
    days.insert(Weekday::Thursday, moved);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2024-01-06 00:00:00 UTC was a Saturday.
    const SATURDAY_UTC: i64 = 1_704_499_200;
    const HOUR: i64 = 3600;
    const DAY: i64 = 24 * HOUR;

    fn airing(id: i64, airing_at: i64) -> Airing {
        Airing {
            id: id.into(),
            title: format!("Show {id}"),
            image: String::new(),
            episode: 3,
            airing_at,
        }
    }

    fn ids(items: &[ScheduleItem]) -> Vec<String> {
        items.iter().map(|i| i.id.to_string()).collect()
    }

    #[test]
    fn test_buckets_by_airing_weekday_and_sorts() {
        let utc = utc_offset(0);
        let week = build_week(
            vec![
                airing(1, SATURDAY_UTC + 20 * HOUR),
                airing(2, SATURDAY_UTC + 8 * HOUR),
                airing(3, SATURDAY_UTC + DAY + HOUR),
            ],
            utc,
        );

        assert_eq!(week.len(), 7);
        assert_eq!(ids(&week[&Weekday::Saturday]), vec!["2", "1"]);
        assert_eq!(ids(&week[&Weekday::Sunday]), vec!["3"]);
        assert_eq!(week[&Weekday::Saturday][0].time, "۰۸:۰۰");
        assert_eq!(week[&Weekday::Saturday][0].episode, "قسمت ۳");
    }

    #[test]
    fn test_offset_moves_late_airings_to_next_day() {
        // Saturday 22:00 UTC is Sunday 01:30 in Tehran.
        let week = build_week(
            vec![airing(1, SATURDAY_UTC + 22 * HOUR)],
            utc_offset(DEFAULT_UTC_OFFSET_MINUTES),
        );
        assert!(week[&Weekday::Saturday].is_empty());
        assert_eq!(week[&Weekday::Sunday][0].time, "۰۱:۳۰");
    }

    #[test]
    fn test_fill_empty_thursday_moves_two_from_busiest_day() {
        let utc = utc_offset(0);
        let mut week = bucket_week(
            vec![
                airing(1, SATURDAY_UTC + HOUR),
                airing(2, SATURDAY_UTC + 2 * HOUR),
                airing(3, SATURDAY_UTC + 3 * HOUR),
                airing(4, SATURDAY_UTC + 2 * DAY + HOUR),
            ],
            utc,
        );

        assert!(fill_empty_thursday(&mut week));
        assert_eq!(ids(&week[&Weekday::Thursday]), vec!["1", "2"]);
        assert_eq!(ids(&week[&Weekday::Saturday]), vec!["3"]);
        assert_eq!(ids(&week[&Weekday::Monday]), vec!["4"]);
    }

    #[test]
    fn test_fill_takes_upstream_order_not_airing_time() {
        let utc = utc_offset(0);
        // Upstream (popularity) order differs from time of day.
        let mut week = bucket_week(
            vec![
                airing(1, SATURDAY_UTC + 20 * HOUR),
                airing(2, SATURDAY_UTC + 18 * HOUR),
                airing(3, SATURDAY_UTC + HOUR),
            ],
            utc,
        );

        assert!(fill_empty_thursday(&mut week));
        sort_days(&mut week, utc);
        assert_eq!(ids(&week[&Weekday::Thursday]), vec!["2", "1"]);
        assert_eq!(ids(&week[&Weekday::Saturday]), vec!["3"]);
    }

    #[test]
    fn test_fill_empty_thursday_needs_a_donor_with_more_than_two() {
        let mut week = build_week(
            vec![airing(1, SATURDAY_UTC), airing(2, SATURDAY_UTC + HOUR)],
            utc_offset(0),
        );
        assert!(!fill_empty_thursday(&mut week));
        assert!(week[&Weekday::Thursday].is_empty());
    }

    #[test]
    fn test_fill_skips_populated_thursday() {
        let thursday = SATURDAY_UTC + 5 * DAY;
        let mut week = build_week(
            vec![
                airing(1, thursday),
                airing(2, SATURDAY_UTC),
                airing(3, SATURDAY_UTC + 1),
                airing(4, SATURDAY_UTC + 2),
            ],
            utc_offset(0),
        );
        assert!(!fill_empty_thursday(&mut week));
        assert_eq!(week[&Weekday::Saturday].len(), 3);
    }
}
