mod catalog;
mod lists;
mod schedule;

pub use catalog::{
    join_subtitles, synthesize_episodes, AiringEpisode, CatalogDetail, CatalogEntry, CatalogId,
    Episode, GenreTag, SubtitleLink, SubtitlePack, MAX_SYNTHESIZED_EPISODES,
};
pub use lists::{UserState, WatchList, WatchListItem};
pub(crate) use schedule::empty_week;
pub use schedule::{ScheduleAvailability, ScheduleItem, ScheduleSnapshot, Weekday};
