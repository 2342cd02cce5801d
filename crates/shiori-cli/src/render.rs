//! Plain-text output for each page.

use shiori_core::models::{
    CatalogDetail, GenreTag, ScheduleAvailability, ScheduleSnapshot, WatchList, Weekday,
};
use shiori_core::view::{Card, ListItem};

fn genres(tags: &[GenreTag]) -> String {
    tags.iter()
        .map(|g| g.display_name())
        .collect::<Vec<_>>()
        .join("، ")
}

pub fn cards(cards: &[Card]) {
    if cards.is_empty() {
        println!("(empty)");
        return;
    }
    for card in cards {
        let new = if card.is_new { " *" } else { "" };
        println!("{:>8}  {}{new}  [{}]", card.id, card.title, card.episode);
    }
}

pub fn list_items(items: &[ListItem]) {
    if items.is_empty() {
        println!("(no results)");
        return;
    }
    for item in items {
        println!(
            "{:>8}  {}  {}  {}",
            item.id,
            item.title,
            item.status,
            genres(&item.genres)
        );
    }
}

pub fn detail(detail: &CatalogDetail, favorite: bool) {
    let entry = &detail.entry;
    println!("{}{}", entry.title, if favorite { "  ♥" } else { "" });
    let facts = [
        entry.format.as_deref(),
        entry.status.as_deref(),
        entry.studio.as_deref(),
        entry.start_date.as_deref(),
    ];
    println!("{}", facts.into_iter().flatten().collect::<Vec<_>>().join(" · "));
    if !entry.genres.is_empty() {
        println!("{}", genres(&entry.genres));
    }
    if let Some(score) = entry.average_score {
        println!("score: {score}");
    }
    if !entry.description.is_empty() {
        println!("\n{}\n", entry.description);
    }

    for episode in &detail.episodes {
        let links = [
            episode.download_link.as_deref().map(|l| format!("dl {l}")),
            episode.subtitle_link.as_deref().map(|l| format!("sub {l}")),
        ];
        let links: Vec<_> = links.into_iter().flatten().collect();
        println!(
            "  S{:02}E{:02}  {}  {}",
            episode.season(),
            episode.number,
            episode.title,
            links.join("  ")
        );
    }
    for pack in &detail.subtitle_packs {
        println!(
            "  S{:02} pack  {}  {}",
            pack.season(),
            pack.title.as_deref().unwrap_or("-"),
            pack.subtitle_link.as_deref().unwrap_or("-")
        );
    }
}

pub fn schedule(snapshot: &ScheduleSnapshot) {
    match snapshot.availability {
        ScheduleAvailability::Placeholder => {
            println!("(this backend has no broadcast schedule)");
            return;
        }
        ScheduleAvailability::Fallback => println!("(not limited to the current season)"),
        ScheduleAvailability::Live => {}
    }
    for day in Weekday::ALL {
        let items = snapshot.day(day);
        if items.is_empty() {
            continue;
        }
        println!("{}", day.persian_name());
        for item in items {
            println!("  {}  {}  {}", item.time, item.title, item.episode);
        }
    }
}

pub fn lists(lists: &[WatchList]) {
    if lists.is_empty() {
        println!("(no lists)");
        return;
    }
    for list in lists {
        println!(
            "{}  {} ({}/{})",
            list.id,
            list.title,
            list.completed_count(),
            list.items.len()
        );
        for item in &list.items {
            let mark = if item.completed { "x" } else { " " };
            println!("  [{mark}] {}  {}", item.id, item.text);
        }
    }
}
