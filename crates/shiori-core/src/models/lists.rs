use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::CatalogId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchListItem {
    pub id: String,
    pub text: String,
    pub completed: bool,
}

/// A user-created checklist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchList {
    pub id: String,
    pub title: String,
    pub items: Vec<WatchListItem>,
    pub created_at: DateTime<Utc>,
}

impl WatchList {
    pub fn item(&self, item_id: &str) -> Option<&WatchListItem> {
        self.items.iter().find(|i| i.id == item_id)
    }

    pub fn completed_count(&self) -> usize {
        self.items.iter().filter(|i| i.completed).count()
    }
}

/// Everything the favorites/lists store persists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserState {
    #[serde(default)]
    pub favorites: Vec<CatalogId>,
    #[serde(default)]
    pub recently_watched: Vec<CatalogId>,
    #[serde(default)]
    pub lists: Vec<WatchList>,
}

impl UserState {
    pub fn is_favorite(&self, id: &CatalogId) -> bool {
        self.favorites.contains(id)
    }

    pub fn list(&self, list_id: &str) -> Option<&WatchList> {
        self.lists.iter().find(|l| l.id == list_id)
    }
}
