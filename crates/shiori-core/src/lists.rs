//! Favorites, recently watched, and user watch-lists.
//!
//! State is handed out as `Arc<UserState>` snapshots. Every mutation builds
//! a new snapshot, so previously returned ones never change; the backend is
//! written only when the new snapshot differs.

use std::sync::Arc;

use chrono::Utc;

use crate::error::CoreError;
use crate::models::{CatalogId, UserState, WatchList, WatchListItem};
use crate::storage::{load_snapshot, save_snapshot, StateBackend};

/// Name of the persisted entry.
pub const USER_STORAGE_KEY: &str = "anime-storage";

/// How many recently watched ids are kept.
pub const RECENTLY_WATCHED_LIMIT: usize = 10;

pub struct UserStore {
    state: Arc<UserState>,
    backend: Arc<dyn StateBackend>,
    last_id: i64,
}

impl UserStore {
    pub fn open(backend: Arc<dyn StateBackend>) -> Result<Self, CoreError> {
        let state: UserState =
            load_snapshot(backend.as_ref(), USER_STORAGE_KEY)?.unwrap_or_default();
        let last_id = state
            .lists
            .iter()
            .flat_map(|l| std::iter::once(l.id.as_str()).chain(l.items.iter().map(|i| i.id.as_str())))
            .filter_map(|id| id.parse::<i64>().ok())
            .max()
            .unwrap_or(0);
        Ok(Self {
            state: Arc::new(state),
            backend,
            last_id,
        })
    }

    pub fn state(&self) -> Arc<UserState> {
        Arc::clone(&self.state)
    }

    pub fn is_favorite(&self, id: &CatalogId) -> bool {
        self.state.is_favorite(id)
    }

    /// Millisecond timestamp id, bumped so ids stay increasing within this store.
    fn next_id(&mut self) -> String {
        let now = Utc::now().timestamp_millis();
        self.last_id = now.max(self.last_id + 1);
        self.last_id.to_string()
    }

    fn commit(&mut self, next: UserState) -> Result<Arc<UserState>, CoreError> {
        if next == *self.state {
            return Ok(self.state());
        }
        save_snapshot(self.backend.as_ref(), USER_STORAGE_KEY, &next)?;
        self.state = Arc::new(next);
        Ok(self.state())
    }

    fn edit_list(
        &mut self,
        list_id: &str,
        edit: impl FnOnce(&mut WatchList),
    ) -> Result<Arc<UserState>, CoreError> {
        let mut next = (*self.state).clone();
        let list = next
            .lists
            .iter_mut()
            .find(|l| l.id == list_id)
            .ok_or_else(|| CoreError::UnknownList(list_id.to_string()))?;
        edit(list);
        self.commit(next)
    }

    // ── Favorites ───────────────────────────────────────────────

    /// Add the id if absent, remove it if present.
    pub fn toggle_favorite(&mut self, id: CatalogId) -> Result<Arc<UserState>, CoreError> {
        let mut next = (*self.state).clone();
        if next.is_favorite(&id) {
            next.favorites.retain(|f| *f != id);
        } else {
            next.favorites.push(id);
        }
        self.commit(next)
    }

    /// Move `id` to the front of the recently watched list.
    pub fn mark_watched(&mut self, id: CatalogId) -> Result<Arc<UserState>, CoreError> {
        let mut next = (*self.state).clone();
        next.recently_watched.retain(|w| *w != id);
        next.recently_watched.insert(0, id);
        next.recently_watched.truncate(RECENTLY_WATCHED_LIMIT);
        self.commit(next)
    }

    // ── Watch lists ─────────────────────────────────────────────

    pub fn create_list(&mut self, title: &str) -> Result<WatchList, CoreError> {
        let list = WatchList {
            id: self.next_id(),
            title: title.trim().to_string(),
            items: Vec::new(),
            created_at: Utc::now(),
        };
        let mut next = (*self.state).clone();
        next.lists.push(list.clone());
        self.commit(next)?;
        tracing::debug!(list_id = %list.id, "created watch list");
        Ok(list)
    }

    /// Removing an unknown list is a no-op.
    pub fn remove_list(&mut self, list_id: &str) -> Result<Arc<UserState>, CoreError> {
        let mut next = (*self.state).clone();
        next.lists.retain(|l| l.id != list_id);
        self.commit(next)
    }

    pub fn add_item(&mut self, list_id: &str, text: &str) -> Result<Arc<UserState>, CoreError> {
        let item = WatchListItem {
            id: self.next_id(),
            text: text.trim().to_string(),
            completed: false,
        };
        self.edit_list(list_id, |list| list.items.push(item))
    }

    pub fn remove_item(&mut self, list_id: &str, item_id: &str) -> Result<Arc<UserState>, CoreError> {
        self.edit_list(list_id, |list| list.items.retain(|i| i.id != item_id))
    }

    pub fn toggle_item_completed(
        &mut self,
        list_id: &str,
        item_id: &str,
    ) -> Result<Arc<UserState>, CoreError> {
        self.edit_list(list_id, |list| {
            if let Some(item) = list.items.iter_mut().find(|i| i.id == item_id) {
                item.completed = !item.completed;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryBackend;

    fn open(backend: &MemoryBackend) -> UserStore {
        UserStore::open(Arc::new(backend.clone())).unwrap()
    }

    #[test]
    fn test_toggle_favorite() {
        let backend = MemoryBackend::new();
        let mut store = open(&backend);
        let id = CatalogId::from(42_i64);

        store.toggle_favorite(id.clone()).unwrap();
        assert!(store.is_favorite(&id));
        store.toggle_favorite(id.clone()).unwrap();
        assert!(!store.is_favorite(&id));
    }

    #[test]
    fn test_numeric_and_string_ids_match() {
        let backend = MemoryBackend::new();
        let mut store = open(&backend);
        store.toggle_favorite(CatalogId::from(7_i64)).unwrap();
        assert!(store.is_favorite(&CatalogId::from("7")));
    }

    #[test]
    fn test_snapshots_are_copy_on_write() {
        let backend = MemoryBackend::new();
        let mut store = open(&backend);
        let before = store.state();
        let after = store.toggle_favorite("1".into()).unwrap();

        assert!(before.favorites.is_empty());
        assert_eq!(after.favorites.len(), 1);
        assert!(!Arc::ptr_eq(&before, &after));
    }

    #[test]
    fn test_unchanged_state_is_not_rewritten() {
        let backend = MemoryBackend::new();
        let mut store = open(&backend);
        let before = store.state();
        let after = store.remove_list("missing").unwrap();
        assert!(Arc::ptr_eq(&before, &after));
        assert!(backend.raw(USER_STORAGE_KEY).is_none());
    }

    #[test]
    fn test_list_crud() {
        let backend = MemoryBackend::new();
        let mut store = open(&backend);

        let list = store.create_list("  Weekend  ").unwrap();
        assert_eq!(list.title, "Weekend");

        let state = store.add_item(&list.id, "Frieren").unwrap();
        let item_id = state.list(&list.id).unwrap().items[0].id.clone();
        assert_ne!(item_id, list.id);

        let state = store.toggle_item_completed(&list.id, &item_id).unwrap();
        assert!(state.list(&list.id).unwrap().items[0].completed);
        assert_eq!(state.list(&list.id).unwrap().completed_count(), 1);

        let state = store.remove_item(&list.id, &item_id).unwrap();
        assert!(state.list(&list.id).unwrap().items.is_empty());

        let state = store.remove_list(&list.id).unwrap();
        assert!(state.lists.is_empty());
    }

    #[test]
    fn test_unknown_list_is_an_error() {
        let backend = MemoryBackend::new();
        let mut store = open(&backend);
        assert!(matches!(
            store.add_item("nope", "x"),
            Err(CoreError::UnknownList(id)) if id == "nope"
        ));
    }

    #[test]
    fn test_ids_increase_even_within_one_millisecond() {
        let backend = MemoryBackend::new();
        let mut store = open(&backend);
        let a = store.create_list("a").unwrap();
        let b = store.create_list("b").unwrap();
        let a_id: i64 = a.id.parse().unwrap();
        let b_id: i64 = b.id.parse().unwrap();
        assert!(b_id > a_id);
    }

    #[test]
    fn test_recently_watched_is_capped_and_deduplicated() {
        let backend = MemoryBackend::new();
        let mut store = open(&backend);
        for id in 0..12_i64 {
            store.mark_watched(id.into()).unwrap();
        }
        let state = store.mark_watched(5_i64.into()).unwrap();
        assert_eq!(state.recently_watched.len(), RECENTLY_WATCHED_LIMIT);
        assert_eq!(state.recently_watched[0], CatalogId::from(5_i64));
        assert_eq!(
            state
                .recently_watched
                .iter()
                .filter(|id| **id == CatalogId::from(5_i64))
                .count(),
            1
        );
    }

    #[test]
    fn test_state_survives_restart() {
        let backend = MemoryBackend::new();
        let list_id = {
            let mut store = open(&backend);
            store.toggle_favorite("9".into()).unwrap();
            let list = store.create_list("Later").unwrap();
            store.add_item(&list.id, "Dandadan").unwrap();
            list.id
        };

        let mut reopened = open(&backend);
        assert!(reopened.is_favorite(&"9".into()));
        assert_eq!(reopened.state().list(&list_id).unwrap().items.len(), 1);

        // Fresh ids continue past the persisted ones.
        let next = reopened.create_list("Next").unwrap();
        assert!(next.id.parse::<i64>().unwrap() > list_id.parse::<i64>().unwrap());
    }
}
