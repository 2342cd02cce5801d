//! Persisted catalog cache.
//!
//! Holds per-section card arrays, per-id details, the weekly schedule, and
//! card snapshots for favorited titles. The whole state is written to the
//! backend after every mutation and rehydrated on open. There is no TTL or
//! eviction; an `Unloaded` entry means "fetch it".
//!
//! Loads are fenced with per-key request tickets: only the most recently
//! issued ticket for a key may write its result.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::models::{CatalogDetail, CatalogId, ScheduleSnapshot};
use crate::storage::{load_snapshot, save_snapshot, StateBackend};
use crate::view::{Card, Section};

/// Name of the persisted entry.
pub const CACHE_STORAGE_KEY: &str = "anime-cache";

/// Load state of one cached value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum CacheEntry<T> {
    Unloaded,
    Loading,
    Loaded(T),
    Failed(String),
}

impl<T> Default for CacheEntry<T> {
    fn default() -> Self {
        Self::Unloaded
    }
}

impl<T> CacheEntry<T> {
    pub fn loaded(&self) -> Option<&T> {
        match self {
            Self::Loaded(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }

    /// Drop transient states; used when rehydrating.
    fn settle(self) -> Self {
        match self {
            Self::Loading | Self::Failed(_) => Self::Unloaded,
            other => other,
        }
    }

    fn begin(&mut self) {
        if !self.is_loaded() {
            *self = Self::Loading;
        }
    }

    /// A failed refresh keeps previously loaded data.
    fn finish(&mut self, result: Result<T, String>) {
        match result {
            Ok(value) => *self = Self::Loaded(value),
            Err(message) if !self.is_loaded() => *self = Self::Failed(message),
            Err(_) => {}
        }
    }
}

/// Identity of a fenced load.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Section(Section),
    Detail(CatalogId),
    Schedule,
    Search,
}

/// Proof that a load was issued; carries its sequence number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTicket {
    key: CacheKey,
    seq: u64,
}

impl RequestTicket {
    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }
}

/// Monotonic per-key sequence numbers.
#[derive(Debug, Default)]
pub struct RequestSequencer {
    issued: HashMap<CacheKey, u64>,
}

impl RequestSequencer {
    pub fn issue(&mut self, key: CacheKey) -> RequestTicket {
        let seq = self.issued.entry(key.clone()).or_insert(0);
        *seq += 1;
        RequestTicket { key, seq: *seq }
    }

    pub fn is_current(&self, ticket: &RequestTicket) -> bool {
        self.issued.get(&ticket.key) == Some(&ticket.seq)
    }
}

/// Everything that is persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheState {
    #[serde(default)]
    pub sections: BTreeMap<Section, CacheEntry<Vec<Card>>>,
    #[serde(default)]
    pub details: HashMap<CatalogId, CatalogDetail>,
    #[serde(default)]
    pub schedule: CacheEntry<ScheduleSnapshot>,
    #[serde(default)]
    pub favorite_cards: HashMap<CatalogId, Card>,
}

impl CacheState {
    fn settle(self) -> Self {
        Self {
            sections: self
                .sections
                .into_iter()
                .map(|(section, entry)| (section, entry.settle()))
                .filter(|(_, entry)| entry.is_loaded())
                .collect(),
            details: self.details,
            schedule: self.schedule.settle(),
            favorite_cards: self.favorite_cards,
        }
    }
}

static UNLOADED_SECTION: CacheEntry<Vec<Card>> = CacheEntry::Unloaded;

pub struct CacheStore {
    state: CacheState,
    backend: Arc<dyn StateBackend>,
    sequencer: RequestSequencer,
}

impl CacheStore {
    /// Open the store, rehydrating whatever the backend holds.
    pub fn open(backend: Arc<dyn StateBackend>) -> Result<Self, CoreError> {
        let state = load_snapshot::<CacheState>(backend.as_ref(), CACHE_STORAGE_KEY)?
            .map(CacheState::settle)
            .unwrap_or_default();
        tracing::debug!(
            sections = state.sections.len(),
            details = state.details.len(),
            "cache store opened"
        );
        Ok(Self {
            state,
            backend,
            sequencer: RequestSequencer::default(),
        })
    }

    pub fn state(&self) -> &CacheState {
        &self.state
    }

    fn persist(&self) -> Result<(), CoreError> {
        save_snapshot(self.backend.as_ref(), CACHE_STORAGE_KEY, &self.state)
    }

    // ── Sections ────────────────────────────────────────────────

    /// Cards of a section; empty unless loaded.
    pub fn get(&self, section: Section) -> &[Card] {
        self.entry(section)
            .loaded()
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Tagged state of a section, distinguishing "never loaded" from "empty".
    pub fn entry(&self, section: Section) -> &CacheEntry<Vec<Card>> {
        self.state
            .sections
            .get(&section)
            .unwrap_or(&UNLOADED_SECTION)
    }

    pub fn set(&mut self, section: Section, cards: Vec<Card>) -> Result<(), CoreError> {
        self.state
            .sections
            .insert(section, CacheEntry::Loaded(cards));
        self.persist()
    }

    /// Forget a section so the next read reloads it.
    pub fn invalidate(&mut self, section: Section) -> Result<(), CoreError> {
        if self.state.sections.remove(&section).is_some() {
            self.persist()?;
        }
        Ok(())
    }

    // ── Details ─────────────────────────────────────────────────

    pub fn get_detail(&self, id: &CatalogId) -> Option<&CatalogDetail> {
        self.state.details.get(id)
    }

    pub fn set_detail(&mut self, id: CatalogId, detail: CatalogDetail) -> Result<(), CoreError> {
        self.state.details.insert(id, detail);
        self.persist()
    }

    // ── Schedule ────────────────────────────────────────────────

    pub fn get_schedule(&self) -> Option<&ScheduleSnapshot> {
        self.state.schedule.loaded()
    }

    pub fn schedule_entry(&self) -> &CacheEntry<ScheduleSnapshot> {
        &self.state.schedule
    }

    pub fn set_schedule(&mut self, snapshot: ScheduleSnapshot) -> Result<(), CoreError> {
        self.state.schedule = CacheEntry::Loaded(snapshot);
        self.persist()
    }

    // ── Favorite card snapshots ─────────────────────────────────

    pub fn favorite_card(&self, id: &CatalogId) -> Option<&Card> {
        self.state.favorite_cards.get(id)
    }

    pub fn set_favorite_card(&mut self, card: Card) -> Result<(), CoreError> {
        self.state.favorite_cards.insert(card.id.clone(), card);
        self.persist()
    }

    pub fn clear_favorite_cards(&mut self) -> Result<(), CoreError> {
        self.state.favorite_cards.clear();
        self.persist()
    }

    // ── Fenced loads ────────────────────────────────────────────

    /// Issue a ticket for `key`, superseding any earlier one, and mark
    /// unloaded entries as loading.
    pub fn begin(&mut self, key: CacheKey) -> RequestTicket {
        match &key {
            CacheKey::Section(section) => self.state.sections.entry(*section).or_default().begin(),
            CacheKey::Schedule => self.state.schedule.begin(),
            CacheKey::Detail(_) | CacheKey::Search => {}
        }
        self.sequencer.issue(key)
    }

    pub fn is_current(&self, ticket: &RequestTicket) -> bool {
        self.sequencer.is_current(ticket)
    }

    fn accept(&self, ticket: &RequestTicket) -> bool {
        let current = self.is_current(ticket);
        if !current {
            tracing::debug!(key = ?ticket.key, seq = ticket.seq, "discarding stale response");
        }
        current
    }

    /// Apply a section load. Returns `false` when the ticket was superseded.
    pub fn complete_section(
        &mut self,
        ticket: &RequestTicket,
        result: Result<Vec<Card>, String>,
    ) -> Result<bool, CoreError> {
        let CacheKey::Section(section) = ticket.key else {
            return Ok(false);
        };
        if !self.accept(ticket) {
            return Ok(false);
        }
        let persist = result.is_ok();
        self.state
            .sections
            .entry(section)
            .or_default()
            .finish(result);
        if persist {
            self.persist()?;
        }
        Ok(true)
    }

    pub fn complete_detail(
        &mut self,
        ticket: &RequestTicket,
        detail: CatalogDetail,
    ) -> Result<bool, CoreError> {
        let CacheKey::Detail(id) = &ticket.key else {
            return Ok(false);
        };
        if !self.accept(ticket) {
            return Ok(false);
        }
        let id = id.clone();
        self.set_detail(id, detail)?;
        Ok(true)
    }

    pub fn complete_schedule(
        &mut self,
        ticket: &RequestTicket,
        result: Result<ScheduleSnapshot, String>,
    ) -> Result<bool, CoreError> {
        if ticket.key != CacheKey::Schedule || !self.accept(ticket) {
            return Ok(false);
        }
        let persist = result.is_ok();
        self.state.schedule.finish(result);
        if persist {
            self.persist()?;
        }
        Ok(true)
    }

    /// Abandon a load without a result (e.g. cancelled). Loading entries
    /// fall back to unloaded if this ticket was still current.
    pub fn abandon(&mut self, ticket: &RequestTicket) {
        if !self.is_current(ticket) {
            return;
        }
        match ticket.key {
            CacheKey::Section(section) => {
                if let Some(entry) = self.state.sections.get_mut(&section) {
                    if matches!(entry, CacheEntry::Loading) {
                        *entry = CacheEntry::Unloaded;
                    }
                }
            }
            CacheKey::Schedule => {
                if matches!(self.state.schedule, CacheEntry::Loading) {
                    self.state.schedule = CacheEntry::Unloaded;
                }
            }
            CacheKey::Detail(_) | CacheKey::Search => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CatalogEntry, ScheduleAvailability};
    use crate::storage::MemoryBackend;

    fn card(id: i64) -> Card {
        Card {
            id: id.into(),
            title: format!("Title {id}"),
            image: format!("https://img/{id}.jpg"),
            episode: "قسمت ۱".into(),
            is_new: id % 2 == 0,
            description: String::new(),
            genres: vec![],
        }
    }

    fn detail(id: i64, title: &str) -> CatalogDetail {
        CatalogDetail {
            entry: CatalogEntry {
                id: id.into(),
                title: title.into(),
                ..Default::default()
            },
            episodes: vec![],
            subtitle_packs: vec![],
        }
    }

    fn open(backend: &MemoryBackend) -> CacheStore {
        CacheStore::open(Arc::new(backend.clone())).unwrap()
    }

    #[test]
    fn test_roundtrip_survives_restart() {
        let backend = MemoryBackend::new();
        let cards = vec![card(1), card(2)];

        let mut store = open(&backend);
        store.set(Section::Popular, cards.clone()).unwrap();
        assert_eq!(store.get(Section::Popular), cards.as_slice());

        let reopened = open(&backend);
        assert_eq!(reopened.get(Section::Popular), cards.as_slice());
    }

    #[test]
    fn test_unloaded_is_distinct_from_empty() {
        let backend = MemoryBackend::new();
        let mut store = open(&backend);

        assert!(store.get(Section::Latest).is_empty());
        assert_eq!(store.entry(Section::Latest), &CacheEntry::Unloaded);

        store.set(Section::Latest, vec![]).unwrap();
        assert!(store.get(Section::Latest).is_empty());
        assert_eq!(store.entry(Section::Latest), &CacheEntry::Loaded(vec![]));
    }

    #[test]
    fn test_stale_section_response_is_discarded() {
        let backend = MemoryBackend::new();
        let mut store = open(&backend);

        let first = store.begin(CacheKey::Section(Section::Movies));
        let second = store.begin(CacheKey::Section(Section::Movies));
        assert_eq!(store.entry(Section::Movies), &CacheEntry::Loading);

        assert!(store.complete_section(&second, Ok(vec![card(2)])).unwrap());
        assert!(!store.complete_section(&first, Ok(vec![card(1)])).unwrap());
        assert_eq!(store.get(Section::Movies), &[card(2)]);
    }

    #[test]
    fn test_tickets_are_per_key() {
        let backend = MemoryBackend::new();
        let mut store = open(&backend);

        let a = store.begin(CacheKey::Detail("1".into()));
        let b = store.begin(CacheKey::Detail("2".into()));
        assert!(store.is_current(&a));
        assert!(store.is_current(&b));

        assert!(store.complete_detail(&a, detail(1, "A")).unwrap());
        assert_eq!(store.get_detail(&"1".into()).unwrap().entry.title, "A");
    }

    #[test]
    fn test_out_of_order_detail_keeps_latest_issued() {
        let backend = MemoryBackend::new();
        let mut store = open(&backend);

        let older = store.begin(CacheKey::Detail("7".into()));
        let newer = store.begin(CacheKey::Detail("7".into()));
        assert!(store.complete_detail(&newer, detail(7, "new")).unwrap());
        assert!(!store.complete_detail(&older, detail(7, "old")).unwrap());
        assert_eq!(store.get_detail(&"7".into()).unwrap().entry.title, "new");
    }

    #[test]
    fn test_failure_keeps_loaded_data() {
        let backend = MemoryBackend::new();
        let mut store = open(&backend);
        store.set(Section::Latest, vec![card(1)]).unwrap();

        let ticket = store.begin(CacheKey::Section(Section::Latest));
        assert!(store.entry(Section::Latest).is_loaded());
        store
            .complete_section(&ticket, Err("network".into()))
            .unwrap();
        assert_eq!(store.get(Section::Latest), &[card(1)]);

        let ticket = store.begin(CacheKey::Section(Section::Featured));
        store
            .complete_section(&ticket, Err("network".into()))
            .unwrap();
        assert_eq!(
            store.entry(Section::Featured),
            &CacheEntry::Failed("network".into())
        );
    }

    #[test]
    fn test_transient_states_settle_on_reopen() {
        let backend = MemoryBackend::new();
        let mut store = open(&backend);
        store.set(Section::Latest, vec![card(1)]).unwrap();
        let ticket = store.begin(CacheKey::Section(Section::Featured));
        store
            .complete_section(&ticket, Err("boom".into()))
            .unwrap();
        // Persist once more so the failed entry is part of the blob.
        store.set(Section::Popular, vec![]).unwrap();

        let reopened = open(&backend);
        assert_eq!(reopened.entry(Section::Featured), &CacheEntry::Unloaded);
        assert!(reopened.entry(Section::Latest).is_loaded());
        assert!(reopened.entry(Section::Popular).is_loaded());
    }

    #[test]
    fn test_abandon_resets_loading() {
        let backend = MemoryBackend::new();
        let mut store = open(&backend);
        let ticket = store.begin(CacheKey::Schedule);
        assert_eq!(store.schedule_entry(), &CacheEntry::Loading);
        store.abandon(&ticket);
        assert_eq!(store.schedule_entry(), &CacheEntry::Unloaded);
    }

    #[test]
    fn test_schedule_and_favorites_persist() {
        let backend = MemoryBackend::new();
        let mut store = open(&backend);
        let snapshot = ScheduleSnapshot::empty("FALL", 2024, ScheduleAvailability::Live);
        store.set_schedule(snapshot.clone()).unwrap();
        store.set_favorite_card(card(3)).unwrap();

        let mut reopened = open(&backend);
        assert_eq!(reopened.get_schedule(), Some(&snapshot));
        assert_eq!(reopened.favorite_card(&"3".into()), Some(&card(3)));

        reopened.clear_favorite_cards().unwrap();
        assert!(open(&backend).favorite_card(&"3".into()).is_none());
    }

    #[test]
    fn test_invalidate() {
        let backend = MemoryBackend::new();
        let mut store = open(&backend);
        store.set(Section::Movies, vec![card(1)]).unwrap();
        store.invalidate(Section::Movies).unwrap();
        assert_eq!(store.entry(Section::Movies), &CacheEntry::Unloaded);
        assert_eq!(open(&backend).entry(Section::Movies), &CacheEntry::Unloaded);
    }
}
