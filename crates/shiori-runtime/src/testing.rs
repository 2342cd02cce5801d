//! Scripted catalog for runtime tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use shiori_api::{ApiError, CatalogAdapter, SectionStrategy};
use shiori_core::config::AppConfig;
use shiori_core::models::{
    synthesize_episodes, CatalogDetail, CatalogEntry, CatalogId, ScheduleAvailability,
    ScheduleSnapshot,
};
use shiori_core::storage::MemoryBackend;
use shiori_core::view::{filter_by_title, Section};

use crate::Runtime;

pub(crate) fn entry(id: i64, title: &str, format: &str) -> CatalogEntry {
    CatalogEntry {
        id: id.into(),
        title: title.to_string(),
        format: Some(format.to_string()),
        episode_count: Some(12),
        ..Default::default()
    }
}

pub(crate) fn runtime(catalog: FakeCatalog) -> Runtime<FakeCatalog> {
    Runtime::with_parts(catalog, Arc::new(MemoryBackend::new()), AppConfig::default())
        .expect("memory backend opens")
}

pub(crate) struct FakeCatalog {
    entries: Vec<CatalogEntry>,
    strategy: SectionStrategy,
    list_delays_ms: Vec<u64>,
    fail: bool,
    list_calls: AtomicUsize,
    detail_calls: AtomicUsize,
    schedule_calls: AtomicUsize,
    hints: Mutex<Vec<Option<Section>>>,
    searches: Mutex<Vec<String>>,
}

impl FakeCatalog {
    pub(crate) fn new(entries: Vec<CatalogEntry>) -> Self {
        Self {
            entries,
            strategy: SectionStrategy::Server,
            list_delays_ms: Vec::new(),
            fail: false,
            list_calls: AtomicUsize::new(0),
            detail_calls: AtomicUsize::new(0),
            schedule_calls: AtomicUsize::new(0),
            hints: Mutex::new(Vec::new()),
            searches: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_strategy(mut self, strategy: SectionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Delay the nth list call by `delays[n]` ms and tag titles with the call number.
    pub(crate) fn with_list_delays(mut self, delays: &[u64]) -> Self {
        self.list_delays_ms = delays.to_vec();
        self
    }

    pub(crate) fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub(crate) fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn detail_calls(&self) -> usize {
        self.detail_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn schedule_calls(&self) -> usize {
        self.schedule_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn section_hints(&self) -> Vec<Option<Section>> {
        self.hints.lock().unwrap().clone()
    }

    pub(crate) fn searches(&self) -> Vec<String> {
        self.searches.lock().unwrap().clone()
    }
}

impl CatalogAdapter for FakeCatalog {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn section_strategy(&self) -> SectionStrategy {
        self.strategy
    }

    async fn list_cards(&self, section: Option<Section>) -> Result<Vec<CatalogEntry>, ApiError> {
        let call = self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.hints.lock().unwrap().push(section);
        if self.fail {
            return Err(ApiError::GraphQL("upstream down".into()));
        }
        let Some(delay) = self.list_delays_ms.get(call).copied() else {
            return Ok(self.entries.clone());
        };
        tokio::time::sleep(Duration::from_millis(delay)).await;
        Ok(self
            .entries
            .iter()
            .cloned()
            .map(|mut e| {
                e.title = format!("{} (call {call})", e.title);
                e
            })
            .collect())
    }

    async fn fetch_by_id(&self, id: &CatalogId) -> Result<CatalogDetail, ApiError> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        let entry = self
            .entries
            .iter()
            .find(|e| e.id == *id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(id.clone()))?;
        let episodes = synthesize_episodes(entry.episode_count.unwrap_or(1));
        Ok(CatalogDetail {
            entry,
            episodes,
            subtitle_packs: Vec::new(),
        })
    }

    async fn fetch_schedule(&self) -> Result<ScheduleSnapshot, ApiError> {
        self.schedule_calls.fetch_add(1, Ordering::SeqCst);
        Ok(ScheduleSnapshot::empty("FALL", 2024, ScheduleAvailability::Live))
    }

    async fn search(&self, query: &str) -> Result<Vec<CatalogEntry>, ApiError> {
        self.searches.lock().unwrap().push(query.to_string());
        Ok(filter_by_title(self.entries.clone(), query))
    }
}
