mod debounce;
mod error;
mod scope;
mod shell;
#[cfg(test)]
mod testing;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use shiori_api::{Backend, CatalogAdapter, SectionStrategy};
use shiori_core::cache::{CacheKey, CacheStore, RequestTicket};
use shiori_core::config::AppConfig;
use shiori_core::lists::UserStore;
use shiori_core::models::{
    CatalogDetail, CatalogEntry, CatalogId, ScheduleSnapshot, UserState, WatchList,
};
use shiori_core::storage::{JsonFileBackend, StateBackend};
use shiori_core::view::{filter_section, similar, to_card, to_list_item, Card, ListItem, Section};

pub use debounce::{next_settled, SearchOutcome, SearchSession};
pub use error::{Page, PageError, RuntimeError};
pub use scope::{Cancelled, ScopeToken, ViewScope};
pub use shell::{ButtonKind, HeadlessShell, HostShell, PopupButton, PopupConfig, ShellEvent, ShellUser};

const CONFIRM_REMOVE_LIST: &str = "آیا از حذف این لیست اطمینان دارید؟";

/// Owns the adapter and both persisted stores.
///
/// Store locks are never held across an upstream call; responses are
/// applied through per-key tickets so a superseded load cannot overwrite
/// a newer one.
pub struct Runtime<A = Backend> {
    adapter: A,
    cache: Mutex<CacheStore>,
    user: Mutex<UserStore>,
    /// Unfiltered listing backing similar-title ranking. Not persisted.
    catalog: Mutex<Option<Arc<Vec<CatalogEntry>>>>,
    config: AppConfig,
}

impl Runtime<Backend> {
    /// Load config and open the stores under the configured data directory.
    pub fn new() -> Result<Self, RuntimeError> {
        let config = AppConfig::load().map_err(|e| RuntimeError::Config(e.to_string()))?;
        Self::from_config(config)
    }

    pub fn from_config(config: AppConfig) -> Result<Self, RuntimeError> {
        let backend = Backend::from_config(&config);
        let state = Arc::new(JsonFileBackend::new(config.data_dir()));
        Self::with_parts(backend, state, config)
    }
}

impl<A: CatalogAdapter> Runtime<A> {
    pub fn with_parts(
        adapter: A,
        state: Arc<dyn StateBackend>,
        config: AppConfig,
    ) -> Result<Self, RuntimeError> {
        let cache = CacheStore::open(Arc::clone(&state))?;
        let user = UserStore::open(state)?;
        tracing::info!(backend = adapter.name(), "runtime ready");
        Ok(Self {
            adapter,
            cache: Mutex::new(cache),
            user: Mutex::new(user),
            catalog: Mutex::new(None),
            config,
        })
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.config.search.debounce_ms)
    }

    /// Signal the host and return the user it reports.
    pub fn boot(&self, shell: &dyn HostShell) -> Option<ShellUser> {
        shell.ready();
        shell.expand();
        let user = shell.current_user();
        match &user {
            Some(u) => tracing::info!(user_id = u.id, "host user"),
            None => tracing::debug!("host reported no user"),
        }
        user
    }

    /// Show a failed load to the user. Cancellations stay silent.
    pub fn report(&self, shell: &dyn HostShell, err: &PageError) {
        if *err != PageError::Cancelled {
            shell.alert(err.user_message());
        }
    }

    // ── Sections ────────────────────────────────────────────────

    /// Cached cards when the section is loaded, otherwise a fresh load.
    pub async fn load_section(
        &self,
        section: Section,
        token: &ScopeToken,
    ) -> Result<Vec<Card>, PageError> {
        if let Some(cards) = self.cache.lock().await.entry(section).loaded() {
            tracing::debug!(%section, "section cache hit");
            return Ok(cards.clone());
        }
        self.refresh_section(section, token).await
    }

    pub async fn refresh_section(
        &self,
        section: Section,
        token: &ScopeToken,
    ) -> Result<Vec<Card>, PageError> {
        let ticket = self.cache.lock().await.begin(CacheKey::Section(section));
        let strategy = self.adapter.section_strategy();
        let hint = match strategy {
            SectionStrategy::Server => Some(section),
            SectionStrategy::Client => None,
        };

        let fetched = token.run(self.adapter.list_cards(hint)).await;
        let mut cache = self.cache.lock().await;
        let result = match fetched {
            Err(Cancelled) => {
                cache.abandon(&ticket);
                tracing::debug!(%section, "section load cancelled");
                return Err(PageError::Cancelled);
            }
            Ok(Ok(entries)) => {
                let entries = match strategy {
                    SectionStrategy::Client => {
                        *self.catalog.lock().await = Some(Arc::new(entries.clone()));
                        filter_section(entries, Some(section))
                    }
                    SectionStrategy::Server => entries,
                };
                Ok(entries.iter().map(to_card).collect::<Vec<_>>())
            }
            Ok(Err(e)) => {
                tracing::warn!(%section, error = %e, "section load failed");
                Err(e)
            }
        };

        let outcome = match &result {
            Ok(cards) => Ok(cards.clone()),
            Err(e) => Err(e.to_string()),
        };
        match cache.complete_section(&ticket, outcome) {
            Ok(true) => {}
            Ok(false) => return Err(PageError::Cancelled),
            Err(e) => tracing::warn!(%section, error = %e, "failed to persist cache"),
        }
        result.map_err(|e| PageError::from_api(Page::List, e))
    }

    pub async fn invalidate_section(&self, section: Section) -> Result<(), RuntimeError> {
        self.cache.lock().await.invalidate(section)?;
        *self.catalog.lock().await = None;
        Ok(())
    }

    // ── Detail ──────────────────────────────────────────────────

    /// Detail through the cache, without touching user state.
    pub async fn load_detail(
        &self,
        id: &CatalogId,
        token: &ScopeToken,
    ) -> Result<CatalogDetail, PageError> {
        if let Some(detail) = self.cache.lock().await.get_detail(id) {
            return Ok(detail.clone());
        }

        let ticket = self.cache.lock().await.begin(CacheKey::Detail(id.clone()));
        let detail = match token.run(self.adapter.fetch_by_id(id)).await {
            Err(Cancelled) => return Err(PageError::Cancelled),
            Ok(Err(e)) => {
                tracing::warn!(id = %id, error = %e, "detail load failed");
                return Err(PageError::from_api(Page::Detail, e));
            }
            Ok(Ok(detail)) => detail,
        };

        let favorite = self.user.lock().await.is_favorite(id);
        let mut cache = self.cache.lock().await;
        match cache.complete_detail(&ticket, detail.clone()) {
            Ok(true) => {}
            Ok(false) => return Err(PageError::Cancelled),
            Err(e) => tracing::warn!(id = %id, error = %e, "failed to persist detail"),
        }
        if favorite {
            Self::snapshot_favorite(&mut cache, to_card(&detail.entry));
        }
        Ok(detail)
    }

    /// [`load_detail`](Self::load_detail) for the detail page; also records
    /// the title as recently watched.
    pub async fn open_detail(
        &self,
        id: &CatalogId,
        token: &ScopeToken,
    ) -> Result<CatalogDetail, PageError> {
        let detail = self.load_detail(id, token).await?;
        if let Err(e) = self.user.lock().await.mark_watched(id.clone()) {
            tracing::warn!(id = %id, error = %e, "failed to record recently watched");
        }
        Ok(detail)
    }

    /// Titles sharing genres with `id`, ranked by overlap then score.
    pub async fn similar(&self, id: &CatalogId, token: &ScopeToken) -> Result<Vec<Card>, PageError> {
        let target = self.load_detail(id, token).await?.entry;
        let catalog = self.catalog_listing(token).await?;
        Ok(similar(&catalog, &target).iter().map(to_card).collect())
    }

    /// The unfiltered listing, fetched once and then served from memory.
    async fn catalog_listing(&self, token: &ScopeToken) -> Result<Arc<Vec<CatalogEntry>>, PageError> {
        if let Some(listing) = self.catalog.lock().await.as_ref() {
            return Ok(Arc::clone(listing));
        }
        let entries = match token.run(self.adapter.list_cards(None)).await {
            Err(Cancelled) => return Err(PageError::Cancelled),
            Ok(result) => result.map_err(|e| PageError::from_api(Page::List, e))?,
        };
        let listing = Arc::new(entries);
        *self.catalog.lock().await = Some(Arc::clone(&listing));
        Ok(listing)
    }

    // ── Schedule ────────────────────────────────────────────────

    pub async fn load_schedule(&self, token: &ScopeToken) -> Result<ScheduleSnapshot, PageError> {
        if let Some(snapshot) = self.cache.lock().await.get_schedule() {
            return Ok(snapshot.clone());
        }
        self.refresh_schedule(token).await
    }

    pub async fn refresh_schedule(&self, token: &ScopeToken) -> Result<ScheduleSnapshot, PageError> {
        let ticket = self.cache.lock().await.begin(CacheKey::Schedule);
        let fetched = token.run(self.adapter.fetch_schedule()).await;
        let mut cache = self.cache.lock().await;
        let result = match fetched {
            Err(Cancelled) => {
                cache.abandon(&ticket);
                return Err(PageError::Cancelled);
            }
            Ok(result) => result,
        };

        if let Ok(snapshot) = &result {
            if snapshot.is_placeholder() {
                tracing::info!(backend = self.adapter.name(), "schedule is a placeholder");
            }
        }
        let outcome = match &result {
            Ok(snapshot) => Ok(snapshot.clone()),
            Err(e) => Err(e.to_string()),
        };
        match cache.complete_schedule(&ticket, outcome) {
            Ok(true) => {}
            Ok(false) => return Err(PageError::Cancelled),
            Err(e) => tracing::warn!(error = %e, "failed to persist schedule"),
        }
        result.map_err(|e| PageError::from_api(Page::Schedule, e))
    }

    // ── Search ──────────────────────────────────────────────────

    /// A blank query yields no results without an upstream call.
    pub async fn search(&self, query: &str, token: &ScopeToken) -> Result<Vec<ListItem>, PageError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let ticket = self.cache.lock().await.begin(CacheKey::Search);
        let entries = match token.run(self.adapter.search(query)).await {
            Err(Cancelled) => return Err(PageError::Cancelled),
            Ok(result) => result.map_err(|e| PageError::from_api(Page::Search, e))?,
        };
        if !self.is_current(&ticket).await {
            tracing::debug!(query, "discarding superseded search");
            return Err(PageError::Cancelled);
        }
        tracing::debug!(query, hits = entries.len(), "search finished");
        Ok(entries.iter().map(to_list_item).collect())
    }

    async fn is_current(&self, ticket: &RequestTicket) -> bool {
        self.cache.lock().await.is_current(ticket)
    }

    // ── Favorites ───────────────────────────────────────────────

    pub async fn is_favorite(&self, id: &CatalogId) -> bool {
        self.user.lock().await.is_favorite(id)
    }

    /// Returns whether `id` is a favorite afterwards.
    pub async fn toggle_favorite(&self, id: &CatalogId) -> Result<bool, RuntimeError> {
        let state = self.user.lock().await.toggle_favorite(id.clone())?;
        let now_favorite = state.is_favorite(id);

        if now_favorite {
            let mut cache = self.cache.lock().await;
            let card = cache.get_detail(id).map(|d| to_card(&d.entry)).or_else(|| {
                Section::CACHED
                    .iter()
                    .flat_map(|s| cache.get(*s))
                    .find(|c| c.id == *id)
                    .cloned()
            });
            if let Some(card) = card {
                Self::snapshot_favorite(&mut cache, card);
            }
        }
        tracing::debug!(id = %id, favorite = now_favorite, "toggled favorite");
        Ok(now_favorite)
    }

    /// Cards for every favorite, loading details for ids without a snapshot.
    /// Favorites that no longer exist upstream are skipped.
    pub async fn favorite_cards(&self, token: &ScopeToken) -> Result<Vec<Card>, PageError> {
        let ids = self.user.lock().await.state().favorites.clone();
        let mut cards = Vec::with_capacity(ids.len());
        for id in ids {
            let cached = self.cache.lock().await.favorite_card(&id).cloned();
            let card = match cached {
                Some(card) => card,
                None => match self.load_detail(&id, token).await {
                    // load_detail snapshots favorites itself.
                    Ok(detail) => to_card(&detail.entry),
                    Err(PageError::NotFound(_)) => {
                        tracing::warn!(id = %id, "favorite no longer exists upstream");
                        continue;
                    }
                    Err(e) => return Err(e),
                },
            };
            cards.push(card);
        }
        Ok(cards)
    }

    fn snapshot_favorite(cache: &mut CacheStore, card: Card) {
        let id = card.id.clone();
        if let Err(e) = cache.set_favorite_card(card) {
            tracing::warn!(id = %id, error = %e, "failed to persist favorite card");
        }
    }

    pub async fn clear_favorite_cards(&self) -> Result<(), RuntimeError> {
        self.cache.lock().await.clear_favorite_cards()?;
        Ok(())
    }

    // ── User state and lists ────────────────────────────────────

    pub async fn user_state(&self) -> Arc<UserState> {
        self.user.lock().await.state()
    }

    pub async fn create_list(&self, title: &str) -> Result<WatchList, RuntimeError> {
        Ok(self.user.lock().await.create_list(title)?)
    }

    /// Asks the host for confirmation first. Returns whether the list was removed.
    pub async fn remove_list(
        &self,
        list_id: &str,
        shell: &dyn HostShell,
    ) -> Result<bool, RuntimeError> {
        if !shell.confirm(CONFIRM_REMOVE_LIST) {
            return Ok(false);
        }
        self.user.lock().await.remove_list(list_id)?;
        Ok(true)
    }

    pub async fn add_item(&self, list_id: &str, text: &str) -> Result<Arc<UserState>, RuntimeError> {
        Ok(self.user.lock().await.add_item(list_id, text)?)
    }

    pub async fn remove_item(
        &self,
        list_id: &str,
        item_id: &str,
    ) -> Result<Arc<UserState>, RuntimeError> {
        Ok(self.user.lock().await.remove_item(list_id, item_id)?)
    }

    pub async fn toggle_item_completed(
        &self,
        list_id: &str,
        item_id: &str,
    ) -> Result<Arc<UserState>, RuntimeError> {
        Ok(self.user.lock().await.toggle_item_completed(list_id, item_id)?)
    }
}
