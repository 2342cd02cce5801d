use shiori_core::config::{AppConfig, BackendKind};
use shiori_core::models::{CatalogDetail, CatalogEntry, CatalogId, ScheduleSnapshot};
use shiori_core::view::Section;

use crate::anilist::{AniListClient, AniListOptions};
use crate::error::ApiError;
use crate::mock::MockAdapter;
use crate::supabase::{PostgrestClient, SupabaseAdapter};
use crate::traits::{CatalogAdapter, SectionStrategy};

/// The configured catalog source.
///
/// A backend whose credentials are missing is kept as `Unconfigured`, so
/// every call fails fast instead of sending a malformed request.
pub enum Backend {
    AniList(AniListClient),
    Supabase(SupabaseAdapter),
    Mock(MockAdapter),
    Unconfigured(String),
}

impl Backend {
    pub fn from_config(config: &AppConfig) -> Self {
        match config.general.backend {
            BackendKind::Anilist => Self::AniList(AniListClient::new(
                &config.anilist.endpoint,
                AniListOptions {
                    per_page: config.anilist.per_page,
                    utc_offset_minutes: config.schedule.utc_offset_minutes,
                    fill_empty_thursday: config.schedule.fill_empty_thursday,
                },
            )),
            BackendKind::Supabase => {
                let Some((url, key)) = config.supabase.credentials() else {
                    let reason = "set SUPABASE_URL and SUPABASE_ANON_KEY".to_string();
                    tracing::error!(%reason, "supabase backend is not configured");
                    return Self::Unconfigured(reason);
                };
                match PostgrestClient::new(url, key) {
                    Ok(client) => Self::Supabase(SupabaseAdapter::new(client)),
                    Err(e) => {
                        tracing::error!(error = %e, "invalid supabase configuration");
                        Self::Unconfigured(e.to_string())
                    }
                }
            }
            BackendKind::Mock => Self::Mock(MockAdapter::sample()),
        }
    }

    fn not_configured(reason: &str) -> ApiError {
        ApiError::NotConfigured(reason.to_string())
    }
}

impl CatalogAdapter for Backend {
    fn name(&self) -> &'static str {
        match self {
            Self::AniList(a) => a.name(),
            Self::Supabase(a) => a.name(),
            Self::Mock(a) => a.name(),
            Self::Unconfigured(_) => "unconfigured",
        }
    }

    fn section_strategy(&self) -> SectionStrategy {
        match self {
            Self::AniList(a) => a.section_strategy(),
            Self::Supabase(a) => a.section_strategy(),
            Self::Mock(a) => a.section_strategy(),
            Self::Unconfigured(_) => SectionStrategy::Client,
        }
    }

    async fn list_cards(&self, section: Option<Section>) -> Result<Vec<CatalogEntry>, ApiError> {
        match self {
            Self::AniList(a) => a.list_cards(section).await,
            Self::Supabase(a) => a.list_cards(section).await,
            Self::Mock(a) => a.list_cards(section).await,
            Self::Unconfigured(reason) => Err(Self::not_configured(reason)),
        }
    }

    async fn fetch_by_id(&self, id: &CatalogId) -> Result<CatalogDetail, ApiError> {
        match self {
            Self::AniList(a) => a.fetch_by_id(id).await,
            Self::Supabase(a) => a.fetch_by_id(id).await,
            Self::Mock(a) => a.fetch_by_id(id).await,
            Self::Unconfigured(reason) => Err(Self::not_configured(reason)),
        }
    }

    async fn fetch_schedule(&self) -> Result<ScheduleSnapshot, ApiError> {
        match self {
            Self::AniList(a) => a.fetch_schedule().await,
            Self::Supabase(a) => a.fetch_schedule().await,
            Self::Mock(a) => a.fetch_schedule().await,
            Self::Unconfigured(reason) => Err(Self::not_configured(reason)),
        }
    }

    async fn search(&self, query: &str) -> Result<Vec<CatalogEntry>, ApiError> {
        match self {
            Self::AniList(a) => a.search(query).await,
            Self::Supabase(a) => a.search(query).await,
            Self::Mock(a) => a.search(query).await,
            Self::Unconfigured(reason) => Err(Self::not_configured(reason)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selects_configured_backend() {
        let mut config = AppConfig::default();
        assert!(matches!(Backend::from_config(&config), Backend::AniList(_)));

        config.general.backend = BackendKind::Mock;
        assert_eq!(Backend::from_config(&config).name(), "mock");

        config.general.backend = BackendKind::Supabase;
        config.supabase.url = "https://demo.supabase.co".into();
        config.supabase.anon_key = "anon".into();
        let backend = Backend::from_config(&config);
        assert_eq!(backend.name(), "supabase");
        assert_eq!(backend.section_strategy(), SectionStrategy::Client);
    }

    #[tokio::test]
    async fn test_missing_credentials_fail_fast() {
        let mut config = AppConfig::default();
        config.general.backend = BackendKind::Supabase;
        let backend = Backend::from_config(&config);
        assert!(matches!(backend, Backend::Unconfigured(_)));

        let err = backend.list_cards(None).await.unwrap_err();
        assert!(matches!(err, ApiError::NotConfigured(_)));
    }
}
