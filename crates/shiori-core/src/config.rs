use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

const DEFAULT_CONFIG: &str = include_str!("../../../config/default.toml");

/// Placeholder left in freshly scaffolded `.env` files.
const PLACEHOLDER_URL: &str = "your_supabase_project_url";

/// Everything read from `config.toml`, after environment overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub anilist: AniListConfig,
    pub supabase: SupabaseConfig,
    pub search: SearchConfig,
    pub schedule: ScheduleConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    pub backend: BackendKind,
}

/// Which catalog source the runtime talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Anilist,
    Supabase,
    Mock,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Anilist => "anilist",
            Self::Supabase => "supabase",
            Self::Mock => "mock",
        })
    }
}

impl FromStr for BackendKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "anilist" => Ok(Self::Anilist),
            "supabase" => Ok(Self::Supabase),
            "mock" => Ok(Self::Mock),
            other => Err(CoreError::Config(format!("unknown backend: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AniListConfig {
    pub endpoint: String,
    pub per_page: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SupabaseConfig {
    pub url: String,
    pub anon_key: String,
}

impl SupabaseConfig {
    /// `(url, anon_key)` when both are set to something real.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let url = self.url.trim();
        let key = self.anon_key.trim();
        if url.is_empty() || key.is_empty() || url == PLACEHOLDER_URL {
            return None;
        }
        Some((url, key))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub debounce_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    pub utc_offset_minutes: i32,
    pub fill_empty_thursday: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
}

impl AppConfig {
    /// Load config: built-in defaults, replaced by the user file if present,
    /// then environment overrides (a `.env` file is honoured).
    pub fn load() -> Result<Self, CoreError> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                tracing::warn!(error = %e, "ignoring unreadable .env file");
            }
        }

        let user_path = Self::config_path();
        let mut config = if user_path.exists() {
            let user_str = std::fs::read_to_string(&user_path)?;
            Self::from_toml(&user_str)?
        } else {
            Self::from_toml(DEFAULT_CONFIG)?
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        tracing::debug!(backend = %config.general.backend, path = %user_path.display(), "loaded config");
        Ok(config)
    }

    pub fn from_toml(source: &str) -> Result<Self, CoreError> {
        toml::from_str(source).map_err(|e| CoreError::Config(e.to_string()))
    }

    /// Apply `SHIORI_BACKEND`, `SUPABASE_URL` and `SUPABASE_ANON_KEY`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), CoreError> {
        if let Some(backend) = lookup("SHIORI_BACKEND") {
            self.general.backend = backend.parse()?;
        }
        if let Some(url) = lookup("SUPABASE_URL") {
            self.supabase.url = url;
        }
        if let Some(key) = lookup("SUPABASE_ANON_KEY") {
            self.supabase.anon_key = key;
        }
        Ok(())
    }

    /// Write this config as TOML to [`config_path`](Self::config_path), creating its directory.
    pub fn save(&self) -> Result<(), CoreError> {
        let path = Self::config_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| CoreError::Config(e.to_string()))?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// `config.toml` under the platform config dir for `shiori`.
    pub fn config_path() -> PathBuf {
        Self::project_dirs()
            .map(|d| d.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    /// Directory holding the persisted stores.
    pub fn data_dir(&self) -> PathBuf {
        let configured = self.storage.data_dir.trim();
        if !configured.is_empty() {
            return PathBuf::from(configured);
        }
        Self::project_dirs()
            .map(|d| d.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("shiori-data"))
    }

    fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("", "", "shiori")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        toml::from_str(DEFAULT_CONFIG).expect("built-in default config is valid TOML")
    }
}
