use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::api::client::Gateway;
use crate::api::transport::{ReqwestTransport, Transport};
use crate::events::Notifier;
use crate::query::QueryClient;
use crate::session::{SessionHandle, SessionStore};
use crate::storage::StorageError;
use crate::storage::token::{TokenStore, TomlTokenStore};
use crate::utils::normalize_url;

pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";
pub const API_URL_ENV: &str = "CONSULT_ADMIN_API_URL";

/// On-disk client state. `token` is the only session field that survives a restart.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct AppState {
    #[serde(default)]
    pub api_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("uz", "consult", "consult-admin")
    }

    pub fn config_path() -> Option<PathBuf> {
        Some(Self::project_dirs()?.config_dir().join("admin.toml"))
    }

    /// Missing or unreadable files yield the default state.
    pub fn load_from(path: &Path) -> Self {
        let Ok(text) = fs::read_to_string(path) else {
            return Self::new();
        };
        match toml::from_str::<AppState>(&text) {
            Ok(state) => state,
            Err(e) => {
                log::warn!("ignoring malformed config {}: {}", path.display(), e);
                Self::new()
            }
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<(), StorageError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let text = toml::to_string_pretty(self)?;
        fs::write(path, text)?;
        Ok(())
    }

    /// Effective API base URL: explicit override, then environment, then file, then default.
    pub fn resolve_api_url(&self, explicit: Option<&str>) -> String {
        let from_env = std::env::var(API_URL_ENV).ok();
        let chosen = explicit
            .map(str::to_string)
            .or(from_env)
            .filter(|s| !s.trim().is_empty())
            .or_else(|| Some(self.api_url.clone()).filter(|s| !s.trim().is_empty()))
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        normalize_url(&chosen)
    }
}

/// Every long-lived service of the client, wired once at startup.
pub struct AppContext {
    pub api_url: String,
    pub tokens: Arc<dyn TokenStore>,
    pub session: SessionHandle,
    pub gateway: Arc<Gateway>,
    pub query: Arc<QueryClient>,
    pub notifier: Notifier,
}

impl AppContext {
    pub fn load(api_url_override: Option<&str>) -> Result<Self, StorageError> {
        let config_path = AppState::config_path().ok_or(StorageError::NoConfigDir)?;
        let state = AppState::load_from(&config_path);
        let api_url = state.resolve_api_url(api_url_override);
        let transport = ReqwestTransport::new(&api_url)
            .map_err(|e| StorageError::Config(e.to_string()))?;
        let tokens: Arc<dyn TokenStore> = Arc::new(TomlTokenStore::new(config_path));
        Ok(Self::assemble(api_url, Arc::new(transport), tokens))
    }

    pub fn assemble(
        api_url: String,
        transport: Arc<dyn Transport>,
        tokens: Arc<dyn TokenStore>,
    ) -> Self {
        let session = SessionHandle::new();
        let gateway = Arc::new(Gateway::new(transport, tokens.clone(), session.clone()));
        Self {
            api_url,
            tokens,
            session,
            gateway,
            query: Arc::new(QueryClient::new()),
            notifier: Notifier::new(),
        }
    }

    pub fn session_store(&self) -> SessionStore {
        SessionStore::new(self.gateway.clone(), self.tokens.clone(), self.session.clone())
    }

    /// Persist the resolved API URL so later runs reuse it.
    pub fn remember_api_url(&self) -> Result<(), StorageError> {
        let path = AppState::config_path().ok_or(StorageError::NoConfigDir)?;
        let mut state = AppState::load_from(&path);
        if state.api_url != self.api_url {
            state.api_url = self.api_url.clone();
            state.save_to(&path)?;
        }
        Ok(())
    }
}
