//! The single durable session key.

use std::path::PathBuf;
use std::sync::Mutex;

use super::StorageError;
use crate::app::AppState;

/// Durable home of the session token. Read by the gateway on every request,
/// written only by login, logout and the session check.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> Option<String>;
    fn save(&self, token: &str) -> Result<(), StorageError>;
    /// Never fails from the caller's point of view; write errors are logged.
    fn clear(&self);
}

/// Keeps the token in the `token` field of the client's TOML state file,
/// leaving the other fields untouched.
pub struct TomlTokenStore {
    path: PathBuf,
}

impl TomlTokenStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl TokenStore for TomlTokenStore {
    fn load(&self) -> Option<String> {
        AppState::load_from(&self.path)
            .token
            .filter(|t| !t.is_empty())
    }

    fn save(&self, token: &str) -> Result<(), StorageError> {
        let mut state = AppState::load_from(&self.path);
        state.token = Some(token.to_string());
        state.save_to(&self.path)
    }

    fn clear(&self) {
        let mut state = AppState::load_from(&self.path);
        if state.token.is_none() {
            return;
        }
        state.token = None;
        if let Err(e) = state.save_to(&self.path) {
            log::warn!("failed to clear stored token: {}", e);
        }
    }
}

#[derive(Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: &str) -> Self {
        Self {
            token: Mutex::new(Some(token.to_string())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Option<String> {
        self.token.lock().ok().and_then(|t| t.clone())
    }

    fn save(&self, token: &str) -> Result<(), StorageError> {
        if let Ok(mut slot) = self.token.lock() {
            *slot = Some(token.to_string());
        }
        Ok(())
    }

    fn clear(&self) {
        if let Ok(mut slot) = self.token.lock() {
            *slot = None;
        }
    }
}
