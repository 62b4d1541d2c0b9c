//! Keyed read cache shared by every screen.
//!
//! Reads go through [`QueryClient::fetch`]; a successful mutation calls
//! [`QueryClient::invalidate`] on the keys it affects and the owning view
//! refetches. A failed read never evicts what is already cached, so the last
//! good data stays on screen.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::api::client::ApiError;
use crate::api::models::ApplicationStatus;

const RETRY_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    Collection(&'static str),
    Settings(&'static str),
    Applications {
        page: u32,
        status: Option<ApplicationStatus>,
        search: String,
    },
    ApplicationStats,
    Conversations,
    Messages(String),
}

impl QueryKey {
    pub fn is_applications(&self) -> bool {
        matches!(self, QueryKey::Applications { .. })
    }
}

struct Entry {
    value: Arc<dyn Any + Send + Sync>,
    stale: bool,
}

#[derive(Default)]
pub struct QueryClient {
    entries: RwLock<HashMap<QueryKey, Entry>>,
}

impl QueryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last stored value for `key`, stale or not.
    pub fn get<T: Clone + Send + Sync + 'static>(&self, key: &QueryKey) -> Option<T> {
        let entries = self.entries.read().ok()?;
        entries.get(key)?.value.downcast_ref::<T>().cloned()
    }

    pub fn is_fresh(&self, key: &QueryKey) -> bool {
        self.entries
            .read()
            .map(|entries| entries.get(key).is_some_and(|e| !e.stale))
            .unwrap_or(false)
    }

    pub fn set<T: Send + Sync + 'static>(&self, key: QueryKey, value: T) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(
                key,
                Entry {
                    value: Arc::new(value),
                    stale: false,
                },
            );
        }
    }

    pub fn invalidate(&self, key: &QueryKey) {
        self.invalidate_where(|k| k == key);
    }

    pub fn invalidate_where(&self, pred: impl Fn(&QueryKey) -> bool) {
        if let Ok(mut entries) = self.entries.write() {
            for (key, entry) in entries.iter_mut() {
                if pred(key) {
                    log::debug!("invalidated {:?}", key);
                    entry.stale = true;
                }
            }
        }
    }

    pub fn remove(&self, key: &QueryKey) {
        if let Ok(mut entries) = self.entries.write() {
            entries.remove(key);
        }
    }

    /// Evicts every entry matching `pred`.
    pub fn remove_where(&self, pred: impl Fn(&QueryKey) -> bool) {
        if let Ok(mut entries) = self.entries.write() {
            entries.retain(|key, _| !pred(key));
        }
    }

    /// Cached value when fresh, otherwise a network read.
    pub async fn fetch<T, F, Fut>(&self, key: QueryKey, fetcher: F) -> Result<T, ApiError>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        if self.is_fresh(&key) {
            if let Some(value) = self.get::<T>(&key) {
                return Ok(value);
            }
        }
        self.refetch(key, fetcher).await
    }

    /// Always hits the network. Transient failures (network, 5xx) get one
    /// retry; 401 and other client errors are returned at once.
    pub async fn refetch<T, F, Fut>(&self, key: QueryKey, fetcher: F) -> Result<T, ApiError>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let result = match fetcher().await {
            Err(e) if is_transient(&e) => {
                log::debug!("query {:?} failed ({}); retrying once", key, e);
                tokio::time::sleep(RETRY_DELAY).await;
                fetcher().await
            }
            other => other,
        };
        let value = result?;
        self.set(key, value.clone());
        Ok(value)
    }
}

fn is_transient(e: &ApiError) -> bool {
    match e {
        ApiError::Network(_) => true,
        ApiError::Status { status, .. } => *status >= 500,
        _ => false,
    }
}
