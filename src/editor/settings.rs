use std::sync::Arc;

use super::EditorError;
use crate::api::client::Gateway;
use crate::api::resources::SettingsApi;
use crate::content::{SettingsDocument, prepare_document};
use crate::events::{Notifier, Operation};
use crate::query::{QueryClient, QueryKey};

/// Upsert-only editor for a singleton section (hero, video, contact, ...).
pub struct SettingsEditor<T: SettingsDocument> {
    api: Arc<SettingsApi<T>>,
    query: Arc<QueryClient>,
    notifier: Notifier,
    saved: T,
    draft: T,
}

impl<T: SettingsDocument> SettingsEditor<T> {
    pub fn new(gateway: Arc<Gateway>, query: Arc<QueryClient>, notifier: Notifier) -> Self {
        let saved = query.get::<T>(&Self::key()).unwrap_or_default();
        Self {
            api: Arc::new(SettingsApi::new(gateway)),
            query,
            notifier,
            draft: saved.clone(),
            saved,
        }
    }

    fn key() -> QueryKey {
        QueryKey::Settings(T::RESOURCE)
    }

    /// Fetches the document and resets the draft to it.
    pub async fn load(&mut self) -> Result<&T, EditorError> {
        let api = self.api.clone();
        let doc = self
            .query
            .fetch(Self::key(), || {
                let api = api.clone();
                async move { api.get().await }
            })
            .await?;
        self.draft = doc.clone();
        self.saved = doc;
        Ok(&self.saved)
    }

    pub fn saved(&self) -> &T {
        &self.saved
    }

    pub fn draft(&self) -> &T {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut T {
        &mut self.draft
    }

    pub fn is_dirty(&self) -> bool {
        self.draft != self.saved
    }

    pub fn reset(&mut self) {
        self.draft = self.saved.clone();
    }

    /// Replaces the whole document with the draft.
    pub async fn save(&mut self) -> Result<(), EditorError> {
        let doc = match prepare_document(&self.draft) {
            Ok(doc) => doc,
            Err(msg) => {
                self.notifier.invalid(&msg);
                return Err(EditorError::Validation(msg));
            }
        };
        if let Err(e) = self.api.update(&doc).await {
            log::warn!("saving {} failed: {}", T::RESOURCE, e);
            self.notifier.failure(Operation::Save);
            return Err(e.into());
        }
        self.notifier.success(Operation::Save);
        self.query.invalidate(&Self::key());
        let reloaded = self.load().await.map(|_| ());
        if let Err(e) = reloaded {
            log::warn!("refetch of {} failed: {}", T::RESOURCE, e);
            self.saved = doc.clone();
            self.draft = doc;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::transport::Method;
    use crate::content::{ContactSettings, VideoSettings};
    use crate::testing::{FakeBackend, harness};
    use serde_json::json;

    #[tokio::test]
    async fn never_saved_document_loads_as_default() {
        let h = harness(Arc::new(FakeBackend::new()));
        let mut editor = SettingsEditor::<VideoSettings>::new(h.gateway, h.query, h.notifier);
        assert_eq!(editor.load().await.unwrap(), &VideoSettings::default());
        assert!(!editor.is_dirty());
    }

    #[tokio::test]
    async fn save_replaces_document_with_fallbacks() {
        let backend = Arc::new(FakeBackend::new());
        backend.seed_settings("contact", json!({"phone": "+998 71 000 00 00", "addressUz": "Eski"}));
        let h = harness(backend.clone());
        let mut editor = SettingsEditor::<ContactSettings>::new(h.gateway, h.query, h.notifier);
        editor.load().await.unwrap();

        editor.draft_mut().address_uz = "Toshkent, Chilonzor".into();
        assert!(editor.is_dirty());
        editor.save().await.unwrap();

        assert!(!editor.is_dirty());
        assert_eq!(editor.saved().address_en, "Toshkent, Chilonzor");
        assert_eq!(editor.saved().phone, "+998 71 000 00 00");
        assert_eq!(backend.count(Method::Put, "/contact"), 1);
    }

    #[tokio::test]
    async fn failed_save_keeps_draft() {
        let backend = Arc::new(FakeBackend::new());
        let h = harness(backend.clone());
        let mut editor = SettingsEditor::<VideoSettings>::new(h.gateway, h.query, h.notifier);
        editor.load().await.unwrap();
        editor.draft_mut().title_uz = "Yangi video".into();
        backend.fail_next(Method::Put, "/video", 500);

        assert!(editor.save().await.is_err());
        assert_eq!(editor.draft().title_uz, "Yangi video");
        assert_eq!(editor.draft().title_en, "");
        assert!(editor.is_dirty());
    }

    #[tokio::test]
    async fn invalid_document_is_not_sent() {
        let backend = Arc::new(FakeBackend::new());
        let h = harness(backend.clone());
        let mut editor = SettingsEditor::<VideoSettings>::new(h.gateway, h.query, h.notifier);
        assert!(matches!(editor.save().await, Err(EditorError::Validation(_))));
        assert_eq!(backend.count(Method::Put, "/video"), 0);
    }
}
