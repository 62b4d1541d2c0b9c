use std::collections::HashSet;
use std::sync::Arc;

use super::EditorError;
use crate::api::client::Gateway;
use crate::api::resources::CollectionApi;
use crate::confirm::ConfirmGate;
use crate::content::{OrderedItem, prepare_item};
use crate::events::{Notifier, Operation};
use crate::query::{QueryClient, QueryKey};
use crate::utils::generate_id;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMode {
    Adding,
    Editing(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Form<T> {
    pub mode: FormMode,
    pub draft: T,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorState<'a> {
    Idle,
    Adding,
    Editing(&'a str),
}

/// List, form and mutation state for one orderable collection.
///
/// At most one form is open. Opening "Add" or "Edit" while another form is
/// open discards the other draft without asking. Every mutation failure is
/// reported through the [`Notifier`] and leaves the editor where it was: a
/// failed save keeps the draft, a failed delete keeps the dialog open, a
/// failed reorder restores the order from before the drag.
pub struct CollectionEditor<T: OrderedItem> {
    api: CollectionApi<T>,
    query: Arc<QueryClient>,
    notifier: Notifier,
    items: Vec<T>,
    form: Option<Form<T>>,
    delete_gate: ConfirmGate<String>,
}

impl<T: OrderedItem> CollectionEditor<T> {
    pub fn new(gateway: Arc<Gateway>, query: Arc<QueryClient>, notifier: Notifier) -> Self {
        let items = query.get::<Vec<T>>(&Self::key()).unwrap_or_default();
        Self {
            api: CollectionApi::new(gateway),
            query,
            notifier,
            items,
            form: None,
            delete_gate: ConfirmGate::new(),
        }
    }

    fn key() -> QueryKey {
        QueryKey::Collection(T::DESCRIPTOR.resource)
    }

    /// Items in display order, as last returned by the backend.
    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub async fn load(&mut self) -> Result<&[T], EditorError> {
        let api = self.api.clone();
        let items = self
            .query
            .fetch(Self::key(), || {
                let api = api.clone();
                async move { api.list().await }
            })
            .await?;
        self.items = items;
        Ok(&self.items)
    }

    async fn reload(&mut self) {
        self.query.invalidate(&Self::key());
        let reloaded = self.load().await.map(|_| ());
        if let Err(e) = reloaded {
            log::warn!("refetch of {} failed: {}", T::DESCRIPTOR.resource, e);
        }
    }

    pub fn state(&self) -> EditorState<'_> {
        match &self.form {
            None => EditorState::Idle,
            Some(Form {
                mode: FormMode::Adding,
                ..
            }) => EditorState::Adding,
            Some(Form {
                mode: FormMode::Editing(id),
                ..
            }) => EditorState::Editing(id),
        }
    }

    pub fn form(&self) -> Option<&Form<T>> {
        self.form.as_ref()
    }

    pub fn draft_mut(&mut self) -> Option<&mut T> {
        self.form.as_mut().map(|f| &mut f.draft)
    }

    pub fn next_order(&self) -> i64 {
        self.items.len() as i64 + 1
    }

    /// Opens a blank form. The id is minted now and kept for the whole add session.
    pub fn begin_add(&mut self) -> &mut T {
        let id = generate_id(T::DESCRIPTOR.id_prefix);
        let draft = T::blank(id, self.next_order());
        &mut self
            .form
            .insert(Form {
                mode: FormMode::Adding,
                draft,
            })
            .draft
    }

    pub fn begin_edit(&mut self, id: &str) -> Option<&mut T> {
        let draft = self.get(id)?.clone();
        Some(
            &mut self
                .form
                .insert(Form {
                    mode: FormMode::Editing(id.to_string()),
                    draft,
                })
                .draft,
        )
    }

    pub fn cancel(&mut self) {
        self.form = None;
    }

    /// Validates and saves the open form.
    ///
    /// Validation failures never reach the network. On success the list is
    /// refetched and the editor returns to idle; on failure the draft stays
    /// exactly as typed.
    pub async fn submit(&mut self) -> Result<(), EditorError> {
        let Some(form) = &self.form else {
            return Err(EditorError::NoActiveForm);
        };
        let item = match prepare_item(&form.draft) {
            Ok(item) => item,
            Err(msg) => {
                self.notifier.invalid(&msg);
                return Err(EditorError::Validation(msg));
            }
        };

        if let Err(e) = self.api.upsert(&item).await {
            log::warn!("saving {} {} failed: {}", T::DESCRIPTOR.resource, item.id(), e);
            self.notifier.failure(Operation::Save);
            return Err(e.into());
        }
        self.notifier.success(Operation::Save);
        self.form = None;
        self.reload().await;
        Ok(())
    }

    pub fn request_delete(&mut self, id: &str) {
        self.delete_gate.request(id.to_string());
    }

    pub fn pending_delete(&self) -> Option<&str> {
        self.delete_gate.pending().map(String::as_str)
    }

    pub fn cancel_delete(&mut self) {
        self.delete_gate.close();
    }

    pub async fn confirm_delete(&mut self) -> Result<(), EditorError> {
        let id = self
            .delete_gate
            .pending()
            .cloned()
            .ok_or(EditorError::NothingToConfirm)?;
        if let Err(e) = self.api.delete(&id).await {
            log::warn!("deleting {} {} failed: {}", T::DESCRIPTOR.resource, id, e);
            self.notifier.failure(Operation::Delete);
            return Err(e.into());
        }
        self.delete_gate.close();
        if matches!(&self.form, Some(Form { mode: FormMode::Editing(editing), .. }) if *editing == id)
        {
            self.form = None;
        }
        self.notifier.success(Operation::Delete);
        self.reload().await;
        Ok(())
    }

    /// Applies a drag result. The new order shows immediately; if the backend
    /// refuses it, the previous order is restored.
    pub async fn reorder(&mut self, ids: Vec<String>) -> Result<(), EditorError> {
        self.check_permutation(&ids)?;
        let snapshot = self.items.clone();

        let mut reordered = Vec::with_capacity(ids.len());
        for (idx, id) in ids.iter().enumerate() {
            if let Some(item) = snapshot.iter().find(|item| item.id() == id) {
                let mut item = item.clone();
                item.set_order(idx as i64 + 1);
                reordered.push(item);
            }
        }
        self.items = reordered;

        if let Err(e) = self.api.reorder(&ids).await {
            log::warn!("reordering {} failed: {}", T::DESCRIPTOR.resource, e);
            self.items = snapshot;
            self.notifier.failure(Operation::Reorder);
            return Err(e.into());
        }
        self.notifier.success(Operation::Reorder);
        self.reload().await;
        Ok(())
    }

    /// Drag helper: moves the item at `from` to position `to`.
    pub async fn move_item(&mut self, from: usize, to: usize) -> Result<(), EditorError> {
        let len = self.items.len();
        if from >= len || to >= len {
            return Err(EditorError::InvalidOrder(format!(
                "position out of range (len {})",
                len
            )));
        }
        if from == to {
            return Ok(());
        }
        let mut ids: Vec<String> = self.items.iter().map(|i| i.id().to_string()).collect();
        let moved = ids.remove(from);
        ids.insert(to, moved);
        self.reorder(ids).await
    }

    fn check_permutation(&self, ids: &[String]) -> Result<(), EditorError> {
        let current: HashSet<&str> = self.items.iter().map(|i| i.id()).collect();
        let proposed: HashSet<&str> = ids.iter().map(String::as_str).collect();
        if ids.len() != self.items.len() || proposed.len() != ids.len() || current != proposed {
            return Err(EditorError::InvalidOrder(
                "ids must list every item exactly once".into(),
            ));
        }
        Ok(())
    }
}
