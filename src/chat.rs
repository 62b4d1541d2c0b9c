//! Conversation viewer for the visitor chat relay.
//!
//! The list of threads is polled every [`LIST_POLL_INTERVAL`]; the selected
//! thread's history every [`HISTORY_POLL_INTERVAL`], and only while a thread is
//! selected. Watchers are woken only when a poll returns something different.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::api::client::{ApiError, Gateway};
use crate::api::models::{ChatMessage, Conversation, MessageHistory};
use crate::api::resources::ChatApi;
use crate::confirm::ConfirmGate;
use crate::events::{Notifier, Operation};
use crate::query::{QueryClient, QueryKey};

pub const LIST_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const HISTORY_POLL_INTERVAL: Duration = Duration::from_secs(3);
pub const HISTORY_PAGE_SIZE: u32 = 100;

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("xabar matni bo'sh")]
    EmptyMessage,
    #[error("no conversation selected")]
    NoSelection,
    #[error("nothing awaiting confirmation")]
    NothingToConfirm,
    #[error(transparent)]
    Api(#[from] ApiError),
}

struct Inner {
    api: Arc<ChatApi>,
    query: Arc<QueryClient>,
    conversations: watch::Sender<Vec<Conversation>>,
    history: watch::Sender<Vec<ChatMessage>>,
    selected: watch::Sender<Option<String>>,
}

impl Inner {
    async fn refresh_list(&self) -> Result<(), ApiError> {
        let api = self.api.clone();
        let list = self
            .query
            .refetch(QueryKey::Conversations, || {
                let api = api.clone();
                async move { api.conversations().await }
            })
            .await?;
        self.conversations
            .send_if_modified(|current| replace_if_changed(current, list));
        Ok(())
    }

    async fn refresh_history(&self, od_id: &str) -> Result<(), ApiError> {
        let api = self.api.clone();
        let od = od_id.to_string();
        let page = self
            .query
            .refetch(QueryKey::Messages(od.clone()), || {
                let api = api.clone();
                let od = od.clone();
                async move { api.history(&od, 1, HISTORY_PAGE_SIZE).await }
            })
            .await?;
        // The operator may have switched threads while this was in flight.
        if self.selected.borrow().as_deref() != Some(od_id) {
            self.query.remove(&QueryKey::Messages(od));
            return Ok(());
        }
        self.history
            .send_if_modified(|current| replace_if_changed(current, page.messages));
        Ok(())
    }
}

fn replace_if_changed<T: PartialEq>(current: &mut T, next: T) -> bool {
    if *current == next {
        false
    } else {
        *current = next;
        true
    }
}

/// Runs `poll` now and then every `period` until aborted or the session closes.
fn spawn_poller<F, Fut>(period: Duration, label: &'static str, mut poll: F) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), ApiError>> + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match poll().await {
                Ok(()) => {}
                Err(ApiError::Unauthorized) => {
                    log::info!("{} polling stopped: session closed", label);
                    break;
                }
                Err(e) => log::debug!("{} poll failed: {}", label, e),
            }
        }
    })
}

pub struct ConversationViewer {
    inner: Arc<Inner>,
    notifier: Notifier,
    list_task: Option<JoinHandle<()>>,
    history_task: Option<JoinHandle<()>>,
    draft: String,
    delete_gate: ConfirmGate<String>,
}

impl ConversationViewer {
    /// The list starts from whatever this session already fetched; nothing
    /// about conversations outlives the process.
    pub fn new(gateway: Arc<Gateway>, query: Arc<QueryClient>, notifier: Notifier) -> Self {
        let seeded = query
            .get::<Vec<Conversation>>(&QueryKey::Conversations)
            .unwrap_or_default();
        let (conversations, _) = watch::channel(seeded);
        let (history, _) = watch::channel(Vec::new());
        let (selected, _) = watch::channel(None);
        Self {
            inner: Arc::new(Inner {
                api: Arc::new(ChatApi::new(gateway)),
                query,
                conversations,
                history,
                selected,
            }),
            notifier,
            list_task: None,
            history_task: None,
            draft: String::new(),
            delete_gate: ConfirmGate::new(),
        }
    }

    pub fn conversations(&self) -> Vec<Conversation> {
        self.inner.conversations.borrow().clone()
    }

    pub fn subscribe_conversations(&self) -> watch::Receiver<Vec<Conversation>> {
        self.inner.conversations.subscribe()
    }

    /// History of the selected thread, oldest first as the server returns it.
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.inner.history.borrow().clone()
    }

    pub fn subscribe_messages(&self) -> watch::Receiver<Vec<ChatMessage>> {
        self.inner.history.subscribe()
    }

    pub fn selected(&self) -> Option<String> {
        self.inner.selected.borrow().clone()
    }

    /// Badge count across all threads.
    pub fn unread_total(&self) -> u32 {
        self.inner
            .conversations
            .borrow()
            .iter()
            .map(|c| c.unread_count)
            .sum()
    }

    pub async fn refresh_list(&self) -> Result<(), ApiError> {
        self.inner.refresh_list().await
    }

    pub async fn refresh_history(&self) -> Result<(), ChatError> {
        let od_id = self.selected().ok_or(ChatError::NoSelection)?;
        Ok(self.inner.refresh_history(&od_id).await?)
    }

    /// Starts list polling. Calling it again while running does nothing.
    pub fn start(&mut self) {
        if self.list_task.is_some() {
            return;
        }
        let inner = self.inner.clone();
        self.list_task = Some(spawn_poller(LIST_POLL_INTERVAL, "conversation list", move || {
            let inner = inner.clone();
            async move { inner.refresh_list().await }
        }));
    }

    /// Opens a thread and starts polling its history. Selecting another
    /// thread stops the previous thread's poller first.
    pub fn select(&mut self, od_id: &str) {
        if self.selected().as_deref() == Some(od_id) && self.history_task.is_some() {
            return;
        }
        self.stop_history();
        let previous = self.inner.selected.send_replace(Some(od_id.to_string()));
        self.forget_history(previous.filter(|prev| prev != od_id));
        let cached = self
            .inner
            .query
            .get::<MessageHistory>(&QueryKey::Messages(od_id.to_string()))
            .map(|h| h.messages)
            .unwrap_or_default();
        self.inner
            .history
            .send_if_modified(|current| replace_if_changed(current, cached));

        let inner = self.inner.clone();
        let od = od_id.to_string();
        self.history_task = Some(spawn_poller(HISTORY_POLL_INTERVAL, "message history", move || {
            let inner = inner.clone();
            let od = od.clone();
            async move { inner.refresh_history(&od).await }
        }));
    }

    pub fn deselect(&mut self) {
        self.stop_history();
        let previous = self.inner.selected.send_replace(None);
        self.forget_history(previous);
        self.inner
            .history
            .send_if_modified(|current| replace_if_changed(current, Vec::new()));
    }

    /// Drops the cached history of a thread that is no longer open.
    fn forget_history(&self, od_id: Option<String>) {
        if let Some(od_id) = od_id {
            self.inner.query.remove(&QueryKey::Messages(od_id));
        }
    }

    fn stop_history(&mut self) {
        if let Some(task) = self.history_task.take() {
            task.abort();
        }
    }

    pub fn stop(&mut self) {
        self.stop_history();
        if let Some(task) = self.list_task.take() {
            task.abort();
        }
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, text: &str) {
        self.draft = text.to_string();
    }

    /// Sends the input box; it is cleared only when the reply is accepted.
    pub async fn send_draft(&mut self) -> Result<ChatMessage, ChatError> {
        let text = self.draft.clone();
        let sent = self.send_message(&text).await?;
        self.draft.clear();
        Ok(sent)
    }

    pub async fn send_message(&mut self, text: &str) -> Result<ChatMessage, ChatError> {
        let od_id = self.selected().ok_or(ChatError::NoSelection)?;
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        let sent = match self.inner.api.reply(&od_id, text).await {
            Ok(sent) => sent,
            Err(e) => {
                log::warn!("reply to {} failed: {}", od_id, e);
                self.notifier.failure(Operation::SendMessage);
                return Err(e.into());
            }
        };
        self.notifier.success(Operation::SendMessage);
        self.inner.query.invalidate(&QueryKey::Messages(od_id.clone()));
        self.inner.query.invalidate(&QueryKey::Conversations);
        if let Err(e) = self.inner.refresh_history(&od_id).await {
            log::debug!("history refresh after send failed: {}", e);
        }
        if let Err(e) = self.inner.refresh_list().await {
            log::debug!("list refresh after send failed: {}", e);
        }
        Ok(sent)
    }

    pub fn request_delete(&mut self, od_id: &str) {
        self.delete_gate.request(od_id.to_string());
    }

    pub fn pending_delete(&self) -> Option<&str> {
        self.delete_gate.pending().map(String::as_str)
    }

    pub fn cancel_delete(&mut self) {
        self.delete_gate.close();
    }

    /// Deletes the thread awaiting confirmation together with its history.
    pub async fn confirm_delete(&mut self) -> Result<(), ChatError> {
        let od_id = self
            .delete_gate
            .pending()
            .cloned()
            .ok_or(ChatError::NothingToConfirm)?;
        if let Err(e) = self.inner.api.delete(&od_id).await {
            log::warn!("deleting conversation {} failed: {}", od_id, e);
            self.notifier.failure(Operation::Delete);
            return Err(e.into());
        }
        self.delete_gate.close();
        if self.selected().as_deref() == Some(od_id.as_str()) {
            self.deselect();
        }
        self.inner.query.remove(&QueryKey::Messages(od_id.clone()));
        self.notifier.success(Operation::Delete);
        self.inner.query.invalidate(&QueryKey::Conversations);
        if let Err(e) = self.inner.refresh_list().await {
            log::debug!("list refresh after delete failed: {}", e);
        }
        Ok(())
    }
}

impl Drop for ConversationViewer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Messages of one calendar day, in the order received.
#[derive(Debug, Clone, PartialEq)]
pub struct DayGroup {
    pub day: NaiveDate,
    pub label: String,
    pub messages: Vec<ChatMessage>,
}

pub fn day_label(day: NaiveDate, today: NaiveDate) -> String {
    if day == today {
        "Today".to_string()
    } else if today.pred_opt() == Some(day) {
        "Yesterday".to_string()
    } else {
        day.format("%d.%m.%Y").to_string()
    }
}

/// Splits `messages` wherever the calendar day (in `now`'s time zone) changes.
pub fn group_by_day<Tz: TimeZone>(messages: &[ChatMessage], now: &DateTime<Tz>) -> Vec<DayGroup> {
    let tz = now.timezone();
    let today = now.date_naive();
    let mut groups: Vec<DayGroup> = Vec::new();
    for message in messages {
        let day = message.created_at.with_timezone(&tz).date_naive();
        match groups.last_mut() {
            Some(group) if group.day == day => group.messages.push(message.clone()),
            _ => groups.push(DayGroup {
                day,
                label: day_label(day, today),
                messages: vec![message.clone()],
            }),
        }
    }
    groups
}

pub fn message_time<Tz>(at: DateTime<Utc>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    at.with_timezone(tz).format("%H:%M").to_string()
}
