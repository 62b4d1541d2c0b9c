//! Lead triage: paged, filterable list of applications with inline status
//! changes, a detail view with notes, and CSV export of the page in view.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::api::client::{ApiError, Gateway};
use crate::api::models::{Application, ApplicationPage, ApplicationStats, ApplicationStatus, ApplicationUpdate};
use crate::api::resources::{ApplicationQuery, ApplicationsApi};
use crate::confirm::ConfirmGate;
use crate::events::{Notifier, Operation};
use crate::query::{QueryClient, QueryKey};
use crate::utils::date_stamp;

pub const PAGE_SIZE: u32 = 20;

const UTF8_BOM: &str = "\u{feff}";
const CSV_HEADER: [&str; 7] = ["Ism", "Telefon", "Davlat", "Holat", "Forma turi", "Izoh", "Sana"];

#[derive(Debug, thiserror::Error)]
pub enum TriageError {
    #[error("nothing awaiting confirmation")]
    NothingToConfirm,
    #[error(transparent)]
    Api(#[from] ApiError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationFilter {
    pub page: u32,
    pub status: Option<ApplicationStatus>,
    pub search: String,
}

impl Default for ApplicationFilter {
    fn default() -> Self {
        Self {
            page: 1,
            status: None,
            search: String::new(),
        }
    }
}

impl ApplicationFilter {
    fn key(&self) -> QueryKey {
        QueryKey::Applications {
            page: self.page,
            status: self.status,
            search: self.search.trim().to_string(),
        }
    }

    fn query(&self) -> ApplicationQuery {
        ApplicationQuery {
            page: self.page,
            limit: PAGE_SIZE,
            status: self.status,
            search: self.search.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CsvExport {
    pub file_name: String,
    pub contents: String,
}

pub struct ApplicationTriage {
    api: Arc<ApplicationsApi>,
    query: Arc<QueryClient>,
    notifier: Notifier,
    filter: ApplicationFilter,
    displayed: Option<(ApplicationFilter, ApplicationPage)>,
    stats: Option<ApplicationStats>,
    detail: Option<Application>,
    delete_gate: ConfirmGate<String>,
}

impl ApplicationTriage {
    pub fn new(gateway: Arc<Gateway>, query: Arc<QueryClient>, notifier: Notifier) -> Self {
        Self {
            api: Arc::new(ApplicationsApi::new(gateway)),
            query,
            notifier,
            filter: ApplicationFilter::default(),
            displayed: None,
            stats: None,
            detail: None,
            delete_gate: ConfirmGate::new(),
        }
    }

    pub fn filter(&self) -> &ApplicationFilter {
        &self.filter
    }

    pub fn set_page(&mut self, page: u32) {
        self.filter.page = page.max(1);
    }

    /// Changing the status filter or the search text goes back to page 1.
    pub fn set_status(&mut self, status: Option<ApplicationStatus>) {
        self.filter.status = status;
        self.filter.page = 1;
    }

    pub fn set_search(&mut self, search: &str) {
        self.filter.search = search.to_string();
        self.filter.page = 1;
    }

    /// The page on screen. After a filter change this is still the previous
    /// page until the new one arrives; see [`Self::is_placeholder`].
    pub fn page(&self) -> Option<&ApplicationPage> {
        self.displayed.as_ref().map(|(_, page)| page)
    }

    pub fn is_placeholder(&self) -> bool {
        self.displayed
            .as_ref()
            .is_some_and(|(shown, _)| *shown != self.filter)
    }

    pub fn stats(&self) -> Option<&ApplicationStats> {
        self.stats.as_ref()
    }

    /// Loads the page for the current filter. Always goes to the network, so
    /// returning to an earlier filter never shows a stale list. On failure the
    /// previous page stays. Pages for other filters are dropped once the new
    /// one lands.
    pub async fn load(&mut self) -> Result<&ApplicationPage, TriageError> {
        let filter = self.filter.clone();
        let api = self.api.clone();
        let q = filter.query();
        let key = filter.key();
        let page = self
            .query
            .refetch(key.clone(), || {
                let api = api.clone();
                let q = q.clone();
                async move { api.list(&q).await }
            })
            .await?;
        self.query.remove_where(|k| k.is_applications() && *k != key);
        let displayed = self.displayed.insert((filter, page));
        Ok(&displayed.1)
    }

    pub async fn load_stats(&mut self) -> Result<&ApplicationStats, TriageError> {
        let api = self.api.clone();
        let stats = self
            .query
            .fetch(QueryKey::ApplicationStats, || {
                let api = api.clone();
                async move { api.stats().await }
            })
            .await?;
        Ok(self.stats.insert(stats))
    }

    /// List pages and status counts must agree, so every mutation reloads both.
    async fn refresh_after_mutation(&mut self) {
        self.query.invalidate(&QueryKey::ApplicationStats);
        if let Err(e) = self.load().await.map(|_| ()) {
            log::warn!("refetch of applications failed: {}", e);
        }
        if self.stats.is_some() {
            if let Err(e) = self.load_stats().await.map(|_| ()) {
                log::warn!("refetch of application stats failed: {}", e);
            }
        }
    }

    pub async fn update_status(&mut self, id: &str, status: ApplicationStatus) -> Result<(), TriageError> {
        let update = ApplicationUpdate {
            status: Some(status),
            notes: None,
        };
        self.apply_update(id, &update).await
    }

    pub fn open_detail(&mut self, id: &str) -> Option<&Application> {
        let found = self
            .page()?
            .items
            .iter()
            .find(|a| a.id == id)?
            .clone();
        Some(self.detail.insert(found))
    }

    pub fn detail(&self) -> Option<&Application> {
        self.detail.as_ref()
    }

    pub fn close_detail(&mut self) {
        self.detail = None;
    }

    /// Saves status and notes from the detail view; closes it on success.
    pub async fn update_detail(
        &mut self,
        id: &str,
        status: ApplicationStatus,
        notes: &str,
    ) -> Result<(), TriageError> {
        let update = ApplicationUpdate {
            status: Some(status),
            notes: Some(notes.to_string()),
        };
        self.apply_update(id, &update).await?;
        if self.detail.as_ref().is_some_and(|d| d.id == id) {
            self.detail = None;
        }
        Ok(())
    }

    async fn apply_update(&mut self, id: &str, update: &ApplicationUpdate) -> Result<(), TriageError> {
        if let Err(e) = self.api.update(id, update).await {
            log::warn!("updating application {} failed: {}", id, e);
            self.notifier.failure(Operation::StatusChange);
            return Err(e.into());
        }
        self.notifier.success(Operation::StatusChange);
        self.refresh_after_mutation().await;
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

    pub async fn confirm_delete(&mut self) -> Result<(), TriageError> {
        let id = self
            .delete_gate
            .pending()
            .cloned()
            .ok_or(TriageError::NothingToConfirm)?;
        if let Err(e) = self.api.delete(&id).await {
            log::warn!("deleting application {} failed: {}", id, e);
            self.notifier.failure(Operation::Delete);
            return Err(e.into());
        }
        self.delete_gate.close();
        if self.detail.as_ref().is_some_and(|d| d.id == id) {
            self.detail = None;
        }
        self.notifier.success(Operation::Delete);
        self.refresh_after_mutation().await;
        Ok(())
    }

    /// CSV of the page currently on screen only, not the whole filtered set.
    pub fn export_csv(&self, now: DateTime<Utc>) -> Option<CsvExport> {
        let page = self.page()?;
        Some(CsvExport {
            file_name: format!("applications_{}.csv", date_stamp(now)),
            contents: applications_csv(&page.items),
        })
    }
}

/// Header plus one line per row, every field quoted, prefixed with a UTF-8 BOM
/// so spreadsheet tools pick the right encoding.
pub fn applications_csv(rows: &[Application]) -> String {
    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(
        CSV_HEADER
            .iter()
            .map(|h| csv_field(h))
            .collect::<Vec<_>>()
            .join(","),
    );
    for app in rows {
        let fields = [
            app.name.as_str(),
            app.phone.as_str(),
            app.country.as_str(),
            app.status.label(),
            app.form_type.as_str(),
            app.notes.as_str(),
            &app.created_at.format("%d.%m.%Y %H:%M").to_string(),
        ];
        lines.push(fields.iter().map(|f| csv_field(f)).collect::<Vec<_>>().join(","));
    }
    format!("{}{}", UTF8_BOM, lines.join("\n"))
}

/// Quoted field on a single line: embedded quotes are doubled and line breaks
/// become spaces, so a row never spans lines.
fn csv_field(value: &str) -> String {
    let flat = value.replace("\r\n", " ").replace(['\r', '\n'], " ");
    format!("\"{}\"", flat.replace('"', "\"\""))
}
