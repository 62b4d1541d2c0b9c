use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct User {
    #[serde(alias = "_id")]
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    New,
    Contacted,
    InProgress,
    Completed,
    Cancelled,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 5] = [
        ApplicationStatus::New,
        ApplicationStatus::Contacted,
        ApplicationStatus::InProgress,
        ApplicationStatus::Completed,
        ApplicationStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ApplicationStatus::New => "new",
            ApplicationStatus::Contacted => "contacted",
            ApplicationStatus::InProgress => "in_progress",
            ApplicationStatus::Completed => "completed",
            ApplicationStatus::Cancelled => "cancelled",
        }
    }

    /// Operator-facing label, also used in CSV exports.
    pub fn label(self) -> &'static str {
        match self {
            ApplicationStatus::New => "Yangi",
            ApplicationStatus::Contacted => "Bog'lanildi",
            ApplicationStatus::InProgress => "Jarayonda",
            ApplicationStatus::Completed => "Yakunlandi",
            ApplicationStatus::Cancelled => "Bekor qilindi",
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == wanted)
            .ok_or_else(|| format!("unknown status '{}'", s))
    }
}

/// An inbound lead. Created by the public site's forms, never by this client.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub form_type: String,
    pub status: ApplicationStatus,
    #[serde(default)]
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct Pagination {
    pub page: u32,
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub pages: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct ApplicationPage {
    #[serde(alias = "applications")]
    pub items: Vec<Application>,
    #[serde(default)]
    pub pagination: Pagination,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ApplicationStats {
    pub total: u64,
    pub new: u64,
    pub contacted: u64,
    pub in_progress: u64,
    pub completed: u64,
    pub cancelled: u64,
}

impl ApplicationStats {
    pub fn count(&self, status: ApplicationStatus) -> u64 {
        match status {
            ApplicationStatus::New => self.new,
            ApplicationStatus::Contacted => self.contacted,
            ApplicationStatus::InProgress => self.in_progress,
            ApplicationStatus::Completed => self.completed,
            ApplicationStatus::Cancelled => self.cancelled,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ApplicationStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// One visitor thread. `od_id` identifies the visitor, not the thread.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub od_id: String,
    #[serde(default)]
    pub last_message: String,
    pub last_message_time: DateTime<Utc>,
    #[serde(default)]
    pub last_message_is_user: bool,
    #[serde(default)]
    pub unread_count: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    #[serde(alias = "_id")]
    pub id: String,
    pub text: String,
    pub is_user: bool,
    #[serde(default)]
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct MessageHistory {
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub has_more: bool,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct UploadedImage {
    pub url: String,
}
