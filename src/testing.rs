//! Test doubles for the transport seam: a scripted queue of raw responses and
//! an in-memory backend that routes requests the way the real API does.

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use crate::api::client::{ApiError, Gateway};
use crate::api::models::{
    Application, ApplicationStats, ApplicationStatus, ChatMessage, Conversation, User,
};
use crate::api::transport::{ApiRequest, ApiResponse, Method, RequestBody, Transport};
use crate::events::Notifier;
use crate::query::QueryClient;
use crate::session::SessionHandle;
use crate::storage::token::{MemoryTokenStore, TokenStore};

fn respond(status: u16, body: &Value) -> ApiResponse {
    ApiResponse {
        status,
        body: serde_json::to_vec(body).unwrap(),
    }
}

fn ok(data: Value) -> ApiResponse {
    respond(200, &json!({ "data": data }))
}

fn error(status: u16, message: &str) -> ApiResponse {
    respond(status, &json!({ "message": message }))
}

enum Scripted {
    Reply(ApiResponse),
    NetworkFailure(String),
}

/// Replays queued responses in order and records every request.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Scripted>>,
    sent: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, status: u16, body: Value) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Scripted::Reply(respond(status, &body)));
    }

    pub fn fail_network(&self, message: &str) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Scripted::NetworkFailure(message.to_string()));
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        self.sent.lock().unwrap().push(request);
        match self.replies.lock().unwrap().pop_front() {
            Some(Scripted::Reply(resp)) => Ok(resp),
            Some(Scripted::NetworkFailure(msg)) => Err(ApiError::Network(msg)),
            None => Ok(error(500, "no scripted response")),
        }
    }
}

pub const FAKE_EMAIL: &str = "admin@site.uz";
pub const FAKE_PASSWORD: &str = "secret";
pub const FAKE_TOKEN: &str = "token-1";

const COLLECTIONS: [&str; 8] = [
    "stats",
    "features",
    "programs",
    "countries",
    "steps",
    "testimonials",
    "tips",
    "faq",
];
const SETTINGS: [&str; 5] = ["hero", "video", "contact", "about", "faq-settings"];

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 1, 8, 0, 0).unwrap()
}

pub fn fake_user() -> User {
    User {
        id: "u1".into(),
        email: FAKE_EMAIL.into(),
        name: Some("Admin".into()),
        role: Some("admin".into()),
    }
}

pub fn application(id: &str, name: &str, status: ApplicationStatus) -> Application {
    Application {
        id: id.into(),
        name: name.into(),
        phone: "+998900000000".into(),
        country: "Germany".into(),
        form_type: "contact".into(),
        status,
        notes: String::new(),
        created_at: base_time(),
        updated_at: base_time(),
    }
}

struct State {
    requests: Vec<ApiRequest>,
    failures: Vec<(Method, String, u16)>,
    collections: HashMap<String, Vec<Value>>,
    settings: HashMap<String, Value>,
    applications: Vec<Application>,
    conversations: Vec<Conversation>,
    messages: HashMap<String, Vec<ChatMessage>>,
    password: String,
    next_id: u64,
}

/// In-memory stand-in for the content API. Requires the fake token on every
/// route except login, like the real backend.
pub struct FakeBackend {
    state: Mutex<State>,
}

impl FakeBackend {
    pub fn new() -> Self {
        let collections = COLLECTIONS
            .iter()
            .map(|r| (r.to_string(), Vec::new()))
            .collect();
        Self {
            state: Mutex::new(State {
                requests: Vec::new(),
                failures: Vec::new(),
                collections,
                settings: HashMap::new(),
                applications: Vec::new(),
                conversations: Vec::new(),
                messages: HashMap::new(),
                password: FAKE_PASSWORD.to_string(),
                next_id: 1,
            }),
        }
    }

    pub fn seed_collection<T: Serialize>(&self, resource: &str, items: &[T]) {
        let values = items
            .iter()
            .map(|i| serde_json::to_value(i).unwrap())
            .collect();
        self.state
            .lock()
            .unwrap()
            .collections
            .insert(resource.to_string(), values);
    }

    pub fn seed_settings(&self, resource: &str, doc: Value) {
        self.state
            .lock()
            .unwrap()
            .settings
            .insert(resource.to_string(), doc);
    }

    pub fn seed_applications(&self, apps: Vec<Application>) {
        self.state.lock().unwrap().applications = apps;
    }

    /// Adds a thread whose messages are one minute apart. Later seeded threads are newer.
    pub fn seed_chat(&self, od_id: &str, texts: &[(&str, bool)]) {
        let mut state = self.state.lock().unwrap();
        let start = base_time() + Duration::hours(state.conversations.len() as i64);
        let messages: Vec<ChatMessage> = texts
            .iter()
            .enumerate()
            .map(|(i, (text, is_user))| ChatMessage {
                id: format!("{}-m{}", od_id, i),
                text: text.to_string(),
                is_user: *is_user,
                is_read: false,
                created_at: start + Duration::minutes(i as i64),
            })
            .collect();
        let mut conversation = Conversation {
            od_id: od_id.to_string(),
            last_message: String::new(),
            last_message_time: start,
            last_message_is_user: false,
            unread_count: 0,
        };
        refresh_summary(&mut conversation, &messages);
        state.conversations.push(conversation);
        state.messages.insert(od_id.to_string(), messages);
    }

    /// A visitor writes into `od_id`; creates the thread if needed.
    pub fn push_visitor_message(&self, od_id: &str, text: &str) {
        let mut state = self.state.lock().unwrap();
        let id = state.mint_id("msg");
        let thread = state.messages.entry(od_id.to_string()).or_default();
        let at = thread
            .last()
            .map(|m| m.created_at + Duration::minutes(1))
            .unwrap_or_else(base_time);
        thread.push(ChatMessage {
            id,
            text: text.to_string(),
            is_user: true,
            is_read: false,
            created_at: at,
        });
        let thread = thread.clone();
        if !state.conversations.iter().any(|c| c.od_id == od_id) {
            state.conversations.push(Conversation {
                od_id: od_id.to_string(),
                last_message: String::new(),
                last_message_time: at,
                last_message_is_user: true,
                unread_count: 0,
            });
        }
        if let Some(c) = state.conversations.iter_mut().find(|c| c.od_id == od_id) {
            refresh_summary(c, &thread);
        }
    }

    /// The next request matching `method` and `path` gets `status` instead of being served.
    pub fn fail_next(&self, method: Method, path: &str, status: u16) {
        self.state
            .lock()
            .unwrap()
            .failures
            .push((method, path.to_string(), status));
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn count(&self, method: Method, path: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .requests
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }

    pub fn last_body(&self, method: Method, path: &str) -> Option<Value> {
        self.state
            .lock()
            .unwrap()
            .requests
            .iter()
            .rev()
            .find(|r| r.method == method && r.path == path)
            .and_then(|r| match &r.body {
                RequestBody::Json(v) => Some(v.clone()),
                _ => None,
            })
    }

    pub fn password(&self) -> String {
        self.state.lock().unwrap().password.clone()
    }

    fn handle(&self, request: &ApiRequest) -> ApiResponse {
        let mut state = self.state.lock().unwrap();
        state.requests.push(request.clone());
        if let Some(pos) = state
            .failures
            .iter()
            .position(|(m, p, _)| *m == request.method && *p == request.path)
        {
            let (_, _, status) = state.failures.remove(pos);
            return error(status, "forced failure");
        }

        let segments: Vec<&str> = request.path.trim_start_matches('/').split('/').collect();
        if segments.as_slice() == ["auth", "login"] && request.method == Method::Post {
            return state.login(request);
        }
        if request.bearer.as_deref() != Some(FAKE_TOKEN) {
            return error(401, "Token topilmadi");
        }
        state.route(request, &segments)
    }
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for FakeBackend {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        Ok(self.handle(&request))
    }
}

fn json_body(request: &ApiRequest) -> Value {
    match &request.body {
        RequestBody::Json(v) => v.clone(),
        _ => Value::Null,
    }
}

fn query_param<'a>(request: &'a ApiRequest, key: &str) -> Option<&'a str> {
    request
        .query
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

fn refresh_summary(conversation: &mut Conversation, messages: &[ChatMessage]) {
    if let Some(last) = messages.last() {
        conversation.last_message = last.text.clone();
        conversation.last_message_time = last.created_at;
        conversation.last_message_is_user = last.is_user;
    }
    conversation.unread_count = messages.iter().filter(|m| m.is_user && !m.is_read).count() as u32;
}

impl State {
    fn mint_id(&mut self, prefix: &str) -> String {
        let id = format!("{}-{}", prefix, self.next_id);
        self.next_id += 1;
        id
    }

    fn login(&self, request: &ApiRequest) -> ApiResponse {
        let body = json_body(request);
        let email = body["email"].as_str().unwrap_or_default();
        let password = body["password"].as_str().unwrap_or_default();
        if email == FAKE_EMAIL && password == self.password {
            ok(json!({ "token": FAKE_TOKEN, "user": fake_user() }))
        } else {
            error(400, "Invalid credentials")
        }
    }

    fn route(&mut self, request: &ApiRequest, segments: &[&str]) -> ApiResponse {
        use Method::*;
        match (request.method, segments) {
            (Get, ["auth", "me"]) => ok(json!(fake_user())),
            (Put, ["auth", "change-password"]) => {
                let body = json_body(request);
                if body["currentPassword"].as_str() != Some(self.password.as_str()) {
                    return error(400, "Joriy parol noto'g'ri");
                }
                self.password = body["newPassword"].as_str().unwrap_or_default().to_string();
                ok(Value::Null)
            }
            (Post | Delete, [.., "image" | "avatar" | "gallery"]) => self.image(request),
            (Get, ["applications"]) => self.list_applications(request),
            (Get, ["applications", "stats"]) => ok(json!(self.stats())),
            (Get | Patch | Delete, ["applications", id]) => self.application(request, id),
            (Get, ["chat", "conversations"]) => {
                let mut list = self.conversations.clone();
                list.sort_by(|a, b| b.last_message_time.cmp(&a.last_message_time));
                ok(json!(list))
            }
            (Get, ["chat", "conversations", od_id, "messages"]) => self.history(request, od_id),
            (Post, ["chat", "conversations", od_id, "reply"]) => self.reply(request, od_id),
            (Delete, ["chat", "conversations", od_id]) => {
                let before = self.conversations.len();
                self.conversations.retain(|c| c.od_id != *od_id);
                self.messages.remove(*od_id);
                if self.conversations.len() == before {
                    error(404, "Suhbat topilmadi")
                } else {
                    ok(Value::Null)
                }
            }
            (Get, [res, "admin"]) if SETTINGS.contains(res) => {
                ok(self.settings.get(*res).cloned().unwrap_or(Value::Null))
            }
            (Put, [res]) if SETTINGS.contains(res) => {
                self.settings.insert(res.to_string(), json_body(request));
                ok(Value::Null)
            }
            (Get, [res, "admin"]) if self.collections.contains_key(*res) => {
                let mut items = self.collections[*res].clone();
                items.sort_by_key(|v| v["order"].as_i64().unwrap_or_default());
                ok(Value::Array(items))
            }
            (Post, [res]) if self.collections.contains_key(*res) => {
                let item = json_body(request);
                let items = self.collections.entry(res.to_string()).or_default();
                match items.iter_mut().find(|v| v["id"] == item["id"]) {
                    Some(existing) => *existing = item.clone(),
                    None => items.push(item.clone()),
                }
                ok(item)
            }
            (Put, [res, "reorder"]) if self.collections.contains_key(*res) => {
                let body = json_body(request);
                let ids = body["ids"].as_array().cloned().unwrap_or_default();
                let items = self.collections.entry(res.to_string()).or_default();
                for (idx, id) in ids.iter().enumerate() {
                    if let Some(item) = items.iter_mut().find(|v| v["id"] == *id) {
                        item["order"] = json!(idx + 1);
                    }
                }
                ok(Value::Null)
            }
            (Delete, [res, id]) if self.collections.contains_key(*res) => {
                let items = self.collections.entry(res.to_string()).or_default();
                let before = items.len();
                items.retain(|v| v["id"] != json!(id));
                if items.len() == before {
                    error(404, "Topilmadi")
                } else {
                    ok(Value::Null)
                }
            }
            _ => error(404, "Route not found"),
        }
    }

    fn image(&self, request: &ApiRequest) -> ApiResponse {
        match &request.body {
            RequestBody::Multipart { file, .. } => {
                ok(json!({ "url": format!("https://cdn.test/{}", file.file_name) }))
            }
            _ if request.method == Method::Delete => ok(Value::Null),
            _ => error(400, "Rasm yuklanmadi"),
        }
    }

    fn list_applications(&self, request: &ApiRequest) -> ApiResponse {
        let page: usize = query_param(request, "page")
            .and_then(|v| v.parse().ok())
            .unwrap_or(1);
        let limit: usize = query_param(request, "limit")
            .and_then(|v| v.parse().ok())
            .unwrap_or(20);
        let status = query_param(request, "status");
        let search = query_param(request, "search").map(str::to_lowercase);

        let matching: Vec<&Application> = self
            .applications
            .iter()
            .filter(|a| status.is_none_or(|s| a.status.as_str() == s))
            .filter(|a| {
                search.as_ref().is_none_or(|q| {
                    a.name.to_lowercase().contains(q) || a.phone.contains(q.as_str())
                })
            })
            .collect();
        let total = matching.len();
        let items: Vec<&Application> = matching
            .into_iter()
            .skip((page.max(1) - 1) * limit)
            .take(limit)
            .collect();
        ok(json!({
            "items": items,
            "pagination": {
                "page": page,
                "limit": limit,
                "total": total,
                "pages": total.div_ceil(limit.max(1)),
            }
        }))
    }

    fn stats(&self) -> ApplicationStats {
        let count = |s: ApplicationStatus| {
            self.applications.iter().filter(|a| a.status == s).count() as u64
        };
        ApplicationStats {
            total: self.applications.len() as u64,
            new: count(ApplicationStatus::New),
            contacted: count(ApplicationStatus::Contacted),
            in_progress: count(ApplicationStatus::InProgress),
            completed: count(ApplicationStatus::Completed),
            cancelled: count(ApplicationStatus::Cancelled),
        }
    }

    fn application(&mut self, request: &ApiRequest, id: &str) -> ApiResponse {
        let Some(pos) = self.applications.iter().position(|a| a.id == id) else {
            return error(404, "Ariza topilmadi");
        };
        match request.method {
            Method::Delete => {
                self.applications.remove(pos);
                ok(Value::Null)
            }
            Method::Patch => {
                let body = json_body(request);
                let app = &mut self.applications[pos];
                if let Some(status) = body["status"].as_str().and_then(|s| s.parse().ok()) {
                    app.status = status;
                }
                if let Some(notes) = body["notes"].as_str() {
                    app.notes = notes.to_string();
                }
                ok(json!(app))
            }
            _ => ok(json!(self.applications[pos])),
        }
    }

    /// Newest `limit` messages per page, oldest first within the page. Marks
    /// the visitor's messages read.
    fn history(&mut self, request: &ApiRequest, od_id: &str) -> ApiResponse {
        let page: usize = query_param(request, "page")
            .and_then(|v| v.parse().ok())
            .unwrap_or(1);
        let limit: usize = query_param(request, "limit")
            .and_then(|v| v.parse().ok())
            .unwrap_or(50);
        let thread = self.messages.entry(od_id.to_string()).or_default();
        let end = thread.len().saturating_sub((page.max(1) - 1) * limit);
        let start = end.saturating_sub(limit);
        let messages = thread[start..end].to_vec();
        for m in thread.iter_mut() {
            m.is_read = true;
        }
        let thread = thread.clone();
        if let Some(c) = self.conversations.iter_mut().find(|c| c.od_id == od_id) {
            refresh_summary(c, &thread);
        }
        ok(json!({ "messages": messages, "hasMore": start > 0 }))
    }

    fn reply(&mut self, request: &ApiRequest, od_id: &str) -> ApiResponse {
        if !self.conversations.iter().any(|c| c.od_id == od_id) {
            return error(404, "Suhbat topilmadi");
        }
        let text = json_body(request)["text"]
            .as_str()
            .unwrap_or_default()
            .to_string();
        let id = self.mint_id("reply");
        let thread = self.messages.entry(od_id.to_string()).or_default();
        let at = thread
            .last()
            .map(|m| m.created_at + Duration::minutes(1))
            .unwrap_or_else(base_time);
        let message = ChatMessage {
            id,
            text,
            is_user: false,
            is_read: true,
            created_at: at,
        };
        thread.push(message.clone());
        let thread = thread.clone();
        if let Some(c) = self.conversations.iter_mut().find(|c| c.od_id == od_id) {
            refresh_summary(c, &thread);
        }
        ok(json!(message))
    }
}

pub struct Harness {
    pub gateway: Arc<Gateway>,
    pub query: Arc<QueryClient>,
    pub notifier: Notifier,
    pub tokens: Arc<MemoryTokenStore>,
    pub session: SessionHandle,
}

/// A signed-in client wired to `backend`.
pub fn harness(backend: Arc<FakeBackend>) -> Harness {
    let tokens = Arc::new(MemoryTokenStore::with_token(FAKE_TOKEN));
    let session = SessionHandle::new();
    session.set_authenticated(fake_user(), FAKE_TOKEN.to_string());
    let store: Arc<dyn TokenStore> = tokens.clone();
    Harness {
        gateway: Arc::new(Gateway::new(backend, store, session.clone())),
        query: Arc::new(QueryClient::new()),
        notifier: Notifier::new(),
        tokens,
        session,
    }
}
