//! Typed accessors, one per backend domain. Each is a thin wrapper over the
//! [`Gateway`]: it picks the path and payload shape and returns the unwrapped
//! `data` value.

use serde::Serialize;
use serde_json::json;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::api::client::{ApiError, Gateway};
use crate::api::models::{
    Application, ApplicationPage, ApplicationStats, ApplicationStatus, ApplicationUpdate,
    ChatMessage, Conversation, LoginResponse, MessageHistory, UploadedImage, User,
};
use crate::api::transport::{ApiRequest, FilePart, Method};
use crate::content::{OrderedItem, SettingsDocument};

pub struct AuthApi {
    gateway: Arc<Gateway>,
}

impl AuthApi {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        self.gateway
            .post("/auth/login", &json!({ "email": email, "password": password }))
            .await
    }

    pub async fn me(&self) -> Result<User, ApiError> {
        self.gateway.get("/auth/me", &[]).await
    }

    pub async fn change_password(&self, current: &str, new: &str) -> Result<(), ApiError> {
        self.gateway
            .send_json_unit(
                Method::Put,
                "/auth/change-password",
                &json!({ "currentPassword": current, "newPassword": new }),
            )
            .await
    }
}

pub struct CollectionApi<T: OrderedItem> {
    gateway: Arc<Gateway>,
    _item: PhantomData<fn() -> T>,
}

impl<T: OrderedItem> Clone for CollectionApi<T> {
    fn clone(&self) -> Self {
        Self::new(self.gateway.clone())
    }
}

impl<T: OrderedItem> CollectionApi<T> {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self {
            gateway,
            _item: PhantomData,
        }
    }

    pub async fn list(&self) -> Result<Vec<T>, ApiError> {
        self.gateway.get(&T::DESCRIPTOR.list_path(), &[]).await
    }

    /// Create-or-update keyed by the item's id.
    pub async fn upsert(&self, item: &T) -> Result<(), ApiError> {
        self.gateway
            .send_json_unit(Method::Post, &T::DESCRIPTOR.upsert_path(), item)
            .await
    }

    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.gateway.delete(&T::DESCRIPTOR.item_path(id)).await
    }

    pub async fn reorder(&self, ids: &[String]) -> Result<(), ApiError> {
        self.gateway
            .send_json_unit(Method::Put, &T::DESCRIPTOR.reorder_path(), &json!({ "ids": ids }))
            .await
    }
}

pub struct SettingsApi<T: SettingsDocument> {
    gateway: Arc<Gateway>,
    _doc: PhantomData<fn() -> T>,
}

impl<T: SettingsDocument> SettingsApi<T> {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self {
            gateway,
            _doc: PhantomData,
        }
    }

    /// A section that was never saved comes back as `null`; treat it as empty.
    pub async fn get(&self) -> Result<T, ApiError> {
        let doc: Option<T> = self
            .gateway
            .get(&format!("/{}/admin", T::RESOURCE), &[])
            .await?;
        Ok(doc.unwrap_or_default())
    }

    pub async fn update(&self, doc: &T) -> Result<(), ApiError> {
        self.gateway
            .send_json_unit(Method::Put, &format!("/{}", T::RESOURCE), doc)
            .await
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplicationQuery {
    pub page: u32,
    pub limit: u32,
    pub status: Option<ApplicationStatus>,
    pub search: String,
}

pub struct ApplicationsApi {
    gateway: Arc<Gateway>,
}

impl ApplicationsApi {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }

    pub async fn list(&self, q: &ApplicationQuery) -> Result<ApplicationPage, ApiError> {
        let mut params = vec![("page", q.page.max(1).to_string()), ("limit", q.limit.to_string())];
        if let Some(status) = q.status {
            params.push(("status", status.as_str().to_string()));
        }
        let search = q.search.trim();
        if !search.is_empty() {
            params.push(("search", search.to_string()));
        }
        self.gateway.get("/applications", &params).await
    }

    pub async fn get(&self, id: &str) -> Result<Application, ApiError> {
        self.gateway.get(&format!("/applications/{}", id), &[]).await
    }

    pub async fn stats(&self) -> Result<ApplicationStats, ApiError> {
        self.gateway.get("/applications/stats", &[]).await
    }

    pub async fn update(&self, id: &str, update: &ApplicationUpdate) -> Result<(), ApiError> {
        self.gateway
            .send_json_unit(Method::Patch, &format!("/applications/{}", id), update)
            .await
    }

    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.gateway.delete(&format!("/applications/{}", id)).await
    }
}

pub struct ChatApi {
    gateway: Arc<Gateway>,
}

impl ChatApi {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }

    pub async fn conversations(&self) -> Result<Vec<Conversation>, ApiError> {
        self.gateway.get("/chat/conversations", &[]).await
    }

    pub async fn history(&self, od_id: &str, page: u32, limit: u32) -> Result<MessageHistory, ApiError> {
        self.gateway
            .get(
                &format!("/chat/conversations/{}/messages", od_id),
                &[("page", page.to_string()), ("limit", limit.to_string())],
            )
            .await
    }

    pub async fn reply(&self, od_id: &str, text: &str) -> Result<ChatMessage, ApiError> {
        self.gateway
            .post(
                &format!("/chat/conversations/{}/reply", od_id),
                &json!({ "text": text }),
            )
            .await
    }

    pub async fn delete(&self, od_id: &str) -> Result<(), ApiError> {
        self.gateway
            .delete(&format!("/chat/conversations/{}", od_id))
            .await
    }
}

pub struct ImageApi {
    gateway: Arc<Gateway>,
}

impl ImageApi {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }

    pub async fn upload(
        &self,
        path: &str,
        file: FilePart,
        fields: Vec<(String, String)>,
    ) -> Result<UploadedImage, ApiError> {
        let request = ApiRequest::new(Method::Post, path).multipart(file, fields);
        self.gateway.send(request).await
    }

    pub async fn delete(&self, path: &str, query: &[(&str, String)]) -> Result<(), ApiError> {
        let mut request = ApiRequest::new(Method::Delete, path);
        for (k, v) in query {
            request = request.query(k, v.clone());
        }
        self.gateway.send_unit(request).await
    }
}
