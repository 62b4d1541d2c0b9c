use serde::Serialize;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use crate::api::transport::{ApiRequest, ApiResponse, Method, Transport};
use crate::session::SessionHandle;
use crate::storage::token::TokenStore;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("unauthorized; session closed")]
    Unauthorized,
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized => Some(401),
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

/// The one HTTP entry point of the client.
///
/// Attaches the stored bearer token to every request, unwraps the backend's
/// `{ "data": ... }` envelope, and turns any 401 into a global logout: the
/// stored token is cleared and the shared session drops to anonymous before
/// the caller sees [`ApiError::Unauthorized`]. Callers treat that error as
/// "operation abandoned" and never retry it.
pub struct Gateway {
    transport: Arc<dyn Transport>,
    tokens: Arc<dyn TokenStore>,
    session: SessionHandle,
}

impl Gateway {
    pub fn new(
        transport: Arc<dyn Transport>,
        tokens: Arc<dyn TokenStore>,
        session: SessionHandle,
    ) -> Self {
        Self {
            transport,
            tokens,
            session,
        }
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let mut request = ApiRequest::new(Method::Get, path);
        for (k, v) in query {
            request = request.query(k, v.clone());
        }
        self.send(request).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = ApiRequest::new(Method::Post, path).json(serde_json::to_value(body)?);
        self.send(request).await
    }

    /// JSON call whose `data` payload the caller does not need.
    pub async fn send_json_unit<B>(&self, method: Method, path: &str, body: &B) -> Result<(), ApiError>
    where
        B: Serialize + ?Sized,
    {
        let request = ApiRequest::new(method, path).json(serde_json::to_value(body)?);
        self.dispatch(request).await.map(|_| ())
    }

    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.dispatch(ApiRequest::new(Method::Delete, path))
            .await
            .map(|_| ())
    }

    pub async fn send_unit(&self, request: ApiRequest) -> Result<(), ApiError> {
        self.dispatch(request).await.map(|_| ())
    }

    pub async fn send<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let body = self.dispatch(request).await?;
        let envelope: Envelope<T> = serde_json::from_slice(&body)?;
        Ok(envelope.data)
    }

    async fn dispatch(&self, mut request: ApiRequest) -> Result<Vec<u8>, ApiError> {
        request.bearer = self.tokens.load();
        let method = request.method;
        let path = request.path.clone();
        log::debug!("{} {}", method.as_str(), path);

        let resp = self.transport.execute(request).await?;
        if resp.status == 401 {
            log::warn!("{} {} returned 401; closing session", method.as_str(), path);
            self.tokens.clear();
            self.session.expire();
            return Err(ApiError::Unauthorized);
        }
        if !resp.is_success() {
            let message = error_message(&resp);
            log::warn!("{} {} failed: HTTP {} {}", method.as_str(), path, resp.status, message);
            return Err(ApiError::Status {
                status: resp.status,
                message,
            });
        }
        Ok(resp.body)
    }
}

fn error_message(resp: &ApiResponse) -> String {
    serde_json::from_slice::<Value>(&resp.body)
        .ok()
        .and_then(|json| {
            json.get("message")
                .or_else(|| json.get("error"))
                .and_then(|v| v.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| format!("HTTP {}", resp.status))
}
