use async_trait::async_trait;
use reqwest::Client as HttpClient;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use std::time::Duration;
use url::Url;

use super::client::ApiError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(Value),
    Multipart {
        file: FilePart,
        fields: Vec<(String, String)>,
    },
}

/// A request relative to the API base URL. `path` always starts with `/`.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
    pub bearer: Option<String>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
            bearer: None,
        }
    }

    pub fn query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_string(), value.into()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    pub fn multipart(mut self, file: FilePart, fields: Vec<(String, String)>) -> Self {
        self.body = RequestBody::Multipart { file, fields };
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Moves one request over the wire. Status handling and envelopes belong to the gateway.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, ApiError>;
}

pub struct ReqwestTransport {
    http: HttpClient,
    base: String,
}

impl ReqwestTransport {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let base = base_url.trim_end_matches('/').to_string();
        Url::parse(&base)?;
        let http = HttpClient::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Ok(Self { http, base })
    }

    fn url_for(&self, request: &ApiRequest) -> Result<Url, ApiError> {
        let mut url = Url::parse(&format!("{}{}", self.base, request.path))?;
        if !request.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in &request.query {
                pairs.append_pair(k, v);
            }
        }
        Ok(url)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let url = self.url_for(&request)?;
        let mut req = match request.method {
            Method::Get => self.http.get(url),
            Method::Post => self.http.post(url),
            Method::Put => self.http.put(url),
            Method::Patch => self.http.patch(url),
            Method::Delete => self.http.delete(url),
        };
        if let Some(token) = &request.bearer {
            req = req.bearer_auth(token);
        }
        req = match request.body {
            RequestBody::Empty => req,
            RequestBody::Json(body) => req.json(&body),
            RequestBody::Multipart { file, fields } => {
                let part = Part::bytes(file.bytes)
                    .file_name(file.file_name)
                    .mime_str(&file.content_type)
                    .map_err(|e| ApiError::Network(e.to_string()))?;
                let mut form = Form::new().part(file.field, part);
                for (k, v) in fields {
                    form = form.text(k, v);
                }
                req.multipart(form)
            }
        };

        let resp = req
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        let status = resp.status().as_u16();
        let body = resp
            .bytes()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?
            .to_vec();
        Ok(ApiResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_keeps_base_path_and_encodes_query() {
        let transport = ReqwestTransport::new("https://api.example.uz/api/").unwrap();
        let request = ApiRequest::new(Method::Get, "/applications")
            .query("search", "Ali Valiyev")
            .query("page", "2");
        let url = transport.url_for(&request).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.example.uz/api/applications?search=Ali+Valiyev&page=2"
        );
    }

    #[test]
    fn rejects_unparseable_base() {
        assert!(ReqwestTransport::new("not a url").is_err());
    }
}
