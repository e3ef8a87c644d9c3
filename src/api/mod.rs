//! HTTP client for the Servio backend.
//!
//! Every endpoint answers with the `{success, data, message}` envelope; the
//! helpers here turn that into `Result<T, ApiError>` so callers never look at
//! raw responses.

pub mod auth;
pub mod catalog;
mod envelope;
mod error;
pub mod models;
pub mod profile;
pub mod registration;

pub use envelope::Envelope;
pub use error::ApiError;

use anyhow::Context;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::{debug, error};

use crate::config::Config;
use models::LocalFile;

pub type ApiResult<T> = Result<T, ApiError>;

/// Backend client. Cheap to clone; clones share the bearer token.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    token: Arc<RwLock<Option<String>>>,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> anyhow::Result<Self> {
        let mut builder =
            Client::builder().user_agent(format!("servio/{}", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: Arc::new(RwLock::new(None)),
        })
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Self::new(&config.api_base_url, config.request_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Replace (or clear) the token attached to authenticated calls.
    pub fn set_token(&self, token: Option<String>) {
        let mut guard = self
            .token
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard = token;
    }

    pub fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// `token` overrides the stored session token for this one request.
    fn request(&self, method: Method, path: &str, token: Option<&str>) -> RequestBuilder {
        let url = self.url(path);
        debug!("{} {}", method, url);

        let builder = self.http.request(method, url);
        match token.map(str::to_string).or_else(|| self.token()) {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(request: RequestBuilder) -> ApiResult<Envelope<T>> {
        let response = request.send().await?;
        let status = response.status();
        let url = response.url().clone();
        let body = response.text().await?;

        if !status.is_success() {
            let message = error_message(&body).unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Request failed")
                    .to_string()
            });
            error!("Request to {} failed ({}): {}", url.path(), status.as_u16(), message);
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }

    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> ApiResult<T> {
        self.get_with_token(path, query, None).await
    }

    pub(crate) async fn get_with_token<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        token: Option<&str>,
    ) -> ApiResult<T> {
        let request = self.request(Method::GET, path, token).query(query);
        Self::send(request).await?.into_data()
    }

    pub(crate) async fn post<B, T>(&self, path: &str, body: &B, token: Option<&str>) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.request(Method::POST, path, token).json(body);
        Self::send(request).await?.into_data()
    }

    /// POST where only success matters; returns the server message.
    pub(crate) async fn post_ack<B>(&self, path: &str, body: &B) -> ApiResult<Option<String>>
    where
        B: Serialize + ?Sized,
    {
        let request = self.request(Method::POST, path, None).json(body);
        Self::send::<Value>(request).await?.into_message()
    }

    pub(crate) async fn put_ack<B>(
        &self,
        path: &str,
        body: &B,
        token: Option<&str>,
    ) -> ApiResult<Option<String>>
    where
        B: Serialize + ?Sized,
    {
        let request = self.request(Method::PUT, path, token).json(body);
        Self::send::<Value>(request).await?.into_message()
    }

    pub(crate) async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: Form,
        token: Option<&str>,
    ) -> ApiResult<T> {
        let request = self.request(Method::POST, path, token).multipart(form);
        Self::send(request).await?.into_data()
    }
}

/// Message from an error body: the envelope's `message`, else short plain text.
fn error_message(body: &str) -> Option<String> {
    if let Ok(envelope) = serde_json::from_str::<Envelope<Value>>(body) {
        if let Some(message) = envelope.message.filter(|m| !m.trim().is_empty()) {
            return Some(message);
        }
    }

    let text = body.trim();
    if text.is_empty() || text.len() > 200 || text.starts_with('<') || text.starts_with('{') {
        None
    } else {
        Some(text.to_string())
    }
}

/// Percent-encode a value for use as one path segment.
pub(crate) fn path_segment(value: &str) -> String {
    let Ok(mut url) = reqwest::Url::parse("http://localhost/") else {
        return value.to_string();
    };
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.push(value);
    }
    url.path().trim_start_matches('/').to_string()
}

/// Read a local file into a multipart part.
pub(crate) async fn file_part(file: &LocalFile) -> ApiResult<Part> {
    let bytes = tokio::fs::read(&file.path)
        .await
        .map_err(|source| ApiError::File {
            path: file.path.display().to_string(),
            source,
        })?;

    Ok(Part::bytes(bytes)
        .file_name(file.name.clone())
        .mime_str(&file.mime_type)?)
}

/// Single-file form as the upload endpoints expect it.
pub(crate) async fn single_file_form(field: &'static str, file: &LocalFile) -> ApiResult<Form> {
    Ok(Form::new().part(field, file_part(file).await?))
}

/// MIME type from the file extension; the backend rejects unknown types
/// itself, so anything unrecognized goes up as a plain octet stream.
pub fn guess_mime(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "gif" => "image/gif",
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    }
}
