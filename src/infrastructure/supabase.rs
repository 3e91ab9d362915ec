//! Thin PostgREST + Storage client shared by the Supabase-backed adapters.

use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;

use crate::domain::DomainError;
use crate::infrastructure::config::SupabaseConfig;
use crate::infrastructure::http::transport_error;

/// Postgres `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Clone)]
pub struct SupabaseClient {
    http: Client,
    base_url: String,
    key: String,
}

impl SupabaseClient {
    pub fn new(http: Client, config: &SupabaseConfig) -> Self {
        Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            key: config.key.clone(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn http(&self) -> &Client {
        &self.http
    }

    pub fn rest_url(&self, path: &str) -> Result<Url, DomainError> {
        parse_url(&format!("{}/rest/v1/{}", self.base_url, path))
    }

    pub fn storage_url(&self, path: &str) -> Result<Url, DomainError> {
        parse_url(&format!("{}/storage/v1/{}", self.base_url, path))
    }

    pub fn public_url(&self, bucket: &str, path: &str) -> String {
        public_object_url(&self.base_url, bucket, path)
    }

    pub fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request.header("apikey", &self.key).bearer_auth(&self.key)
    }

    /// Sends a PostgREST request, classifying unique violations as
    /// `DuplicateKey`.
    pub async fn send_rest(&self, request: RequestBuilder) -> Result<Response, DomainError> {
        let response = self.authed(request).send().await.map_err(transport_error)?;
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(classify_postgrest(status, &body))
    }

    /// Sends a Storage request, classifying existing objects as `Conflict`.
    pub async fn send_storage(&self, request: RequestBuilder) -> Result<Response, DomainError> {
        let response = self.authed(request).send().await.map_err(transport_error)?;
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(classify_storage(status, &body))
    }
}

pub fn public_object_url(base_url: &str, bucket: &str, path: &str) -> String {
    format!(
        "{}/storage/v1/object/public/{}/{}",
        base_url.trim_end_matches('/'),
        bucket,
        path.trim_start_matches('/')
    )
}

fn parse_url(url: &str) -> Result<Url, DomainError> {
    Url::parse(url).map_err(|e| DomainError::internal(format!("invalid url {url}: {e}")))
}

#[derive(Debug, Deserialize)]
struct PostgrestError {
    code: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StorageError {
    status_code: Option<serde_json::Value>,
    error: Option<String>,
    message: Option<String>,
}

pub(crate) fn classify_postgrest(status: StatusCode, body: &str) -> DomainError {
    let parsed = serde_json::from_str::<PostgrestError>(body).ok();
    let code = parsed.as_ref().and_then(|e| e.code.as_deref());
    let message = parsed
        .as_ref()
        .and_then(|e| e.message.clone())
        .unwrap_or_else(|| body.to_string());

    // A bare 409 only stands in for the code when the body carries none.
    let duplicate = match code {
        Some(code) => code == UNIQUE_VIOLATION,
        None => status == StatusCode::CONFLICT,
    };
    if duplicate {
        DomainError::duplicate_key(message)
    } else {
        DomainError::external(format!("PostgREST error {status}: {message}"))
    }
}

pub(crate) fn classify_storage(status: StatusCode, body: &str) -> DomainError {
    let parsed = serde_json::from_str::<StorageError>(body).ok();
    // Storage reports some errors as HTTP 400 with the real status in the body.
    let body_status = parsed.as_ref().and_then(|e| match &e.status_code {
        Some(serde_json::Value::String(s)) => s.parse::<u16>().ok(),
        Some(serde_json::Value::Number(n)) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
        _ => None,
    });
    let message = parsed
        .as_ref()
        .and_then(|e| e.message.clone().or_else(|| e.error.clone()))
        .unwrap_or_else(|| body.to_string());

    if status == StatusCode::CONFLICT || body_status == Some(409) {
        DomainError::conflict(message)
    } else {
        DomainError::external(format!("Storage error {status}: {message}"))
    }
}
