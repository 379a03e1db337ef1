//! HTTP transport for the ledger service
//!
//! The [`Transport`] trait is the seam between the state machines (poll
//! supervisor, transactions controller) and the network. Production code uses
//! [`HttpApi`]; tests script a mock against the same trait.
//!
//! Error bodies follow the service convention: a JSON object with an `error`
//! field carrying a user-presentable message.

pub mod models;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

use models::{
    BulkDeleteRequest, BulkDeleteResponse, Category, Job, ResultPage, UploadAccepted,
};

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Failures surfaced by the transport
///
/// `Http` carries the server's own message so it can be shown to the user
/// as-is; `Network` covers connection, timeout, and decode failures below the
/// HTTP layer.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{message}")]
    Http { status: u16, message: String },
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Standard error body shape: `{"error": "..."}`
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Transport trait
// ─────────────────────────────────────────────────────────────────────────────

/// Request/response exchanges against the ledger service
///
/// `query` strings are the canonical serialization produced by
/// [`crate::query::QueryState::serialize`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch the current status of one import job
    async fn job_status(&self, job_id: i64) -> Result<Job, ApiError>;

    /// List all import jobs for the authenticated user
    async fn list_jobs(&self) -> Result<Vec<Job>, ApiError>;

    /// Fetch one page of transactions for a serialized query
    async fn list_transactions(&self, query: &str) -> Result<ResultPage, ApiError>;

    /// Delete transactions by explicit ids or by filter predicate
    async fn bulk_delete(&self, req: &BulkDeleteRequest) -> Result<BulkDeleteResponse, ApiError>;

    /// List spending categories (for the category filter)
    async fn list_categories(&self) -> Result<Vec<Category>, ApiError>;

    /// Upload a statement PDF; the service creates a background import job
    async fn upload_statement(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadAccepted, ApiError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// HTTP implementation
// ─────────────────────────────────────────────────────────────────────────────

/// reqwest-backed transport with bearer authentication
pub struct HttpApi {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpApi {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            token,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Attach the bearer credential if one is configured
    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    /// Decode a success body, or extract the server's `error` message
    async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ApiError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp.json().await?);
        }
        let message = resp
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|b| b.error)
            .unwrap_or_else(|| format!("Request failed ({})", status.as_u16()));
        Err(ApiError::Http {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl Transport for HttpApi {
    async fn job_status(&self, job_id: i64) -> Result<Job, ApiError> {
        let resp = self
            .authed(self.client.get(self.url(&format!("/imports/jobs/{job_id}"))))
            .send()
            .await?;
        Self::decode(resp).await
    }

    async fn list_jobs(&self) -> Result<Vec<Job>, ApiError> {
        let resp = self
            .authed(self.client.get(self.url("/imports/jobs")))
            .send()
            .await?;
        Self::decode(resp).await
    }

    async fn list_transactions(&self, query: &str) -> Result<ResultPage, ApiError> {
        let resp = self
            .authed(
                self.client
                    .get(format!("{}?{}", self.url("/transactions"), query)),
            )
            .send()
            .await?;
        Self::decode(resp).await
    }

    async fn bulk_delete(&self, req: &BulkDeleteRequest) -> Result<BulkDeleteResponse, ApiError> {
        let resp = self
            .authed(self.client.post(self.url("/transactions/bulk-delete")))
            .json(req)
            .send()
            .await?;
        Self::decode(resp).await
    }

    async fn list_categories(&self) -> Result<Vec<Category>, ApiError> {
        let resp = self
            .authed(self.client.get(self.url("/transactions/categories")))
            .send()
            .await?;
        Self::decode(resp).await
    }

    async fn upload_statement(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadAccepted, ApiError> {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str("application/pdf")?;
        let form = reqwest::multipart::Form::new().part("file", part);
        let resp = self
            .authed(self.client.post(self.url("/imports/upload")))
            .multipart(form)
            .send()
            .await?;
        Self::decode(resp).await
    }
}
