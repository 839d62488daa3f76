// Network transport for API calls.
//
// The Target talks to the wiki only through `ApiTransport`, so tests can
// script replies and the CLI can plug in the reqwest-backed `HttpTransport`.

mod http;

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use url::Url;

use wikiedit_common::protocol::params::ApiParams;

pub use http::HttpTransport;

/// A decoded API reply plus the transfer details recorded by telemetry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApiReply {
    /// Parsed JSON body; `None` when the server sent nothing.
    pub body: Option<Value>,
    /// Size of the raw response body.
    pub bytes: usize,
    /// `X-Cache` reported a hit.
    pub cache_hit: bool,
    /// `X-Parsoid-Performance` header, if any.
    pub parsoid: Option<String>,
}

impl ApiReply {
    pub fn json(body: Value) -> Self {
        let bytes = body.to_string().len();
        Self { body: Some(body), bytes, ..Self::default() }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

/// Result of a form submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormReply {
    pub status: u16,
    /// Where the submission ended up after redirects.
    pub final_url: String,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("server answered HTTP {status}")]
    Status { status: u16 },
    #[error("request failed: {0}")]
    Request(String),
    #[error("response is not valid JSON: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("request was cancelled")]
    Cancelled,
}

#[async_trait]
pub trait ApiTransport: Send + Sync {
    /// Form-encoded POST to the API endpoint.
    async fn post(&self, params: &ApiParams) -> Result<ApiReply, TransportError>;

    /// GET against the API endpoint (read-only queries).
    async fn get(&self, params: &ApiParams) -> Result<ApiReply, TransportError>;

    /// Multipart form POST to an index endpoint, mimicking a classic edit form.
    async fn submit_form(&self, url: &Url, fields: &ApiParams) -> Result<FormReply, TransportError>;
}
