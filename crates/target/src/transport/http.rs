// reqwest-backed transport.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::multipart;
use tracing::debug;
use url::Url;

use wikiedit_common::protocol::params::ApiParams;

use super::{ApiReply, ApiTransport, FormReply, TransportError};
use crate::config::ClientConfig;

const CACHE_HEADER: &str = "x-cache";
const PARSOID_HEADER: &str = "x-parsoid-performance";

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    api_url: Url,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(api_url: Url, timeout: Duration, user_agent: &str) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .cookie_store(true)
            .build()
            .map_err(|error| TransportError::Request(error.to_string()))?;
        Ok(Self { client, api_url, timeout })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, TransportError> {
        let api_url = config
            .api_url()
            .map_err(|error| TransportError::Request(error.to_string()))?;
        Self::new(api_url, config.timeout(), &config.http.user_agent)
    }

    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    fn map_error(&self, error: reqwest::Error) -> TransportError {
        if error.is_timeout() {
            TransportError::Timeout(self.timeout)
        } else if let Some(status) = error.status() {
            TransportError::Status { status: status.as_u16() }
        } else {
            TransportError::Request(error.to_string())
        }
    }

    async fn read_reply(&self, response: reqwest::Response) -> Result<ApiReply, TransportError> {
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status { status: status.as_u16() });
        }
        let (cache_hit, parsoid) = transfer_headers(response.headers());
        let text = response.text().await.map_err(|error| self.map_error(error))?;
        let body = if text.trim().is_empty() {
            None
        } else {
            Some(serde_json::from_str(&text).map_err(TransportError::Decode)?)
        };
        Ok(ApiReply { body, bytes: text.len(), cache_hit, parsoid })
    }
}

#[async_trait]
impl ApiTransport for HttpTransport {
    async fn post(&self, params: &ApiParams) -> Result<ApiReply, TransportError> {
        debug!(operation = params.operation(), "api post");
        let response = self
            .client
            .post(self.api_url.clone())
            .form(params)
            .send()
            .await
            .map_err(|error| self.map_error(error))?;
        self.read_reply(response).await
    }

    async fn get(&self, params: &ApiParams) -> Result<ApiReply, TransportError> {
        debug!(operation = params.operation(), "api get");
        let response = self
            .client
            .get(self.api_url.clone())
            .query(params)
            .send()
            .await
            .map_err(|error| self.map_error(error))?;
        self.read_reply(response).await
    }

    async fn submit_form(
        &self,
        url: &Url,
        fields: &ApiParams,
    ) -> Result<FormReply, TransportError> {
        let form = fields
            .iter()
            .fold(multipart::Form::new(), |form, (name, value)| {
                form.text(name.to_string(), value.to_string())
            });
        let response = self
            .client
            .post(url.clone())
            .multipart(form)
            .send()
            .await
            .map_err(|error| self.map_error(error))?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status { status: status.as_u16() });
        }
        Ok(FormReply { status: status.as_u16(), final_url: response.url().to_string() })
    }
}

fn transfer_headers(headers: &HeaderMap) -> (bool, Option<String>) {
    let cache_hit = headers
        .get(CACHE_HEADER)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.to_ascii_lowercase().contains("hit"));
    let parsoid = headers
        .get(PARSOID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    (cache_hit, parsoid)
}
