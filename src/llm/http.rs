//! Minimal JSON-over-HTTP transport used by the chat backend.
//!
//! Kept behind a trait so tests can substitute a recording transport and the
//! per-request timeout stays the caller's single cancellation mechanism.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde_json::Value;

use super::error::TranslationError;

/// Response from a JSON POST: HTTP status plus the decoded body.
#[derive(Debug, Clone)]
pub struct JsonResponse {
    pub status: u16,
    pub body: Value,
}

impl JsonResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport capability for the chat backend.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn post_json(
        &self,
        url: &str,
        headers: HeaderMap,
        body: &Value,
    ) -> Result<JsonResponse, TranslationError>;
}

/// Production transport backed by `reqwest` with a hard request timeout.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, TranslationError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| TranslationError::Transport(err.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post_json(
        &self,
        url: &str,
        headers: HeaderMap,
        body: &Value,
    ) -> Result<JsonResponse, TranslationError> {
        let response = self
            .client
            .post(url)
            .headers(headers)
            .json(body)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    TranslationError::Timeout
                } else {
                    TranslationError::Transport(err.to_string())
                }
            })?;

        let status = response.status().as_u16();
        let body = response
            .json::<Value>()
            .await
            .unwrap_or_else(|_| Value::Null);

        Ok(JsonResponse { status, body })
    }
}
