//! REST client for the Zylo server's mobile endpoints.
//!
//! Covers device push-token registration, the background liveness ping, the
//! authoritative unread-count query, and mark-read. Transient failures are
//! retried with bounded exponential delay; an HTTP 401 is surfaced as
//! [`ApiError::AuthRejected`] so the session layer can drop the token.

mod http_helpers;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use zylo_core::current_unix_timestamp_ms;

use crate::http_helpers::{
    is_retryable_status, is_retryable_transport_error, parse_retry_after, retry_delay,
    truncate_for_error,
};

#[derive(Debug, Error)]
/// Enumerates failures surfaced by the REST client.
pub enum ApiError {
    #[error("authentication rejected by server")]
    AuthRejected,
    #[error("server returned non-success status {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, Serialize)]
/// Device identity reported alongside a push-token registration.
pub struct DeviceInfo {
    pub model: String,
    pub os: String,
    pub os_version: String,
    pub device_name: String,
    pub app_version: String,
}

#[derive(Debug, Clone, Deserialize)]
struct UnreadCountResponse {
    #[serde(default)]
    count: Option<u64>,
    #[serde(default)]
    success: Option<bool>,
}

#[derive(Debug, Clone)]
/// Configuration for [`ApiClient`].
pub struct ApiClientConfig {
    pub api_base: String,
    pub request_timeout_ms: u64,
    pub retry_max_attempts: usize,
    pub retry_base_delay_ms: u64,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self {
            api_base: "https://zylo.vet/api".to_string(),
            request_timeout_ms: 10_000,
            retry_max_attempts: 3,
            retry_base_delay_ms: 250,
        }
    }
}

#[derive(Clone)]
/// Bearer-authenticated client for the mobile REST endpoints.
pub struct ApiClient {
    http: reqwest::Client,
    api_base: String,
    retry_max_attempts: usize,
    retry_base_delay_ms: u64,
}

impl ApiClient {
    pub fn new(config: ApiClientConfig) -> Result<Self, ApiError> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("zylo-mobile-shell"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(config.request_timeout_ms.max(1)))
            .build()?;

        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            retry_max_attempts: config.retry_max_attempts.max(1),
            retry_base_delay_ms: config.retry_base_delay_ms.max(1),
        })
    }

    /// Binds `push_token` to the server-side device record for this session.
    ///
    /// Idempotent from the client's perspective; the caller is responsible for
    /// suppressing redundant calls per `(auth_token, push_token)` pair.
    pub async fn register_device(
        &self,
        auth_token: &str,
        push_token: &str,
        device: &DeviceInfo,
    ) -> Result<(), ApiError> {
        let payload = json!({
            "push_token": push_token,
            "device_type": device.os,
            "device_info": device,
        });
        self.post_expect_success("/notifications/register-device", auth_token, &payload)
            .await
    }

    /// Reports device liveness while the shell is backgrounded.
    pub async fn send_ping(&self, auth_token: &str, app_state: &str) -> Result<(), ApiError> {
        let payload = json!({
            "timestamp_unix_ms": current_unix_timestamp_ms(),
            "device_active": true,
            "app_state": app_state,
        });
        self.post_expect_success("/mobile/ping", auth_token, &payload)
            .await
    }

    /// Fetches the authoritative unread-notification count for the badge.
    pub async fn unread_count(&self, auth_token: &str) -> Result<u64, ApiError> {
        let response = self
            .execute_with_retry("unread-count", || {
                self.http
                    .get(format!("{}/notifications/unread-count", self.api_base))
                    .bearer_auth(auth_token)
            })
            .await?;
        let parsed = response
            .json::<UnreadCountResponse>()
            .await
            .map_err(|error| ApiError::InvalidResponse(error.to_string()))?;
        if parsed.success == Some(false) {
            return Err(ApiError::InvalidResponse(
                "unread-count reported failure".to_string(),
            ));
        }
        parsed
            .count
            .ok_or_else(|| ApiError::InvalidResponse("unread-count missing count".to_string()))
    }

    /// Marks the given notifications read on the server.
    pub async fn mark_notifications_read(
        &self,
        auth_token: &str,
        notification_ids: &[String],
    ) -> Result<(), ApiError> {
        let payload = json!({ "notification_ids": notification_ids });
        self.post_expect_success("/notifications/mark-read", auth_token, &payload)
            .await
    }

    async fn post_expect_success(
        &self,
        endpoint: &str,
        auth_token: &str,
        payload: &serde_json::Value,
    ) -> Result<(), ApiError> {
        self.execute_with_retry(endpoint, || {
            self.http
                .post(format!("{}{}", self.api_base, endpoint))
                .bearer_auth(auth_token)
                .json(payload)
        })
        .await
        .map(|_| ())
    }

    async fn execute_with_retry<F>(
        &self,
        operation: &str,
        builder: F,
    ) -> Result<reqwest::Response, ApiError>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let mut attempt = 0_usize;
        loop {
            attempt = attempt.saturating_add(1);
            let response = builder()
                .header("x-zylo-retry-attempt", attempt.saturating_sub(1).to_string())
                .send()
                .await;
            match response {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }
                    if status.as_u16() == 401 {
                        return Err(ApiError::AuthRejected);
                    }
                    let retry_after = parse_retry_after(response.headers());
                    if attempt < self.retry_max_attempts && is_retryable_status(status.as_u16()) {
                        tokio::time::sleep(retry_delay(
                            self.retry_base_delay_ms,
                            attempt,
                            retry_after,
                        ))
                        .await;
                        continue;
                    }
                    let body = response.text().await.unwrap_or_default();
                    tracing::warn!(operation, status = status.as_u16(), "api request failed");
                    return Err(ApiError::HttpStatus {
                        status: status.as_u16(),
                        body: truncate_for_error(&body, 320),
                    });
                }
                Err(error) => {
                    if attempt < self.retry_max_attempts && is_retryable_transport_error(&error) {
                        tokio::time::sleep(retry_delay(self.retry_base_delay_ms, attempt, None))
                            .await;
                        continue;
                    }
                    return Err(ApiError::Http(error));
                }
            }
        }
    }
}
