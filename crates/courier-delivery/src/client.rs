// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the outbound text-message API.
//!
//! One `POST {base_url}/{recipient_id}` per recipient with body
//! `{id, phone, text}`. The API answers `{code, message}`; a send succeeds
//! only on a 2xx status with `code == 0`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Deserialize;
use tracing::debug;

use courier_config::model::DeliveryConfig;
use courier_core::{
    AdapterType, CourierError, DeliveryAdapter, HealthStatus, PluginAdapter, SendRequest,
};

/// Response body of the send endpoint.
#[derive(Debug, Deserialize)]
struct SendResponse {
    code: i64,
    #[serde(default)]
    message: String,
}

/// Delivery adapter backed by the HTTP send API.
#[derive(Debug, Clone)]
pub struct HttpDelivery {
    client: reqwest::Client,
    base_url: String,
}

impl HttpDelivery {
    pub fn new(config: &DeliveryConfig) -> Result<Self, CourierError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &config.token {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| {
                CourierError::Config(format!("invalid delivery token header value: {e}"))
            })?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CourierError::Delivery {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, recipient_id: i64) -> String {
        format!("{}/{recipient_id}", self.base_url)
    }
}

#[async_trait]
impl PluginAdapter for HttpDelivery {
    fn name(&self) -> &str {
        "http"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Delivery
    }

    /// The API has no health endpoint; a built client is considered healthy.
    async fn health_check(&self) -> Result<HealthStatus, CourierError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), CourierError> {
        Ok(())
    }
}

#[async_trait]
impl DeliveryAdapter for HttpDelivery {
    async fn send(&self, request: &SendRequest) -> Result<(), CourierError> {
        let response = self
            .client
            .post(self.endpoint(request.id))
            .json(request)
            .send()
            .await
            .map_err(|e| CourierError::Delivery {
                message: format!("HTTP request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| CourierError::Delivery {
            message: format!("failed to read response body: {e}"),
            source: Some(Box::new(e)),
        })?;
        debug!(recipient_id = request.id, status = %status, "send response received");

        if !status.is_success() {
            return Err(CourierError::delivery(format!(
                "API returned {status}: {body}"
            )));
        }

        let parsed: SendResponse =
            serde_json::from_str(&body).map_err(|e| CourierError::Delivery {
                message: format!("failed to parse API response: {e}"),
                source: Some(Box::new(e)),
            })?;
        if parsed.code != 0 {
            return Err(CourierError::delivery(format!(
                "API rejected message with code {}: {}",
                parsed.code, parsed.message
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base_url: &str, token: Option<&str>) -> DeliveryConfig {
        DeliveryConfig {
            base_url: base_url.to_string(),
            token: token.map(str::to_string),
            timeout_secs: 5,
        }
    }

    #[test]
    fn endpoint_appends_recipient_id() {
        let delivery = HttpDelivery::new(&config("https://api.example.com/v1/send/", None)).unwrap();
        assert_eq!(delivery.endpoint(17), "https://api.example.com/v1/send/17");
    }

    #[test]
    fn token_with_newline_is_rejected() {
        let err = HttpDelivery::new(&config("https://x", Some("bad\ntoken"))).unwrap_err();
        assert!(matches!(err, CourierError::Config(_)));
    }
}
