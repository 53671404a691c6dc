// SPDX-FileCopyrightText: 2026 Orderlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the userbot's fallback-send route.
//!
//! Provides [`HttpFallbackClient`], the notify bot's [`FallbackSender`]. Any
//! non-2xx status or an `ok=false` body is a hard failure.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::{debug, warn};

use orderlink_core::types::{AdapterType, GroupId, HealthStatus, UserId};
use orderlink_core::{FallbackSender, OrderlinkError, PluginAdapter};

use crate::auth::CRM_KEY_HEADER;
use crate::schemas::{GenericResponse, SendFallbackMessageRequest};

const SEND_FALLBACK_PATH: &str = "/api/crm/send_fallback_message";

/// Client settings (mirrors `FallbackConfig` from orderlink-config).
#[derive(Clone)]
pub struct FallbackClientConfig {
    /// Base URL of the userbot service, e.g. `http://127.0.0.1:8001`.
    pub base_url: String,
    /// Key sent as `X-CRM-API-Key`.
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl std::fmt::Debug for FallbackClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackClientConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[redacted]"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Calls `send_fallback_message` on the userbot service.
#[derive(Debug, Clone)]
pub struct HttpFallbackClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpFallbackClient {
    pub fn new(config: FallbackClientConfig) -> Result<Self, OrderlinkError> {
        let mut headers = HeaderMap::new();
        if let Some(key) = config.api_key.as_deref().filter(|k| !k.is_empty()) {
            headers.insert(
                CRM_KEY_HEADER,
                HeaderValue::from_str(key).map_err(|e| {
                    OrderlinkError::Config(format!("invalid fallback.api_key header value: {e}"))
                })?,
            );
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| OrderlinkError::Fallback {
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: config.timeout,
        })
    }

    fn url(&self) -> String {
        format!("{}{SEND_FALLBACK_PATH}", self.base_url)
    }

    fn request_error(&self, e: reqwest::Error) -> OrderlinkError {
        if e.is_timeout() {
            OrderlinkError::Timeout {
                duration: self.timeout,
            }
        } else {
            OrderlinkError::Fallback {
                message: format!("userbot request failed: {e}"),
            }
        }
    }
}

#[async_trait]
impl PluginAdapter for HttpFallbackClient {
    fn name(&self) -> &str {
        "userbot-http"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Fallback
    }

    async fn health_check(&self) -> Result<HealthStatus, OrderlinkError> {
        let url = format!("{}/health", self.base_url);
        match self.client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => Ok(HealthStatus::Healthy),
            Ok(resp) => Ok(HealthStatus::Degraded(format!(
                "userbot health returned {}",
                resp.status()
            ))),
            Err(e) => Ok(HealthStatus::Unhealthy(format!("userbot unreachable: {e}"))),
        }
    }

    async fn shutdown(&self) -> Result<(), OrderlinkError> {
        Ok(())
    }
}

#[async_trait]
impl FallbackSender for HttpFallbackClient {
    async fn send_fallback(
        &self,
        contractor: UserId,
        group: GroupId,
        text: &str,
    ) -> Result<(), OrderlinkError> {
        let body = SendFallbackMessageRequest {
            contractor_id: contractor.0,
            group_id: group.0,
            text: text.to_string(),
        };

        let response = self
            .client
            .post(self.url())
            .json(&body)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        let status = response.status();
        debug!(status = %status, contractor_id = %contractor, group_id = %group, "fallback response received");

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %text, "userbot rejected fallback request");
            return Err(OrderlinkError::Fallback {
                message: format!("userbot returned {status}: {text}"),
            });
        }

        let reply: GenericResponse = response.json().await.map_err(|e| OrderlinkError::Fallback {
            message: format!("failed to parse userbot response: {e}"),
        })?;

        if reply.ok {
            Ok(())
        } else {
            Err(OrderlinkError::Fallback {
                message: format!(
                    "userbot fallback failed: {}",
                    reply.error.as_deref().unwrap_or(&reply.result_code)
                ),
            })
        }
    }
}
