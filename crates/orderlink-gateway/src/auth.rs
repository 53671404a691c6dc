// SPDX-FileCopyrightText: 2026 Orderlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Authentication middleware for the CRM API.
//!
//! Accepts the shared key in either of two headers (checked in order):
//! 1. `X-CRM-API-Key: <key>`
//! 2. `Authorization: Bearer <key>`
//!
//! When no key is configured, all requests are rejected (fail-closed).

use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

/// Header carrying the CRM key.
pub const CRM_KEY_HEADER: &str = "x-crm-api-key";

/// Authentication configuration for the CRM API.
#[derive(Clone, Default)]
pub struct AuthConfig {
    /// Expected shared key. `None` rejects every request.
    pub api_key: Option<String>,
}

impl AuthConfig {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.is_empty()),
        }
    }

    /// Checks the request headers against the configured key.
    pub fn authorize(&self, headers: &HeaderMap) -> bool {
        let Some(expected) = self.api_key.as_deref() else {
            return false;
        };

        let crm_key = headers.get(CRM_KEY_HEADER).and_then(|v| v.to_str().ok());
        if crm_key == Some(expected) {
            return true;
        }

        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|token| token == expected)
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

/// Middleware that validates the CRM key.
pub async fn auth_middleware(
    State(auth): State<AuthConfig>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if auth.api_key.is_none() {
        tracing::error!("gateway has no api key configured -- rejecting request");
        return Err(StatusCode::UNAUTHORIZED);
    }

    if auth.authorize(request.headers()) {
        Ok(next.run(request).await)
    } else {
        tracing::debug!(path = %request.uri().path(), "rejected request with invalid CRM key");
        Err(StatusCode::UNAUTHORIZED)
    }
}
