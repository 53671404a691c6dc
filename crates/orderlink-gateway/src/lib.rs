// SPDX-FileCopyrightText: 2026 Orderlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP surface of the Orderlink services.
//!
//! The userbot process serves group provisioning, membership changes and the
//! fallback-send route; the notify process serves contractor notifications.
//! Both share the CRM key middleware. The notify process reaches the userbot
//! through [`HttpFallbackClient`].

pub mod auth;
pub mod client;
pub mod handlers;
pub mod schemas;
pub mod server;

pub use auth::AuthConfig;
pub use client::{FallbackClientConfig, HttpFallbackClient};
pub use server::{NotifyState, ServerConfig, UserbotState, notify_router, serve, userbot_router};
