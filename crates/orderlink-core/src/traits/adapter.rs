// SPDX-FileCopyrightText: 2026 Orderlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Base trait shared by every injected service handle.

use async_trait::async_trait;

use crate::error::OrderlinkError;
use crate::types::{AdapterType, HealthStatus};

/// Identity and lifecycle for the transport, notify bot, fallback client and store.
///
/// Handles are created once at process start, passed into the saga components
/// as `Arc<dyn ...>`, and shut down once when the process stops.
#[async_trait]
pub trait PluginAdapter: Send + Sync + 'static {
    /// Short adapter name used in logs and `/health` output.
    fn name(&self) -> &str;

    fn version(&self) -> semver::Version;

    fn adapter_type(&self) -> AdapterType;

    /// Checks the backing service (RPC ping, `SELECT 1`, ...).
    async fn health_check(&self) -> Result<HealthStatus, OrderlinkError>;

    /// Releases held connections. Called once during graceful shutdown.
    async fn shutdown(&self) -> Result<(), OrderlinkError>;
}
