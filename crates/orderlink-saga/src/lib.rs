// SPDX-FileCopyrightText: 2026 Orderlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Order-group orchestration: provisioning, membership, and the fallback
//! delivery saga.
//!
//! Every component here talks to the outside world only through the traits
//! in `orderlink-core`:
//! - [`GroupProvisioner`] runs the fault-tolerant group setup sequence
//! - [`MembershipLifecycle`] adds and removes contractors
//! - [`FallbackDeliveryRouter`] tries the notify bot, then the remote fallback
//! - [`FallbackTracker`] sends and records substitute messages (userbot side)
//! - [`MembershipWatcher`] removes substitute messages once the contractor joins

pub mod locks;
pub mod membership;
pub mod metrics;
pub mod provisioner;
pub mod router;
pub mod tracker;
pub mod watcher;

use std::future::Future;
use std::time::Duration;

use orderlink_config::model::SagaConfig;
use orderlink_core::OrderlinkError;

pub use locks::PairLocks;
pub use membership::MembershipLifecycle;
pub use provisioner::{GroupProvisioner, ProvisionRequest};
pub use router::{FallbackDeliveryRouter, new_order_text};
pub use tracker::FallbackTracker;
pub use watcher::{MembershipWatcher, WatchOutcome};

/// Timing and bounds shared by the saga components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SagaSettings {
    /// Upper bound on any single remote call.
    pub call_timeout: Duration,
    /// How many recent messages the history-clear step inspects.
    pub history_scan_limit: usize,
}

impl Default for SagaSettings {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(15),
            history_scan_limit: 50,
        }
    }
}

impl From<&SagaConfig> for SagaSettings {
    fn from(config: &SagaConfig) -> Self {
        Self {
            call_timeout: Duration::from_secs(config.call_timeout_secs),
            history_scan_limit: config.history_scan_limit,
        }
    }
}

/// Runs `fut` under `limit`, mapping expiry to [`OrderlinkError::Timeout`].
pub async fn bounded<T, F>(limit: Duration, fut: F) -> Result<T, OrderlinkError>
where
    F: Future<Output = Result<T, OrderlinkError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(OrderlinkError::Timeout { duration: limit }),
    }
}
