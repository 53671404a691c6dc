// SPDX-FileCopyrightText: 2026 Orderlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Client side of the cross-service fallback-send operation.

use async_trait::async_trait;

use crate::error::OrderlinkError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{GroupId, UserId};

/// Asks the group-messaging service to deliver a substitute message and track it.
#[async_trait]
pub trait FallbackSender: PluginAdapter {
    /// Returns `Ok` only once the remote side has sent the message and recorded
    /// the tracking row.
    async fn send_fallback(
        &self,
        contractor: UserId,
        group: GroupId,
        text: &str,
    ) -> Result<(), OrderlinkError>;
}
