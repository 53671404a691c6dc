// SPDX-FileCopyrightText: 2026 Orderlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Primary notification channel (the order bot).

use async_trait::async_trait;

use crate::error::OrderlinkError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{GroupId, MessageRef, UserId};

#[async_trait]
pub trait NotifyChannel: PluginAdapter {
    /// Sends `text` straight to the contractor's private chat with the bot.
    ///
    /// Fails with [`OrderlinkError::Forbidden`] when the contractor blocked the
    /// bot or never started it.
    async fn send_direct(&self, contractor: UserId, text: &str)
    -> Result<MessageRef, OrderlinkError>;

    /// Payment notice with a button opening the contractor cabinet.
    async fn send_payment_notice(
        &self,
        contractor: UserId,
        amount_rub: i64,
        order_id: &str,
    ) -> Result<MessageRef, OrderlinkError>;

    /// Posts an order-details card into the group and pins it silently.
    ///
    /// Pinning is best-effort; the posted message id is returned either way.
    async fn pin_order_details(
        &self,
        group: GroupId,
        order_id: &str,
        title: Option<&str>,
    ) -> Result<MessageRef, OrderlinkError>;
}
