// SPDX-FileCopyrightText: 2026 Orderlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notify bot adapter for Orderlink.
//!
//! Implements [`NotifyChannel`] for the Telegram Bot API via teloxide:
//! direct contractor notifications, payment notices with a mini-app button,
//! and pinned order-details cards in order groups. Permission-denied API
//! errors are classified as [`OrderlinkError::Forbidden`] so the delivery
//! router can switch to the userbot fallback.

pub mod classify;
pub mod handler;
pub mod keyboard;

use async_trait::async_trait;
use orderlink_config::model::TelegramConfig;
use orderlink_core::error::OrderlinkError;
use orderlink_core::traits::{NotifyChannel, PluginAdapter};
use orderlink_core::types::{AdapterType, GroupId, HealthStatus, MessageRef, UserId};
use teloxide::prelude::*;
use teloxide::types::ChatId;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::classify::classify_request_error;
use crate::keyboard::MiniAppLinks;

/// Payment notice button label.
pub const PAYMENT_BUTTON: &str = "Открыть мини‑приложение";

/// Order-details card button label.
pub const ORDER_DETAILS_BUTTON: &str = "Детали заказа";

/// Renders the payment notice text.
pub fn payment_text(amount_rub: i64) -> String {
    format!("Мы отправили вам {amount_rub} руб.")
}

/// Renders the caption of the pinned order-details card.
pub fn order_details_caption(title: Option<&str>) -> String {
    match title.map(str::trim).filter(|t| !t.is_empty()) {
        Some(title) => format!("Детали заказа: {title}"),
        None => "Детали заказа".to_string(),
    }
}

/// The order bot, implementing [`NotifyChannel`].
pub struct NotifyBot {
    bot: Bot,
    links: MiniAppLinks,
}

impl NotifyBot {
    /// Creates a new notify bot adapter.
    ///
    /// Requires `config.bot_token` to be set.
    pub fn new(config: &TelegramConfig) -> Result<Self, OrderlinkError> {
        let token = config.bot_token.as_deref().ok_or_else(|| {
            OrderlinkError::Config("telegram.bot_token is required for the notify bot".into())
        })?;

        if token.trim().is_empty() {
            return Err(OrderlinkError::Config(
                "telegram.bot_token cannot be empty".into(),
            ));
        }

        Ok(Self {
            bot: Bot::new(token),
            links: MiniAppLinks::new(&config.miniapp_public_url),
        })
    }

    /// Returns a reference to the underlying teloxide Bot.
    pub fn bot(&self) -> &Bot {
        &self.bot
    }

    pub fn links(&self) -> &MiniAppLinks {
        &self.links
    }

    /// Starts long polling for `/start` and `/help` until `cancel` fires.
    pub fn spawn_polling(&self, cancel: CancellationToken) -> JoinHandle<()> {
        handler::spawn_polling(self.bot.clone(), self.links.clone(), cancel)
    }
}

#[async_trait]
impl PluginAdapter for NotifyBot {
    fn name(&self) -> &str {
        "telegram"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Notify
    }

    async fn health_check(&self) -> Result<HealthStatus, OrderlinkError> {
        match self.bot.get_me().await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(format!(
                "Telegram bot unreachable: {e}"
            ))),
        }
    }

    async fn shutdown(&self) -> Result<(), OrderlinkError> {
        debug!("notify bot shutting down");
        Ok(())
    }
}

#[async_trait]
impl NotifyChannel for NotifyBot {
    async fn send_direct(
        &self,
        contractor: UserId,
        text: &str,
    ) -> Result<MessageRef, OrderlinkError> {
        let sent = self
            .bot
            .send_message(ChatId(contractor.0), text)
            .await
            .map_err(|e| classify_request_error("send message", e))?;
        debug!(contractor_id = %contractor, message_id = sent.id.0, "direct message sent");
        Ok(MessageRef(i64::from(sent.id.0)))
    }

    async fn send_payment_notice(
        &self,
        contractor: UserId,
        amount_rub: i64,
        order_id: &str,
    ) -> Result<MessageRef, OrderlinkError> {
        let markup = self.links.open_button(Some(order_id), PAYMENT_BUTTON)?;
        let sent = self
            .bot
            .send_message(ChatId(contractor.0), payment_text(amount_rub))
            .reply_markup(markup)
            .await
            .map_err(|e| classify_request_error("send payment notice", e))?;
        info!(contractor_id = %contractor, order_id, amount_rub, "payment notice sent");
        Ok(MessageRef(i64::from(sent.id.0)))
    }

    async fn pin_order_details(
        &self,
        group: GroupId,
        order_id: &str,
        title: Option<&str>,
    ) -> Result<MessageRef, OrderlinkError> {
        let chat = ChatId(group.0);
        let markup = self.links.open_button(Some(order_id), ORDER_DETAILS_BUTTON)?;
        let sent = self
            .bot
            .send_message(chat, order_details_caption(title))
            .reply_markup(markup)
            .await
            .map_err(|e| classify_request_error("send order details", e))?;

        if let Err(e) = self
            .bot
            .pin_chat_message(chat, sent.id)
            .disable_notification(true)
            .await
        {
            warn!(group_id = %group, message_id = sent.id.0, error = %e, "failed to pin order details");
        }

        Ok(MessageRef(i64::from(sent.id.0)))
    }
}
