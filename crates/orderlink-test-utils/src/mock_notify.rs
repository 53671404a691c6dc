// SPDX-FileCopyrightText: 2026 Orderlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock notify channel and fallback sender.

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;

use orderlink_core::traits::adapter::PluginAdapter;
use orderlink_core::traits::fallback::FallbackSender;
use orderlink_core::traits::notify::NotifyChannel;
use orderlink_core::types::{AdapterType, GroupId, HealthStatus, MessageRef, UserId};
use orderlink_core::OrderlinkError;

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// Captured notify-bot output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifySent {
    Direct { contractor: UserId, text: String },
    Payment { contractor: UserId, amount_rub: i64, order_id: String },
    Pinned { group: GroupId, order_id: String, title: Option<String> },
}

/// Mock notify bot.
///
/// Contractors added with [`block`](Self::block) get `Forbidden`; a generic
/// failure set with [`fail_with`](Self::fail_with) applies to everyone else.
#[derive(Default)]
pub struct MockNotifyChannel {
    sent: Mutex<Vec<NotifySent>>,
    blocked: Mutex<HashSet<UserId>>,
    failure: Mutex<Option<String>>,
    hang: Mutex<bool>,
    next_id: AtomicI64,
}

impl MockNotifyChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates the contractor having blocked the bot.
    pub fn block(&self, contractor: UserId) {
        lock(&self.blocked).insert(contractor);
    }

    /// Every send fails with a non-permission transport error.
    pub fn fail_with(&self, message: &str) {
        *lock(&self.failure) = Some(message.to_string());
    }

    /// Sends never complete.
    pub fn hang(&self) {
        *lock(&self.hang) = true;
    }

    pub fn sent(&self) -> Vec<NotifySent> {
        lock(&self.sent).clone()
    }

    async fn gate(&self, contractor: Option<UserId>) -> Result<(), OrderlinkError> {
        let hang = *lock(&self.hang);
        if hang {
            std::future::pending::<()>().await;
        }
        if let Some(c) = contractor {
            if lock(&self.blocked).contains(&c) {
                return Err(OrderlinkError::Forbidden {
                    message: "bot was blocked by the user".into(),
                });
            }
        }
        let failure = lock(&self.failure).clone();
        match failure {
            Some(message) => Err(OrderlinkError::transport(message)),
            None => Ok(()),
        }
    }

    fn record(&self, sent: NotifySent) -> MessageRef {
        lock(&self.sent).push(sent);
        MessageRef(self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

#[async_trait]
impl PluginAdapter for MockNotifyChannel {
    fn name(&self) -> &str {
        "mock-notify"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Notify
    }

    async fn health_check(&self) -> Result<HealthStatus, OrderlinkError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), OrderlinkError> {
        Ok(())
    }
}

#[async_trait]
impl NotifyChannel for MockNotifyChannel {
    async fn send_direct(&self, contractor: UserId, text: &str) -> Result<MessageRef, OrderlinkError> {
        self.gate(Some(contractor)).await?;
        Ok(self.record(NotifySent::Direct {
            contractor,
            text: text.to_string(),
        }))
    }

    async fn send_payment_notice(
        &self,
        contractor: UserId,
        amount_rub: i64,
        order_id: &str,
    ) -> Result<MessageRef, OrderlinkError> {
        self.gate(Some(contractor)).await?;
        Ok(self.record(NotifySent::Payment {
            contractor,
            amount_rub,
            order_id: order_id.to_string(),
        }))
    }

    async fn pin_order_details(
        &self,
        group: GroupId,
        order_id: &str,
        title: Option<&str>,
    ) -> Result<MessageRef, OrderlinkError> {
        self.gate(None).await?;
        Ok(self.record(NotifySent::Pinned {
            group,
            order_id: order_id.to_string(),
            title: title.map(str::to_string),
        }))
    }
}

/// One captured fallback request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackCall {
    pub contractor: UserId,
    pub group: GroupId,
    pub text: String,
}

/// Mock remote fallback-send operation.
#[derive(Default)]
pub struct MockFallbackSender {
    calls: Mutex<Vec<FallbackCall>>,
    failure: Mutex<Option<String>>,
}

impl MockFallbackSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_with(&self, message: &str) {
        *lock(&self.failure) = Some(message.to_string());
    }

    pub fn calls(&self) -> Vec<FallbackCall> {
        lock(&self.calls).clone()
    }
}

#[async_trait]
impl PluginAdapter for MockFallbackSender {
    fn name(&self) -> &str {
        "mock-fallback"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Fallback
    }

    async fn health_check(&self) -> Result<HealthStatus, OrderlinkError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), OrderlinkError> {
        Ok(())
    }
}

#[async_trait]
impl FallbackSender for MockFallbackSender {
    async fn send_fallback(&self, contractor: UserId, group: GroupId, text: &str) -> Result<(), OrderlinkError> {
        lock(&self.calls).push(FallbackCall {
            contractor,
            group,
            text: text.to_string(),
        });
        let failure = lock(&self.failure).clone();
        match failure {
            Some(message) => Err(OrderlinkError::Fallback { message }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn blocked_contractor_gets_forbidden() {
        let bot = MockNotifyChannel::new();
        bot.block(UserId(555));

        let err = bot.send_direct(UserId(555), "hi").await.unwrap_err();
        assert!(err.is_forbidden());
        assert!(bot.send_direct(UserId(556), "hi").await.is_ok());
        assert_eq!(bot.sent().len(), 1);
    }

    #[tokio::test]
    async fn fallback_sender_captures_and_fails_on_demand() {
        let sender = MockFallbackSender::new();
        sender.send_fallback(UserId(1), GroupId(-2), "x").await.unwrap();
        sender.fail_with("HTTP 500");
        assert!(sender.send_fallback(UserId(1), GroupId(-2), "y").await.is_err());
        assert_eq!(sender.calls().len(), 2);
    }
}
