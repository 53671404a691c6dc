// SPDX-FileCopyrightText: 2026 Orderlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notify-bot side of the fallback saga.

use std::sync::Arc;

use tracing::{info, warn};

use orderlink_core::types::{DeliveryOutcome, GroupId, UserId};
use orderlink_core::{FallbackSender, NotifyChannel};

use crate::{SagaSettings, bounded, metrics};

/// Text of the new-order notification.
pub fn new_order_text(order_title: &str, group_link: &str) -> String {
    format!("У вас новый заказ: {order_title}.\nПодробности в чате: {group_link}")
}

/// Tries the notify bot first and falls back to the userbot only when the
/// contractor has blocked (or never started) the bot.
pub struct FallbackDeliveryRouter {
    notify: Arc<dyn NotifyChannel>,
    fallback: Arc<dyn FallbackSender>,
    settings: SagaSettings,
}

impl FallbackDeliveryRouter {
    pub fn new(
        notify: Arc<dyn NotifyChannel>,
        fallback: Arc<dyn FallbackSender>,
        settings: SagaSettings,
    ) -> Self {
        Self {
            notify,
            fallback,
            settings,
        }
    }

    pub async fn notify(&self, contractor: UserId, group: GroupId, text: &str) -> DeliveryOutcome {
        let limit = self.settings.call_timeout;
        let outcome = match bounded(limit, self.notify.send_direct(contractor, text)).await {
            Ok(message) => {
                info!(contractor_id = %contractor, message_id = %message, "notification delivered");
                DeliveryOutcome::Delivered
            }
            Err(e) if e.is_forbidden() => {
                info!(
                    contractor_id = %contractor,
                    group_id = %group,
                    reason = %e,
                    "direct delivery forbidden, using fallback"
                );
                match bounded(limit, self.fallback.send_fallback(contractor, group, text)).await {
                    Ok(()) => DeliveryOutcome::DeliveredViaFallback,
                    Err(e) => {
                        warn!(contractor_id = %contractor, group_id = %group, error = %e, "fallback delivery failed");
                        DeliveryOutcome::Failed(e.to_string())
                    }
                }
            }
            Err(e) => {
                warn!(contractor_id = %contractor, error = %e, "direct delivery failed");
                DeliveryOutcome::Failed(e.to_string())
            }
        };
        metrics::record_notify(outcome.result_code());
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use orderlink_test_utils::{FallbackCall, MockFallbackSender, MockNotifyChannel};

    fn router(
        notify: &Arc<MockNotifyChannel>,
        fallback: &Arc<MockFallbackSender>,
    ) -> FallbackDeliveryRouter {
        FallbackDeliveryRouter::new(
            notify.clone(),
            fallback.clone(),
            SagaSettings {
                call_timeout: Duration::from_millis(200),
                history_scan_limit: 50,
            },
        )
    }

    #[test]
    fn new_order_text_matches_template() {
        assert_eq!(
            new_order_text("TEST-ORDER", "https://t.me/x"),
            "У вас новый заказ: TEST-ORDER.\nПодробности в чате: https://t.me/x"
        );
    }

    #[tokio::test]
    async fn direct_delivery_skips_fallback() {
        let notify = Arc::new(MockNotifyChannel::new());
        let fallback = Arc::new(MockFallbackSender::new());

        let outcome = router(&notify, &fallback)
            .notify(UserId(555), GroupId(-100123), "hi")
            .await;

        assert_eq!(outcome, DeliveryOutcome::Delivered);
        assert_eq!(outcome.result_code(), "OK");
        assert!(fallback.calls().is_empty());
    }

    #[tokio::test]
    async fn forbidden_routes_to_fallback_once() {
        let notify = Arc::new(MockNotifyChannel::new());
        notify.block(UserId(555));
        let fallback = Arc::new(MockFallbackSender::new());
        let text = new_order_text("TEST-ORDER", "https://t.me/x");

        let outcome = router(&notify, &fallback)
            .notify(UserId(555), GroupId(-100123), &text)
            .await;

        assert_eq!(outcome.result_code(), "OK_FALLBACK");
        assert_eq!(
            fallback.calls(),
            vec![FallbackCall {
                contractor: UserId(555),
                group: GroupId(-100123),
                text: "У вас новый заказ: TEST-ORDER.\nПодробности в чате: https://t.me/x".into(),
            }]
        );
    }

    #[tokio::test]
    async fn other_direct_errors_do_not_fall_back() {
        let notify = Arc::new(MockNotifyChannel::new());
        notify.fail_with("chat not found");
        let fallback = Arc::new(MockFallbackSender::new());

        let outcome = router(&notify, &fallback)
            .notify(UserId(555), GroupId(-100123), "hi")
            .await;

        assert!(matches!(&outcome, DeliveryOutcome::Failed(reason) if reason.contains("chat not found")));
        assert!(fallback.calls().is_empty());
    }

    #[tokio::test]
    async fn failed_fallback_is_a_failure() {
        let notify = Arc::new(MockNotifyChannel::new());
        notify.block(UserId(555));
        let fallback = Arc::new(MockFallbackSender::new());
        fallback.fail_with("userbot returned HTTP 502");

        let outcome = router(&notify, &fallback)
            .notify(UserId(555), GroupId(-100123), "hi")
            .await;

        assert_eq!(outcome.result_code(), "ERROR");
        assert!(!outcome.is_delivered());
        assert_eq!(fallback.calls().len(), 1);
    }

    #[tokio::test]
    async fn hung_direct_send_times_out_without_fallback() {
        let notify = Arc::new(MockNotifyChannel::new());
        notify.hang();
        let fallback = Arc::new(MockFallbackSender::new());

        let outcome = router(&notify, &fallback)
            .notify(UserId(555), GroupId(-100123), "hi")
            .await;

        assert!(matches!(&outcome, DeliveryOutcome::Failed(reason) if reason.contains("timed out")));
        assert!(fallback.calls().is_empty());
    }
}
