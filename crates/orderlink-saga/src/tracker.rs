// SPDX-FileCopyrightText: 2026 Orderlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Userbot side of the fallback saga: send a substitute message and record it.

use std::sync::Arc;

use tracing::{error, info, warn};

use orderlink_core::types::{GroupId, MessageRef, UserId};
use orderlink_core::{GroupTransport, OrderlinkError, TrackingStore};

use crate::locks::PairLocks;
use crate::{SagaSettings, bounded, metrics};

pub struct FallbackTracker {
    transport: Arc<dyn GroupTransport>,
    store: Arc<dyn TrackingStore>,
    locks: Arc<PairLocks>,
    settings: SagaSettings,
}

impl FallbackTracker {
    pub fn new(
        transport: Arc<dyn GroupTransport>,
        store: Arc<dyn TrackingStore>,
        locks: Arc<PairLocks>,
        settings: SagaSettings,
    ) -> Self {
        Self {
            transport,
            store,
            locks,
            settings,
        }
    }

    /// Sends `text` to the contractor from the userbot and tracks it for cleanup.
    ///
    /// When the contractor already joined the group the message is sent but
    /// not tracked, since no join event will come to clean it up. A newer
    /// message for the same pair supersedes the older one, which is deleted
    /// in the background so the caller only waits for the send.
    pub async fn send_and_track(
        &self,
        contractor: UserId,
        group: GroupId,
        text: &str,
    ) -> Result<MessageRef, OrderlinkError> {
        let _guard = self.locks.acquire(contractor, group).await;
        let limit = self.settings.call_timeout;

        if self.store.has_joined(contractor, group).await? {
            let message = bounded(limit, self.transport.send_private_message(contractor, text)).await?;
            info!(
                contractor_id = %contractor,
                group_id = %group,
                message_id = %message,
                "contractor already in group, fallback message sent untracked"
            );
            return Ok(message);
        }

        let message = bounded(limit, self.transport.send_private_message(contractor, text)).await?;

        let superseded = match self.store.put(contractor, group, message).await {
            Ok(superseded) => superseded,
            Err(e) => {
                error!(
                    contractor_id = %contractor,
                    group_id = %group,
                    message_id = %message,
                    error = %e,
                    "fallback message sent but not tracked"
                );
                return Err(e);
            }
        };
        metrics::record_fallback_tracked();
        info!(
            contractor_id = %contractor,
            group_id = %group,
            message_id = %message,
            "fallback message sent and tracked"
        );

        if let Some(old) = superseded {
            let transport = self.transport.clone();
            tokio::spawn(async move {
                let stale = [old.message_ref];
                let deleted = bounded(limit, transport.delete_private_messages(contractor, &stale)).await;
                if let Err(e) = deleted {
                    warn!(
                        contractor_id = %contractor,
                        group_id = %group,
                        message_id = %old.message_ref,
                        error = %e,
                        "failed to delete superseded fallback message"
                    );
                }
            });
        }

        Ok(message)
    }
}
