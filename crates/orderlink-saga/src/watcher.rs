// SPDX-FileCopyrightText: 2026 Orderlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Long-lived consumer of membership events.
//!
//! When a contractor joins a group, the substitute message sent on the bot's
//! behalf is no longer needed: the watcher deletes it from the contractor's
//! private chat and drops the tracking row.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use orderlink_core::types::{MembershipChange, MembershipEvent, MessageRef};
use orderlink_core::{GroupTransport, OrderlinkError, TrackingStore};

use crate::locks::PairLocks;
use crate::{SagaSettings, bounded, metrics};

/// What the watcher did with one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchOutcome {
    /// Join with nothing tracked for the pair.
    NoPending,
    /// The tracked message was handled and its row removed.
    Cleaned {
        message_ref: MessageRef,
        /// `false` when the delete call failed; the row is removed regardless.
        deleted: bool,
    },
    /// Leave or role change.
    Ignored,
}

pub struct MembershipWatcher {
    transport: Arc<dyn GroupTransport>,
    store: Arc<dyn TrackingStore>,
    locks: Arc<PairLocks>,
    settings: SagaSettings,
}

impl MembershipWatcher {
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

    /// Handles one event under the pair lock.
    pub async fn handle_event(&self, event: MembershipEvent) -> Result<WatchOutcome, OrderlinkError> {
        let MembershipEvent {
            group_id,
            user_id,
            change,
        } = event;

        match change {
            MembershipChange::Updated => return Ok(WatchOutcome::Ignored),
            MembershipChange::Left => {
                let _guard = self.locks.acquire(user_id, group_id).await;
                self.store.clear_join(user_id, group_id).await?;
                debug!(group_id = %group_id, user_id = %user_id, "member left");
                return Ok(WatchOutcome::Ignored);
            }
            MembershipChange::Joined => {}
        }

        let _guard = self.locks.acquire(user_id, group_id).await;
        self.store.record_join(user_id, group_id).await?;

        let Some(pending) = self.store.find(user_id, group_id).await? else {
            debug!(group_id = %group_id, user_id = %user_id, "join with no pending fallback message");
            return Ok(WatchOutcome::NoPending);
        };

        let deleted = match bounded(
            self.settings.call_timeout,
            self.transport
                .delete_private_messages(user_id, &[pending.message_ref]),
        )
        .await
        {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    group_id = %group_id,
                    user_id = %user_id,
                    message_id = %pending.message_ref,
                    error = %e,
                    "failed to delete fallback message"
                );
                false
            }
        };

        self.store.remove(pending.id).await?;
        metrics::record_fallback_cleaned();
        info!(
            group_id = %group_id,
            user_id = %user_id,
            message_id = %pending.message_ref,
            deleted,
            "fallback message cleaned up after join"
        );

        Ok(WatchOutcome::Cleaned {
            message_ref: pending.message_ref,
            deleted,
        })
    }

    /// Consumes events until the channel closes or `cancel` fires.
    ///
    /// Handler errors are logged and never stop the loop.
    pub async fn run(&self, mut events: mpsc::Receiver<MembershipEvent>, cancel: CancellationToken) {
        info!("membership watcher running");
        loop {
            tokio::select! {
                event = events.recv() => {
                    let Some(event) = event else {
                        info!("membership event stream closed");
                        break;
                    };
                    if let Err(e) = self.handle_event(event).await {
                        error!(
                            group_id = %event.group_id,
                            user_id = %event.user_id,
                            change = %event.change,
                            error = %e,
                            "failed to handle membership event"
                        );
                    }
                    self.locks.prune();
                }
                _ = cancel.cancelled() => {
                    info!("shutdown signal received, stopping membership watcher");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use orderlink_core::types::{GroupId, UserId};
    use orderlink_test_utils::{MockTransport, TransportCall, TransportOp, temp_store};

    use crate::tracker::FallbackTracker;

    const GROUP: GroupId = GroupId(-100123);
    const CONTRACTOR: UserId = UserId(555);

    struct Fixture {
        transport: Arc<MockTransport>,
        store: Arc<dyn TrackingStore>,
        watcher: Arc<MembershipWatcher>,
        tracker: Arc<FallbackTracker>,
        _dir: tempfile::TempDir,
    }

    async fn fixture() -> Fixture {
        let transport = Arc::new(MockTransport::new(GROUP));
        let (store, dir) = temp_store().await.unwrap();
        let store: Arc<dyn TrackingStore> = Arc::new(store);
        let locks = Arc::new(PairLocks::new());
        let settings = SagaSettings {
            call_timeout: Duration::from_millis(500),
            history_scan_limit: 50,
        };
        Fixture {
            watcher: Arc::new(MembershipWatcher::new(
                transport.clone(),
                store.clone(),
                locks.clone(),
                settings,
            )),
            tracker: Arc::new(FallbackTracker::new(
                transport.clone(),
                store.clone(),
                locks,
                settings,
            )),
            transport,
            store,
            _dir: dir,
        }
    }

    #[tokio::test]
    async fn join_deletes_pending_message_once() {
        let f = fixture().await;
        f.store.put(CONTRACTOR, GROUP, MessageRef(999)).await.unwrap();

        let first = f
            .watcher
            .handle_event(MembershipEvent::joined(GROUP, CONTRACTOR))
            .await
            .unwrap();
        let second = f
            .watcher
            .handle_event(MembershipEvent::joined(GROUP, CONTRACTOR))
            .await
            .unwrap();

        assert_eq!(
            first,
            WatchOutcome::Cleaned {
                message_ref: MessageRef(999),
                deleted: true
            }
        );
        assert_eq!(second, WatchOutcome::NoPending);
        assert_eq!(
            f.transport.calls_of(TransportOp::DeletePrivateMessages),
            vec![TransportCall::DeletePrivateMessages {
                user: CONTRACTOR,
                messages: vec![MessageRef(999)]
            }]
        );
        assert!(f.store.find(CONTRACTOR, GROUP).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn failed_delete_still_removes_row() {
        let f = fixture().await;
        f.store.put(CONTRACTOR, GROUP, MessageRef(999)).await.unwrap();
        f.transport
            .fail(TransportOp::DeletePrivateMessages, "MESSAGE_DELETE_FORBIDDEN");

        let outcome = f
            .watcher
            .handle_event(MembershipEvent::joined(GROUP, CONTRACTOR))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            WatchOutcome::Cleaned {
                message_ref: MessageRef(999),
                deleted: false
            }
        );
        assert!(f.store.find(CONTRACTOR, GROUP).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn other_pairs_are_untouched() {
        let f = fixture().await;
        f.store.put(CONTRACTOR, GROUP, MessageRef(1)).await.unwrap();
        f.store.put(CONTRACTOR, GroupId(-100999), MessageRef(2)).await.unwrap();

        f.watcher
            .handle_event(MembershipEvent::joined(GROUP, CONTRACTOR))
            .await
            .unwrap();

        assert!(f.store.find(CONTRACTOR, GroupId(-100999)).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn leave_clears_join_marker_and_updates_are_ignored() {
        let f = fixture().await;
        f.watcher
            .handle_event(MembershipEvent::joined(GROUP, CONTRACTOR))
            .await
            .unwrap();
        assert!(f.store.has_joined(CONTRACTOR, GROUP).await.unwrap());

        let updated = MembershipEvent {
            change: MembershipChange::Updated,
            ..MembershipEvent::joined(GROUP, CONTRACTOR)
        };
        assert_eq!(f.watcher.handle_event(updated).await.unwrap(), WatchOutcome::Ignored);
        assert!(f.store.has_joined(CONTRACTOR, GROUP).await.unwrap());

        let left = MembershipEvent {
            change: MembershipChange::Left,
            ..MembershipEvent::joined(GROUP, CONTRACTOR)
        };
        assert_eq!(f.watcher.handle_event(left).await.unwrap(), WatchOutcome::Ignored);
        assert!(!f.store.has_joined(CONTRACTOR, GROUP).await.unwrap());
    }

    #[tokio::test]
    async fn fallback_after_join_leaves_no_orphan() {
        let f = fixture().await;
        f.watcher
            .handle_event(MembershipEvent::joined(GROUP, CONTRACTOR))
            .await
            .unwrap();

        f.tracker.send_and_track(CONTRACTOR, GROUP, "late").await.unwrap();

        assert!(f.store.find(CONTRACTOR, GROUP).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn join_during_send_waits_and_cleans_up() {
        let f = fixture().await;
        f.transport.set_send_delay(Duration::from_millis(100));

        let send = {
            let tracker = f.tracker.clone();
            tokio::spawn(async move { tracker.send_and_track(CONTRACTOR, GROUP, "racy").await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        let outcome = f
            .watcher
            .handle_event(MembershipEvent::joined(GROUP, CONTRACTOR))
            .await
            .unwrap();
        let message = send.await.unwrap().unwrap();

        assert_eq!(
            outcome,
            WatchOutcome::Cleaned {
                message_ref: message,
                deleted: true
            }
        );
        assert!(f.store.find(CONTRACTOR, GROUP).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn concurrent_sends_and_joins_leave_no_duplicates() {
        let f = fixture().await;
        let mut handles = Vec::new();
        for i in 0..8 {
            let tracker = f.tracker.clone();
            handles.push(tokio::spawn(async move {
                tracker
                    .send_and_track(CONTRACTOR, GROUP, &format!("msg {i}"))
                    .await
                    .map(|_| ())
            }));
        }
        for _ in 0..3 {
            let watcher = f.watcher.clone();
            handles.push(tokio::spawn(async move {
                watcher
                    .handle_event(MembershipEvent::joined(GROUP, CONTRACTOR))
                    .await
                    .map(|_| ())
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert!(f.store.list_pending(100).await.unwrap().len() <= 1);
        // Every tracked message was deleted exactly once.
        let mut deleted: Vec<MessageRef> = f
            .transport
            .calls_of(TransportOp::DeletePrivateMessages)
            .into_iter()
            .flat_map(|c| match c {
                TransportCall::DeletePrivateMessages { messages, .. } => messages,
                _ => Vec::new(),
            })
            .collect();
        let total = deleted.len();
        deleted.sort_by_key(|m| m.0);
        deleted.dedup();
        assert_eq!(deleted.len(), total);
    }

    #[tokio::test]
    async fn run_cleans_up_and_stops_on_cancel() {
        let f = fixture().await;
        let events = f.transport.subscribe_membership().unwrap();
        let cancel = CancellationToken::new();
        f.store.put(CONTRACTOR, GROUP, MessageRef(999)).await.unwrap();

        let task = {
            let watcher = f.watcher.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { watcher.run(events, cancel).await })
        };

        f.transport.emit(MembershipEvent::joined(GROUP, CONTRACTOR)).await;
        tokio::time::timeout(Duration::from_secs(2), async {
            while f.store.find(CONTRACTOR, GROUP).await.unwrap().is_some() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("row should be cleaned by the running watcher");

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("watcher should stop on cancel")
            .unwrap();
    }
}
