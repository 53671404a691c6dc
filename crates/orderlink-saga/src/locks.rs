// SPDX-FileCopyrightText: 2026 Orderlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-(contractor, group) async locks.
//!
//! Every writer of a tracking row takes the pair lock first, so a join can
//! never interleave with the send-then-record sequence for the same pair.

use std::sync::Arc;

use dashmap::DashMap;
use orderlink_core::types::{GroupId, UserId};
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Lock table shared (via `Arc`) by every writer of the tracking rows.
#[derive(Debug, Default)]
pub struct PairLocks {
    locks: DashMap<(UserId, GroupId), Arc<Mutex<()>>>,
}

impl PairLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for and returns the lock for the pair.
    pub async fn acquire(&self, contractor: UserId, group: GroupId) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry((contractor, group))
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    /// Drops entries nobody is holding or waiting on.
    pub fn prune(&self) {
        self.locks.retain(|_, lock| Arc::strong_count(lock) > 1);
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
