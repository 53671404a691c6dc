// SPDX-FileCopyrightText: 2026 Orderlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adding and removing contractors from an existing group.

use std::sync::Arc;

use tracing::{info, warn};

use orderlink_core::types::{GroupId, UserId, UserRef};
use orderlink_core::{GroupTransport, OrderlinkError, TrackingStore};

use crate::locks::PairLocks;
use crate::{SagaSettings, bounded};

pub struct MembershipLifecycle {
    transport: Arc<dyn GroupTransport>,
    store: Arc<dyn TrackingStore>,
    locks: Arc<PairLocks>,
    settings: SagaSettings,
}

impl MembershipLifecycle {
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

    /// Removes a contractor so they can be re-invited later.
    ///
    /// Removal is a ban immediately followed by an unban. A failed ban skips
    /// the unban; a failed unban leaves the contractor banned. Both errors
    /// propagate to the caller. The pair lock is held throughout, so a join
    /// event for the same pair is handled before or after the removal.
    pub async fn remove_member(&self, group: GroupId, contractor: UserId) -> Result<(), OrderlinkError> {
        let _guard = self.locks.acquire(contractor, group).await;
        let limit = self.settings.call_timeout;

        if let Err(e) = bounded(limit, self.transport.ban_member(group, contractor)).await {
            warn!(group_id = %group, contractor_id = %contractor, error = %e, "ban failed");
            return Err(e);
        }
        if let Err(e) = bounded(limit, self.transport.unban_member(group, contractor)).await {
            warn!(
                group_id = %group,
                contractor_id = %contractor,
                error = %e,
                "unban failed, contractor remains banned"
            );
            return Err(e);
        }

        self.store.clear_join(contractor, group).await?;
        info!(group_id = %group, contractor_id = %contractor, "contractor removed");
        Ok(())
    }

    /// Adds one contractor. Adding a current member is not an error.
    pub async fn add_member(&self, group: GroupId, contractor: UserId) -> Result<(), OrderlinkError> {
        let users = [UserRef::from(contractor)];
        bounded(self.settings.call_timeout, self.transport.add_members(group, &users)).await?;
        info!(group_id = %group, contractor_id = %contractor, "contractor added");
        Ok(())
    }
}
