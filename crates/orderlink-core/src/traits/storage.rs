// SPDX-FileCopyrightText: 2026 Orderlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter traits for the fallback tracking table.

use async_trait::async_trait;

use crate::error::OrderlinkError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{GroupId, MessageRef, PendingFallbackMessage, UserId};

/// Adapter for storage and persistence backends.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Opens the backend and applies pending migrations.
    async fn initialize(&self) -> Result<(), OrderlinkError>;

    /// Flushes pending writes and releases the connection.
    async fn close(&self) -> Result<(), OrderlinkError>;
}

/// Durable mapping from a (contractor, group) pair to an outstanding substitute message.
///
/// At most one live row exists per pair: [`put`](TrackingStore::put) supersedes
/// an existing row in the same transaction and hands it back to the caller.
#[async_trait]
pub trait TrackingStore: StorageAdapter {
    /// Inserts a pending row, returning the row it superseded, if any.
    async fn put(
        &self,
        contractor_id: UserId,
        group_id: GroupId,
        message_ref: MessageRef,
    ) -> Result<Option<PendingFallbackMessage>, OrderlinkError>;

    /// Returns the live row for the pair.
    async fn find(
        &self,
        contractor_id: UserId,
        group_id: GroupId,
    ) -> Result<Option<PendingFallbackMessage>, OrderlinkError>;

    /// Deletes a row by surrogate id. Removing an unknown id is not an error.
    async fn remove(&self, row_id: i64) -> Result<(), OrderlinkError>;

    /// Lists pending rows, newest first.
    async fn list_pending(&self, limit: u32) -> Result<Vec<PendingFallbackMessage>, OrderlinkError>;

    /// Marks the contractor as a current member of the group.
    async fn record_join(&self, contractor_id: UserId, group_id: GroupId)
    -> Result<(), OrderlinkError>;

    /// Forgets a previously recorded join (member left or was removed).
    async fn clear_join(&self, contractor_id: UserId, group_id: GroupId)
    -> Result<(), OrderlinkError>;

    async fn has_joined(&self, contractor_id: UserId, group_id: GroupId)
    -> Result<bool, OrderlinkError>;
}
