// SPDX-FileCopyrightText: 2026 Orderlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the TrackingStore trait.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use orderlink_config::model::StorageConfig;
use orderlink_core::types::{GroupId, MessageRef, PendingFallbackMessage, UserId};
use orderlink_core::{
    AdapterType, HealthStatus, OrderlinkError, PluginAdapter, StorageAdapter, TrackingStore,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed tracking store.
///
/// The database is opened on the first call to [`StorageAdapter::initialize`].
pub struct SqliteTrackingStore {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteTrackingStore {
    /// The database connection is not opened until [`initialize`] is called.
    ///
    /// [`initialize`]: StorageAdapter::initialize
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    fn db(&self) -> Result<&Database, OrderlinkError> {
        self.db.get().ok_or_else(|| OrderlinkError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteTrackingStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, OrderlinkError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.query_row("SELECT 1", [], |_| Ok(()))
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), OrderlinkError> {
        if let Some(db) = self.db.get() {
            db.checkpoint().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteTrackingStore {
    async fn initialize(&self) -> Result<(), OrderlinkError> {
        let db = Database::open_with(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| OrderlinkError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "tracking store initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), OrderlinkError> {
        self.db()?.checkpoint().await
    }
}

#[async_trait]
impl TrackingStore for SqliteTrackingStore {
    async fn put(
        &self,
        contractor_id: UserId,
        group_id: GroupId,
        message_ref: MessageRef,
    ) -> Result<Option<PendingFallbackMessage>, OrderlinkError> {
        queries::fallback_messages::put(self.db()?, contractor_id, group_id, message_ref).await
    }

    async fn find(
        &self,
        contractor_id: UserId,
        group_id: GroupId,
    ) -> Result<Option<PendingFallbackMessage>, OrderlinkError> {
        queries::fallback_messages::find(self.db()?, contractor_id, group_id).await
    }

    async fn remove(&self, row_id: i64) -> Result<(), OrderlinkError> {
        queries::fallback_messages::remove(self.db()?, row_id).await
    }

    async fn list_pending(&self, limit: u32) -> Result<Vec<PendingFallbackMessage>, OrderlinkError> {
        queries::fallback_messages::list(self.db()?, limit).await
    }

    async fn record_join(&self, contractor_id: UserId, group_id: GroupId) -> Result<(), OrderlinkError> {
        queries::member_joins::record(self.db()?, contractor_id, group_id).await
    }

    async fn clear_join(&self, contractor_id: UserId, group_id: GroupId) -> Result<(), OrderlinkError> {
        queries::member_joins::clear(self.db()?, contractor_id, group_id).await
    }

    async fn has_joined(&self, contractor_id: UserId, group_id: GroupId) -> Result<bool, OrderlinkError> {
        queries::member_joins::exists(self.db()?, contractor_id, group_id).await
    }
}
