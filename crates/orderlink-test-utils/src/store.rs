// SPDX-FileCopyrightText: 2026 Orderlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Temp-dir backed tracking store.

use orderlink_config::model::StorageConfig;
use orderlink_core::{OrderlinkError, StorageAdapter};
use orderlink_storage::SqliteTrackingStore;

/// Opens an initialized store in a fresh temp dir.
///
/// Keep the returned `TempDir` alive for as long as the store is used.
pub async fn temp_store() -> Result<(SqliteTrackingStore, tempfile::TempDir), OrderlinkError> {
    let dir = tempfile::TempDir::new().map_err(|e| OrderlinkError::Storage { source: e.into() })?;
    let path = dir.path().join("tracking.db");
    let store = SqliteTrackingStore::new(StorageConfig {
        database_path: path.to_string_lossy().into_owned(),
        wal_mode: true,
    });
    store.initialize().await?;
    Ok((store, dir))
}
