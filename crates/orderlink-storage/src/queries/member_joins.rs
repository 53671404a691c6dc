// SPDX-FileCopyrightText: 2026 Orderlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Join markers for (contractor, group) pairs.

use orderlink_core::types::{GroupId, UserId};
use orderlink_core::OrderlinkError;
use rusqlite::params;

use crate::database::Database;

pub async fn record(db: &Database, contractor_id: UserId, group_id: GroupId) -> Result<(), OrderlinkError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO member_joins (contractor_id, group_id) VALUES (?1, ?2)",
                params![contractor_id.0, group_id.0],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn clear(db: &Database, contractor_id: UserId, group_id: GroupId) -> Result<(), OrderlinkError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "DELETE FROM member_joins WHERE contractor_id = ?1 AND group_id = ?2",
                params![contractor_id.0, group_id.0],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn exists(db: &Database, contractor_id: UserId, group_id: GroupId) -> Result<bool, OrderlinkError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM member_joins WHERE contractor_id = ?1 AND group_id = ?2)",
                params![contractor_id.0, group_id.0],
                |row| row.get::<_, bool>(0),
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn record_clear_round() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("joins.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();

        assert!(!exists(&db, UserId(5), GroupId(-1)).await.unwrap());
        record(&db, UserId(5), GroupId(-1)).await.unwrap();
        record(&db, UserId(5), GroupId(-1)).await.unwrap();
        assert!(exists(&db, UserId(5), GroupId(-1)).await.unwrap());
        assert!(!exists(&db, UserId(5), GroupId(-2)).await.unwrap());

        clear(&db, UserId(5), GroupId(-1)).await.unwrap();
        assert!(!exists(&db, UserId(5), GroupId(-1)).await.unwrap());
    }
}
