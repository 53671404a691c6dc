// SPDX-FileCopyrightText: 2026 Orderlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Operations on pending fallback messages.

use orderlink_core::types::{GroupId, MessageRef, PendingFallbackMessage, UserId};
use orderlink_core::OrderlinkError;
use rusqlite::{OptionalExtension, params};

use crate::database::Database;

const COLUMNS: &str = "id, contractor_id, group_id, message_id, created_at";

fn row_to_pending(row: &rusqlite::Row<'_>) -> rusqlite::Result<PendingFallbackMessage> {
    Ok(PendingFallbackMessage {
        id: row.get(0)?,
        contractor_id: UserId(row.get(1)?),
        group_id: GroupId(row.get(2)?),
        message_ref: MessageRef(row.get(3)?),
        created_at: row.get(4)?,
    })
}

/// Inserts a row for the pair, replacing any existing one.
///
/// The lookup, delete and insert run in one transaction. The superseded row is
/// returned so the caller can retract the message it points to.
pub async fn put(
    db: &Database,
    contractor_id: UserId,
    group_id: GroupId,
    message_ref: MessageRef,
) -> Result<Option<PendingFallbackMessage>, OrderlinkError> {
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let previous = tx
                .query_row(
                    &format!(
                        "SELECT {COLUMNS} FROM fallback_messages \
                         WHERE contractor_id = ?1 AND group_id = ?2"
                    ),
                    params![contractor_id.0, group_id.0],
                    row_to_pending,
                )
                .optional()?;
            if let Some(prev) = &previous {
                tx.execute(
                    "DELETE FROM fallback_messages WHERE id = ?1",
                    params![prev.id],
                )?;
            }
            tx.execute(
                "INSERT INTO fallback_messages (contractor_id, group_id, message_id) \
                 VALUES (?1, ?2, ?3)",
                params![contractor_id.0, group_id.0, message_ref.0],
            )?;
            tx.commit()?;
            Ok(previous)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Returns the live row for the pair, if any.
pub async fn find(
    db: &Database,
    contractor_id: UserId,
    group_id: GroupId,
) -> Result<Option<PendingFallbackMessage>, OrderlinkError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!(
                    "SELECT {COLUMNS} FROM fallback_messages \
                     WHERE contractor_id = ?1 AND group_id = ?2"
                ),
                params![contractor_id.0, group_id.0],
                row_to_pending,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Deletes a row by id. Unknown ids are a no-op.
pub async fn remove(db: &Database, id: i64) -> Result<(), OrderlinkError> {
    db.connection()
        .call(move |conn| {
            conn.execute("DELETE FROM fallback_messages WHERE id = ?1", params![id])?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Lists pending rows, newest first.
pub async fn list(db: &Database, limit: u32) -> Result<Vec<PendingFallbackMessage>, OrderlinkError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM fallback_messages ORDER BY id DESC LIMIT ?1"
            ))?;
            let rows = stmt.query_map(params![limit], row_to_pending)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn test_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fallback.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn put_then_find_returns_row() {
        let (db, _dir) = test_db().await;
        let prev = put(&db, UserId(1), GroupId(-100), MessageRef(10)).await.unwrap();
        assert!(prev.is_none());

        let row = find(&db, UserId(1), GroupId(-100)).await.unwrap().unwrap();
        assert_eq!(row.message_ref, MessageRef(10));
        assert!(row.created_at.ends_with('Z'));
    }

    #[tokio::test]
    async fn second_put_supersedes_first() {
        let (db, _dir) = test_db().await;
        put(&db, UserId(1), GroupId(-100), MessageRef(10)).await.unwrap();
        let prev = put(&db, UserId(1), GroupId(-100), MessageRef(11))
            .await
            .unwrap()
            .expect("first row is returned");
        assert_eq!(prev.message_ref, MessageRef(10));

        let rows = list(&db, 10).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].message_ref, MessageRef(11));
    }

    #[tokio::test]
    async fn pairs_are_independent() {
        let (db, _dir) = test_db().await;
        put(&db, UserId(1), GroupId(-100), MessageRef(10)).await.unwrap();
        put(&db, UserId(1), GroupId(-200), MessageRef(20)).await.unwrap();
        put(&db, UserId(2), GroupId(-100), MessageRef(30)).await.unwrap();

        assert_eq!(list(&db, 10).await.unwrap().len(), 3);
        assert!(find(&db, UserId(2), GroupId(-200)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let (db, _dir) = test_db().await;
        put(&db, UserId(1), GroupId(-100), MessageRef(10)).await.unwrap();
        let row = find(&db, UserId(1), GroupId(-100)).await.unwrap().unwrap();

        remove(&db, row.id).await.unwrap();
        remove(&db, row.id).await.unwrap();
        assert!(find(&db, UserId(1), GroupId(-100)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_is_newest_first_and_limited() {
        let (db, _dir) = test_db().await;
        for i in 0..5 {
            put(&db, UserId(i), GroupId(-100), MessageRef(i)).await.unwrap();
        }
        let rows = list(&db, 2).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].contractor_id, UserId(4));
        assert_eq!(rows[1].contractor_id, UserId(3));
    }
}
