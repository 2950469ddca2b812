// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recipient CRUD operations and audience selection.

use courier_core::{CourierError, FilterChoice, Recipient, RecipientDraft};
use rusqlite::{Row, params};

use crate::database::{Database, map_tr_err};

fn recipient_from_row(row: &Row<'_>) -> rusqlite::Result<Recipient> {
    Ok(Recipient {
        id: row.get(0)?,
        phone: row.get(1)?,
        operator_code: row.get(2)?,
        tag: row.get(3)?,
        utc_offset: row.get(4)?,
    })
}

fn invalid_offset(offset: i32) -> CourierError {
    CourierError::Storage {
        source: format!(
            "utc offset {offset} is outside [{}, {}]",
            courier_core::types::MIN_UTC_OFFSET,
            courier_core::types::MAX_UTC_OFFSET
        )
        .into(),
    }
}

pub async fn create_recipient(
    db: &Database,
    draft: &RecipientDraft,
) -> Result<Recipient, CourierError> {
    if !Recipient::offset_in_range(draft.utc_offset) {
        return Err(invalid_offset(draft.utc_offset));
    }
    let draft = draft.clone();
    db.connection()
        .call(move |conn| -> Result<Recipient, rusqlite::Error> {
            conn.execute(
                "INSERT INTO recipients (phone, operator_code, tag, utc_offset)
                 VALUES (?1, ?2, ?3, ?4)",
                params![draft.phone, draft.operator_code, draft.tag, draft.utc_offset],
            )?;
            Ok(draft.into_recipient(conn.last_insert_rowid()))
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_recipient(db: &Database, id: i64) -> Result<Option<Recipient>, CourierError> {
    db.connection()
        .call(move |conn| -> Result<Option<Recipient>, rusqlite::Error> {
            match conn.query_row(
                "SELECT id, phone, operator_code, tag, utc_offset FROM recipients WHERE id = ?1",
                params![id],
                recipient_from_row,
            ) {
                Ok(recipient) => Ok(Some(recipient)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Recipients whose operator code or tag (per `filter`) equals `value`.
pub async fn recipients_by_filter(
    db: &Database,
    filter: FilterChoice,
    value: &str,
) -> Result<Vec<Recipient>, CourierError> {
    let column = match filter {
        FilterChoice::Operator => "operator_code",
        FilterChoice::Tag => "tag",
    };
    let value = value.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<Recipient>, rusqlite::Error> {
            let sql = format!(
                "SELECT id, phone, operator_code, tag, utc_offset FROM recipients
                 WHERE {column} = ?1 ORDER BY id"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![value], recipient_from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn update_recipient(db: &Database, recipient: &Recipient) -> Result<(), CourierError> {
    if !Recipient::offset_in_range(recipient.utc_offset) {
        return Err(invalid_offset(recipient.utc_offset));
    }
    let recipient = recipient.clone();
    let id = recipient.id;
    let changed = db
        .connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute(
                "UPDATE recipients SET phone = ?2, operator_code = ?3, tag = ?4, utc_offset = ?5
                 WHERE id = ?1",
                params![
                    recipient.id,
                    recipient.phone,
                    recipient.operator_code,
                    recipient.tag,
                    recipient.utc_offset,
                ],
            )
        })
        .await
        .map_err(map_tr_err)?;
    if changed == 0 {
        return Err(CourierError::NotFound {
            entity: "recipient",
            id,
        });
    }
    Ok(())
}

pub async fn delete_recipient(db: &Database, id: i64) -> Result<(), CourierError> {
    let changed = db
        .connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute("DELETE FROM recipients WHERE id = ?1", params![id])
        })
        .await
        .map_err(map_tr_err)?;
    if changed == 0 {
        return Err(CourierError::NotFound {
            entity: "recipient",
            id,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn draft(phone: i64, operator: &str, tag: &str) -> RecipientDraft {
        RecipientDraft {
            phone,
            operator_code: operator.into(),
            tag: tag.into(),
            utc_offset: 12,
        }
    }

    #[tokio::test]
    async fn filter_selects_by_column() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("recipients.db");
        let db = Database::open(path.to_str().unwrap(), true).await.unwrap();

        let a = create_recipient(&db, &draft(79_000_000_001, "900", "gold")).await.unwrap();
        let b = create_recipient(&db, &draft(79_000_000_002, "916", "gold")).await.unwrap();
        create_recipient(&db, &draft(79_000_000_003, "900", "silver")).await.unwrap();

        let gold = recipients_by_filter(&db, FilterChoice::Tag, "gold").await.unwrap();
        assert_eq!(gold, vec![a.clone(), b]);

        let op = recipients_by_filter(&db, FilterChoice::Operator, "900").await.unwrap();
        assert_eq!(op.len(), 2);
        assert_eq!(op[0], a);
    }

    #[tokio::test]
    async fn offset_out_of_range_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("offset.db");
        let db = Database::open(path.to_str().unwrap(), true).await.unwrap();

        let mut bad = draft(1, "900", "x");
        bad.utc_offset = 57;
        assert!(create_recipient(&db, &bad).await.is_err());
    }

    #[tokio::test]
    async fn update_get_delete_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("crud.db");
        let db = Database::open(path.to_str().unwrap(), true).await.unwrap();

        let mut r = create_recipient(&db, &draft(5, "900", "x")).await.unwrap();
        r.utc_offset = -48;
        update_recipient(&db, &r).await.unwrap();
        assert_eq!(get_recipient(&db, r.id).await.unwrap(), Some(r.clone()));

        delete_recipient(&db, r.id).await.unwrap();
        assert_eq!(get_recipient(&db, r.id).await.unwrap(), None);
        assert!(matches!(
            delete_recipient(&db, r.id).await.unwrap_err(),
            CourierError::NotFound { entity: "recipient", .. }
        ));
    }
}
