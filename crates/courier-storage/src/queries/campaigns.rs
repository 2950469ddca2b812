// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Campaign CRUD operations.

use std::str::FromStr;

use courier_core::{Campaign, CampaignDraft, CourierError, FilterChoice};
use rusqlite::{Row, params};

use crate::database::{Database, map_tr_err};

const CAMPAIGN_COLUMNS: &str = "id, message_text, operator_code, tag, filter_choice,
     dispatch_start, dispatch_end, eligibility_start, eligibility_end";

fn campaign_from_row(row: &Row<'_>) -> rusqlite::Result<Campaign> {
    let filter: String = row.get(4)?;
    let filter_choice = FilterChoice::from_str(&filter).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(Campaign {
        id: row.get(0)?,
        message_text: row.get(1)?,
        operator_code: row.get(2)?,
        tag: row.get(3)?,
        filter_choice,
        dispatch_start: row.get(5)?,
        dispatch_end: row.get(6)?,
        eligibility_start: row.get(7)?,
        eligibility_end: row.get(8)?,
    })
}

/// Insert a new campaign and return it with its assigned id.
pub async fn create_campaign(db: &Database, draft: &CampaignDraft) -> Result<Campaign, CourierError> {
    let draft = draft.clone();
    db.connection()
        .call(move |conn| -> Result<Campaign, rusqlite::Error> {
            conn.execute(
                "INSERT INTO campaigns (message_text, operator_code, tag, filter_choice,
                     dispatch_start, dispatch_end, eligibility_start, eligibility_end)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    draft.message_text,
                    draft.operator_code,
                    draft.tag,
                    draft.filter_choice.to_string(),
                    draft.dispatch_start,
                    draft.dispatch_end,
                    draft.eligibility_start,
                    draft.eligibility_end,
                ],
            )?;
            Ok(draft.into_campaign(conn.last_insert_rowid()))
        })
        .await
        .map_err(map_tr_err)
}

/// Get a campaign by id.
pub async fn get_campaign(db: &Database, id: i64) -> Result<Option<Campaign>, CourierError> {
    db.connection()
        .call(move |conn| -> Result<Option<Campaign>, rusqlite::Error> {
            let sql = format!("SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE id = ?1");
            match conn.query_row(&sql, params![id], campaign_from_row) {
                Ok(campaign) => Ok(Some(campaign)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// List all campaigns ordered by id.
pub async fn list_campaigns(db: &Database) -> Result<Vec<Campaign>, CourierError> {
    db.connection()
        .call(|conn| -> Result<Vec<Campaign>, rusqlite::Error> {
            let sql = format!("SELECT {CAMPAIGN_COLUMNS} FROM campaigns ORDER BY id");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([], campaign_from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Replace every field of an existing campaign.
pub async fn update_campaign(db: &Database, campaign: &Campaign) -> Result<(), CourierError> {
    let campaign = campaign.clone();
    let id = campaign.id;
    let changed = db
        .connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute(
                "UPDATE campaigns SET message_text = ?2, operator_code = ?3, tag = ?4,
                     filter_choice = ?5, dispatch_start = ?6, dispatch_end = ?7,
                     eligibility_start = ?8, eligibility_end = ?9
                 WHERE id = ?1",
                params![
                    campaign.id,
                    campaign.message_text,
                    campaign.operator_code,
                    campaign.tag,
                    campaign.filter_choice.to_string(),
                    campaign.dispatch_start,
                    campaign.dispatch_end,
                    campaign.eligibility_start,
                    campaign.eligibility_end,
                ],
            )
        })
        .await
        .map_err(map_tr_err)?;
    if changed == 0 {
        return Err(CourierError::NotFound {
            entity: "campaign",
            id,
        });
    }
    Ok(())
}

/// Delete a campaign. Its delivery records go with it.
pub async fn delete_campaign(db: &Database, id: i64) -> Result<(), CourierError> {
    let changed = db
        .connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute("DELETE FROM campaigns WHERE id = ?1", params![id])
        })
        .await
        .map_err(map_tr_err)?;
    if changed == 0 {
        return Err(CourierError::NotFound {
            entity: "campaign",
            id,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use tempfile::tempdir;

    fn draft() -> CampaignDraft {
        let start = Utc.with_ymd_and_hms(2026, 4, 1, 8, 0, 0).unwrap();
        CampaignDraft {
            message_text: "Weekend offer".into(),
            operator_code: "916".into(),
            tag: "vip".into(),
            filter_choice: FilterChoice::Operator,
            dispatch_start: start + Duration::nanoseconds(5),
            dispatch_end: start + Duration::days(2),
            eligibility_start: start,
            eligibility_end: start + Duration::hours(10),
        }
    }

    async fn open_db(dir: &tempfile::TempDir) -> Database {
        let path = dir.path().join("campaigns.db");
        Database::open(path.to_str().unwrap(), true).await.unwrap()
    }

    #[tokio::test]
    async fn create_then_get_preserves_fields() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir).await;

        let created = create_campaign(&db, &draft()).await.unwrap();
        assert!(created.id > 0);

        let fetched = get_campaign(&db, created.id).await.unwrap().unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn missing_campaign_is_none() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir).await;
        assert!(get_campaign(&db, 404).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_and_delete() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir).await;

        let mut campaign = create_campaign(&db, &draft()).await.unwrap();
        campaign.filter_choice = FilterChoice::Tag;
        campaign.message_text = "Changed".into();
        update_campaign(&db, &campaign).await.unwrap();
        assert_eq!(get_campaign(&db, campaign.id).await.unwrap().unwrap(), campaign);

        delete_campaign(&db, campaign.id).await.unwrap();
        assert!(list_campaigns(&db).await.unwrap().is_empty());

        let err = delete_campaign(&db, campaign.id).await.unwrap_err();
        assert!(matches!(err, CourierError::NotFound { entity: "campaign", .. }));
        let err = update_campaign(&db, &campaign).await.unwrap_err();
        assert!(matches!(err, CourierError::NotFound { .. }));
    }
}
