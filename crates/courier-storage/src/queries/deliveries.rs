// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery record appends and per-campaign aggregation.

use chrono::{DateTime, Utc};
use courier_core::{CampaignStats, CourierError, DeliveryRecord, NewDeliveryRecord};
use rusqlite::{Row, params};

use crate::database::{Database, map_tr_err};

const STATS_SQL: &str = "SELECT MIN(created_at), MAX(created_at),
            COALESCE(SUM(delivered), 0), COALESCE(SUM(1 - delivered), 0)
     FROM delivery_records WHERE campaign_id = ?1";

fn stats_from_row(campaign_id: i64, row: &Row<'_>) -> rusqlite::Result<CampaignStats> {
    let succeeded: i64 = row.get(2)?;
    let failed: i64 = row.get(3)?;
    Ok(CampaignStats {
        campaign_id,
        first_attempt_at: row.get(0)?,
        last_attempt_at: row.get(1)?,
        succeeded: succeeded.max(0) as u64,
        failed: failed.max(0) as u64,
    })
}

/// Append a delivery record stamped with `created_at`.
pub async fn create_delivery_record(
    db: &Database,
    record: &NewDeliveryRecord,
    created_at: DateTime<Utc>,
) -> Result<DeliveryRecord, CourierError> {
    let record = *record;
    db.connection()
        .call(move |conn| -> Result<DeliveryRecord, rusqlite::Error> {
            conn.execute(
                "INSERT INTO delivery_records (created_at, attempt, delivered, campaign_id, recipient_id)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    created_at,
                    record.attempt,
                    record.delivered,
                    record.campaign_id,
                    record.recipient_id,
                ],
            )?;
            Ok(DeliveryRecord {
                id: conn.last_insert_rowid(),
                created_at,
                attempt: record.attempt,
                delivered: record.delivered,
                campaign_id: record.campaign_id,
                recipient_id: record.recipient_id,
            })
        })
        .await
        .map_err(map_tr_err)
}

/// Delivery records of one campaign in insertion order.
pub async fn list_delivery_records(
    db: &Database,
    campaign_id: i64,
) -> Result<Vec<DeliveryRecord>, CourierError> {
    db.connection()
        .call(move |conn| -> Result<Vec<DeliveryRecord>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT id, created_at, attempt, delivered, campaign_id, recipient_id
                 FROM delivery_records WHERE campaign_id = ?1 ORDER BY id",
            )?;
            let rows = stmt.query_map(params![campaign_id], |row| {
                Ok(DeliveryRecord {
                    id: row.get(0)?,
                    created_at: row.get(1)?,
                    attempt: row.get(2)?,
                    delivered: row.get(3)?,
                    campaign_id: row.get(4)?,
                    recipient_id: row.get(5)?,
                })
            })?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Ids of recipients that already hold a successful record for the campaign.
pub async fn delivered_recipient_ids(
    db: &Database,
    campaign_id: i64,
) -> Result<Vec<i64>, CourierError> {
    db.connection()
        .call(move |conn| -> Result<Vec<i64>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT DISTINCT recipient_id FROM delivery_records
                 WHERE campaign_id = ?1 AND delivered = 1 ORDER BY recipient_id",
            )?;
            let rows = stmt.query_map(params![campaign_id], |row| row.get(0))?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn campaign_stats(db: &Database, campaign_id: i64) -> Result<CampaignStats, CourierError> {
    db.connection()
        .call(move |conn| -> Result<CampaignStats, rusqlite::Error> {
            conn.query_row(STATS_SQL, params![campaign_id], |row| {
                stats_from_row(campaign_id, row)
            })
        })
        .await
        .map_err(map_tr_err)
}

/// Stats for every campaign, including campaigns with no records yet.
pub async fn all_campaign_stats(db: &Database) -> Result<Vec<CampaignStats>, CourierError> {
    db.connection()
        .call(|conn| -> Result<Vec<CampaignStats>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT MIN(d.created_at), MAX(d.created_at),
                        COALESCE(SUM(d.delivered), 0), COALESCE(SUM(1 - d.delivered), 0), c.id
                 FROM campaigns c LEFT JOIN delivery_records d ON d.campaign_id = c.id
                 GROUP BY c.id ORDER BY c.id",
            )?;
            let rows = stmt.query_map([], |row| {
                let campaign_id: i64 = row.get(4)?;
                stats_from_row(campaign_id, row)
            })?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use courier_core::{CampaignDraft, FilterChoice, RecipientDraft};
    use tempfile::tempdir;

    use crate::queries::{campaigns, recipients};

    async fn seeded(dir: &tempfile::TempDir) -> (Database, i64, Vec<i64>) {
        let path = dir.path().join("deliveries.db");
        let db = Database::open(path.to_str().unwrap(), true).await.unwrap();
        let t = Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap();
        let campaign = campaigns::create_campaign(
            &db,
            &CampaignDraft {
                message_text: "hi".into(),
                operator_code: String::new(),
                tag: "t".into(),
                filter_choice: FilterChoice::Tag,
                dispatch_start: t,
                dispatch_end: t + Duration::days(1),
                eligibility_start: t,
                eligibility_end: t + Duration::days(1),
            },
        )
        .await
        .unwrap();
        let mut ids = Vec::new();
        for phone in 1..=3 {
            let r = recipients::create_recipient(
                &db,
                &RecipientDraft {
                    phone,
                    operator_code: String::new(),
                    tag: "t".into(),
                    utc_offset: 0,
                },
            )
            .await
            .unwrap();
            ids.push(r.id);
        }
        (db, campaign.id, ids)
    }

    fn record(campaign_id: i64, recipient_id: i64, attempt: u32, delivered: bool) -> NewDeliveryRecord {
        NewDeliveryRecord {
            attempt,
            delivered,
            campaign_id,
            recipient_id,
        }
    }

    #[tokio::test]
    async fn stats_aggregate_records() {
        let dir = tempdir().unwrap();
        let (db, cid, ids) = seeded(&dir).await;
        let t0 = Utc.with_ymd_and_hms(2026, 4, 1, 9, 0, 0).unwrap();

        create_delivery_record(&db, &record(cid, ids[0], 0, true), t0).await.unwrap();
        create_delivery_record(&db, &record(cid, ids[1], 0, false), t0 + Duration::seconds(1))
            .await
            .unwrap();
        create_delivery_record(&db, &record(cid, ids[1], 1, true), t0 + Duration::minutes(5))
            .await
            .unwrap();

        let stats = campaign_stats(&db, cid).await.unwrap();
        assert_eq!(stats.succeeded, 2);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.first_attempt_at, Some(t0));
        assert_eq!(stats.last_attempt_at, Some(t0 + Duration::minutes(5)));

        let delivered = delivered_recipient_ids(&db, cid).await.unwrap();
        assert_eq!(delivered, vec![ids[0], ids[1]]);

        let records = list_delivery_records(&db, cid).await.unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[2].attempt, 1);
    }

    #[tokio::test]
    async fn stats_of_untouched_campaign_are_empty() {
        let dir = tempdir().unwrap();
        let (db, cid, _) = seeded(&dir).await;
        assert_eq!(campaign_stats(&db, cid).await.unwrap(), CampaignStats::empty(cid));

        let all = all_campaign_stats(&db).await.unwrap();
        assert_eq!(all, vec![CampaignStats::empty(cid)]);
    }

    #[tokio::test]
    async fn deleting_campaign_cascades_to_records() {
        let dir = tempdir().unwrap();
        let (db, cid, ids) = seeded(&dir).await;
        create_delivery_record(&db, &record(cid, ids[2], 0, true), Utc::now()).await.unwrap();

        campaigns::delete_campaign(&db, cid).await.unwrap();
        assert!(list_delivery_records(&db, cid).await.unwrap().is_empty());
    }
}
