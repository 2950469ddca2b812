// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests of the SQLite adapter through the StorageAdapter trait.

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use courier_config::model::StorageConfig;
use courier_core::{
    CampaignDraft, FilterChoice, ManualClock, NewDeliveryRecord, RecipientDraft, StorageAdapter,
};
use courier_storage::SqliteStorage;
use tempfile::tempdir;

#[tokio::test]
async fn delivery_log_lifecycle() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("lifecycle.db");
    let now = Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap();
    let clock = ManualClock::new(now);
    let storage = SqliteStorage::with_clock(
        StorageConfig {
            database_path: db_path.to_string_lossy().into_owned(),
            wal_mode: true,
        },
        Arc::new(clock.clone()),
    );
    storage.initialize().await.unwrap();

    let campaign = storage
        .create_campaign(&CampaignDraft {
            message_text: "Flash sale".into(),
            operator_code: "999".into(),
            tag: String::new(),
            filter_choice: FilterChoice::Operator,
            dispatch_start: now,
            dispatch_end: now + Duration::hours(6),
            eligibility_start: now,
            eligibility_end: now + Duration::hours(6),
        })
        .await
        .unwrap();

    let recipient = storage
        .create_recipient(&RecipientDraft {
            phone: 79_990_000_000,
            operator_code: "999".into(),
            tag: String::new(),
            utc_offset: 0,
        })
        .await
        .unwrap();

    let audience = storage
        .recipients_by_filter(FilterChoice::Operator, "999")
        .await
        .unwrap();
    assert_eq!(audience, vec![recipient.clone()]);

    let failed = storage
        .create_delivery_record(&NewDeliveryRecord {
            attempt: 0,
            delivered: false,
            campaign_id: campaign.id,
            recipient_id: recipient.id,
        })
        .await
        .unwrap();
    assert_eq!(failed.created_at, now);

    clock.advance(Duration::minutes(15));
    storage
        .create_delivery_record(&NewDeliveryRecord {
            attempt: 1,
            delivered: true,
            campaign_id: campaign.id,
            recipient_id: recipient.id,
        })
        .await
        .unwrap();

    let stats = storage.campaign_stats(campaign.id).await.unwrap();
    assert_eq!((stats.succeeded, stats.failed), (1, 1));
    assert_eq!(stats.last_attempt_at, Some(now + Duration::minutes(15)));
    assert_eq!(
        storage.delivered_recipient_ids(campaign.id).await.unwrap(),
        vec![recipient.id]
    );

    storage.delete_campaign(campaign.id).await.unwrap();
    assert!(storage.get_campaign(campaign.id).await.unwrap().is_none());
    assert!(storage.all_campaign_stats().await.unwrap().is_empty());

    storage.close().await.unwrap();
}
