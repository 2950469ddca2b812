// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Consumer protocol behaviour against mock storage and delivery.

use std::collections::HashSet;

use chrono::Duration;
use courier_core::{
    BrokerAdapter, CourierError, FilterChoice, NewDeliveryRecord, PluginAdapter, Recipient,
    RetryEnvelope, StorageAdapter,
};
use courier_scheduler::{AbandonReason, RetryOutcome};
use courier_test_utils::TestHarness;
use courier_test_utils::fixtures::{campaign_draft, epoch, recipient_draft};
use proptest::prelude::*;

async fn seed(harness: &TestHarness, phones: &[i64]) -> Vec<Recipient> {
    let mut recipients = Vec::new();
    for phone in phones {
        recipients.push(harness.add_recipient(recipient_draft(*phone)).await.unwrap());
    }
    recipients
}

fn ids(recipients: &[Recipient]) -> Vec<i64> {
    recipients.iter().map(|r| r.id).collect()
}

#[tokio::test]
async fn eligibility_window_in_the_past_defers_everyone() {
    let harness = TestHarness::new();
    let mut draft = campaign_draft();
    draft.eligibility_start = epoch() - Duration::hours(5);
    draft.eligibility_end = epoch() - Duration::hours(2);
    let campaign = harness.storage.create_campaign(&draft).await.unwrap();
    let recipients = seed(&harness, &[79000000001, 79000000002, 79000000003]).await;

    let envelope = RetryEnvelope {
        campaign,
        recipients: recipients.clone(),
        attempt: 0,
    };
    let report = harness.protocol().consume_retry(&envelope).await.unwrap();

    assert_eq!(report.deferred, 3);
    assert_eq!(report.delivered, 0);
    assert_eq!(report.failed, 0);
    assert_eq!(report.reserved(), 3);
    assert_eq!(report.outcome, RetryOutcome::Republished { attempt: 1 });
    assert_eq!(harness.delivery.call_count().await, 0);
    assert!(harness.storage.records().await.is_empty());

    let envelopes = harness.retry_envelopes();
    assert_eq!(envelopes.len(), 1);
    assert_eq!(envelopes[0].attempt, 1);
    assert_eq!(envelopes[0].recipients, recipients);
}

#[tokio::test]
async fn open_window_and_healthy_api_delivers_to_all() {
    let harness = TestHarness::new();
    let campaign = harness
        .storage
        .create_campaign(&campaign_draft())
        .await
        .unwrap();
    seed(&harness, &[79000000001, 79000000002, 79000000003]).await;

    let report = harness.protocol().consume_fresh(&campaign).await.unwrap();

    assert_eq!(report.attempt, 0);
    assert_eq!(report.delivered, 3);
    assert_eq!(report.reserved(), 0);
    assert_eq!(report.outcome, RetryOutcome::Complete);
    assert_eq!(report.stats.succeeded, 3);
    assert_eq!(report.stats.failed, 0);
    assert_eq!(report.stats.first_attempt_at, Some(epoch()));

    let records = harness.storage.records().await;
    assert_eq!(records.len(), 3);
    assert!(records.iter().all(|r| r.delivered && r.attempt == 0));
    assert!(harness.retry_envelopes().is_empty());
}

#[tokio::test]
async fn failed_and_unreachable_recipients_are_reserved() {
    let harness = TestHarness::new();
    let campaign = harness
        .storage
        .create_campaign(&campaign_draft())
        .await
        .unwrap();
    let x = harness.add_recipient(recipient_draft(79000000001)).await.unwrap();
    let mut far = recipient_draft(79000000002);
    far.utc_offset = 56;
    let y = harness.add_recipient(far).await.unwrap();
    let z = harness.add_recipient(recipient_draft(79000000003)).await.unwrap();
    harness.delivery.fail_for(x.id).await;

    let envelope = RetryEnvelope {
        campaign: campaign.clone(),
        recipients: vec![x.clone(), y.clone(), z.clone()],
        attempt: 0,
    };
    let report = harness.protocol().consume_retry(&envelope).await.unwrap();

    assert_eq!(report.delivered, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.deferred, 1);
    assert_eq!(report.outcome, RetryOutcome::Republished { attempt: 1 });

    let x_records = harness.storage.records_for(campaign.id, x.id).await;
    assert_eq!(x_records.len(), 1);
    assert!(!x_records[0].delivered);
    assert_eq!(x_records[0].attempt, 1);
    assert!(harness.storage.records_for(campaign.id, y.id).await.is_empty());
    assert_eq!(harness.storage.records_for(campaign.id, z.id).await.len(), 1);

    let envelopes = harness.retry_envelopes();
    assert_eq!(envelopes.len(), 1);
    assert_eq!(envelopes[0].attempt, 1);
    assert_eq!(ids(&envelopes[0].recipients), vec![x.id, y.id]);
}

#[tokio::test]
async fn fresh_pass_republishes_with_counter_zero() {
    let harness = TestHarness::new();
    let campaign = harness
        .storage
        .create_campaign(&campaign_draft())
        .await
        .unwrap();
    let recipients = seed(&harness, &[79000000001]).await;
    harness.delivery.fail_for(recipients[0].id).await;

    let report = harness.protocol().consume_fresh(&campaign).await.unwrap();
    assert_eq!(report.outcome, RetryOutcome::Republished { attempt: 0 });

    let retry = harness.protocol().consume_retry(&harness.retry_envelopes()[0]).await.unwrap();
    assert_eq!(retry.attempt, 1);
    assert_eq!(retry.outcome, RetryOutcome::Republished { attempt: 1 });

    let attempts: Vec<u32> = harness.retry_envelopes().iter().map(|e| e.attempt).collect();
    assert_eq!(attempts, vec![0, 1]);
}

#[tokio::test]
async fn deleted_campaign_aborts_every_pass() {
    let harness = TestHarness::new();
    let campaign = harness
        .storage
        .create_campaign(&campaign_draft())
        .await
        .unwrap();
    let recipients = seed(&harness, &[79000000001]).await;
    harness.storage.delete_campaign(campaign.id).await.unwrap();

    let protocol = harness.protocol();
    let err = protocol.consume_fresh(&campaign).await.unwrap_err();
    assert!(err.is_campaign_deleted());

    let envelope = RetryEnvelope {
        campaign: campaign.clone(),
        recipients,
        attempt: 4,
    };
    for _ in 0..2 {
        let err = protocol.consume_retry(&envelope).await.unwrap_err();
        assert!(matches!(
            err,
            CourierError::CampaignDeleted { campaign_id } if campaign_id == campaign.id
        ));
    }

    assert_eq!(harness.delivery.call_count().await, 0);
    assert!(harness.retry_envelopes().is_empty());
}

#[tokio::test]
async fn retry_uses_the_stored_campaign() {
    let harness = TestHarness::new();
    let mut campaign = harness
        .storage
        .create_campaign(&campaign_draft())
        .await
        .unwrap();
    let recipients = seed(&harness, &[79000000001]).await;
    let envelope = RetryEnvelope {
        campaign: campaign.clone(),
        recipients,
        attempt: 0,
    };

    campaign.message_text = "Sale extended".into();
    harness.storage.update_campaign(&campaign).await.unwrap();

    harness.protocol().consume_retry(&envelope).await.unwrap();
    assert_eq!(harness.delivery.calls().await[0].text, "Sale extended");
}

#[tokio::test]
async fn chain_stops_at_attempt_ceiling() {
    let harness = TestHarness::builder().with_max_attempts(2).build();
    let campaign = harness
        .storage
        .create_campaign(&campaign_draft())
        .await
        .unwrap();
    let recipients = seed(&harness, &[79000000001]).await;
    harness.delivery.fail_for(recipients[0].id).await;

    let envelope = RetryEnvelope {
        campaign,
        recipients,
        attempt: 1,
    };
    let report = harness.protocol().consume_retry(&envelope).await.unwrap();

    assert_eq!(report.attempt, 2);
    assert_eq!(
        report.outcome,
        RetryOutcome::Abandoned {
            remaining: 1,
            reason: AbandonReason::AttemptsExhausted,
        }
    );
    assert!(harness.retry_envelopes().is_empty());
}

#[tokio::test]
async fn chain_stops_when_dispatch_window_has_closed() {
    let harness = TestHarness::new();
    let mut draft = campaign_draft();
    draft.dispatch_start = epoch() - Duration::hours(3);
    draft.dispatch_end = epoch() - Duration::hours(2);
    let campaign = harness.storage.create_campaign(&draft).await.unwrap();
    let recipients = seed(&harness, &[79000000001]).await;
    harness.delivery.fail_for(recipients[0].id).await;

    let envelope = RetryEnvelope {
        campaign,
        recipients,
        attempt: 0,
    };
    let report = harness.protocol().consume_retry(&envelope).await.unwrap();

    assert_eq!(
        report.outcome,
        RetryOutcome::Abandoned {
            remaining: 1,
            reason: AbandonReason::DispatchWindowClosed,
        }
    );
    assert!(harness.retry_envelopes().is_empty());
}

#[tokio::test]
async fn already_delivered_recipients_are_skipped() {
    let harness = TestHarness::new();
    let campaign = harness
        .storage
        .create_campaign(&campaign_draft())
        .await
        .unwrap();
    let recipients = seed(&harness, &[79000000001, 79000000002]).await;
    harness
        .storage
        .create_delivery_record(&NewDeliveryRecord {
            attempt: 0,
            delivered: true,
            campaign_id: campaign.id,
            recipient_id: recipients[0].id,
        })
        .await
        .unwrap();

    let envelope = RetryEnvelope {
        campaign,
        recipients: recipients.clone(),
        attempt: 0,
    };
    let report = harness.protocol().consume_retry(&envelope).await.unwrap();

    assert_eq!(report.skipped, 1);
    assert_eq!(report.delivered, 1);
    assert_eq!(harness.delivery.calls_for(recipients[0].id).await, 0);
    assert_eq!(harness.delivery.calls_for(recipients[1].id).await, 1);
}

#[tokio::test]
async fn tag_filter_selects_the_audience() {
    let harness = TestHarness::new();
    let mut draft = campaign_draft();
    draft.filter_choice = FilterChoice::Tag;
    draft.tag = "autumn".into();
    let campaign = harness.storage.create_campaign(&draft).await.unwrap();
    seed(&harness, &[79000000001]).await;
    let mut tagged = recipient_draft(79000000002);
    tagged.tag = "autumn".into();
    let tagged = harness.add_recipient(tagged).await.unwrap();

    let report = harness.protocol().consume_fresh(&campaign).await.unwrap();

    assert_eq!(report.delivered, 1);
    let calls = harness.delivery.calls().await;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].id, tagged.id);
    assert_eq!(calls[0].phone, 79000000002);
}

#[tokio::test]
async fn record_write_failure_does_not_abort_the_pass() {
    let harness = TestHarness::new();
    let campaign = harness
        .storage
        .create_campaign(&campaign_draft())
        .await
        .unwrap();
    seed(&harness, &[79000000001, 79000000002]).await;
    harness.storage.fail_record_writes(true);

    let report = harness.protocol().consume_fresh(&campaign).await.unwrap();

    assert_eq!(report.delivered, 2);
    assert_eq!(harness.delivery.call_count().await, 2);
    assert!(harness.storage.records().await.is_empty());
}

#[tokio::test]
async fn storage_read_failure_is_an_error() {
    let harness = TestHarness::new();
    let campaign = harness
        .storage
        .create_campaign(&campaign_draft())
        .await
        .unwrap();
    harness.storage.fail_reads(true);

    let err = harness.protocol().consume_fresh(&campaign).await.unwrap_err();
    assert!(matches!(err, CourierError::Storage { .. }));
    assert!(!err.is_campaign_deleted());
}

#[tokio::test]
async fn publish_failure_fails_the_pass_after_recording() {
    let harness = TestHarness::new();
    let campaign = harness
        .storage
        .create_campaign(&campaign_draft())
        .await
        .unwrap();
    let recipients = seed(&harness, &[79000000001, 79000000002]).await;
    harness.delivery.fail_for(recipients[1].id).await;
    harness.broker.shutdown().await.unwrap();

    let err = harness.protocol().consume_fresh(&campaign).await.unwrap_err();
    assert!(matches!(err, CourierError::Broker { .. }));

    // Progress made before the publish is kept, so a redelivery skips it.
    assert_eq!(
        harness
            .storage
            .delivered_recipient_ids(campaign.id)
            .await
            .unwrap(),
        vec![recipients[0].id]
    );
    assert!(
        harness
            .broker
            .publish(harness.pool_subject(), Vec::new())
            .await
            .is_err()
    );
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn partition_is_exhaustive_and_disjoint(
        audience in prop::collection::vec((-48i32..=56, any::<bool>()), 0..10),
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(async {
            let harness = TestHarness::new();
            let campaign = harness.storage.create_campaign(&campaign_draft()).await.unwrap();

            let mut recipients = Vec::new();
            for (i, (offset, fails)) in audience.iter().enumerate() {
                let mut draft = recipient_draft(79000000000 + i as i64);
                draft.utc_offset = *offset;
                let recipient = harness.add_recipient(draft).await.unwrap();
                if *fails {
                    harness.delivery.fail_for(recipient.id).await;
                }
                recipients.push(recipient);
            }

            let report = harness.protocol().consume_fresh(&campaign).await.unwrap();
            assert_eq!(report.delivered + report.failed + report.deferred, recipients.len());
            assert_eq!(harness.delivery.call_count().await, report.delivered + report.failed);

            let delivered: HashSet<i64> = harness
                .storage
                .delivered_recipient_ids(campaign.id)
                .await
                .unwrap()
                .into_iter()
                .collect();
            let reserve: Vec<i64> = harness
                .retry_envelopes()
                .first()
                .map(|e| ids(&e.recipients))
                .unwrap_or_default();

            assert_eq!(reserve.len(), report.reserved());
            assert!(reserve.iter().all(|id| !delivered.contains(id)));
            let expected: Vec<i64> = recipients
                .iter()
                .map(|r| r.id)
                .filter(|id| !delivered.contains(id))
                .collect();
            assert_eq!(reserve, expected);
        });
    }
}
