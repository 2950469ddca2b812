// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Consumer protocol: resolve the campaign, partition the audience, attempt
//! delivery, record outcomes and republish the remainder.
//!
//! The protocol keeps no state between invocations. Within one invocation
//! recipients are processed sequentially in the order they were resolved.

use std::collections::HashSet;
use std::sync::Arc;

use courier_core::{
    BrokerAdapter, Campaign, CampaignStats, Clock, CourierError, DeliveryAdapter,
    NewDeliveryRecord, Recipient, RetryEnvelope, SendRequest, StorageAdapter, WindowStatus,
};
use tracing::{debug, error, info, warn};

/// What happened to the recipients that were not delivered in this pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome {
    /// Nothing was left over.
    Complete,
    /// A retry envelope carrying `attempt` was published.
    Republished { attempt: u32 },
    /// The chain ended with recipients still undelivered.
    Abandoned { remaining: usize, reason: AbandonReason },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbandonReason {
    /// The next attempt would exceed the configured ceiling.
    AttemptsExhausted,
    /// The campaign's dispatch window has closed.
    DispatchWindowClosed,
}

/// Result of one protocol invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumeReport {
    pub stats: CampaignStats,
    /// Attempt counter used for this pass.
    pub attempt: u32,
    /// Recipients the delivery API accepted.
    pub delivered: usize,
    /// Recipients the delivery API rejected.
    pub failed: usize,
    /// Recipients outside the eligibility window.
    pub deferred: usize,
    /// Recipients skipped because an earlier pass already delivered to them.
    pub skipped: usize,
    pub outcome: RetryOutcome,
}

impl ConsumeReport {
    /// Size of the reserve set (failed plus deferred).
    pub fn reserved(&self) -> usize {
        self.failed + self.deferred
    }
}

/// Per-pass partition of the audience.
#[derive(Debug, Default)]
struct Partition {
    delivered: usize,
    failed: usize,
    deferred: usize,
    reserve: Vec<Recipient>,
}

/// Collaborators and limits of the protocol.
pub struct ConsumerProtocol {
    storage: Arc<dyn StorageAdapter>,
    delivery: Arc<dyn DeliveryAdapter>,
    broker: Arc<dyn BrokerAdapter>,
    pool_subject: String,
    clock: Arc<dyn Clock>,
    max_attempts: u32,
}

impl ConsumerProtocol {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        delivery: Arc<dyn DeliveryAdapter>,
        broker: Arc<dyn BrokerAdapter>,
        pool_subject: impl Into<String>,
        clock: Arc<dyn Clock>,
        max_attempts: u32,
    ) -> Self {
        Self {
            storage,
            delivery,
            broker,
            pool_subject: pool_subject.into(),
            clock,
            max_attempts,
        }
    }

    /// First pass of a campaign: attempt counter 0, audience from the filter.
    pub async fn consume_fresh(&self, campaign: &Campaign) -> Result<ConsumeReport, CourierError> {
        let campaign = self.resolve(campaign.id).await?;
        let recipients = self
            .storage
            .recipients_by_filter(campaign.filter_choice, campaign.filter_value())
            .await?;
        debug!(
            campaign_id = campaign.id,
            audience = recipients.len(),
            "resolved audience"
        );
        self.partition_and_attempt(&campaign, recipients, 0).await
    }

    /// Follow-up pass over an envelope's recipients with `attempt + 1`.
    pub async fn consume_retry(
        &self,
        envelope: &RetryEnvelope,
    ) -> Result<ConsumeReport, CourierError> {
        let campaign = self.resolve(envelope.campaign.id).await?;
        let attempt = envelope.attempt.saturating_add(1);
        self.partition_and_attempt(&campaign, envelope.recipients.clone(), attempt)
            .await
    }

    /// Re-reads the campaign so updates and deletions are honoured.
    async fn resolve(&self, campaign_id: i64) -> Result<Campaign, CourierError> {
        match self.storage.get_campaign(campaign_id).await? {
            Some(campaign) => Ok(campaign),
            None => Err(CourierError::CampaignDeleted { campaign_id }),
        }
    }

    async fn partition_and_attempt(
        &self,
        campaign: &Campaign,
        recipients: Vec<Recipient>,
        attempt: u32,
    ) -> Result<ConsumeReport, CourierError> {
        let already: HashSet<i64> = self
            .storage
            .delivered_recipient_ids(campaign.id)
            .await?
            .into_iter()
            .collect();
        let total = recipients.len();
        let pending: Vec<Recipient> = recipients
            .into_iter()
            .filter(|r| !already.contains(&r.id))
            .collect();
        let skipped = total - pending.len();
        if skipped > 0 {
            info!(campaign_id = campaign.id, skipped, "skipping already delivered recipients");
        }

        let eligibility = campaign.eligibility_window()?;
        let mut partition = Partition::default();

        for recipient in pending {
            if !recipient.is_reachable(self.clock.now(), &eligibility) {
                partition.deferred += 1;
                partition.reserve.push(recipient);
                continue;
            }

            let request = SendRequest::new(&recipient, &campaign.message_text);
            let delivered = match self.delivery.send(&request).await {
                Ok(()) => true,
                Err(e) => {
                    debug!(
                        campaign_id = campaign.id,
                        recipient_id = recipient.id,
                        error = %e,
                        "delivery failed"
                    );
                    false
                }
            };

            let record = NewDeliveryRecord {
                attempt,
                delivered,
                campaign_id: campaign.id,
                recipient_id: recipient.id,
            };
            if let Err(e) = self.storage.create_delivery_record(&record).await {
                error!(
                    campaign_id = campaign.id,
                    recipient_id = recipient.id,
                    error = %e,
                    "failed to persist delivery record"
                );
            }

            if delivered {
                partition.delivered += 1;
            } else {
                partition.failed += 1;
                partition.reserve.push(recipient);
            }
        }

        let outcome = self.republish(campaign, partition.reserve, attempt).await?;
        let stats = self.storage.campaign_stats(campaign.id).await?;

        Ok(ConsumeReport {
            stats,
            attempt,
            delivered: partition.delivered,
            failed: partition.failed,
            deferred: partition.deferred,
            skipped,
            outcome,
        })
    }

    async fn republish(
        &self,
        campaign: &Campaign,
        reserve: Vec<Recipient>,
        attempt: u32,
    ) -> Result<RetryOutcome, CourierError> {
        if reserve.is_empty() {
            return Ok(RetryOutcome::Complete);
        }

        let reason = if attempt >= self.max_attempts {
            Some(AbandonReason::AttemptsExhausted)
        } else if campaign.dispatch_window()?.evaluate(self.clock.now()) == WindowStatus::Expired {
            Some(AbandonReason::DispatchWindowClosed)
        } else {
            None
        };
        if let Some(reason) = reason {
            warn!(
                campaign_id = campaign.id,
                attempt,
                remaining = reserve.len(),
                ?reason,
                "retry chain abandoned"
            );
            return Ok(RetryOutcome::Abandoned {
                remaining: reserve.len(),
                reason,
            });
        }

        let envelope = RetryEnvelope {
            campaign: campaign.clone(),
            recipients: reserve,
            attempt,
        };
        let payload = serde_json::to_vec(&envelope).map_err(|source| CourierError::Codec {
            subject: self.pool_subject.clone(),
            source,
        })?;
        self.broker.publish(&self.pool_subject, payload).await?;
        debug!(
            campaign_id = campaign.id,
            attempt,
            recipients = envelope.recipients.len(),
            "retry envelope published"
        );
        Ok(RetryOutcome::Republished { attempt })
    }
}
