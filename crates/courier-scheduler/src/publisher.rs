// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Producer side of the group subject.

use std::sync::Arc;

use courier_core::{
    ActivationWindow, BrokerAdapter, Campaign, CampaignDraft, CourierError, StorageAdapter,
};
use tracing::{error, info};

/// Stores new campaigns and announces them for dispatch.
pub struct CampaignPublisher {
    storage: Arc<dyn StorageAdapter>,
    broker: Arc<dyn BrokerAdapter>,
    group_subject: String,
}

impl CampaignPublisher {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        broker: Arc<dyn BrokerAdapter>,
        group_subject: impl Into<String>,
    ) -> Self {
        Self {
            storage,
            broker,
            group_subject: group_subject.into(),
        }
    }

    /// Persists `draft` and publishes the stored campaign on the group subject.
    ///
    /// Both windows are validated before anything is written. If the publish
    /// fails the campaign row stays, and [`CampaignPublisher::announce`] can
    /// be retried for it.
    pub async fn publish(&self, draft: &CampaignDraft) -> Result<Campaign, CourierError> {
        ActivationWindow::new(draft.dispatch_start, draft.dispatch_end)?;
        ActivationWindow::new(draft.eligibility_start, draft.eligibility_end)?;
        let campaign = self.storage.create_campaign(draft).await?;
        if let Err(e) = self.announce(&campaign).await {
            error!(campaign_id = campaign.id, error = %e, "campaign stored but not announced");
            return Err(e);
        }
        Ok(campaign)
    }

    /// Publishes an existing campaign on the group subject.
    pub async fn announce(&self, campaign: &Campaign) -> Result<(), CourierError> {
        let payload = serde_json::to_vec(campaign).map_err(|source| CourierError::Codec {
            subject: self.group_subject.clone(),
            source,
        })?;
        self.broker.publish(&self.group_subject, payload).await?;
        info!(
            campaign_id = campaign.id,
            subject = %self.group_subject,
            opens_at = %campaign.dispatch_start,
            "campaign announced"
        );
        Ok(())
    }
}
