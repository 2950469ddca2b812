// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for persistence backends (SQLite, etc.).

use async_trait::async_trait;

use crate::error::CourierError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    Campaign, CampaignDraft, CampaignStats, DeliveryRecord, FilterChoice, NewDeliveryRecord,
    Recipient, RecipientDraft,
};

/// Adapter for the campaign, recipient and delivery-record store.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Initializes the storage backend (migrations, connection, etc.).
    async fn initialize(&self) -> Result<(), CourierError>;

    /// Closes the storage backend, flushing pending writes.
    async fn close(&self) -> Result<(), CourierError>;

    // --- Scheduler operations ---

    /// Appends one delivery record. The store assigns id and timestamp.
    async fn create_delivery_record(
        &self,
        record: &NewDeliveryRecord,
    ) -> Result<DeliveryRecord, CourierError>;

    /// Looks up a campaign. `Ok(None)` means the campaign was deleted.
    async fn get_campaign(&self, campaign_id: i64) -> Result<Option<Campaign>, CourierError>;

    /// Recipients whose `filter_choice` attribute equals `value`.
    async fn recipients_by_filter(
        &self,
        filter: FilterChoice,
        value: &str,
    ) -> Result<Vec<Recipient>, CourierError>;

    /// Ids of recipients holding a successful delivery record for the campaign.
    async fn delivered_recipient_ids(&self, campaign_id: i64) -> Result<Vec<i64>, CourierError>;

    async fn campaign_stats(&self, campaign_id: i64) -> Result<CampaignStats, CourierError>;

    /// Stats for every stored campaign, ordered by campaign id.
    async fn all_campaign_stats(&self) -> Result<Vec<CampaignStats>, CourierError>;

    // --- Administration ---

    async fn create_campaign(&self, draft: &CampaignDraft) -> Result<Campaign, CourierError>;

    /// Replaces all fields of an existing campaign.
    async fn update_campaign(&self, campaign: &Campaign) -> Result<(), CourierError>;

    /// Deletes a campaign and its delivery records.
    async fn delete_campaign(&self, campaign_id: i64) -> Result<(), CourierError>;

    async fn list_campaigns(&self) -> Result<Vec<Campaign>, CourierError>;

    async fn create_recipient(&self, draft: &RecipientDraft) -> Result<Recipient, CourierError>;

    async fn get_recipient(&self, recipient_id: i64) -> Result<Option<Recipient>, CourierError>;

    async fn update_recipient(&self, recipient: &Recipient) -> Result<(), CourierError>;

    async fn delete_recipient(&self, recipient_id: i64) -> Result<(), CourierError>;

    async fn list_delivery_records(
        &self,
        campaign_id: i64,
    ) -> Result<Vec<DeliveryRecord>, CourierError>;
}
