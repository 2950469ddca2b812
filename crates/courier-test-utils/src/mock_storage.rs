// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory storage adapter for deterministic testing.
//!
//! `MockStorage` implements `StorageAdapter` over plain collections guarded by
//! a mutex. Reads and delivery-record writes can be made to fail on demand.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use courier_core::{
    AdapterType, Campaign, CampaignDraft, CampaignStats, Clock, CourierError, DeliveryRecord,
    FilterChoice, HealthStatus, NewDeliveryRecord, PluginAdapter, Recipient, RecipientDraft,
    StorageAdapter, SystemClock,
};

#[derive(Default)]
struct State {
    campaigns: BTreeMap<i64, Campaign>,
    recipients: BTreeMap<i64, Recipient>,
    records: Vec<DeliveryRecord>,
    next_id: i64,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn stats(&self, campaign_id: i64) -> CampaignStats {
        let mut stats = CampaignStats::empty(campaign_id);
        for record in self.records.iter().filter(|r| r.campaign_id == campaign_id) {
            stats.first_attempt_at = Some(
                stats
                    .first_attempt_at
                    .map_or(record.created_at, |t| t.min(record.created_at)),
            );
            stats.last_attempt_at = Some(
                stats
                    .last_attempt_at
                    .map_or(record.created_at, |t| t.max(record.created_at)),
            );
            if record.delivered {
                stats.succeeded += 1;
            } else {
                stats.failed += 1;
            }
        }
        stats
    }
}

/// A mock storage backend for testing.
pub struct MockStorage {
    state: Arc<Mutex<State>>,
    clock: Arc<dyn Clock>,
    fail_reads: AtomicBool,
    fail_record_writes: AtomicBool,
}

impl MockStorage {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Stamps delivery records with `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Arc::new(Mutex::new(State::default())),
            clock,
            fail_reads: AtomicBool::new(false),
            fail_record_writes: AtomicBool::new(false),
        }
    }

    /// Makes campaign, audience and stats reads fail with a storage error.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Makes delivery-record writes fail with a storage error.
    pub fn fail_record_writes(&self, fail: bool) {
        self.fail_record_writes.store(fail, Ordering::SeqCst);
    }

    /// All delivery records written so far, in insertion order.
    pub async fn records(&self) -> Vec<DeliveryRecord> {
        self.state.lock().await.records.clone()
    }

    /// Delivery records for one recipient of one campaign.
    pub async fn records_for(&self, campaign_id: i64, recipient_id: i64) -> Vec<DeliveryRecord> {
        self.state
            .lock()
            .await
            .records
            .iter()
            .filter(|r| r.campaign_id == campaign_id && r.recipient_id == recipient_id)
            .cloned()
            .collect()
    }

    fn check_reads(&self) -> Result<(), CourierError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(injected("read"));
        }
        Ok(())
    }
}

impl Default for MockStorage {
    fn default() -> Self {
        Self::new()
    }
}

fn injected(op: &str) -> CourierError {
    CourierError::Storage {
        source: Box::new(std::io::Error::other(format!("injected {op} failure"))),
    }
}

#[async_trait]
impl PluginAdapter for MockStorage {
    fn name(&self) -> &str {
        "mock-storage"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, CourierError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), CourierError> {
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for MockStorage {
    async fn initialize(&self) -> Result<(), CourierError> {
        Ok(())
    }

    async fn close(&self) -> Result<(), CourierError> {
        Ok(())
    }

    async fn create_delivery_record(
        &self,
        record: &NewDeliveryRecord,
    ) -> Result<DeliveryRecord, CourierError> {
        if self.fail_record_writes.load(Ordering::SeqCst) {
            return Err(injected("write"));
        }
        let mut state = self.state.lock().await;
        let stored = DeliveryRecord {
            id: state.next_id(),
            created_at: self.clock.now(),
            attempt: record.attempt,
            delivered: record.delivered,
            campaign_id: record.campaign_id,
            recipient_id: record.recipient_id,
        };
        state.records.push(stored.clone());
        Ok(stored)
    }

    async fn get_campaign(&self, campaign_id: i64) -> Result<Option<Campaign>, CourierError> {
        self.check_reads()?;
        Ok(self.state.lock().await.campaigns.get(&campaign_id).cloned())
    }

    async fn recipients_by_filter(
        &self,
        filter: FilterChoice,
        value: &str,
    ) -> Result<Vec<Recipient>, CourierError> {
        self.check_reads()?;
        Ok(self
            .state
            .lock()
            .await
            .recipients
            .values()
            .filter(|r| r.matches(filter, value))
            .cloned()
            .collect())
    }

    async fn delivered_recipient_ids(&self, campaign_id: i64) -> Result<Vec<i64>, CourierError> {
        self.check_reads()?;
        let state = self.state.lock().await;
        let mut ids: Vec<i64> = state
            .records
            .iter()
            .filter(|r| r.campaign_id == campaign_id && r.delivered)
            .map(|r| r.recipient_id)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }

    async fn campaign_stats(&self, campaign_id: i64) -> Result<CampaignStats, CourierError> {
        self.check_reads()?;
        Ok(self.state.lock().await.stats(campaign_id))
    }

    async fn all_campaign_stats(&self) -> Result<Vec<CampaignStats>, CourierError> {
        self.check_reads()?;
        let state = self.state.lock().await;
        Ok(state.campaigns.keys().map(|id| state.stats(*id)).collect())
    }

    async fn create_campaign(&self, draft: &CampaignDraft) -> Result<Campaign, CourierError> {
        let mut state = self.state.lock().await;
        let campaign = draft.clone().into_campaign(state.next_id());
        state.campaigns.insert(campaign.id, campaign.clone());
        Ok(campaign)
    }

    async fn update_campaign(&self, campaign: &Campaign) -> Result<(), CourierError> {
        let mut state = self.state.lock().await;
        match state.campaigns.get_mut(&campaign.id) {
            Some(existing) => {
                *existing = campaign.clone();
                Ok(())
            }
            None => Err(CourierError::NotFound {
                entity: "campaign",
                id: campaign.id,
            }),
        }
    }

    async fn delete_campaign(&self, campaign_id: i64) -> Result<(), CourierError> {
        let mut state = self.state.lock().await;
        if state.campaigns.remove(&campaign_id).is_none() {
            return Err(CourierError::NotFound {
                entity: "campaign",
                id: campaign_id,
            });
        }
        state.records.retain(|r| r.campaign_id != campaign_id);
        Ok(())
    }

    async fn list_campaigns(&self) -> Result<Vec<Campaign>, CourierError> {
        Ok(self.state.lock().await.campaigns.values().cloned().collect())
    }

    async fn create_recipient(&self, draft: &RecipientDraft) -> Result<Recipient, CourierError> {
        let mut state = self.state.lock().await;
        let recipient = draft.clone().into_recipient(state.next_id());
        state.recipients.insert(recipient.id, recipient.clone());
        Ok(recipient)
    }

    async fn get_recipient(&self, recipient_id: i64) -> Result<Option<Recipient>, CourierError> {
        Ok(self.state.lock().await.recipients.get(&recipient_id).cloned())
    }

    async fn update_recipient(&self, recipient: &Recipient) -> Result<(), CourierError> {
        let mut state = self.state.lock().await;
        match state.recipients.get_mut(&recipient.id) {
            Some(existing) => {
                *existing = recipient.clone();
                Ok(())
            }
            None => Err(CourierError::NotFound {
                entity: "recipient",
                id: recipient.id,
            }),
        }
    }

    async fn delete_recipient(&self, recipient_id: i64) -> Result<(), CourierError> {
        let mut state = self.state.lock().await;
        if state.recipients.remove(&recipient_id).is_none() {
            return Err(CourierError::NotFound {
                entity: "recipient",
                id: recipient_id,
            });
        }
        state.records.retain(|r| r.recipient_id != recipient_id);
        Ok(())
    }

    async fn list_delivery_records(
        &self,
        campaign_id: i64,
    ) -> Result<Vec<DeliveryRecord>, CourierError> {
        Ok(self
            .state
            .lock()
            .await
            .records
            .iter()
            .filter(|r| r.campaign_id == campaign_id)
            .cloned()
            .collect())
    }
}
