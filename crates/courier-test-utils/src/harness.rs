// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end scheduler testing.
//!
//! `TestHarness` assembles a scheduler over a [`MemoryBroker`], mock storage,
//! mock delivery and a manual clock. Tests publish campaigns, move the clock
//! and assert on broker settlements, delivery calls and stored records.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use courier_broker::{MemoryBroker, Settlement};
use courier_core::{
    BrokerAdapter, BrokerMessage, Campaign, CampaignDraft, Clock, CourierError, DeliveryAdapter,
    ManualClock, Recipient, RecipientDraft, RetryEnvelope, StorageAdapter,
};
use courier_scheduler::{
    CampaignPublisher, ConsumeHandlers, ConsumerProtocol, Scheduler, SchedulerSettings,
};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::fixtures::epoch;
use crate::mock_delivery::MockDelivery;
use crate::mock_storage::MockStorage;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    start: DateTime<Utc>,
    settings: SchedulerSettings,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            start: epoch(),
            settings: SchedulerSettings {
                sweep_interval: Duration::from_millis(10),
                drain_timeout: Duration::from_secs(1),
                ..SchedulerSettings::default()
            },
        }
    }

    /// Set the initial instant of the manual clock.
    pub fn starting_at(mut self, start: DateTime<Utc>) -> Self {
        self.start = start;
        self
    }

    /// Set the attempt ceiling of the retry chain.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.settings.max_attempts = max_attempts;
        self
    }

    /// Set how often the registry re-evaluates held messages.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.settings.sweep_interval = interval;
        self
    }

    pub fn build(self) -> TestHarness {
        let clock = ManualClock::new(self.start);
        let storage = Arc::new(MockStorage::with_clock(Arc::new(clock.clone())));
        TestHarness {
            broker: MemoryBroker::new(),
            storage,
            delivery: Arc::new(MockDelivery::new()),
            clock,
            settings: self.settings,
            cancel: CancellationToken::new(),
            running: None,
        }
    }
}

/// A complete scheduler environment with mock adapters.
pub struct TestHarness {
    /// The in-process broker; its ledger records every settlement.
    pub broker: MemoryBroker,
    pub storage: Arc<MockStorage>,
    pub delivery: Arc<MockDelivery>,
    /// Drives every window evaluation.
    pub clock: ManualClock,
    pub settings: SchedulerSettings,
    cancel: CancellationToken,
    running: Option<JoinHandle<Result<(), CourierError>>>,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn group_subject(&self) -> &str {
        &self.settings.group_subject
    }

    pub fn pool_subject(&self) -> &str {
        &self.settings.pool_subject
    }

    fn clock(&self) -> Arc<dyn Clock> {
        Arc::new(self.clock.clone())
    }

    /// A protocol bound to the harness collaborators, for direct calls.
    pub fn protocol(&self) -> ConsumerProtocol {
        ConsumerProtocol::new(
            self.storage.clone() as Arc<dyn StorageAdapter>,
            self.delivery.clone() as Arc<dyn DeliveryAdapter>,
            Arc::new(self.broker.clone()) as Arc<dyn BrokerAdapter>,
            self.settings.pool_subject.clone(),
            self.clock(),
            self.settings.max_attempts,
        )
    }

    /// Consume handlers over [`TestHarness::protocol`].
    pub fn handlers(&self) -> ConsumeHandlers {
        ConsumeHandlers::new(Arc::new(self.protocol()), self.clock())
            .with_progress_interval(self.settings.sweep_interval)
    }

    pub fn publisher(&self) -> CampaignPublisher {
        CampaignPublisher::new(
            self.storage.clone(),
            Arc::new(self.broker.clone()),
            self.settings.group_subject.clone(),
        )
    }

    pub async fn add_recipient(&self, draft: RecipientDraft) -> Result<Recipient, CourierError> {
        self.storage.create_recipient(&draft).await
    }

    /// Stores `draft` and announces it on the group subject.
    pub async fn publish_campaign(&self, draft: &CampaignDraft) -> Result<Campaign, CourierError> {
        self.publisher().publish(draft).await
    }

    /// Publishes `payload` on `subject` and takes the delivery straight off a
    /// short-lived subscription, bypassing the scheduler.
    ///
    /// Only valid while the scheduler is not running.
    pub async fn deliver(
        &self,
        subject: &str,
        payload: Vec<u8>,
    ) -> Result<BrokerMessage, CourierError> {
        self.broker.publish(subject, payload).await?;
        let mut stream = self.broker.subscribe(subject).await?;
        stream
            .next()
            .await
            .ok_or_else(|| CourierError::broker("subscription closed"))
    }

    /// Starts the scheduler in the background.
    pub fn start(&mut self) {
        if self.running.is_some() {
            return;
        }
        let scheduler = Scheduler::new(
            self.settings.clone(),
            self.storage.clone(),
            self.delivery.clone(),
            Arc::new(self.broker.clone()),
        )
        .with_clock(self.clock());
        self.running = Some(tokio::spawn(scheduler.run(self.cancel.clone())));
    }

    /// Cancels the scheduler and waits for it to stop.
    pub async fn stop(&mut self) -> Result<(), CourierError> {
        self.cancel.cancel();
        match self.running.take() {
            Some(task) => task
                .await
                .map_err(|e| CourierError::Internal(format!("scheduler task failed: {e}")))?,
            None => Ok(()),
        }
    }

    /// Polls the broker ledger until `subject` has seen `count` settlements
    /// of kind `settlement`. Returns `false` on timeout.
    pub async fn wait_for_settlements(
        &self,
        subject: &str,
        settlement: Settlement,
        count: usize,
        timeout: Duration,
    ) -> bool {
        let poll = async {
            while self.broker.count(subject, settlement) < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        };
        tokio::time::timeout(timeout, poll).await.is_ok()
    }

    /// Retry envelopes published on the pool subject, decoded.
    pub fn retry_envelopes(&self) -> Vec<RetryEnvelope> {
        self.broker
            .published(self.pool_subject())
            .iter()
            .filter_map(|payload| serde_json::from_slice(payload).ok())
            .collect()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TestHarness {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
