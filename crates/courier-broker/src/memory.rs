// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process broker with at-least-once redelivery.
//!
//! Each subject keeps a backlog until a subscriber attaches; after that,
//! published messages go straight to the subscriber. A nak puts the message
//! back on its subject (optionally after a delay). Every settlement is kept
//! in a ledger so tests can assert on dispositions.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use futures::channel::mpsc;
use strum::Display;
use tracing::{debug, trace};

use courier_core::{
    AdapterType, BrokerAdapter, BrokerMessage, CourierError, HealthStatus, MessageAcker,
    MessageStream, PluginAdapter,
};

/// How a delivery was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Settlement {
    Ack,
    Nak,
    Term,
    InProgress,
}

/// One ledger entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementRecord {
    pub subject: String,
    pub sequence: u64,
    pub settlement: Settlement,
}

#[derive(Clone)]
struct Envelope {
    sequence: u64,
    payload: Vec<u8>,
}

#[derive(Default)]
struct SubjectState {
    backlog: VecDeque<Envelope>,
    subscriber: Option<mpsc::UnboundedSender<BrokerMessage>>,
    published: Vec<Vec<u8>>,
}

#[derive(Default)]
struct Inner {
    next_sequence: u64,
    subjects: HashMap<String, SubjectState>,
    ledger: Vec<SettlementRecord>,
    closed: bool,
}

/// In-process [`BrokerAdapter`].
#[derive(Clone, Default)]
pub struct MemoryBroker {
    inner: Arc<Mutex<Inner>>,
    nak_delay: Duration,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays redelivery after a nak. Requires a tokio runtime.
    pub fn with_nak_delay(mut self, delay: Duration) -> Self {
        self.nak_delay = delay;
        self
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Payloads published on `subject`, in publication order.
    pub fn published(&self, subject: &str) -> Vec<Vec<u8>> {
        self.lock()
            .subjects
            .get(subject)
            .map(|s| s.published.clone())
            .unwrap_or_default()
    }

    /// Every settlement observed so far, in order.
    pub fn ledger(&self) -> Vec<SettlementRecord> {
        self.lock().ledger.clone()
    }

    /// Settlements of `subject` of one kind.
    pub fn count(&self, subject: &str, settlement: Settlement) -> usize {
        self.lock()
            .ledger
            .iter()
            .filter(|r| r.subject == subject && r.settlement == settlement)
            .count()
    }

    /// Number of messages waiting for a subscriber on `subject`.
    pub fn backlog_len(&self, subject: &str) -> usize {
        self.lock()
            .subjects
            .get(subject)
            .map_or(0, |s| s.backlog.len())
    }

    fn deliver(&self, subject: &str, envelope: Envelope) {
        let mut inner = self.lock();
        if inner.closed {
            return;
        }
        let state = inner.subjects.entry(subject.to_string()).or_default();
        match &state.subscriber {
            Some(tx) => {
                let message = self.to_message(subject, envelope.clone());
                if tx.unbounded_send(message).is_err() {
                    // Subscriber went away; keep the message for the next one.
                    state.subscriber = None;
                    state.backlog.push_back(envelope);
                }
            }
            None => state.backlog.push_back(envelope),
        }
    }

    fn to_message(&self, subject: &str, envelope: Envelope) -> BrokerMessage {
        let acker = MemoryAcker {
            broker: self.clone(),
            subject: subject.to_string(),
            envelope: envelope.clone(),
        };
        BrokerMessage::new(subject, envelope.payload, Box::new(acker))
    }

    fn record(&self, subject: &str, sequence: u64, settlement: Settlement) {
        trace!(subject, sequence, %settlement, "settled");
        self.lock().ledger.push(SettlementRecord {
            subject: subject.to_string(),
            sequence,
            settlement,
        });
    }
}

struct MemoryAcker {
    broker: MemoryBroker,
    subject: String,
    envelope: Envelope,
}

#[async_trait]
impl MessageAcker for MemoryAcker {
    async fn ack(&self) -> Result<(), CourierError> {
        self.broker
            .record(&self.subject, self.envelope.sequence, Settlement::Ack);
        Ok(())
    }

    async fn nak(&self) -> Result<(), CourierError> {
        self.broker
            .record(&self.subject, self.envelope.sequence, Settlement::Nak);
        let broker = self.broker.clone();
        let subject = self.subject.clone();
        let envelope = self.envelope.clone();
        if broker.nak_delay.is_zero() {
            broker.deliver(&subject, envelope);
        } else {
            tokio::spawn(async move {
                tokio::time::sleep(broker.nak_delay).await;
                broker.deliver(&subject, envelope);
            });
        }
        Ok(())
    }

    async fn term(&self) -> Result<(), CourierError> {
        self.broker
            .record(&self.subject, self.envelope.sequence, Settlement::Term);
        Ok(())
    }

    async fn in_progress(&self) -> Result<(), CourierError> {
        self.broker
            .record(&self.subject, self.envelope.sequence, Settlement::InProgress);
        Ok(())
    }
}

#[async_trait]
impl PluginAdapter for MemoryBroker {
    fn name(&self) -> &str {
        "memory"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Broker
    }

    async fn health_check(&self) -> Result<HealthStatus, CourierError> {
        if self.lock().closed {
            return Ok(HealthStatus::Unhealthy("broker is shut down".into()));
        }
        Ok(HealthStatus::Healthy)
    }

    /// Closes every subscription; their streams end.
    async fn shutdown(&self) -> Result<(), CourierError> {
        let mut inner = self.lock();
        inner.closed = true;
        for state in inner.subjects.values_mut() {
            state.subscriber = None;
        }
        debug!("memory broker shut down");
        Ok(())
    }
}

#[async_trait]
impl BrokerAdapter for MemoryBroker {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<(), CourierError> {
        let sequence = {
            let mut inner = self.lock();
            if inner.closed {
                return Err(CourierError::broker("broker is shut down"));
            }
            inner.next_sequence += 1;
            let sequence = inner.next_sequence;
            inner
                .subjects
                .entry(subject.to_string())
                .or_default()
                .published
                .push(payload.clone());
            sequence
        };
        trace!(subject, sequence, "published");
        self.deliver(subject, Envelope { sequence, payload });
        Ok(())
    }

    async fn subscribe(&self, subject: &str) -> Result<MessageStream, CourierError> {
        let (tx, rx) = mpsc::unbounded();
        let backlog: Vec<Envelope> = {
            let mut inner = self.lock();
            if inner.closed {
                return Err(CourierError::broker("broker is shut down"));
            }
            let state = inner.subjects.entry(subject.to_string()).or_default();
            if state.subscriber.as_ref().is_some_and(|s| !s.is_closed()) {
                return Err(CourierError::broker(format!(
                    "subject `{subject}` already has a subscriber"
                )));
            }
            state.subscriber = Some(tx.clone());
            state.backlog.drain(..).collect()
        };
        for envelope in backlog {
            let _ = tx.unbounded_send(self.to_message(subject, envelope));
        }
        debug!(subject, "subscribed");
        Ok(Box::pin(rx))
    }
}
