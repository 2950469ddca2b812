// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Broker messages and their acknowledgement handles.

use std::fmt;
use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;

use crate::error::CourierError;

/// Settles a single broker delivery.
///
/// Exactly one of `ack`, `nak` or `term` is expected per delivery; the
/// consuming methods on [`BrokerMessage`] enforce this at the type level.
#[async_trait]
pub trait MessageAcker: Send + Sync {
    /// Positive acknowledgement: the message is done.
    async fn ack(&self) -> Result<(), CourierError>;

    /// Negative acknowledgement: the broker should redeliver.
    async fn nak(&self) -> Result<(), CourierError>;

    /// Terminal acknowledgement: never redeliver.
    async fn term(&self) -> Result<(), CourierError>;

    /// Extends the acknowledgement deadline of a held message.
    async fn in_progress(&self) -> Result<(), CourierError> {
        Ok(())
    }
}

/// A message received from a broker subscription.
pub struct BrokerMessage {
    pub subject: String,
    pub payload: Vec<u8>,
    acker: Box<dyn MessageAcker>,
}

impl BrokerMessage {
    pub fn new(
        subject: impl Into<String>,
        payload: Vec<u8>,
        acker: Box<dyn MessageAcker>,
    ) -> Self {
        Self {
            subject: subject.into(),
            payload,
            acker,
        }
    }

    pub async fn ack(self) -> Result<(), CourierError> {
        self.acker.ack().await
    }

    pub async fn nak(self) -> Result<(), CourierError> {
        self.acker.nak().await
    }

    pub async fn term(self) -> Result<(), CourierError> {
        self.acker.term().await
    }

    pub async fn in_progress(&self) -> Result<(), CourierError> {
        self.acker.in_progress().await
    }
}

impl fmt::Debug for BrokerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrokerMessage")
            .field("subject", &self.subject)
            .field("payload_len", &self.payload.len())
            .finish_non_exhaustive()
    }
}

/// Stream of messages from one subscription.
pub type MessageStream = Pin<Box<dyn Stream<Item = BrokerMessage> + Send>>;
