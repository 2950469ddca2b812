// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Broker adapter trait for durable pub/sub backends.

use async_trait::async_trait;

use crate::error::CourierError;
use crate::message::MessageStream;
use crate::traits::adapter::PluginAdapter;

/// A durable subject-based broker with per-message acknowledgement.
///
/// Delivery is at-least-once: a message that is neither acked nor terminated
/// is redelivered, to the same subscription, after a nak or an ack timeout.
#[async_trait]
pub trait BrokerAdapter: PluginAdapter {
    /// Publishes `payload` on `subject`. Returns once the broker has persisted it.
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<(), CourierError>;

    /// Opens a durable subscription to `subject`.
    async fn subscribe(&self, subject: &str) -> Result<MessageStream, CourierError>;
}
