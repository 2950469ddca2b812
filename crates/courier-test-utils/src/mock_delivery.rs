// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock delivery adapter for deterministic testing.
//!
//! `MockDelivery` implements `DeliveryAdapter`, capturing every request and
//! failing for the recipients it has been told to fail for.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use courier_core::{
    AdapterType, CourierError, DeliveryAdapter, HealthStatus, PluginAdapter, SendRequest,
};

/// A mock outbound delivery API.
pub struct MockDelivery {
    calls: Arc<Mutex<Vec<SendRequest>>>,
    failing: Arc<Mutex<HashSet<i64>>>,
    fail_all: AtomicBool,
    latency: Mutex<Duration>,
}

impl MockDelivery {
    /// Create a delivery mock that accepts every request.
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            failing: Arc::new(Mutex::new(HashSet::new())),
            fail_all: AtomicBool::new(false),
            latency: Mutex::new(Duration::ZERO),
        }
    }

    /// Reject every request addressed to `recipient_id` until [`MockDelivery::recover`].
    pub async fn fail_for(&self, recipient_id: i64) {
        self.failing.lock().await.insert(recipient_id);
    }

    /// Accept requests for `recipient_id` again.
    pub async fn recover(&self, recipient_id: i64) {
        self.failing.lock().await.remove(&recipient_id);
    }

    /// Reject every request regardless of recipient.
    pub fn fail_all(&self, fail: bool) {
        self.fail_all.store(fail, Ordering::SeqCst);
    }

    /// Make every `send()` take `latency` before answering.
    pub async fn set_latency(&self, latency: Duration) {
        *self.latency.lock().await = latency;
    }

    /// Get every request passed to `send()`, in call order.
    pub async fn calls(&self) -> Vec<SendRequest> {
        self.calls.lock().await.clone()
    }

    /// Number of requests addressed to `recipient_id`.
    pub async fn calls_for(&self, recipient_id: i64) -> usize {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|r| r.id == recipient_id)
            .count()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }
}

impl Default for MockDelivery {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockDelivery {
    fn name(&self) -> &str {
        "mock-delivery"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Delivery
    }

    async fn health_check(&self) -> Result<HealthStatus, CourierError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), CourierError> {
        Ok(())
    }
}

#[async_trait]
impl DeliveryAdapter for MockDelivery {
    async fn send(&self, request: &SendRequest) -> Result<(), CourierError> {
        self.calls.lock().await.push(request.clone());
        let latency = *self.latency.lock().await;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if self.fail_all.load(Ordering::SeqCst) || self.failing.lock().await.contains(&request.id)
        {
            return Err(CourierError::delivery(format!(
                "recipient {} rejected by mock",
                request.id
            )));
        }
        Ok(())
    }
}
