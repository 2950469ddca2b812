// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery adapter trait for the outbound notification API.

use async_trait::async_trait;

use crate::error::CourierError;
use crate::traits::adapter::PluginAdapter;
use crate::types::SendRequest;

/// Sends one notification to one recipient.
#[async_trait]
pub trait DeliveryAdapter: PluginAdapter {
    /// `Ok(())` means the API accepted the message; any error is a failed attempt.
    async fn send(&self, request: &SendRequest) -> Result<(), CourierError>;
}
