// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Courier campaign scheduler.
//!
//! This crate provides the adapter traits, domain types, activation windows
//! and error types used throughout the Courier workspace.

pub mod clock;
pub mod error;
pub mod message;
pub mod traits;
pub mod types;
pub mod window;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::CourierError;
pub use message::{BrokerMessage, MessageAcker, MessageStream};
pub use types::{
    AdapterType, Campaign, CampaignDraft, CampaignStats, DeliveryRecord, FilterChoice,
    HealthStatus, NewDeliveryRecord, Recipient, RecipientDraft, RetryEnvelope, SendRequest,
};
pub use window::{ActivationWindow, WindowStatus};

pub use traits::{BrokerAdapter, DeliveryAdapter, PluginAdapter, StorageAdapter};
