// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Courier campaign scheduler.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// The primary error type used across all Courier adapter traits and core operations.
#[derive(Debug, Error)]
pub enum CourierError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, row mapping).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Broker errors (connection, publish, subscription, acknowledgement).
    #[error("broker error: {message}")]
    Broker {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Outbound delivery API errors (transport failure, rejected request).
    #[error("delivery error: {message}")]
    Delivery {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A broker payload could not be encoded or decoded.
    #[error("codec error on subject `{subject}`: {source}")]
    Codec {
        subject: String,
        source: serde_json::Error,
    },

    /// An activation window whose start lies after its end.
    #[error("invalid window: start {start} is after end {end}")]
    InvalidWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// The campaign referenced by a message no longer exists.
    ///
    /// Handlers terminate the triggering message on this error, which ends
    /// the retry chain for the campaign.
    #[error("campaign {campaign_id} was deleted")]
    CampaignDeleted { campaign_id: i64 },

    /// A requested entity does not exist.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CourierError {
    /// Returns `true` when the error aborts the retry chain of a campaign.
    pub fn is_campaign_deleted(&self) -> bool {
        matches!(self, CourierError::CampaignDeleted { .. })
    }

    /// Shorthand for a broker error without an underlying source.
    pub fn broker(message: impl Into<String>) -> Self {
        CourierError::Broker {
            message: message.into(),
            source: None,
        }
    }

    /// Shorthand for a delivery error without an underlying source.
    pub fn delivery(message: impl Into<String>) -> Self {
        CourierError::Delivery {
            message: message.into(),
            source: None,
        }
    }
}
