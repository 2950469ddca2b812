// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Courier campaign scheduler.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Top-level Courier configuration.
///
/// All sections are optional and default to values suitable for a local,
/// in-memory run.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CourierConfig {
    #[serde(default)]
    pub service: ServiceConfig,

    /// Message broker connection and subject names.
    #[serde(default)]
    pub broker: BrokerConfig,

    /// Activation sweep and retry settings.
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    /// Outbound delivery API settings.
    #[serde(default)]
    pub delivery: DeliveryConfig,
}

/// Process identity and logging.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "courier".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Broker backend selector.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Deserialize, Serialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BrokerKind {
    /// In-process broker; messages do not survive a restart.
    #[default]
    Memory,
    /// NATS JetStream.
    Nats,
}

/// Broker connection and subject configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BrokerConfig {
    #[serde(default)]
    pub kind: BrokerKind,

    /// Server URL, used when `kind = "nats"`.
    #[serde(default = "default_broker_url")]
    pub url: String,

    /// JetStream stream holding both subjects.
    #[serde(default = "default_stream")]
    pub stream: String,

    /// Prefix for durable consumer names; one consumer per subject.
    #[serde(default = "default_durable_prefix")]
    pub durable_prefix: String,

    /// Subject carrying fresh campaign announcements.
    #[serde(default = "default_group_subject")]
    pub group_subject: String,

    /// Subject carrying retry envelopes.
    #[serde(default = "default_pool_subject")]
    pub pool_subject: String,

    /// Broker acknowledgement deadline in seconds.
    #[serde(default = "default_ack_wait_secs")]
    pub ack_wait_secs: u64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            kind: BrokerKind::default(),
            url: default_broker_url(),
            stream: default_stream(),
            durable_prefix: default_durable_prefix(),
            group_subject: default_group_subject(),
            pool_subject: default_pool_subject(),
            ack_wait_secs: default_ack_wait_secs(),
        }
    }
}

fn default_broker_url() -> String {
    "nats://127.0.0.1:4222".to_string()
}

fn default_stream() -> String {
    "MAILING".to_string()
}

fn default_durable_prefix() -> String {
    "courier".to_string()
}

fn default_group_subject() -> String {
    "mailing.group".to_string()
}

fn default_pool_subject() -> String {
    "mailing.pool".to_string()
}

fn default_ack_wait_secs() -> u64 {
    60
}

/// Scheduler configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SchedulerConfig {
    /// Seconds between activation sweeps.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Highest attempt counter a retry pass may use.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Seconds to wait for in-flight handlers on shutdown.
    #[serde(default = "default_drain_timeout_secs")]
    pub drain_timeout_secs: u64,

    /// Capacity of the channel between the sweep and the dispatcher.
    #[serde(default = "default_ingest_buffer")]
    pub ingest_buffer: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: default_sweep_interval_secs(),
            max_attempts: default_max_attempts(),
            drain_timeout_secs: default_drain_timeout_secs(),
            ingest_buffer: default_ingest_buffer(),
        }
    }
}

fn default_sweep_interval_secs() -> u64 {
    20
}

fn default_max_attempts() -> u32 {
    96
}

fn default_drain_timeout_secs() -> u64 {
    5
}

fn default_ingest_buffer() -> usize {
    512
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("courier").join("courier.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("courier.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Outbound delivery API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DeliveryConfig {
    /// Send endpoint; requests go to `{base_url}/{recipient_id}`.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bearer token. `None` sends requests without an Authorization header.
    #[serde(default)]
    pub token: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:8081/v1/send".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}
