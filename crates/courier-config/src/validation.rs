// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use crate::diagnostic::ConfigError;
use crate::model::{BrokerKind, CourierConfig};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every failure instead of stopping at the first one.
pub fn validate_config(config: &CourierConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if !LOG_LEVELS.contains(&config.service.log_level.as_str()) {
        fail(format!(
            "service.log_level `{}` must be one of: {}",
            config.service.log_level,
            LOG_LEVELS.join(", ")
        ));
    }

    let broker = &config.broker;
    if broker.group_subject.trim().is_empty() {
        fail("broker.group_subject must not be empty".to_string());
    }
    if broker.pool_subject.trim().is_empty() {
        fail("broker.pool_subject must not be empty".to_string());
    }
    if broker.group_subject == broker.pool_subject {
        fail(format!(
            "broker.group_subject and broker.pool_subject must differ, both are `{}`",
            broker.group_subject
        ));
    }

    if config.scheduler.sweep_interval_secs == 0 {
        fail("scheduler.sweep_interval_secs must be greater than 0".to_string());
    }

    if broker.kind == BrokerKind::Nats {
        if broker.url.trim().is_empty() {
            fail("broker.url must not be empty when broker.kind is `nats`".to_string());
        }
        if broker.stream.trim().is_empty() {
            fail("broker.stream must not be empty when broker.kind is `nats`".to_string());
        }
        // Held messages get their deadline extended once per sweep.
        if config.scheduler.sweep_interval_secs >= broker.ack_wait_secs {
            fail(format!(
                "scheduler.sweep_interval_secs ({}) must be less than broker.ack_wait_secs ({})",
                config.scheduler.sweep_interval_secs, broker.ack_wait_secs
            ));
        }
    }

    if config.scheduler.max_attempts < 1 {
        fail("scheduler.max_attempts must be at least 1".to_string());
    }

    if config.scheduler.ingest_buffer == 0 {
        fail("scheduler.ingest_buffer must be greater than 0".to_string());
    }

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    let base_url = config.delivery.base_url.trim();
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        fail(format!(
            "delivery.base_url `{base_url}` must start with http:// or https://"
        ));
    }

    if config.delivery.timeout_secs == 0 {
        fail("delivery.timeout_secs must be greater than 0".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn messages(config: &CourierConfig) -> Vec<String> {
        validate_config(config)
            .unwrap_err()
            .into_iter()
            .map(|e| e.to_string())
            .collect()
    }

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&CourierConfig::default()).is_ok());
    }

    #[test]
    fn identical_subjects_fail() {
        let mut config = CourierConfig::default();
        config.broker.pool_subject = config.broker.group_subject.clone();
        let msgs = messages(&config);
        assert!(msgs.iter().any(|m| m.contains("must differ")));
    }

    #[test]
    fn sweep_must_outpace_ack_wait_on_nats() {
        let mut config = CourierConfig::default();
        config.broker.kind = BrokerKind::Nats;
        config.broker.ack_wait_secs = 20;
        let msgs = messages(&config);
        assert!(msgs.iter().any(|m| m.contains("ack_wait_secs")));

        config.broker.kind = BrokerKind::Memory;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn errors_are_collected_not_short_circuited() {
        let mut config = CourierConfig::default();
        config.scheduler.sweep_interval_secs = 0;
        config.scheduler.max_attempts = 0;
        config.storage.database_path = " ".to_string();
        config.delivery.base_url = "ftp://example.com".to_string();
        assert_eq!(messages(&config).len(), 4);
    }

    #[test]
    fn unknown_log_level_fails() {
        let mut config = CourierConfig::default();
        config.service.log_level = "verbose".to_string();
        assert!(messages(&config)[0].contains("log_level"));
    }
}
