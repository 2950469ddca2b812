// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! NATS JetStream implementation of the BrokerAdapter trait.
//!
//! Both subjects live in one stream. Each subscription binds a durable pull
//! consumer with explicit acknowledgement, so unacknowledged messages are
//! redelivered after `ack_wait` and survive process restarts.

use std::time::Duration;

use async_nats::jetstream::{self, AckKind, consumer::pull};
use async_trait::async_trait;
use futures::StreamExt;
use tracing::{debug, info, warn};

use courier_config::model::BrokerConfig;
use courier_core::{
    AdapterType, BrokerAdapter, BrokerMessage, CourierError, HealthStatus, MessageAcker,
    MessageStream, PluginAdapter,
};

fn broker_err<E>(message: &str, e: E) -> CourierError
where
    E: std::error::Error + Send + Sync + 'static,
{
    CourierError::Broker {
        message: format!("{message}: {e}"),
        source: Some(Box::new(e)),
    }
}

/// JetStream-backed [`BrokerAdapter`].
pub struct NatsBroker {
    client: async_nats::Client,
    context: jetstream::Context,
    stream: String,
    durable_prefix: String,
    ack_wait: Duration,
}

impl NatsBroker {
    /// Connects to the server and ensures the stream exists with both subjects.
    pub async fn connect(config: &BrokerConfig) -> Result<Self, CourierError> {
        let client = async_nats::connect(config.url.as_str())
            .await
            .map_err(|e| broker_err("failed to connect", e))?;
        let context = jetstream::new(client.clone());

        context
            .get_or_create_stream(stream_config(config))
            .await
            .map_err(|e| broker_err("failed to create stream", e))?;

        info!(url = %config.url, stream = %config.stream, "connected to NATS JetStream");
        Ok(Self {
            client,
            context,
            stream: config.stream.clone(),
            durable_prefix: config.durable_prefix.clone(),
            ack_wait: Duration::from_secs(config.ack_wait_secs),
        })
    }
}

/// The stream carrying both scheduler subjects.
fn stream_config(config: &BrokerConfig) -> jetstream::stream::Config {
    jetstream::stream::Config {
        name: config.stream.clone(),
        subjects: vec![config.group_subject.clone(), config.pool_subject.clone()],
        ..Default::default()
    }
}

/// Durable consumer name for `subject`; dots and wildcards are not allowed
/// in names.
fn durable_name(prefix: &str, subject: &str) -> String {
    format!("{prefix}-{}", subject.replace(['.', '*', '>'], "-"))
}

/// Pull consumer bound to one subject with explicit acknowledgement.
fn consumer_config(durable: &str, subject: &str, ack_wait: Duration) -> pull::Config {
    pull::Config {
        durable_name: Some(durable.to_string()),
        filter_subject: subject.to_string(),
        ack_policy: jetstream::consumer::AckPolicy::Explicit,
        ack_wait,
        ..Default::default()
    }
}

struct NatsAcker {
    message: jetstream::Message,
}

#[async_trait]
impl MessageAcker for NatsAcker {
    async fn ack(&self) -> Result<(), CourierError> {
        self.message
            .ack()
            .await
            .map_err(|e| CourierError::Broker {
                message: format!("ack failed: {e}"),
                source: Some(e),
            })
    }

    async fn nak(&self) -> Result<(), CourierError> {
        self.message
            .ack_with(AckKind::Nak(None))
            .await
            .map_err(|e| CourierError::Broker {
                message: format!("nak failed: {e}"),
                source: Some(e),
            })
    }

    async fn term(&self) -> Result<(), CourierError> {
        self.message
            .ack_with(AckKind::Term)
            .await
            .map_err(|e| CourierError::Broker {
                message: format!("term failed: {e}"),
                source: Some(e),
            })
    }

    async fn in_progress(&self) -> Result<(), CourierError> {
        self.message
            .ack_with(AckKind::Progress)
            .await
            .map_err(|e| CourierError::Broker {
                message: format!("progress failed: {e}"),
                source: Some(e),
            })
    }
}

#[async_trait]
impl PluginAdapter for NatsBroker {
    fn name(&self) -> &str {
        "nats"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Broker
    }

    async fn health_check(&self) -> Result<HealthStatus, CourierError> {
        use async_nats::connection::State;

        Ok(match self.client.connection_state() {
            State::Connected => HealthStatus::Healthy,
            State::Pending => HealthStatus::Degraded("reconnecting".into()),
            State::Disconnected => HealthStatus::Unhealthy("disconnected".into()),
        })
    }

    async fn shutdown(&self) -> Result<(), CourierError> {
        self.client
            .flush()
            .await
            .map_err(|e| broker_err("flush failed", e))?;
        debug!("NATS client flushed");
        Ok(())
    }
}

#[async_trait]
impl BrokerAdapter for NatsBroker {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<(), CourierError> {
        let ack = self
            .context
            .publish(subject.to_string(), payload.into())
            .await
            .map_err(|e| broker_err("publish failed", e))?;
        ack.await
            .map_err(|e| broker_err("publish not acknowledged", e))?;
        Ok(())
    }

    async fn subscribe(&self, subject: &str) -> Result<MessageStream, CourierError> {
        let stream = self
            .context
            .get_stream(&self.stream)
            .await
            .map_err(|e| broker_err("failed to look up stream", e))?;

        let durable = durable_name(&self.durable_prefix, subject);
        let consumer = stream
            .get_or_create_consumer(&durable, consumer_config(&durable, subject, self.ack_wait))
            .await
            .map_err(|e| broker_err("failed to create consumer", e))?;

        let messages = consumer
            .messages()
            .await
            .map_err(|e| broker_err("failed to open message stream", e))?;

        debug!(subject, durable = %durable, "subscribed");
        let subject = subject.to_string();
        let mapped = messages.filter_map(move |item| {
            let subject = subject.clone();
            async move {
                match item {
                    Ok(message) => {
                        let msg_subject = message.subject.to_string();
                        let payload = message.payload.to_vec();
                        Some(BrokerMessage::new(
                            msg_subject,
                            payload,
                            Box::new(NatsAcker { message }),
                        ))
                    }
                    Err(e) => {
                        warn!(subject = %subject, error = %e, "message stream error");
                        None
                    }
                }
            }
        });
        Ok(Box::pin(mapped))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durable_names_are_sanitised() {
        assert_eq!(durable_name("courier", "mailing.group"), "courier-mailing-group");
        assert_eq!(durable_name("c", "mailing.*.pool.>"), "c-mailing---pool--");
        assert_eq!(durable_name("courier", "plain"), "courier-plain");
    }

    #[test]
    fn distinct_subjects_get_distinct_consumers() {
        assert_ne!(
            durable_name("courier", "mailing.group"),
            durable_name("courier", "mailing.pool")
        );
    }

    #[test]
    fn stream_holds_both_subjects() {
        let config = BrokerConfig::default();
        let stream = stream_config(&config);
        assert_eq!(stream.name, "MAILING");
        assert_eq!(stream.subjects, vec!["mailing.group", "mailing.pool"]);
    }

    #[test]
    fn consumer_uses_explicit_acks_and_ack_wait() {
        let consumer = consumer_config(
            "courier-mailing-pool",
            "mailing.pool",
            Duration::from_secs(45),
        );
        assert_eq!(consumer.durable_name.as_deref(), Some("courier-mailing-pool"));
        assert_eq!(consumer.filter_subject, "mailing.pool");
        assert_eq!(consumer.ack_wait, Duration::from_secs(45));
        assert!(matches!(
            consumer.ack_policy,
            jetstream::consumer::AckPolicy::Explicit
        ));
    }
}
