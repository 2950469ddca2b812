// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Consume and reject handlers for the group and pool subjects.
//!
//! A handler either settles the message itself (`Handled`) or gives it back
//! for the registry to hold (`Deferred`). The handler's decision is the only
//! place a processable message gets settled.
//!
//! While a pass runs, the handler keeps extending the message's ack deadline
//! so the broker does not redeliver it to a second, concurrent pass.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use courier_core::{
    ActivationWindow, BrokerMessage, Campaign, Clock, CourierError, RetryEnvelope, WindowStatus,
};
use serde::de::DeserializeOwned;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::protocol::{ConsumeReport, ConsumerProtocol};
use crate::router::SubjectKind;
use crate::task::ScheduledTask;

/// Outcome of a consume handler.
#[derive(Debug)]
pub enum Disposition {
    /// The message has been acked, nak'd or terminated.
    Handled,
    /// The activation window has not opened; hold the task.
    Deferred(ScheduledTask),
}

enum Admission {
    Process(BrokerMessage),
    Done(Disposition),
}

/// Default cadence of ack-deadline extensions during a pass.
const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_secs(20);

pub struct ConsumeHandlers {
    protocol: Arc<ConsumerProtocol>,
    clock: Arc<dyn Clock>,
    progress_interval: Duration,
}

impl ConsumeHandlers {
    pub fn new(protocol: Arc<ConsumerProtocol>, clock: Arc<dyn Clock>) -> Self {
        Self {
            protocol,
            clock,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }

    /// Sets how often a running pass extends its message's ack deadline.
    /// Must stay below the broker's ack wait.
    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval.max(Duration::from_millis(1));
        self
    }

    pub async fn consume(&self, kind: SubjectKind, message: BrokerMessage) -> Disposition {
        match kind {
            SubjectKind::Group => self.consume_group(message).await,
            SubjectKind::Pool => self.consume_pool(message).await,
        }
    }

    /// Handles a fresh campaign announcement.
    pub async fn consume_group(&self, message: BrokerMessage) -> Disposition {
        let Some((message, campaign)) = decode::<Campaign>(message).await else {
            return Disposition::Handled;
        };
        let window = campaign.dispatch_window();
        match self.admit(message, campaign.id, window).await {
            Admission::Process(message) => {
                let pass = self.protocol.consume_fresh(&campaign);
                let result = self.with_progress(&message, pass).await;
                settle(message, campaign.id, result).await;
                Disposition::Handled
            }
            Admission::Done(disposition) => disposition,
        }
    }

    /// Handles a retry envelope.
    ///
    /// The envelope is held until one of its recipients can be reached, so
    /// recipients waiting for their local window do not spin the retry chain.
    pub async fn consume_pool(&self, message: BrokerMessage) -> Disposition {
        let Some((message, envelope)) = decode::<RetryEnvelope>(message).await else {
            return Disposition::Handled;
        };
        let window = envelope.activation_window(self.clock.now());
        match self.admit(message, envelope.campaign.id, window).await {
            Admission::Process(message) => {
                let pass = self.protocol.consume_retry(&envelope);
                let result = self.with_progress(&message, pass).await;
                settle(message, envelope.campaign.id, result).await;
                Disposition::Handled
            }
            Admission::Done(disposition) => disposition,
        }
    }

    /// Terminates a message the registry classified as expired.
    pub async fn reject(&self, message: BrokerMessage) {
        warn!(subject = %message.subject, "activation window closed while held");
        terminate(message).await;
    }

    /// Gates a decoded message on its activation window.
    async fn admit(
        &self,
        message: BrokerMessage,
        campaign_id: i64,
        window: Result<ActivationWindow, CourierError>,
    ) -> Admission {
        let window = match window {
            Ok(window) => window,
            Err(e) => {
                error!(
                    subject = %message.subject,
                    campaign_id,
                    error = %e,
                    "invalid campaign window"
                );
                terminate(message).await;
                return Admission::Done(Disposition::Handled);
            }
        };

        match window.evaluate(self.clock.now()) {
            WindowStatus::Ready => Admission::Process(message),
            WindowStatus::Pending => {
                Admission::Done(Disposition::Deferred(ScheduledTask::new(message, window)))
            }
            WindowStatus::Expired => {
                info!(
                    subject = %message.subject,
                    campaign_id,
                    "activation window already closed"
                );
                terminate(message).await;
                Admission::Done(Disposition::Handled)
            }
        }
    }

    /// Drives `pass` to completion, extending the ack deadline of `message`
    /// every `progress_interval` until it finishes.
    async fn with_progress<T>(
        &self,
        message: &BrokerMessage,
        pass: impl Future<Output = T>,
    ) -> T {
        let mut ticker = tokio::time::interval(self.progress_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;
        tokio::pin!(pass);

        loop {
            tokio::select! {
                biased;
                result = &mut pass => return result,
                _ = ticker.tick() => {
                    debug!(subject = %message.subject, "pass still running");
                    if let Err(e) = message.in_progress().await {
                        warn!(
                            subject = %message.subject,
                            error = %e,
                            "failed to extend ack deadline"
                        );
                    }
                }
            }
        }
    }
}

/// Decodes the payload, terminating the message if it is malformed.
async fn decode<T: DeserializeOwned>(message: BrokerMessage) -> Option<(BrokerMessage, T)> {
    match serde_json::from_slice::<T>(&message.payload) {
        Ok(value) => Some((message, value)),
        Err(source) => {
            let err = CourierError::Codec {
                subject: message.subject.clone(),
                source,
            };
            error!(error = %err, "failed to decode payload");
            terminate(message).await;
            None
        }
    }
}

/// Maps a protocol result onto the broker disposition.
async fn settle(
    message: BrokerMessage,
    campaign_id: i64,
    result: Result<ConsumeReport, CourierError>,
) {
    let subject = message.subject.clone();
    let settled = match result {
        Ok(report) => {
            info!(
                subject = %subject,
                campaign_id,
                attempt = report.attempt,
                delivered = report.delivered,
                failed = report.failed,
                deferred = report.deferred,
                skipped = report.skipped,
                outcome = ?report.outcome,
                succeeded_total = report.stats.succeeded,
                failed_total = report.stats.failed,
                "campaign pass complete"
            );
            message.ack().await
        }
        Err(e) if e.is_campaign_deleted() => {
            warn!(subject = %subject, campaign_id, "campaign deleted; ending retry chain");
            message.term().await
        }
        Err(e @ CourierError::InvalidWindow { .. }) => {
            error!(subject = %subject, campaign_id, error = %e, "campaign has an invalid window");
            message.term().await
        }
        Err(e) => {
            warn!(subject = %subject, campaign_id, error = %e, "campaign pass failed; requesting redelivery");
            message.nak().await
        }
    };
    if let Err(e) = settled {
        error!(subject = %subject, campaign_id, error = %e, "failed to settle message");
    }
}

async fn terminate(message: BrokerMessage) {
    let subject = message.subject.clone();
    if let Err(e) = message.term().await {
        error!(subject = %subject, error = %e, "failed to terminate message");
    }
}
