// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wires subscriptions, the task registry and the dispatcher into one
//! running scheduler.

use std::sync::Arc;
use std::time::Duration;

use courier_config::model::CourierConfig;
use courier_core::{
    BrokerAdapter, BrokerMessage, Clock, CourierError, DeliveryAdapter, MessageStream,
    StorageAdapter, SystemClock,
};
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::dispatcher::Dispatcher;
use crate::handlers::ConsumeHandlers;
use crate::protocol::ConsumerProtocol;
use crate::registry::{SweepOutputs, TaskRegistry};
use crate::router::{SubjectKind, SubjectRouter};

/// Runtime knobs of the scheduler, resolved from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerSettings {
    pub group_subject: String,
    pub pool_subject: String,
    pub sweep_interval: Duration,
    pub max_attempts: u32,
    pub drain_timeout: Duration,
    pub ingest_buffer: usize,
}

impl SchedulerSettings {
    pub fn from_config(config: &CourierConfig) -> Self {
        Self {
            group_subject: config.broker.group_subject.clone(),
            pool_subject: config.broker.pool_subject.clone(),
            sweep_interval: Duration::from_secs(config.scheduler.sweep_interval_secs),
            max_attempts: config.scheduler.max_attempts,
            drain_timeout: Duration::from_secs(config.scheduler.drain_timeout_secs),
            ingest_buffer: config.scheduler.ingest_buffer,
        }
    }
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self::from_config(&CourierConfig::default())
    }
}

/// The deferred-delivery scheduler.
pub struct Scheduler {
    settings: SchedulerSettings,
    storage: Arc<dyn StorageAdapter>,
    delivery: Arc<dyn DeliveryAdapter>,
    broker: Arc<dyn BrokerAdapter>,
    clock: Arc<dyn Clock>,
}

impl Scheduler {
    pub fn new(
        settings: SchedulerSettings,
        storage: Arc<dyn StorageAdapter>,
        delivery: Arc<dyn DeliveryAdapter>,
        broker: Arc<dyn BrokerAdapter>,
    ) -> Self {
        Self {
            settings,
            storage,
            delivery,
            broker,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replaces the wall clock used for window evaluation.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Subscribes to both subjects and runs until `cancel` fires.
    ///
    /// Returns once the dispatcher has drained, the registry has released
    /// what it held and both subscription pumps have stopped.
    pub async fn run(self, cancel: CancellationToken) -> Result<(), CourierError> {
        let settings = self.settings;
        let router = SubjectRouter::new(&settings.group_subject, &settings.pool_subject)?;

        let group = self.broker.subscribe(router.subject(SubjectKind::Group)).await?;
        let pool = self.broker.subscribe(router.subject(SubjectKind::Pool)).await?;

        let buffer = settings.ingest_buffer.max(1);
        let (ingest_tx, ingest_rx) = mpsc::channel(buffer);
        let (expired_tx, expired_rx) = mpsc::channel(buffer);

        let registry = TaskRegistry::new(
            self.clock.clone(),
            SweepOutputs {
                ready: ingest_tx.clone(),
                expired: expired_tx,
            },
        );
        let (registry_handle, registry_task) =
            registry.spawn(settings.sweep_interval, cancel.clone());

        let pumps = [
            tokio::spawn(pump(group, ingest_tx.clone(), cancel.clone())),
            tokio::spawn(pump(pool, ingest_tx, cancel.clone())),
        ];

        let protocol = Arc::new(ConsumerProtocol::new(
            self.storage,
            self.delivery,
            self.broker,
            router.subject(SubjectKind::Pool),
            self.clock.clone(),
            settings.max_attempts,
        ));
        let handlers = Arc::new(
            ConsumeHandlers::new(protocol, self.clock)
                .with_progress_interval(settings.sweep_interval),
        );

        info!(
            group = %settings.group_subject,
            pool = %settings.pool_subject,
            sweep_interval = ?settings.sweep_interval,
            max_attempts = settings.max_attempts,
            "scheduler started"
        );

        Dispatcher::new(
            router,
            handlers,
            registry_handle,
            ingest_rx,
            expired_rx,
            settings.drain_timeout,
        )
        .run(cancel)
        .await;

        join("registry", registry_task).await;
        for task in pumps {
            join("subscription pump", task).await;
        }

        info!("scheduler stopped");
        Ok(())
    }
}

/// Forwards a subscription into the dispatcher's ingest channel.
async fn pump(
    mut stream: MessageStream,
    ingest: mpsc::Sender<BrokerMessage>,
    cancel: CancellationToken,
) {
    loop {
        let message = tokio::select! {
            _ = cancel.cancelled() => break,
            next = stream.next() => match next {
                Some(message) => message,
                None => {
                    warn!("subscription ended");
                    break;
                }
            },
        };
        debug!(subject = %message.subject, "message received");

        if let Err(mpsc::error::SendError(message)) = ingest.send(message).await {
            let subject = message.subject.clone();
            if let Err(e) = message.nak().await {
                error!(subject = %subject, error = %e, "failed to release message");
            }
            break;
        }
    }
}

async fn join(name: &'static str, task: JoinHandle<()>) {
    if let Err(e) = task.await {
        error!(task = name, error = %e, "background task failed");
    }
}
