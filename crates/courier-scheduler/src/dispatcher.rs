// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The coordinating loop between the broker, the registry and the handlers.
//!
//! Every processable message becomes its own task in a [`JoinSet`], so a slow
//! delivery API never blocks the accept loop. On stop the loop accepts
//! nothing new, releases whatever is still buffered, and waits a bounded time
//! for in-flight work. Tasks still running after that are aborted; their
//! messages stay unsettled and the broker redelivers them.

use std::sync::Arc;
use std::time::Duration;

use courier_core::BrokerMessage;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::handlers::{ConsumeHandlers, Disposition};
use crate::registry::RegistryHandle;
use crate::router::SubjectRouter;

pub struct Dispatcher {
    router: SubjectRouter,
    handlers: Arc<ConsumeHandlers>,
    registry: RegistryHandle,
    ingest: mpsc::Receiver<BrokerMessage>,
    expired: mpsc::Receiver<BrokerMessage>,
    drain_timeout: Duration,
    tasks: JoinSet<()>,
}

impl Dispatcher {
    pub fn new(
        router: SubjectRouter,
        handlers: Arc<ConsumeHandlers>,
        registry: RegistryHandle,
        ingest: mpsc::Receiver<BrokerMessage>,
        expired: mpsc::Receiver<BrokerMessage>,
        drain_timeout: Duration,
    ) -> Self {
        Self {
            router,
            handlers,
            registry,
            ingest,
            expired,
            drain_timeout,
            tasks: JoinSet::new(),
        }
    }

    /// Runs until `cancel` fires.
    pub async fn run(mut self, cancel: CancellationToken) {
        info!("dispatcher running");

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("shutdown signal received, stopping dispatcher");
                    break;
                }
                Some(message) = self.ingest.recv() => self.spawn_consume(message),
                Some(message) = self.expired.recv() => {
                    let handlers = self.handlers.clone();
                    self.tasks.spawn(async move { handlers.reject(message).await });
                }
                Some(joined) = self.tasks.join_next(), if !self.tasks.is_empty() => {
                    log_join(joined);
                }
            }
        }

        self.ingest.close();
        self.expired.close();
        while let Ok(message) = self.ingest.try_recv() {
            release(message).await;
        }
        while let Ok(message) = self.expired.try_recv() {
            release(message).await;
        }

        let tasks = &mut self.tasks;
        let drained = tokio::time::timeout(self.drain_timeout, async {
            while let Some(joined) = tasks.join_next().await {
                log_join(joined);
            }
        })
        .await;

        if drained.is_err() {
            warn!(
                remaining = self.tasks.len(),
                timeout = ?self.drain_timeout,
                "drain timeout reached, aborting in-flight work"
            );
            self.tasks.shutdown().await;
        } else {
            info!("in-flight work drained");
        }
    }

    fn spawn_consume(&mut self, message: BrokerMessage) {
        let Some(kind) = self.router.resolve(&message.subject) else {
            self.tasks.spawn(async move {
                warn!(subject = %message.subject, "no handler for subject; terminating");
                let subject = message.subject.clone();
                if let Err(e) = message.term().await {
                    error!(subject = %subject, error = %e, "failed to terminate message");
                }
            });
            return;
        };

        let handlers = self.handlers.clone();
        let registry = self.registry.clone();
        self.tasks.spawn(async move {
            if let Disposition::Deferred(task) = handlers.consume(kind, message).await {
                if let Err(task) = registry.register(task) {
                    release(task.message).await;
                }
            }
        });
    }
}

fn log_join(joined: Result<(), JoinError>) {
    if let Err(e) = joined {
        if e.is_panic() {
            error!(error = %e, "message task panicked");
        }
    }
}

async fn release(message: BrokerMessage) {
    let subject = message.subject.clone();
    if let Err(e) = message.nak().await {
        error!(subject = %subject, error = %e, "failed to release message");
    }
}
