// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Single-owner registry of messages whose activation window is not open yet.
//!
//! The registry runs as its own task. Registrations arrive over a channel and
//! are interleaved with periodic sweeps, so the pending collection is never
//! shared. A sweep re-evaluates every held task: ready messages go back to
//! the dispatcher's ingest path, expired ones to its reject path, and the
//! rest stay (with their broker acknowledgement deadline extended).

use std::sync::Arc;
use std::time::Duration;

use courier_core::{BrokerMessage, Clock, WindowStatus};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::task::ScheduledTask;

/// Sending half used by handlers to hand over deferred tasks.
#[derive(Debug, Clone)]
pub struct RegistryHandle {
    tx: mpsc::UnboundedSender<ScheduledTask>,
}

impl RegistryHandle {
    /// Hands `task` to the registry. Returns the task if the registry has
    /// already stopped, so the caller can release the message itself.
    pub fn register(&self, task: ScheduledTask) -> Result<(), ScheduledTask> {
        self.tx.send(task).map_err(|e| e.0)
    }
}

/// Destination channels for tasks leaving the registry.
pub struct SweepOutputs {
    pub ready: mpsc::Sender<BrokerMessage>,
    pub expired: mpsc::Sender<BrokerMessage>,
}

/// Tally of one sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepSummary {
    pub ready: usize,
    pub expired: usize,
    pub pending: usize,
}

pub struct TaskRegistry {
    tasks: Vec<ScheduledTask>,
    clock: Arc<dyn Clock>,
    outputs: SweepOutputs,
}

impl TaskRegistry {
    pub fn new(clock: Arc<dyn Clock>, outputs: SweepOutputs) -> Self {
        Self {
            tasks: Vec::new(),
            clock,
            outputs,
        }
    }

    /// Spawns the registry's owner task.
    ///
    /// The task sweeps every `interval` until `cancel` fires, then negatively
    /// acknowledges everything it still holds so the broker redelivers it.
    pub fn spawn(
        self,
        interval: Duration,
        cancel: CancellationToken,
    ) -> (RegistryHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(self.run(rx, interval, cancel));
        (RegistryHandle { tx }, handle)
    }

    async fn run(
        mut self,
        mut rx: mpsc::UnboundedReceiver<ScheduledTask>,
        interval: Duration,
        cancel: CancellationToken,
    ) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                Some(task) = rx.recv() => self.register(task),
                _ = ticker.tick() => {
                    let summary = self.sweep().await;
                    debug!(
                        ready = summary.ready,
                        expired = summary.expired,
                        pending = summary.pending,
                        "registry sweep"
                    );
                }
            }
        }

        rx.close();
        while let Ok(task) = rx.try_recv() {
            self.tasks.push(task);
        }
        self.release_all().await;
    }

    fn register(&mut self, task: ScheduledTask) {
        debug!(
            subject = %task.message.subject,
            opens_at = %task.window.start(),
            "holding message until its window opens"
        );
        self.tasks.push(task);
    }

    /// Number of held tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Re-evaluates every held task against the clock.
    ///
    /// The surviving set is computed first and then replaces the collection;
    /// promoted and expired messages are forwarded afterwards.
    pub async fn sweep(&mut self) -> SweepSummary {
        let now = self.clock.now();
        let mut survivors = Vec::with_capacity(self.tasks.len());
        let mut ready = Vec::new();
        let mut expired = Vec::new();

        for task in std::mem::take(&mut self.tasks) {
            match task.status(now) {
                WindowStatus::Pending => survivors.push(task),
                WindowStatus::Ready => ready.push(task.message),
                WindowStatus::Expired => expired.push(task.message),
            }
        }
        self.tasks = survivors;

        let summary = SweepSummary {
            ready: ready.len(),
            expired: expired.len(),
            pending: self.tasks.len(),
        };

        for task in &self.tasks {
            if let Err(e) = task.message.in_progress().await {
                warn!(subject = %task.message.subject, error = %e, "failed to extend ack deadline");
            }
        }

        for message in ready {
            if let Err(mpsc::error::SendError(message)) = self.outputs.ready.send(message).await {
                release(message, "ingest path closed").await;
            }
        }
        for message in expired {
            if let Err(mpsc::error::SendError(message)) = self.outputs.expired.send(message).await
            {
                release(message, "reject path closed").await;
            }
        }

        summary
    }

    async fn release_all(&mut self) {
        if self.tasks.is_empty() {
            return;
        }
        info!(count = self.tasks.len(), "releasing held messages");
        for task in std::mem::take(&mut self.tasks) {
            release(task.message, "registry stopped").await;
        }
    }
}

/// Negatively acknowledges a message the registry can no longer hold.
async fn release(message: BrokerMessage, reason: &'static str) {
    let subject = message.subject.clone();
    warn!(subject = %subject, reason, "releasing message for redelivery");
    if let Err(e) = message.nak().await {
        error!(subject = %subject, error = %e, "failed to nak released message");
    }
}
