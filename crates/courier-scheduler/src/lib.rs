// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deferred-delivery scheduler for the Courier campaign scheduler.
//!
//! Broker messages flow through the [`Dispatcher`](dispatcher::Dispatcher):
//! messages whose activation window is open go to the consume handlers and
//! the [`ConsumerProtocol`], messages not yet open wait in the
//! [`TaskRegistry`](registry::TaskRegistry), and expired ones are terminated.

pub mod dispatcher;
pub mod handlers;
pub mod protocol;
pub mod publisher;
pub mod registry;
pub mod router;
pub mod service;
pub mod shutdown;
pub mod task;

pub use dispatcher::Dispatcher;
pub use handlers::{ConsumeHandlers, Disposition};
pub use protocol::{AbandonReason, ConsumeReport, ConsumerProtocol, RetryOutcome};
pub use publisher::CampaignPublisher;
pub use registry::{RegistryHandle, SweepOutputs, SweepSummary, TaskRegistry};
pub use router::{SubjectKind, SubjectRouter};
pub use service::{Scheduler, SchedulerSettings};
pub use shutdown::install_signal_handler;
pub use task::ScheduledTask;
