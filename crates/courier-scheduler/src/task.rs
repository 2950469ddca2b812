// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A broker message waiting for its activation window.

use chrono::{DateTime, Utc};
use courier_core::{ActivationWindow, BrokerMessage, WindowStatus};

/// A held message plus the window that releases it.
///
/// Status is never cached; [`ScheduledTask::status`] recomputes it.
#[derive(Debug)]
pub struct ScheduledTask {
    pub message: BrokerMessage,
    pub window: ActivationWindow,
}

impl ScheduledTask {
    pub fn new(message: BrokerMessage, window: ActivationWindow) -> Self {
        Self { message, window }
    }

    pub fn status(&self, now: DateTime<Utc>) -> WindowStatus {
        self.window.evaluate(now)
    }
}
