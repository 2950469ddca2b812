// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Activation windows and their time-derived status.
//!
//! A window is the half-open interval `[start, end)`. Status is never stored;
//! it is recomputed against the current time on every evaluation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::error::CourierError;

/// Status of a window relative to a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum WindowStatus {
    /// The window has not opened yet (`now < start`).
    Pending,
    /// The window is open (`start <= now < end`).
    Ready,
    /// The window has closed (`now >= end`).
    Expired,
}

/// A validated `[start, end)` interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl ActivationWindow {
    /// Creates a window, rejecting `start > end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, CourierError> {
        if start > end {
            return Err(CourierError::InvalidWindow { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Evaluates the window against `now`.
    pub fn evaluate(&self, now: DateTime<Utc>) -> WindowStatus {
        if now < self.start {
            WindowStatus::Pending
        } else if now < self.end {
            WindowStatus::Ready
        } else {
            WindowStatus::Expired
        }
    }

    /// Returns `true` if `instant` lies inside the window.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.evaluate(instant) == WindowStatus::Ready
    }
}
