// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Courier integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`MockStorage`] - In-memory storage with injectable failures
//! - [`MockDelivery`] - Delivery adapter with scripted per-recipient failures and call capture
//! - [`TestHarness`] - Scheduler over a [`MemoryBroker`](courier_broker::MemoryBroker) with a manual clock

pub mod fixtures;
pub mod harness;
pub mod mock_delivery;
pub mod mock_storage;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_delivery::MockDelivery;
pub use mock_storage::MockStorage;
