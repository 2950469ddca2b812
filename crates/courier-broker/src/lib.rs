// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Broker adapters for the Courier campaign scheduler.
//!
//! [`MemoryBroker`] is always available and is what tests and local runs use.
//! The NATS JetStream adapter is compiled with the `nats` feature.

pub mod memory;
#[cfg(feature = "nats")]
pub mod nats;

pub use memory::{MemoryBroker, Settlement, SettlementRecord};
#[cfg(feature = "nats")]
pub use nats::NatsBroker;
