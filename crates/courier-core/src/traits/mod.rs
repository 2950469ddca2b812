// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for the collaborators the scheduler depends on.
//!
//! All adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod broker;
pub mod delivery;
pub mod storage;

pub use adapter::PluginAdapter;
pub use broker::BrokerAdapter;
pub use delivery::DeliveryAdapter;
pub use storage::StorageAdapter;
