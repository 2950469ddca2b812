// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound delivery adapter for the Courier campaign scheduler.

pub mod client;

pub use client::HttpDelivery;
