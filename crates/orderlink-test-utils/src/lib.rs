// SPDX-FileCopyrightText: 2026 Orderlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Orderlink integration tests.
//!
//! Provides mock adapters and a temp SQLite store for fast, deterministic,
//! CI-runnable tests without a Telegram account.
//!
//! # Components
//!
//! - [`MockTransport`] - Mock group transport with call capture, fault injection and event injection
//! - [`MockNotifyChannel`] - Mock notify bot with per-contractor blocking
//! - [`MockFallbackSender`] - Mock remote fallback-send operation
//! - [`temp_store`] - Initialized SQLite tracking store in a temp dir

pub mod mock_notify;
pub mod mock_transport;
pub mod store;

pub use mock_notify::{FallbackCall, MockFallbackSender, MockNotifyChannel, NotifySent};
pub use mock_transport::{MockTransport, TransportCall, TransportOp};
pub use store::temp_store;
