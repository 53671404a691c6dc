// SPDX-FileCopyrightText: 2026 Orderlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence for fallback-message tracking.
//!
//! Provides WAL-mode SQLite storage with embedded migrations and a
//! single-writer concurrency model via `tokio-rusqlite`. Rows map a
//! (contractor, group) pair to the substitute message sent on the bot's
//! behalf, so it can be removed once the contractor joins the group.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod queries;

pub use adapter::SqliteTrackingStore;
pub use database::Database;
