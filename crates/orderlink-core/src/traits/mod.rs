// SPDX-FileCopyrightText: 2026 Orderlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions.
//!
//! All adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` so they can be injected as `Arc<dyn Trait>`.

pub mod adapter;
pub mod fallback;
pub mod notify;
pub mod storage;
pub mod transport;

pub use adapter::PluginAdapter;
pub use fallback::FallbackSender;
pub use notify::NotifyChannel;
pub use storage::{StorageAdapter, TrackingStore};
pub use transport::GroupTransport;
