// SPDX-FileCopyrightText: 2026 Orderlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Orderlink order-group orchestration services.
//!
//! This crate provides the trait seams, error type and shared value types used
//! throughout the workspace. The saga components in `orderlink-saga` only see
//! the traits defined here; concrete adapters (userbot transport, notify bot,
//! HTTP fallback client, SQLite store) implement them.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::OrderlinkError;
pub use types::{
    AdapterType, AdminRights, AssistantOutcome, DeliveryOutcome, GroupId,
    GroupProvisioningResult, HealthStatus, MembershipChange, MembershipEvent, MessageRef,
    PendingFallbackMessage, ProvisioningOutcome, ProvisioningStep, StepOutcome, StepReport,
    UserId, UserRef,
};

pub use traits::{
    FallbackSender, GroupTransport, NotifyChannel, PluginAdapter, StorageAdapter, TrackingStore,
};
