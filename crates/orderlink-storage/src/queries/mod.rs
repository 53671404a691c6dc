// SPDX-FileCopyrightText: 2026 Orderlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for the fallback tracking tables.

pub mod fallback_messages;
pub mod member_joins;
