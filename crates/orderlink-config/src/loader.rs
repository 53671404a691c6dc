// SPDX-FileCopyrightText: 2026 Orderlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./orderlink.toml` > `~/.config/orderlink/orderlink.toml`
//! > `/etc/orderlink/orderlink.toml`, with environment variable overrides via
//! the `ORDERLINK_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::OrderlinkConfig;

/// Section names, in the order the env mapper tries them.
const SECTIONS: &[&str] = &[
    "service", "telegram", "userbot", "storage", "gateway", "fallback", "saga",
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/orderlink/orderlink.toml` (system-wide)
/// 3. `~/.config/orderlink/orderlink.toml` (user XDG config)
/// 4. `./orderlink.toml` (local directory)
/// 5. `ORDERLINK_*` environment variables
pub fn load_config() -> Result<OrderlinkConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no files, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<OrderlinkConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(OrderlinkConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<OrderlinkConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(OrderlinkConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for config loading, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(OrderlinkConfig::default()))
        .merge(Toml::file("/etc/orderlink/orderlink.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("orderlink/orderlink.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("orderlink.toml"))
        .merge(env_provider())
}

/// Maps `ORDERLINK_SECTION_KEY` to `section.key`.
///
/// Only the first underscore after a known section name becomes a dot, so
/// `ORDERLINK_TELEGRAM_BOT_TOKEN` lands on `telegram.bot_token`.
pub fn map_env_key(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|rest| rest.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

fn env_provider() -> Env {
    Env::prefixed("ORDERLINK_").map(|key| map_env_key(key.as_str()).into())
}
