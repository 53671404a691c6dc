// SPDX-FileCopyrightText: 2026 Orderlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Orderlink services.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Orderlink configuration.
///
/// One file serves both processes: the userbot reads `[userbot]`, `[storage]`
/// and `[saga]`, the notify bot reads `[telegram]` and `[fallback]`, and both
/// read `[service]` and `[gateway]`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OrderlinkConfig {
    #[serde(default)]
    pub service: ServiceConfig,

    /// Notify bot settings.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// User-account (MTProto) session settings.
    #[serde(default)]
    pub userbot: UserbotConfig,

    /// Tracking store settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// HTTP surface exposed to the CRM.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// How the notify bot reaches the userbot's fallback route.
    #[serde(default)]
    pub fallback: FallbackConfig,

    /// Timeouts and bounds for saga operations.
    #[serde(default)]
    pub saga: SagaConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Notify bot configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    /// Telegram Bot API token. Required by the `notify` command.
    #[serde(default)]
    pub bot_token: Option<String>,

    /// Public base URL of the contractor mini-app.
    #[serde(default = "default_miniapp_public_url")]
    pub miniapp_public_url: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            miniapp_public_url: default_miniapp_public_url(),
        }
    }
}

fn default_miniapp_public_url() -> String {
    "https://example.com".to_string()
}

/// MTProto user-account configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct UserbotConfig {
    /// Application id from my.telegram.org. Required by the `userbot` command.
    #[serde(default)]
    pub api_id: Option<i32>,

    #[serde(default)]
    pub api_hash: Option<String>,

    /// File holding the authorized session.
    #[serde(default = "default_session_path")]
    pub session_path: String,
}

impl Default for UserbotConfig {
    fn default() -> Self {
        Self {
            api_id: None,
            api_hash: None,
            session_path: default_session_path(),
        }
    }
}

fn default_session_path() -> String {
    data_file("userbot.session")
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    data_file("orderlink.db")
}

fn default_wal_mode() -> bool {
    true
}

fn data_file(name: &str) -> String {
    dirs::data_dir()
        .map(|p| p.join("orderlink").join(name))
        .unwrap_or_else(|| std::path::PathBuf::from(name))
        .to_string_lossy()
        .into_owned()
}

/// HTTP gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Shared secret expected in `X-CRM-API-Key`. `None` rejects every
    /// authenticated route.
    #[serde(default)]
    pub api_key: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            api_key: None,
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8001
}

/// Notify-bot side of the fallback route.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FallbackConfig {
    /// Base URL of the userbot HTTP gateway.
    #[serde(default = "default_userbot_api_base")]
    pub userbot_api_base: String,

    /// Key sent to the userbot gateway.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_fallback_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            userbot_api_base: default_userbot_api_base(),
            api_key: None,
            timeout_secs: default_fallback_timeout_secs(),
        }
    }
}

fn default_userbot_api_base() -> String {
    "http://127.0.0.1:8001".to_string()
}

fn default_fallback_timeout_secs() -> u64 {
    20
}

/// Saga timing and bounds.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SagaConfig {
    /// Upper bound on any single transport call.
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,

    /// How many recent group messages the history-clear step inspects.
    #[serde(default = "default_history_scan_limit")]
    pub history_scan_limit: usize,
}

impl Default for SagaConfig {
    fn default() -> Self {
        Self {
            call_timeout_secs: default_call_timeout_secs(),
            history_scan_limit: default_history_scan_limit(),
        }
    }
}

fn default_call_timeout_secs() -> u64 {
    15
}

fn default_history_scan_limit() -> usize {
    50
}
