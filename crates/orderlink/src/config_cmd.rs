// SPDX-FileCopyrightText: 2026 Orderlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `orderlink config`: a redacted view of the effective configuration.

use std::fmt::Write;

use orderlink_config::OrderlinkConfig;

fn secret(value: Option<&str>) -> &'static str {
    match value {
        Some(v) if !v.is_empty() => "[set]",
        _ => "[not set]",
    }
}

/// Renders the effective configuration with every credential replaced by
/// `[set]` or `[not set]`.
pub fn summary(config: &OrderlinkConfig) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "[service]");
    let _ = writeln!(out, "  log_level = {}", config.service.log_level);
    let _ = writeln!(out, "[telegram]");
    let _ = writeln!(out, "  bot_token = {}", secret(config.telegram.bot_token.as_deref()));
    let _ = writeln!(out, "  miniapp_public_url = {}", config.telegram.miniapp_public_url);
    let _ = writeln!(out, "[userbot]");
    let _ = writeln!(
        out,
        "  api_id = {}",
        config
            .userbot
            .api_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "[not set]".into())
    );
    let _ = writeln!(out, "  api_hash = {}", secret(config.userbot.api_hash.as_deref()));
    let _ = writeln!(out, "  session_path = {}", config.userbot.session_path);
    let _ = writeln!(out, "[storage]");
    let _ = writeln!(out, "  database_path = {}", config.storage.database_path);
    let _ = writeln!(out, "  wal_mode = {}", config.storage.wal_mode);
    let _ = writeln!(out, "[gateway]");
    let _ = writeln!(out, "  listen = {}:{}", config.gateway.host, config.gateway.port);
    let _ = writeln!(out, "  api_key = {}", secret(config.gateway.api_key.as_deref()));
    let _ = writeln!(out, "[fallback]");
    let _ = writeln!(out, "  userbot_api_base = {}", config.fallback.userbot_api_base);
    let _ = writeln!(out, "  api_key = {}", secret(config.fallback.api_key.as_deref()));
    let _ = writeln!(out, "  timeout_secs = {}", config.fallback.timeout_secs);
    let _ = writeln!(out, "[saga]");
    let _ = writeln!(out, "  call_timeout_secs = {}", config.saga.call_timeout_secs);
    let _ = writeln!(out, "  history_scan_limit = {}", config.saga.history_scan_limit);
    out
}
