// SPDX-FileCopyrightText: 2026 Orderlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as valid hostnames, non-empty paths, and positive timeouts.

use crate::diagnostic::ConfigError;
use crate::model::OrderlinkConfig;

/// Upper bound accepted for `saga.history_scan_limit`.
pub const MAX_HISTORY_SCAN_LIMIT: usize = 100;

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every failure instead of stopping at the first one.
pub fn validate_config(config: &OrderlinkConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |key: &'static str, message: String| {
        errors.push(ConfigError::Validation { key, message })
    };

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path", "must not be empty".to_string());
    }

    if config.userbot.session_path.trim().is_empty() {
        fail("userbot.session_path", "must not be empty".to_string());
    }

    let host = config.gateway.host.trim();
    if host.is_empty() {
        fail("gateway.host", "must not be empty".to_string());
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            fail(
                "gateway.host",
                format!("`{host}` is not a valid IP address or hostname"),
            );
        }
    }

    if config.fallback.timeout_secs == 0 {
        fail("fallback.timeout_secs", "must be greater than 0".to_string());
    }

    if config.saga.call_timeout_secs == 0 {
        fail("saga.call_timeout_secs", "must be greater than 0".to_string());
    }

    // The notify side waits on the userbot's whole send-and-track, which
    // includes at least one bounded transport call.
    let client = config.fallback.timeout_secs;
    let call = config.saga.call_timeout_secs;
    if client > 0 && call > 0 && client <= call {
        fail(
            "fallback.timeout_secs",
            format!("must exceed saga.call_timeout_secs ({call}), got {client}"),
        );
    }

    let limit = config.saga.history_scan_limit;
    if !(1..=MAX_HISTORY_SCAN_LIMIT).contains(&limit) {
        fail(
            "saga.history_scan_limit",
            format!("must be between 1 and {MAX_HISTORY_SCAN_LIMIT}, got {limit}"),
        );
    }

    let base = config.fallback.userbot_api_base.trim();
    if !(base.starts_with("http://") || base.starts_with("https://")) {
        fail(
            "fallback.userbot_api_base",
            format!("`{base}` must start with http:// or https://"),
        );
    }

    let miniapp = config.telegram.miniapp_public_url.trim();
    if !(miniapp.starts_with("http://") || miniapp.starts_with("https://")) {
        fail(
            "telegram.miniapp_public_url",
            format!("`{miniapp}` must start with http:// or https://"),
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn messages(config: &OrderlinkConfig) -> Vec<String> {
        validate_config(config)
            .unwrap_err()
            .into_iter()
            .map(|e| e.to_string())
            .collect()
    }

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&OrderlinkConfig::default()).is_ok());
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = OrderlinkConfig::default();
        config.storage.database_path = "".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { key, .. } if *key == "storage.database_path")
        ));
    }

    #[test]
    fn zero_timeouts_fail_validation() {
        let mut config = OrderlinkConfig::default();
        config.fallback.timeout_secs = 0;
        config.saga.call_timeout_secs = 0;
        let msgs = messages(&config);
        assert!(msgs.iter().any(|m| m.contains("fallback.timeout_secs")));
        assert!(msgs.iter().any(|m| m.contains("saga.call_timeout_secs")));
    }

    #[test]
    fn fallback_timeout_must_outlast_call_timeout() {
        let mut config = OrderlinkConfig::default();
        config.fallback.timeout_secs = 20;
        config.saga.call_timeout_secs = 30;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0],
            ConfigError::Validation { key: "fallback.timeout_secs", message } if message.contains("(30)")
        ));

        config.fallback.timeout_secs = 31;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn history_scan_limit_is_bounded() {
        let mut config = OrderlinkConfig::default();
        config.saga.history_scan_limit = 0;
        assert!(messages(&config)[0].contains("history_scan_limit"));

        config.saga.history_scan_limit = 101;
        assert!(messages(&config)[0].contains("history_scan_limit"));

        config.saga.history_scan_limit = 100;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn api_base_requires_http_scheme() {
        let mut config = OrderlinkConfig::default();
        config.fallback.userbot_api_base = "127.0.0.1:8001".to_string();
        assert!(messages(&config)[0].contains("userbot_api_base"));
    }

    #[test]
    fn invalid_host_fails_validation() {
        let mut config = OrderlinkConfig::default();
        config.gateway.host = "not a host!".to_string();
        assert!(messages(&config)[0].contains("gateway.host"));
    }

    #[test]
    fn errors_are_collected_not_fail_fast() {
        let mut config = OrderlinkConfig::default();
        config.storage.database_path = " ".to_string();
        config.saga.history_scan_limit = 500;
        config.fallback.userbot_api_base = "ftp://x".to_string();
        assert_eq!(validate_config(&config).unwrap_err().len(), 3);
    }
}
