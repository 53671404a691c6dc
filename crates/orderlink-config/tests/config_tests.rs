// SPDX-FileCopyrightText: 2026 Orderlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Orderlink configuration system.

use orderlink_config::diagnostic::ConfigError;
use orderlink_config::model::OrderlinkConfig;
use orderlink_config::{load_and_validate_path, load_and_validate_str, load_config_from_str};

/// Valid TOML with all known fields deserializes successfully.
#[test]
fn valid_toml_deserializes_into_orderlink_config() {
    let toml = r#"
[service]
log_level = "debug"

[telegram]
bot_token = "123:ABC"
miniapp_public_url = "https://cabinet.example.org"

[userbot]
api_id = 12345
api_hash = "deadbeef"
session_path = "/var/lib/orderlink/userbot.session"

[storage]
database_path = "/tmp/test.db"
wal_mode = false

[gateway]
host = "0.0.0.0"
port = 9000
api_key = "crm-secret"

[fallback]
userbot_api_base = "http://userbot:8001"
api_key = "crm-secret"
timeout_secs = 5

[saga]
call_timeout_secs = 10
history_scan_limit = 80
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.service.log_level, "debug");
    assert_eq!(config.telegram.bot_token.as_deref(), Some("123:ABC"));
    assert_eq!(config.telegram.miniapp_public_url, "https://cabinet.example.org");
    assert_eq!(config.userbot.api_id, Some(12345));
    assert_eq!(config.userbot.api_hash.as_deref(), Some("deadbeef"));
    assert_eq!(config.storage.database_path, "/tmp/test.db");
    assert!(!config.storage.wal_mode);
    assert_eq!(config.gateway.host, "0.0.0.0");
    assert_eq!(config.gateway.port, 9000);
    assert_eq!(config.gateway.api_key.as_deref(), Some("crm-secret"));
    assert_eq!(config.fallback.userbot_api_base, "http://userbot:8001");
    assert_eq!(config.fallback.timeout_secs, 5);
    assert_eq!(config.saga.call_timeout_secs, 10);
    assert_eq!(config.saga.history_scan_limit, 80);
}

#[test]
fn missing_optional_sections_use_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");
    assert_eq!(config.service.log_level, "info");
    assert!(config.telegram.bot_token.is_none());
    assert_eq!(config.telegram.miniapp_public_url, "https://example.com");
    assert!(config.userbot.api_id.is_none());
    assert!(config.storage.wal_mode);
    assert_eq!(config.gateway.host, "127.0.0.1");
    assert_eq!(config.gateway.port, 8001);
    assert!(config.gateway.api_key.is_none());
    assert_eq!(config.fallback.userbot_api_base, "http://127.0.0.1:8001");
    assert_eq!(config.fallback.timeout_secs, 20);
    assert_eq!(config.saga.call_timeout_secs, 15);
    assert_eq!(config.saga.history_scan_limit, 50);
}

/// Dotted keys stand in for the `ORDERLINK_*` env provider.
#[test]
fn dotted_override_reaches_nested_key() {
    use figment::{
        Figment,
        providers::{Format, Serialized, Toml},
    };

    let config: OrderlinkConfig = Figment::new()
        .merge(Serialized::defaults(OrderlinkConfig::default()))
        .merge(Toml::string("[gateway]\nport = 7000\n"))
        .merge(("gateway.port", 7100))
        .merge(("telegram.bot_token", "xyz-from-env"))
        .extract()
        .expect("should merge overrides");

    assert_eq!(config.gateway.port, 7100);
    assert_eq!(config.telegram.bot_token.as_deref(), Some("xyz-from-env"));
}

#[test]
fn missing_config_files_silently_skipped() {
    use figment::{
        Figment,
        providers::{Format, Serialized, Toml},
    };

    let config: OrderlinkConfig = Figment::new()
        .merge(Serialized::defaults(OrderlinkConfig::default()))
        .merge(Toml::file("/nonexistent/path/orderlink.toml"))
        .extract()
        .expect("missing file should be silently skipped");

    assert_eq!(config.gateway.port, 8001);
}

#[test]
fn deny_unknown_fields_at_top_level() {
    let toml = r#"
[agent]
name = "legacy"
"#;

    let err = load_config_from_str(toml).expect_err("unknown top-level section should be rejected");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("agent"),
        "error should mention unknown field, got: {err_str}"
    );
}

#[test]
fn diagnostic_error_includes_unknown_key_and_suggestion() {
    let toml = r#"
[gateway]
prot = 8001
"#;

    let errors = load_and_validate_str(toml).expect_err("should produce errors");
    let has_unknown_key = errors.iter().any(|e| {
        matches!(e, ConfigError::UnknownKey { key, suggestion, valid_keys, .. } if {
            key == "prot"
                && suggestion.as_deref() == Some("port")
                && valid_keys.contains("host")
                && valid_keys.contains("api_key")
        })
    });
    assert!(
        has_unknown_key,
        "should have UnknownKey error for 'prot' with suggestion 'port', got: {errors:?}"
    );
}

#[test]
fn diagnostic_invalid_type_message() {
    let toml = r#"
[saga]
history_scan_limit = "lots"
"#;

    let err = load_config_from_str(toml).expect_err("should reject invalid type");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("invalid type") || err_str.contains("history_scan_limit"),
        "error should mention type mismatch, got: {err_str}"
    );
}

#[test]
fn config_error_renders_with_miette() {
    use miette::{Diagnostic, GraphicalReportHandler};

    let error = ConfigError::UnknownKey {
        key: "bot_tken".to_string(),
        location: "[telegram]".to_string(),
        suggestion: Some("bot_token".to_string()),
        valid_keys: "bot_token, miniapp_public_url".to_string(),
        span: None,
        src: None,
    };

    assert!(error.code().is_some(), "should have diagnostic code");
    let help = error.help().expect("should have help text").to_string();
    assert!(help.contains("did you mean `bot_token`"), "got: {help}");

    let mut buf = String::new();
    GraphicalReportHandler::new()
        .render_report(&mut buf, &error)
        .expect("should render without error");
    assert!(buf.contains("bot_tken"));
}

#[test]
fn validation_runs_after_successful_parse() {
    let toml = r#"
[saga]
history_scan_limit = 0

[fallback]
timeout_secs = 0
"#;

    let errors = load_and_validate_str(toml).expect_err("bounds should be enforced");
    assert_eq!(errors.len(), 2);
    assert!(
        errors
            .iter()
            .all(|e| matches!(e, ConfigError::Validation { .. }))
    );
}

#[test]
fn load_and_validate_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("orderlink.toml");
    std::fs::write(&path, "[gateway]\nport = 8100\n").unwrap();

    let config = load_and_validate_path(&path).expect("file should validate");
    assert_eq!(config.gateway.port, 8100);
}

#[test]
fn unknown_key_points_into_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("orderlink.toml");
    let content = "[service]\nlog_level = \"info\"\n\n[gateway]\nhost = \"0.0.0.0\"\nprot = 8001\n";
    std::fs::write(&path, content).unwrap();

    let errors = load_and_validate_path(&path).expect_err("typo should be rejected");
    let span = errors
        .iter()
        .find_map(|e| match e {
            ConfigError::UnknownKey { key, location, span, src, .. } if key == "prot" => {
                assert_eq!(location, "[gateway]");
                assert!(src.is_some());
                *span
            }
            _ => None,
        })
        .expect("unknown key should carry a span");
    assert_eq!(&content[span.offset()..span.offset() + span.len()], "prot");
}

#[test]
fn invalid_type_names_the_dotted_key() {
    let errors = load_and_validate_str("[saga]\nhistory_scan_limit = \"lots\"\n")
        .expect_err("should reject invalid type");
    assert!(errors.iter().any(|e| matches!(
        e,
        ConfigError::InvalidType { key, span, .. }
            if key == "saga.history_scan_limit" && span.is_some()
    )));
}
