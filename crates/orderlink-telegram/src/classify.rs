// SPDX-FileCopyrightText: 2026 Orderlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mapping of Bot API failures onto [`OrderlinkError`].

use orderlink_core::error::OrderlinkError;
use teloxide::{ApiError, RequestError};

/// Returns `true` when the API refused delivery because the recipient cannot
/// be reached by this bot (blocked, never started, deactivated).
pub fn is_forbidden(error: &ApiError) -> bool {
    match error {
        ApiError::BotBlocked | ApiError::CantInitiateConversation | ApiError::UserDeactivated => {
            true
        }
        ApiError::Unknown(description) => description.starts_with("Forbidden"),
        _ => false,
    }
}

/// Converts a teloxide request error into an [`OrderlinkError`].
///
/// Permission-denied errors become [`OrderlinkError::Forbidden`]; everything
/// else is a transport error carrying the original as its source.
pub fn classify_request_error(action: &str, error: RequestError) -> OrderlinkError {
    if let RequestError::Api(api) = &error {
        if is_forbidden(api) {
            return OrderlinkError::Forbidden {
                message: api.to_string(),
            };
        }
    }
    OrderlinkError::Transport {
        message: format!("failed to {action}: {error}"),
        source: Some(Box::new(error)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocked_and_unreachable_users_are_forbidden() {
        assert!(is_forbidden(&ApiError::BotBlocked));
        assert!(is_forbidden(&ApiError::CantInitiateConversation));
        assert!(is_forbidden(&ApiError::UserDeactivated));
    }

    #[test]
    fn unknown_forbidden_description_is_forbidden() {
        assert!(is_forbidden(&ApiError::Unknown(
            "Forbidden: bot is not a member of the supergroup chat".into()
        )));
        assert!(!is_forbidden(&ApiError::Unknown(
            "Bad Request: something else".into()
        )));
    }

    #[test]
    fn chat_not_found_is_not_forbidden() {
        assert!(!is_forbidden(&ApiError::ChatNotFound));
        assert!(!is_forbidden(&ApiError::MessageTextIsEmpty));
    }

    #[test]
    fn request_error_maps_to_forbidden() {
        let err = classify_request_error("send message", RequestError::Api(ApiError::BotBlocked));
        assert!(err.is_forbidden());
    }

    #[test]
    fn other_request_errors_map_to_transport() {
        let err = classify_request_error("send message", RequestError::Api(ApiError::ChatNotFound));
        assert!(!err.is_forbidden());
        match err {
            OrderlinkError::Transport { message, source } => {
                assert!(message.starts_with("failed to send message"));
                assert!(source.is_some());
            }
            other => panic!("expected Transport, got {other:?}"),
        }
    }

    #[test]
    fn retry_after_is_not_forbidden() {
        let err = classify_request_error(
            "send message",
            RequestError::RetryAfter(teloxide::types::Seconds::from_seconds(3)),
        );
        assert!(!err.is_forbidden());
    }
}
