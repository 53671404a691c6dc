// SPDX-FileCopyrightText: 2026 Orderlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request and response bodies of the CRM API.

use serde::{Deserialize, Serialize};

use orderlink_core::types::{DeliveryOutcome, GroupProvisioningResult, UserId};
use orderlink_core::OrderlinkError;
use orderlink_saga::ProvisionRequest;

/// Result code of a successful call.
pub const RESULT_OK: &str = "OK";

/// Result code of a failed call.
pub const RESULT_ERROR: &str = "ERROR";

/// Body of `POST /api/crm/create_group`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CreateGroupRequest {
    #[serde(default)]
    pub order_id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon_base64: Option<String>,
    pub curator_id: i64,
    #[serde(default)]
    pub curator_label: String,
    #[serde(default)]
    pub contractor_ids: Vec<i64>,
    #[serde(default)]
    pub assistant_usernames: Vec<String>,
    /// Legacy single-assistant fields, appended after `assistant_usernames`.
    #[serde(default)]
    pub bot2_username: Option<String>,
    #[serde(default)]
    pub bot3_username: Option<String>,
}

impl CreateGroupRequest {
    /// Validates the body and converts it into a provisioning request.
    ///
    /// Assistants keep their order; blank and repeated usernames are dropped.
    pub fn into_provision_request(self) -> Result<ProvisionRequest, OrderlinkError> {
        if self.title.trim().is_empty() {
            return Err(OrderlinkError::InvalidInput("title must not be empty".into()));
        }

        let mut assistants: Vec<String> = Vec::new();
        let candidates = self
            .assistant_usernames
            .into_iter()
            .chain(self.bot2_username)
            .chain(self.bot3_username);
        for raw in candidates {
            let name = raw.trim().trim_start_matches('@');
            if name.is_empty() || assistants.iter().any(|a| a.eq_ignore_ascii_case(name)) {
                continue;
            }
            assistants.push(name.to_string());
        }

        Ok(ProvisionRequest {
            order_id: self.order_id,
            title: self.title,
            description: self.description,
            icon_base64: self.icon_base64,
            curator_id: UserId(self.curator_id),
            curator_label: self.curator_label,
            contractor_ids: self.contractor_ids.into_iter().map(UserId).collect(),
            assistants,
        })
    }
}

/// Response of `POST /api/crm/create_group`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CreateGroupResponse {
    pub ok: bool,
    pub result_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&GroupProvisioningResult> for CreateGroupResponse {
    fn from(result: &GroupProvisioningResult) -> Self {
        Self {
            ok: result.ok(),
            result_code: if result.ok() { RESULT_OK } else { RESULT_ERROR }.to_string(),
            group_id: result.group_id().map(|g| g.0),
            group_link: result.invite_link().map(String::from),
            error: result.error().map(String::from),
        }
    }
}

/// Body of `remove_contractor` and `add_contractor`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ContractorRequest {
    pub chat_id: i64,
    pub contractor_id: i64,
}

/// Body of `POST /api/crm/send_fallback_message`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SendFallbackMessageRequest {
    pub contractor_id: i64,
    pub group_id: i64,
    pub text: String,
}

/// Query of `GET /api/crm/pending_fallbacks`.
#[derive(Debug, Clone, Deserialize)]
pub struct PendingQuery {
    #[serde(default = "default_pending_limit")]
    pub limit: u32,
}

/// Upper bound on one administrative listing.
pub const MAX_PENDING_LIMIT: u32 = 1000;

fn default_pending_limit() -> u32 {
    100
}

/// Body of `POST /api/crm/notify_new_order`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotifyNewOrderRequest {
    pub contractor_id: i64,
    pub order_title: String,
    pub group_link: String,
    pub group_id: i64,
}

/// Body of `POST /api/crm/notify_payment`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotifyPaymentRequest {
    pub contractor_id: i64,
    pub amount_rub: i64,
    pub order_id: String,
}

/// Body of `POST /api/crm/pin_order_details`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PinOrderDetailsRequest {
    pub chat_id: i64,
    pub order_id: String,
    #[serde(default)]
    pub title: Option<String>,
}

/// Response shared by most operations.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct GenericResponse {
    pub ok: bool,
    pub result_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GenericResponse {
    pub fn ok() -> Self {
        Self {
            ok: true,
            result_code: RESULT_OK.to_string(),
            message_id: None,
            error: None,
        }
    }

    pub fn with_message_id(mut self, message_id: i64) -> Self {
        self.message_id = Some(message_id);
        self
    }

    pub fn error(error: impl ToString) -> Self {
        Self {
            ok: false,
            result_code: RESULT_ERROR.to_string(),
            message_id: None,
            error: Some(error.to_string()),
        }
    }
}

impl From<&DeliveryOutcome> for GenericResponse {
    fn from(outcome: &DeliveryOutcome) -> Self {
        Self {
            ok: outcome.is_delivered(),
            result_code: outcome.result_code().to_string(),
            message_id: None,
            error: match outcome {
                DeliveryOutcome::Failed(reason) => Some(reason.clone()),
                _ => None,
            },
        }
    }
}

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: String,
    pub version: String,
}
