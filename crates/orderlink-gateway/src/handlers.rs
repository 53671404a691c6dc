// SPDX-FileCopyrightText: 2026 Orderlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the CRM API.
//!
//! Operation failures are answered with `200 OK` and `ok=false`, matching
//! what the CRM expects; only malformed input gets a 4xx status.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{info, warn};

use orderlink_core::OrderlinkError;
use orderlink_core::types::{GroupId, PendingFallbackMessage, UserId};
use orderlink_saga::{bounded, new_order_text};

use crate::schemas::{
    ContractorRequest, CreateGroupRequest, CreateGroupResponse, GenericResponse, HealthResponse,
    MAX_PENDING_LIMIT, NotifyNewOrderRequest, NotifyPaymentRequest, PendingQuery,
    PinOrderDetailsRequest, SendFallbackMessageRequest,
};
use crate::server::{NotifyState, UserbotState};

fn bad_request(e: OrderlinkError) -> Response {
    (StatusCode::BAD_REQUEST, Json(GenericResponse::error(e))).into_response()
}

fn generic(result: Result<(), OrderlinkError>) -> Json<GenericResponse> {
    match result {
        Ok(()) => Json(GenericResponse::ok()),
        Err(e) => Json(GenericResponse::error(e)),
    }
}

/// GET /health (no auth).
pub async fn get_public_health(service: &'static str) -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        service: service.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// POST /api/crm/create_group
pub async fn create_group(
    State(state): State<UserbotState>,
    Json(body): Json<CreateGroupRequest>,
) -> Response {
    let request = match body.into_provision_request() {
        Ok(request) => request,
        Err(e) => return bad_request(e),
    };

    let result = state.provisioner.provision(&request).await;
    Json(CreateGroupResponse::from(&result)).into_response()
}

/// POST /api/crm/remove_contractor
pub async fn remove_contractor(
    State(state): State<UserbotState>,
    Json(body): Json<ContractorRequest>,
) -> Json<GenericResponse> {
    let result = state
        .lifecycle
        .remove_member(GroupId(body.chat_id), UserId(body.contractor_id))
        .await;
    if let Err(e) = &result {
        warn!(group_id = body.chat_id, contractor_id = body.contractor_id, error = %e, "remove contractor failed");
    }
    generic(result)
}

/// POST /api/crm/add_contractor
pub async fn add_contractor(
    State(state): State<UserbotState>,
    Json(body): Json<ContractorRequest>,
) -> Json<GenericResponse> {
    let result = state
        .lifecycle
        .add_member(GroupId(body.chat_id), UserId(body.contractor_id))
        .await;
    if let Err(e) = &result {
        warn!(group_id = body.chat_id, contractor_id = body.contractor_id, error = %e, "add contractor failed");
    }
    generic(result)
}

/// POST /api/crm/send_fallback_message
pub async fn send_fallback_message(
    State(state): State<UserbotState>,
    Json(body): Json<SendFallbackMessageRequest>,
) -> Response {
    if body.text.trim().is_empty() {
        return bad_request(OrderlinkError::InvalidInput("text must not be empty".into()));
    }

    let result = state
        .tracker
        .send_and_track(UserId(body.contractor_id), GroupId(body.group_id), &body.text)
        .await;
    match result {
        Ok(message) => Json(GenericResponse::ok().with_message_id(message.0)).into_response(),
        Err(e) => Json(GenericResponse::error(e)).into_response(),
    }
}

/// GET /api/crm/pending_fallbacks
pub async fn list_pending_fallbacks(
    State(state): State<UserbotState>,
    Query(query): Query<PendingQuery>,
) -> Result<Json<Vec<PendingFallbackMessage>>, (StatusCode, Json<GenericResponse>)> {
    let limit = query.limit.clamp(1, MAX_PENDING_LIMIT);
    state.store.list_pending(limit).await.map(Json).map_err(|e| {
        warn!(error = %e, "listing pending fallbacks failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(GenericResponse::error(e)),
        )
    })
}

/// DELETE /api/crm/pending_fallbacks/{id}
///
/// Drops the tracking row only; the substitute message stays where it is.
pub async fn delete_pending_fallback(
    State(state): State<UserbotState>,
    Path(id): Path<i64>,
) -> Json<GenericResponse> {
    let result = state.store.remove(id).await;
    if result.is_ok() {
        info!(row_id = id, "pending fallback removed by administrator");
    }
    generic(result)
}

/// POST /api/crm/notify_new_order
pub async fn notify_new_order(
    State(state): State<NotifyState>,
    Json(body): Json<NotifyNewOrderRequest>,
) -> Json<GenericResponse> {
    let text = new_order_text(&body.order_title, &body.group_link);
    let outcome = state
        .router
        .notify(UserId(body.contractor_id), GroupId(body.group_id), &text)
        .await;
    Json(GenericResponse::from(&outcome))
}

/// POST /api/crm/notify_payment
pub async fn notify_payment(
    State(state): State<NotifyState>,
    Json(body): Json<NotifyPaymentRequest>,
) -> Json<GenericResponse> {
    let sent = bounded(
        state.settings.call_timeout,
        state
            .notify
            .send_payment_notice(UserId(body.contractor_id), body.amount_rub, &body.order_id),
    )
    .await;
    match sent {
        Ok(message) => Json(GenericResponse::ok().with_message_id(message.0)),
        Err(e) => {
            warn!(contractor_id = body.contractor_id, order_id = %body.order_id, error = %e, "payment notice failed");
            Json(GenericResponse::error(e))
        }
    }
}

/// POST /api/crm/pin_order_details
pub async fn pin_order_details(
    State(state): State<NotifyState>,
    Json(body): Json<PinOrderDetailsRequest>,
) -> Json<GenericResponse> {
    let pinned = bounded(
        state.settings.call_timeout,
        state
            .notify
            .pin_order_details(GroupId(body.chat_id), &body.order_id, body.title.as_deref()),
    )
    .await;
    match pinned {
        Ok(message) => Json(GenericResponse::ok().with_message_id(message.0)),
        Err(e) => {
            warn!(group_id = body.chat_id, order_id = %body.order_id, error = %e, "order details card failed");
            Json(GenericResponse::error(e))
        }
    }
}
