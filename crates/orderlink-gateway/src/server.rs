// SPDX-FileCopyrightText: 2026 Orderlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP server built on axum.
//!
//! Sets up the userbot and notify routers, their shared state, and serves
//! them until the shutdown token fires.

use std::sync::Arc;

use axum::{
    Router, middleware as axum_middleware,
    routing::{delete, get, post},
};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use orderlink_core::{NotifyChannel, OrderlinkError, TrackingStore};
use orderlink_saga::{
    FallbackDeliveryRouter, FallbackTracker, GroupProvisioner, MembershipLifecycle, SagaSettings,
};

use crate::auth::{AuthConfig, auth_middleware};
use crate::handlers;

/// Shared state of the userbot service.
#[derive(Clone)]
pub struct UserbotState {
    pub provisioner: Arc<GroupProvisioner>,
    pub lifecycle: Arc<MembershipLifecycle>,
    pub tracker: Arc<FallbackTracker>,
    pub store: Arc<dyn TrackingStore>,
}

/// Shared state of the notify service.
#[derive(Clone)]
pub struct NotifyState {
    pub router: Arc<FallbackDeliveryRouter>,
    pub notify: Arc<dyn NotifyChannel>,
    pub settings: SagaSettings,
}

/// Server bind configuration (mirrors `GatewayConfig` from orderlink-config).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

fn public_routes(service: &'static str) -> Router {
    Router::new().route(
        "/health",
        get(move || handlers::get_public_health(service)),
    )
}

/// Routes served by the userbot process.
pub fn userbot_router(state: UserbotState, auth: AuthConfig) -> Router {
    let api_routes = Router::new()
        .route("/api/crm/create_group", post(handlers::create_group))
        .route("/api/crm/remove_contractor", post(handlers::remove_contractor))
        .route("/api/crm/add_contractor", post(handlers::add_contractor))
        .route(
            "/api/crm/send_fallback_message",
            post(handlers::send_fallback_message),
        )
        .route("/api/crm/pending_fallbacks", get(handlers::list_pending_fallbacks))
        .route(
            "/api/crm/pending_fallbacks/{id}",
            delete(handlers::delete_pending_fallback),
        )
        .route_layer(axum_middleware::from_fn_with_state(auth, auth_middleware))
        .with_state(state);

    Router::new()
        .merge(public_routes("userbot"))
        .merge(api_routes)
        .layer(TraceLayer::new_for_http())
}

/// Routes served by the notify-bot process.
pub fn notify_router(state: NotifyState, auth: AuthConfig) -> Router {
    let api_routes = Router::new()
        .route("/api/crm/notify_new_order", post(handlers::notify_new_order))
        .route("/api/crm/notify_payment", post(handlers::notify_payment))
        .route("/api/crm/pin_order_details", post(handlers::pin_order_details))
        .route_layer(axum_middleware::from_fn_with_state(auth, auth_middleware))
        .with_state(state);

    Router::new()
        .merge(public_routes("notify"))
        .merge(api_routes)
        .layer(TraceLayer::new_for_http())
}

/// Binds `host:port` and serves `app` until `shutdown` is cancelled.
///
/// In-flight requests are allowed to finish before this returns.
pub async fn serve(
    config: &ServerConfig,
    app: Router,
    shutdown: CancellationToken,
) -> Result<(), OrderlinkError> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| OrderlinkError::Transport {
            message: format!("failed to bind gateway to {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("gateway server listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| OrderlinkError::Transport {
            message: format!("gateway server error: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("gateway server stopped");
    Ok(())
}
