// SPDX-FileCopyrightText: 2026 Orderlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process wiring for `orderlink userbot` and `orderlink notify`.
//!
//! Adapters are created once here, injected into the saga components as
//! trait objects, and shut down once after the HTTP server stops.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use orderlink_config::OrderlinkConfig;
use orderlink_core::{
    FallbackSender, GroupTransport, NotifyChannel, OrderlinkError, PluginAdapter, StorageAdapter,
    TrackingStore,
};
use orderlink_gateway::{
    AuthConfig, FallbackClientConfig, HttpFallbackClient, NotifyState, ServerConfig,
    UserbotState, notify_router, serve, userbot_router,
};
use orderlink_saga::{
    FallbackDeliveryRouter, FallbackTracker, GroupProvisioner, MembershipLifecycle,
    MembershipWatcher, PairLocks, SagaSettings,
};
use orderlink_storage::SqliteTrackingStore;
use orderlink_telegram::NotifyBot;

use crate::shutdown::install_signal_handler;

/// How often idle per-pair locks are dropped.
const LOCK_PRUNE_INTERVAL: Duration = Duration::from_secs(600);

/// Everything the userbot process runs besides the transport itself.
pub struct UserbotServices {
    pub app: Router,
    pub watcher: Arc<MembershipWatcher>,
    pub locks: Arc<PairLocks>,
}

/// Builds the userbot routes and the membership watcher over shared adapters.
pub fn build_userbot(
    transport: Arc<dyn GroupTransport>,
    store: Arc<dyn TrackingStore>,
    config: &OrderlinkConfig,
) -> UserbotServices {
    let settings = SagaSettings::from(&config.saga);
    let locks = Arc::new(PairLocks::new());

    let state = UserbotState {
        provisioner: Arc::new(GroupProvisioner::new(transport.clone(), settings)),
        lifecycle: Arc::new(MembershipLifecycle::new(
            transport.clone(),
            store.clone(),
            locks.clone(),
            settings,
        )),
        tracker: Arc::new(FallbackTracker::new(
            transport.clone(),
            store.clone(),
            locks.clone(),
            settings,
        )),
        store: store.clone(),
    };

    let watcher = Arc::new(MembershipWatcher::new(
        transport,
        store,
        locks.clone(),
        settings,
    ));

    UserbotServices {
        app: userbot_router(state, AuthConfig::new(config.gateway.api_key.clone())),
        watcher,
        locks,
    }
}

/// Builds the notify routes over the notify channel and fallback sender.
pub fn build_notify(
    notify: Arc<dyn NotifyChannel>,
    fallback: Arc<dyn FallbackSender>,
    config: &OrderlinkConfig,
) -> Router {
    let settings = SagaSettings::from(&config.saga);
    let state = NotifyState {
        router: Arc::new(FallbackDeliveryRouter::new(
            notify.clone(),
            fallback,
            settings,
        )),
        notify,
        settings,
    };
    notify_router(state, AuthConfig::new(config.gateway.api_key.clone()))
}

fn server_config(config: &OrderlinkConfig) -> ServerConfig {
    ServerConfig {
        host: config.gateway.host.clone(),
        port: config.gateway.port,
    }
}

fn spawn_lock_pruner(locks: Arc<PairLocks>, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(LOCK_PRUNE_INTERVAL);
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    locks.prune();
                    debug!(remaining = locks.len(), "pruned idle pair locks");
                }
            }
        }
    })
}

/// Serves the userbot until `cancel` fires, then stops the watcher and
/// shuts the adapters down.
pub async fn serve_userbot(
    transport: Arc<dyn GroupTransport>,
    store: Arc<dyn TrackingStore>,
    config: &OrderlinkConfig,
    cancel: CancellationToken,
) -> Result<(), OrderlinkError> {
    let events = transport.subscribe_membership()?;
    let services = build_userbot(transport.clone(), store.clone(), config);

    let watcher_task = tokio::spawn({
        let watcher = services.watcher.clone();
        let cancel = cancel.clone();
        async move { watcher.run(events, cancel).await }
    });
    let pruner_task = spawn_lock_pruner(services.locks.clone(), cancel.clone());

    let result = serve(&server_config(config), services.app, cancel.clone()).await;

    cancel.cancel();
    if let Err(e) = watcher_task.await {
        warn!(error = %e, "membership watcher task failed");
    }
    let _ = pruner_task.await;

    if let Err(e) = transport.shutdown().await {
        warn!(error = %e, "transport shutdown failed");
    }
    if let Err(e) = store.shutdown().await {
        warn!(error = %e, "tracking store shutdown failed");
    }
    info!("userbot stopped");
    result
}

#[cfg(feature = "mtproto")]
async fn connect_transport(
    config: &OrderlinkConfig,
) -> Result<Arc<dyn GroupTransport>, OrderlinkError> {
    let transport = crate::mtproto::MtprotoTransport::connect(&config.userbot).await?;
    Ok(Arc::new(transport))
}

#[cfg(not(feature = "mtproto"))]
async fn connect_transport(
    _config: &OrderlinkConfig,
) -> Result<Arc<dyn GroupTransport>, OrderlinkError> {
    Err(OrderlinkError::Config(
        "orderlink was built without the `mtproto` feature; rebuild with `--features mtproto` to run the userbot".into(),
    ))
}

/// Runs the `orderlink userbot` command.
pub async fn run_userbot(config: OrderlinkConfig) -> Result<(), OrderlinkError> {
    init_tracing(&config.service.log_level);
    orderlink_saga::metrics::register_metrics();
    info!("starting orderlink userbot");

    let store = SqliteTrackingStore::new(config.storage.clone());
    store.initialize().await?;
    let store: Arc<dyn TrackingStore> = Arc::new(store);

    let transport = match connect_transport(&config).await {
        Ok(transport) => transport,
        Err(e) => {
            if let Err(close) = store.shutdown().await {
                warn!(error = %close, "tracking store shutdown failed");
            }
            return Err(e);
        }
    };

    let cancel = install_signal_handler();
    serve_userbot(transport, store, &config, cancel).await
}

/// Runs the `orderlink notify` command.
pub async fn run_notify(config: OrderlinkConfig) -> Result<(), OrderlinkError> {
    init_tracing(&config.service.log_level);
    orderlink_saga::metrics::register_metrics();
    info!("starting orderlink notify bot");

    let bot = Arc::new(NotifyBot::new(&config.telegram)?);
    let fallback = Arc::new(HttpFallbackClient::new(FallbackClientConfig {
        base_url: config.fallback.userbot_api_base.clone(),
        api_key: config.fallback.api_key.clone(),
        timeout: Duration::from_secs(config.fallback.timeout_secs),
    })?);

    let cancel = install_signal_handler();
    let polling = bot.spawn_polling(cancel.clone());

    let app = build_notify(bot.clone(), fallback, &config);
    let result = serve(&server_config(&config), app, cancel.clone()).await;

    cancel.cancel();
    if let Err(e) = polling.await {
        warn!(error = %e, "notify bot polling task failed");
    }
    if let Err(e) = bot.shutdown().await {
        warn!(error = %e, "notify bot shutdown failed");
    }
    info!("notify bot stopped");
    result
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("orderlink={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use orderlink_core::types::{GroupId, MembershipEvent, MessageRef, UserId};
    use orderlink_test_utils::{
        MockFallbackSender, MockNotifyChannel, MockTransport, TransportCall, TransportOp,
        temp_store,
    };

    fn test_config() -> OrderlinkConfig {
        let mut config = OrderlinkConfig::default();
        config.gateway.port = 0;
        config.gateway.api_key = Some("k".into());
        config.saga.call_timeout_secs = 2;
        config
    }

    #[tokio::test]
    async fn userbot_cleans_up_on_join_and_stops_on_cancel() {
        let transport = Arc::new(MockTransport::new(GroupId(-100123)));
        let (store, _dir) = temp_store().await.unwrap();
        let store = Arc::new(store);
        store
            .put(UserId(555), GroupId(-100123), MessageRef(999))
            .await
            .unwrap();

        let cancel = CancellationToken::new();
        let task = tokio::spawn({
            let transport: Arc<dyn GroupTransport> = transport.clone();
            let store: Arc<dyn TrackingStore> = store.clone();
            let cancel = cancel.clone();
            async move { serve_userbot(transport, store, &test_config(), cancel).await }
        });

        transport
            .emit(MembershipEvent::joined(GroupId(-100123), UserId(555)))
            .await;

        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while store
            .find(UserId(555), GroupId(-100123))
            .await
            .unwrap()
            .is_some()
        {
            assert!(tokio::time::Instant::now() < deadline, "row was not cleaned up");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        cancel.cancel();
        let result = tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("userbot did not stop")
            .expect("userbot task panicked");
        assert!(result.is_ok());
        assert_eq!(
            transport.calls_of(TransportOp::DeletePrivateMessages),
            vec![TransportCall::DeletePrivateMessages {
                user: UserId(555),
                messages: vec![MessageRef(999)],
            }]
        );
    }

    #[tokio::test]
    async fn userbot_routes_share_the_store() {
        let transport: Arc<dyn GroupTransport> = Arc::new(MockTransport::new(GroupId(-100123)));
        let (store, _dir) = temp_store().await.unwrap();
        let store: Arc<dyn TrackingStore> = Arc::new(store);
        let services = build_userbot(transport, store.clone(), &test_config());

        let request = Request::builder()
            .method("POST")
            .uri("/api/crm/send_fallback_message")
            .header("content-type", "application/json")
            .header("x-crm-api-key", "k")
            .body(Body::from(
                serde_json::json!({"contractor_id": 7, "group_id": -100123, "text": "hi"}).to_string(),
            ))
            .unwrap();
        let response = services.app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(store.find(UserId(7), GroupId(-100123)).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn notify_routes_use_configured_key() {
        let notify: Arc<dyn NotifyChannel> = Arc::new(MockNotifyChannel::new());
        let fallback: Arc<dyn FallbackSender> = Arc::new(MockFallbackSender::new());
        let app = build_notify(notify, fallback, &test_config());

        let request = Request::builder()
            .method("POST")
            .uri("/api/crm/notify_payment")
            .header("content-type", "application/json")
            .header("authorization", "Bearer k")
            .body(Body::from(
                serde_json::json!({"contractor_id": 7, "amount_rub": 100, "order_id": "A"}).to_string(),
            ))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), 1 << 16).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["result_code"], "OK");
    }

    #[cfg(not(feature = "mtproto"))]
    #[tokio::test]
    async fn userbot_requires_mtproto_feature() {
        let err = connect_transport(&test_config()).await.err().unwrap();
        assert!(matches!(err, OrderlinkError::Config(_)));
    }
}
