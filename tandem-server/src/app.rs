use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::router::{Router, RouterCommand};
use crate::signaling::{SignalingService, ws_handler};
use axum::routing::get;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// HTTP surface: `GET /ws` for signaling and `GET /health` for probes.
pub fn app(service: SignalingService) -> axum::Router {
    axum::Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

async fn health() -> &'static str {
    "ok"
}

/// Spawns the router task and returns the service that feeds it.
pub fn launch(config: &RelayConfig) -> (SignalingService, JoinHandle<()>) {
    let (cmd_tx, cmd_rx) = mpsc::channel::<RouterCommand>(config.command_capacity.max(1));
    let service = SignalingService::new(cmd_tx, config);
    let router = Router::new(cmd_rx, Arc::new(service.clone()), config.clone());

    let task = tokio::spawn(router.run());
    (service, task)
}

pub async fn serve(
    config: RelayConfig,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), RelayError> {
    let listener = TcpListener::bind(config.bind)
        .await
        .map_err(|source| RelayError::Bind {
            addr: config.bind,
            source,
        })?;
    serve_on(listener, config, shutdown).await
}

/// Serves on an already bound listener until `shutdown` resolves.
pub async fn serve_on(
    listener: TcpListener,
    config: RelayConfig,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), RelayError> {
    let (service, router_task) = launch(&config);
    info!("Signaling server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app(service))
        .with_graceful_shutdown(shutdown)
        .await?;

    router_task.abort();
    info!("Signaling server stopped");
    Ok(())
}
