mod config;
mod local_server;
mod routes_chat;
mod routes_runtime;
mod state;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{routing::{get, post}, Router};
use lifecycle::LifecycleManager;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env()?;
    info!(
        model_path = %cfg.model_path.display(),
        engine_url = %cfg.engine_url,
        max_tokens = cfg.model.max_tokens,
        top_k = cfg.model.top_k,
        "assistant: configuration loaded"
    );

    // Init engine & lifecycle
    let loader = Arc::new(crate::local_server::LocalServerLoader::new(cfg.engine_url.clone()));
    let (manager, notifications) =
        LifecycleManager::start(cfg.model_path.clone(), cfg.model, loader);
    let manager = Arc::new(manager);

    let app_state = Arc::new(AppState::new(manager.clone()));

    // Spawn view updater
    let pump = tokio::spawn(crate::state::pump_notifications(
        app_state.view.clone(),
        notifications,
    ));

    if cfg.load_on_start {
        if let Err(e) = manager.request_load() {
            warn!("assistant: initial load request rejected: {e}");
        }
    }

    let app = Router::new()
        .route("/runtime", get(crate::routes_runtime::get_runtime))
        .route("/runtime/load", post(crate::routes_runtime::post_load))
        .route("/ask", post(crate::routes_chat::ask))
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("assistant: ctrl-c handler failed: {e}");
            }
            cancel.cancel();
        }
    });

    let addr = &cfg.bind_addr;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("assistant listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .context("HTTP server failed")?;

    // Teardown: finish the in-flight task, release the model
    manager.shutdown().await;

    // The pump ends once the last manager reference is gone and the final
    // notifications have been applied to the view.
    drop(manager);
    if tokio::time::timeout(Duration::from_secs(2), pump).await.is_err() {
        warn!("assistant: view pump still running at exit");
    }
    info!("assistant: stopped");

    Ok(())
}
