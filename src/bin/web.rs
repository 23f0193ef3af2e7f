//! precinct HTTP 服务
//!
//! 启动: cargo run --bin precinct-web
//! 端口取 [server] 配置，可用 PRECINCT__SERVER__PORT 覆盖

#![cfg(feature = "web")]

use std::sync::Arc;

use anyhow::Context;

use precinct::chat::FileStore;
use precinct::config::{load_config, AppConfig};
use precinct::core::ShutdownManager;
use precinct::resolve::cache::spawn_sweeper;
use precinct::server::{router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    precinct::observability::init();

    let cfg = load_config(None).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        AppConfig::default()
    });

    let storage = Arc::new(FileStore::new(cfg.app.storage_dir()));
    let state = Arc::new(AppState::from_config(&cfg, storage).context("Failed to build app state")?);
    state.chat.load().await;

    let shutdown = Arc::new(ShutdownManager::new());
    shutdown.install_signal_handlers();
    let sweeper = spawn_sweeper(state.chat.resolver().cache().clone(), shutdown.token());

    let app = router(Arc::clone(&state));
    let addr = format!("{}:{}", cfg.server.host, cfg.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("precinct listening on http://{}", addr);

    let token = shutdown.token();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { token.cancelled().await })
        .await
        .context("Server error")?;

    sweeper.await.ok();
    tracing::info!("precinct stopped");
    Ok(())
}
