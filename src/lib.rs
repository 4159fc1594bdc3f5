pub(crate) mod api;
pub(crate) mod core;
pub(crate) mod db;
pub(crate) mod engine;
pub(crate) mod repositories;
pub(crate) mod schemas;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use crate::core::{config::Settings, state::AppState, telemetry};
use crate::engine::{clock::SystemClock, store::SqliteStore, SessionEngine};

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;
    core::metrics::init(&settings)?;

    let db_pool = db::init_pool(&settings).await?;
    db::run_migrations(&db_pool).await?;

    let store = Arc::new(SqliteStore::new(db_pool.clone()));
    let engine = SessionEngine::new(
        store.clone(),
        store,
        Arc::new(SystemClock),
        settings.engine().to_engine_config(),
    );

    let state = AppState::new(settings, db_pool, engine);

    if let Err(err) = core::bootstrap::ensure_admin(&state).await {
        tracing::error!(error = %err, "Failed to ensure default admin account");
    }

    let app = api::router::router(state.clone());
    let listener = tokio::net::TcpListener::bind(state.settings().server_addr()).await?;

    tracing::info!(
        host = %state.settings().server_host(),
        port = state.settings().server_port(),
        environment = %state.settings().runtime().environment.as_str(),
        "Examdesk API listening"
    );

    let result =
        axum::serve(listener, app).with_graceful_shutdown(core::shutdown::shutdown_signal()).await;

    // Release every scheduled timer wake before the process exits.
    state.engine().shutdown().await;

    result?;

    Ok(())
}
