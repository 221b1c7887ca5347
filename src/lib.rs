pub(crate) mod api;
pub(crate) mod core;
pub(crate) mod db;
pub(crate) mod repositories;
pub(crate) mod schemas;
pub(crate) mod services;
pub(crate) mod tasks;

#[cfg(test)]
mod test_support;

use crate::core::{config::Settings, redis::RedisHandle, state::AppState, telemetry};

/// Loads settings, initialises telemetry and opens the pool, running migrations.
async fn build_state() -> anyhow::Result<AppState> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;
    core::metrics::init(&settings)?;

    let db_pool = db::init_pool(&settings).await?;
    db::run_migrations(&db_pool).await?;

    let redis = RedisHandle::new(settings.redis().redis_url());
    if let Err(err) = redis.connect().await {
        tracing::error!(error = %err, "Failed to connect to Redis; login rate limiting disabled");
    } else {
        tracing::info!("Redis connected successfully");
    }

    Ok(AppState::new(settings, db_pool, redis))
}

pub async fn run() -> anyhow::Result<()> {
    let state = build_state().await?;

    if let Err(err) = core::bootstrap::ensure_first_admin(&state).await {
        tracing::error!(error = %err, "Failed to ensure first admin account");
    }

    let app = api::router::service(state.clone());
    let listener = tokio::net::TcpListener::bind(state.settings().server_addr()).await?;

    tracing::info!(
        host = %state.settings().server_host(),
        port = state.settings().server_port(),
        environment = %state.settings().runtime().environment.as_str(),
        "Quizhall API listening"
    );

    let result = axum::serve(
        listener,
        axum::ServiceExt::<axum::extract::Request>::into_make_service(app),
    )
    .with_graceful_shutdown(core::shutdown::shutdown_signal())
    .await;

    state.redis().disconnect().await;
    tracing::info!("Redis disconnected");

    result?;

    Ok(())
}

pub async fn run_worker() -> anyhow::Result<()> {
    let state = build_state().await?;

    tracing::info!(
        sweep_interval_seconds = state.settings().attempts().sweep_interval_seconds,
        "Quizhall worker started"
    );

    let result = tasks::scheduler::run(state.clone()).await;

    state.redis().disconnect().await;
    tracing::info!("Redis disconnected");

    result?;

    Ok(())
}
