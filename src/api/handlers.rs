use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::collections::HashMap;

use crate::api::errors::ApiError;
use crate::api::guards::{authorize, Authenticated};
use crate::core::metrics;
use crate::core::redis::RedisHealth;
use crate::core::state::AppState;
use crate::repositories::{self, accounts::AccountStore};
use crate::schemas::account::AccountResponse;
use crate::schemas::{HealthResponse, RootResponse};
use crate::services::access_policy::Operation;

pub(crate) async fn root(State(state): State<AppState>) -> Json<RootResponse> {
    Json(RootResponse {
        message: state.settings().api().project_name.clone(),
        version: state.settings().api().version.clone(),
    })
}

pub(crate) async fn healthz(State(state): State<AppState>) -> Json<HealthResponse> {
    let mut status = "healthy".to_string();
    let mut components = HashMap::new();

    let redis = state.redis().health().await;
    match &redis {
        RedisHealth::Healthy | RedisHealth::Disconnected => {
            components.insert("redis".to_string(), redis.as_str().to_string());
        }
        RedisHealth::Unhealthy(error) => {
            components.insert("redis".to_string(), format!("unhealthy: {error}"));
            status = "degraded".to_string();
        }
    }

    match repositories::health::ping(state.db()).await {
        Ok(()) => {
            components.insert("database".to_string(), "healthy".to_string());
        }
        Err(err) => {
            components.insert("database".to_string(), format!("unhealthy: {err}"));
            status = "unhealthy".to_string();
        }
    }

    Json(HealthResponse { service: "quizhall-api".to_string(), status, components })
}

pub(crate) async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    if !state.settings().telemetry().prometheus_enabled {
        return StatusCode::NOT_FOUND.into_response();
    }

    match metrics::render() {
        Some(body) => ([(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")], body)
            .into_response(),
        None => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    }
}

pub(crate) async fn me(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
) -> Result<Json<AccountResponse>, ApiError> {
    let id = authorize(&identity, Operation::ViewProfile)?;
    let role = identity.role();

    let account = repositories::accounts::find_by_id(state.db(), AccountStore::for_role(role), id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load account"))?
        .ok_or(ApiError::Unauthorized("Account not found"))?;

    Ok(Json(AccountResponse::from_account(account, role)))
}
