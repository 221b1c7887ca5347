use axum::{extract::State, routing::post, Json, Router};

use crate::api::errors::ApiError;
use crate::api::validation::ValidJson;
use crate::core::redis::login_rate_key;
use crate::core::security;
use crate::core::state::AppState;
use crate::db::types::Role;
use crate::repositories::{self, accounts::AccountStore};
use crate::schemas::account::AccountResponse;
use crate::schemas::auth::{LoginRequest, TokenResponse};

const BAD_CREDENTIALS: &str = "Incorrect username or password";

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/authenticate", post(admin_login))
        .route("/teauthenticate", post(teacher_login))
        .route("/stauthenticate", post(student_login))
}

async fn admin_login(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    authenticate(&state, Role::Admin, payload).await.map(Json)
}

async fn teacher_login(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    authenticate(&state, Role::Teacher, payload).await.map(Json)
}

async fn student_login(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    authenticate(&state, Role::Student, payload).await.map(Json)
}

/// Checks credentials against the store for `role` and issues a bearer token carrying that role.
async fn authenticate(
    state: &AppState,
    role: Role,
    payload: LoginRequest,
) -> Result<TokenResponse, ApiError> {
    let security_settings = state.settings().security();
    let allowed = state
        .redis()
        .rate_limit(
            &login_rate_key(role.as_str(), &payload.username),
            security_settings.login_rate_limit,
            security_settings.login_rate_window_seconds,
        )
        .await
        .unwrap_or(true);
    if !allowed {
        return Err(ApiError::TooManyRequests("Too many login attempts, try again later"));
    }

    let account = repositories::accounts::find_by_username(
        state.db(),
        AccountStore::for_role(role),
        payload.username.trim(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to load account"))?
    .ok_or(ApiError::Unauthorized(BAD_CREDENTIALS))?;

    let verified = security::verify_password(&payload.password, &account.hashed_password)
        .map_err(|_| ApiError::Unauthorized(BAD_CREDENTIALS))?;
    if !verified {
        tracing::info!(role = role.as_str(), username = %account.username, "Login rejected");
        return Err(ApiError::Unauthorized(BAD_CREDENTIALS));
    }

    if !account.is_active {
        return Err(ApiError::Forbidden("Account is disabled".to_string()));
    }

    let access_token = security::create_access_token(&account.id, role, state.settings(), None)
        .map_err(|e| ApiError::internal(e, "Failed to create access token"))?;

    Ok(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
        role,
        account: AccountResponse::from_account(account, role),
    })
}
