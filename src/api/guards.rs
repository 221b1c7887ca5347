use async_trait::async_trait;
use axum::extract::{FromRequestParts, State};
use axum::http::{header, request::Parts, HeaderName};

use crate::api::errors::ApiError;
use crate::core::{security, state::AppState};
use crate::repositories::accounts::{self, AccountStore};
use crate::services::access_policy::{self, Identity, Operation};

pub(crate) const ATTEMPT_TOKEN_HEADER: HeaderName = HeaderName::from_static("x-attempt-token");

/// Caller identity taken from the bearer token and confirmed against its credential store.
pub(crate) struct Authenticated(pub(crate) Identity);

/// The opaque attempt credential sent alongside the bearer token.
pub(crate) struct AttemptTokenHeader(pub(crate) String);

#[async_trait]
impl FromRequestParts<AppState> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let State(app_state) = State::<AppState>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to access application state"))?;

        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::Unauthorized("Invalid authentication credentials"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(ApiError::Unauthorized("Invalid authentication credentials"))?;

        let claims = security::verify_token(token, app_state.settings())
            .map_err(|_| ApiError::Unauthorized("Invalid authentication credentials"))?;

        let account =
            accounts::find_by_id(app_state.db(), AccountStore::for_role(claims.role), &claims.sub)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to load account"))?;

        let Some(account) = account else {
            return Err(ApiError::Unauthorized("Account not found"));
        };

        if !account.is_active {
            return Err(ApiError::Unauthorized("Invalid authentication credentials"));
        }

        Ok(Authenticated(Identity::new(claims.role, account.id)))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AttemptTokenHeader {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(&ATTEMPT_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| AttemptTokenHeader(value.to_string()))
            .ok_or_else(|| ApiError::InvalidAttemptToken("Attempt token is missing".to_string()))
    }
}

/// Applies the role table and returns the caller's account id.
pub(crate) fn authorize(identity: &Identity, operation: Operation) -> Result<&str, ApiError> {
    access_policy::ensure_allowed(identity, operation)?;
    Ok(identity.id())
}
