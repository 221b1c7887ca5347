use async_trait::async_trait;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::Json;
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::api::errors::ApiError;

pub(crate) const MIN_PASSWORD_LEN: usize = 8;

/// JSON body that has passed its `validator` rules.
///
/// Unparsable bodies are rejected as malformed input; bodies that parse but break a
/// rule are unprocessable.
pub(crate) struct ValidJson<T>(pub(crate) T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|rejection| {
            if rejection.status() == StatusCode::UNPROCESSABLE_ENTITY {
                ApiError::Unprocessable(rejection.body_text())
            } else {
                ApiError::BadRequest(rejection.body_text())
            }
        })?;
        value.validate().map_err(|e| ApiError::Unprocessable(e.to_string()))?;
        Ok(ValidJson(value))
    }
}

pub(crate) fn validate_password_len(password: &str) -> Result<(), ApiError> {
    if password.chars().count() >= MIN_PASSWORD_LEN {
        Ok(())
    } else {
        Err(ApiError::Unprocessable(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters long"
        )))
    }
}
