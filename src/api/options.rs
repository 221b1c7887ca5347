use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{post, put},
    Json, Router,
};
use uuid::Uuid;

use crate::api::authoring::{ensure_no_attempts, load_owned_option, load_owned_question};
use crate::api::errors::ApiError;
use crate::api::guards::{authorize, Authenticated};
use crate::api::validation::ValidJson;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::repositories::options::NewOption;
use crate::schemas::quiz::{OptionAdd, OptionResponse, OptionUpdate};
use crate::services::access_policy::Operation;

const LAST_CORRECT: &str = "A question must keep exactly one correct option";

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/options", post(create_option))
        .route("/options/:option_id", put(update_option).delete(delete_option))
}

/// Adding a correct option moves the correct mark to it.
async fn create_option(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    ValidJson(payload): ValidJson<OptionAdd>,
) -> Result<(StatusCode, Json<OptionResponse>), ApiError> {
    authorize(&identity, Operation::AuthorQuizzes)?;
    let now = primitive_now_utc();

    let mut tx =
        state.db().begin().await.map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;
    let (_, question) = load_owned_question(&mut tx, &identity, &payload.question_id).await?;

    if payload.is_correct {
        repositories::options::clear_correct(&mut *tx, &question.id, None, now)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to update options"))?;
    }

    let position = repositories::options::next_position(&mut *tx, &question.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to compute option position"))?;
    let created = repositories::options::insert_many(
        &mut *tx,
        &question.id,
        &[NewOption {
            id: Uuid::new_v4().to_string(),
            text: &payload.text,
            is_correct: payload.is_correct,
            position,
        }],
        now,
    )
    .await
    .map_err(|e| ApiError::write_failure(e, "Failed to create option", "Option conflicts"))?;

    let option = created
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::Internal("Option insert returned no row".to_string()))?;

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit option"))?;

    Ok((StatusCode::CREATED, Json(option.into())))
}

async fn update_option(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    Path(option_id): Path<String>,
    ValidJson(payload): ValidJson<OptionUpdate>,
) -> Result<Json<OptionResponse>, ApiError> {
    authorize(&identity, Operation::AuthorQuizzes)?;
    let now = primitive_now_utc();

    let mut tx =
        state.db().begin().await.map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;
    let (question, option) = load_owned_option(&mut tx, &identity, &option_id).await?;

    match payload.is_correct {
        Some(true) if !option.is_correct => {
            repositories::options::clear_correct(&mut *tx, &question.id, Some(&option.id), now)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to update options"))?;
        }
        Some(false) if option.is_correct => {
            return Err(ApiError::Conflict(LAST_CORRECT.to_string()));
        }
        _ => {}
    }

    let updated = repositories::options::update(
        &mut *tx,
        &option.id,
        payload.text.as_deref(),
        payload.is_correct,
        payload.position,
        now,
    )
    .await
    .map_err(|e| ApiError::write_failure(e, "Failed to update option", "Option conflicts"))?;

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit option"))?;

    Ok(Json(updated.into()))
}

async fn delete_option(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    Path(option_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    authorize(&identity, Operation::AuthorQuizzes)?;

    let mut tx =
        state.db().begin().await.map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;
    let (question, option) = load_owned_option(&mut tx, &identity, &option_id).await?;
    ensure_no_attempts(&mut *tx, &question.quiz_id).await?;

    if option.is_correct {
        return Err(ApiError::Conflict(LAST_CORRECT.to_string()));
    }

    repositories::options::delete(&mut *tx, &option.id)
        .await
        .map_err(|e| ApiError::write_failure(e, "Failed to delete option", "Option conflicts"))?;

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit option"))?;

    Ok(StatusCode::NO_CONTENT)
}
