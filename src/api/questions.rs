use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{post, put},
    Json, Router,
};

use crate::api::authoring::{
    ensure_no_attempts, insert_question, load_owned_question, load_owned_quiz,
};
use crate::api::errors::ApiError;
use crate::api::guards::{authorize, Authenticated};
use crate::api::validation::ValidJson;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::quiz::{QuestionAdd, QuestionResponse, QuestionUpdate};
use crate::services::access_policy::Operation;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/questions", post(create_question))
        .route("/questions/:question_id", put(update_question).delete(delete_question))
}

async fn create_question(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    ValidJson(payload): ValidJson<QuestionAdd>,
) -> Result<(StatusCode, Json<QuestionResponse>), ApiError> {
    authorize(&identity, Operation::AuthorQuizzes)?;
    payload.question.check_single_correct().map_err(ApiError::Unprocessable)?;

    let mut tx =
        state.db().begin().await.map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;
    let quiz = load_owned_quiz(&mut *tx, &identity, &payload.quiz_id).await?;

    let position = repositories::questions::next_position(&mut *tx, &quiz.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to compute question position"))?;
    let question =
        insert_question(&mut tx, &quiz.id, &payload.question, position, primitive_now_utc()).await?;

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit question"))?;

    Ok((StatusCode::CREATED, Json(question)))
}

async fn update_question(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    Path(question_id): Path<String>,
    ValidJson(payload): ValidJson<QuestionUpdate>,
) -> Result<Json<QuestionResponse>, ApiError> {
    authorize(&identity, Operation::AuthorQuizzes)?;

    let mut tx =
        state.db().begin().await.map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;
    let (_, question) = load_owned_question(&mut tx, &identity, &question_id).await?;

    let updated = repositories::questions::update(
        &mut *tx,
        &question.id,
        payload.text.as_deref(),
        payload.points,
        payload.position,
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::write_failure(e, "Failed to update question", "Question conflicts"))?;
    let options = repositories::options::list_by_question(&mut *tx, &updated.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load options"))?;

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit question"))?;

    Ok(Json(QuestionResponse::new(updated, options)))
}

async fn delete_question(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    Path(question_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    authorize(&identity, Operation::AuthorQuizzes)?;

    let mut tx =
        state.db().begin().await.map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;
    let (_, question) = load_owned_question(&mut tx, &identity, &question_id).await?;
    ensure_no_attempts(&mut *tx, &question.quiz_id).await?;

    repositories::questions::delete(&mut *tx, &question.id)
        .await
        .map_err(|e| ApiError::write_failure(e, "Failed to delete question", "Question conflicts"))?;

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit question"))?;

    Ok(StatusCode::NO_CONTENT)
}
