use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};

use crate::api::errors::ApiError;
use crate::api::guards::{authorize, AttemptTokenHeader, Authenticated};
use crate::api::validation::ValidJson;
use crate::core::state::AppState;
use crate::core::time::{format_primitive, primitive_now_utc, remaining_seconds};
use crate::schemas::attempt::{
    AttemptTokenResponse, ScoreResponse, SolutionsResponse, StartAttemptRequest, StudentQuestion,
    StudentQuestionsResponse, SubmitRequest,
};
use crate::services::access_policy::Operation;
use crate::services::attempts::{self, StartRequest};

#[cfg(test)]
mod tests;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/student/quizzes/:quiz_id/start", post(start_attempt))
        .route("/student/quizzes/:quiz_id/submit", post(submit_attempt))
        .route("/student/questions/:quiz_id", get(fetch_questions))
        .route("/student/solutions/:quiz_id", get(reveal_solutions))
}

/// The body is optional; quizzes without a password accept an empty request.
async fn start_attempt(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    Path(quiz_id): Path<String>,
    payload: Option<Json<StartAttemptRequest>>,
) -> Result<Json<AttemptTokenResponse>, ApiError> {
    let student_id = authorize(&identity, Operation::TakeQuiz)?;
    let payload = payload.map(|Json(payload)| payload).unwrap_or_default();
    let now = primitive_now_utc();

    let started = attempts::start_attempt(
        state.db(),
        StartRequest {
            student_id,
            quiz_id: &quiz_id,
            password: payload.password.as_deref(),
            token_bytes: state.settings().attempts().token_bytes,
            now,
        },
    )
    .await?;

    Ok(Json(AttemptTokenResponse::new(started.attempt, started.resumed, now)))
}

async fn fetch_questions(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    AttemptTokenHeader(token): AttemptTokenHeader,
    Path(quiz_id): Path<String>,
) -> Result<Json<StudentQuestionsResponse>, ApiError> {
    let student_id = authorize(&identity, Operation::TakeQuiz)?;
    let now = primitive_now_utc();

    let (attempt, content) =
        attempts::questions_for_attempt(state.db(), student_id, &quiz_id, &token, now).await?;

    Ok(Json(StudentQuestionsResponse {
        remaining_seconds: attempt
            .attempt_token_expires_at
            .map(|deadline| remaining_seconds(deadline, now))
            .unwrap_or(0),
        expires_at: attempt.attempt_token_expires_at.map(format_primitive),
        attempt_id: attempt.id,
        quiz_id: attempt.quiz_id,
        questions: content.into_iter().map(StudentQuestion::from).collect(),
    }))
}

async fn submit_attempt(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    AttemptTokenHeader(token): AttemptTokenHeader,
    Path(quiz_id): Path<String>,
    ValidJson(payload): ValidJson<SubmitRequest>,
) -> Result<Json<ScoreResponse>, ApiError> {
    let student_id = authorize(&identity, Operation::TakeQuiz)?;
    let answers = payload.answers.into_map().map_err(ApiError::Unprocessable)?;

    let submitted = attempts::submit_attempt(
        state.db(),
        student_id,
        &quiz_id,
        &token,
        answers,
        primitive_now_utc(),
    )
    .await?;

    Ok(Json(ScoreResponse::new(submitted.attempt, submitted.result)))
}

async fn reveal_solutions(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    Path(quiz_id): Path<String>,
) -> Result<Json<SolutionsResponse>, ApiError> {
    let student_id = authorize(&identity, Operation::TakeQuiz)?;
    let solutions = attempts::reveal_solutions(state.db(), student_id, &quiz_id).await?;
    Ok(Json(solutions.into()))
}
