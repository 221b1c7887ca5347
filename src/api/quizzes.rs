use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use crate::api::authoring::{
    check_window, ensure_subject_exists, insert_question, load_owned_quiz, teacher_view,
};
use crate::api::errors::ApiError;
use crate::api::guards::{authorize, Authenticated};
use crate::api::pagination::PageQuery;
use crate::api::validation::ValidJson;
use crate::core::security;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::repositories::quizzes::{CreateQuiz, ListFilter, UpdateQuiz};
use crate::schemas::attempt::QuizAttemptResponse;
use crate::schemas::quiz::{
    PublicQuizResponse, QuizCreate, QuizListQuery, QuizSummary, QuizUpdate, TeacherQuizResponse,
};
use crate::services::access_policy::Operation;

#[cfg(test)]
mod tests;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/quizzes", get(list_quizzes).post(create_quiz))
        .route("/quizzes1/:quiz_id", get(get_quiz))
        .route("/quizzes/:quiz_id", axum::routing::put(update_quiz).delete(delete_quiz))
        .route("/quizzes/:quiz_id/attempts", get(list_quiz_attempts))
        .route("/teacher/quizzes", get(list_own_quizzes))
        .route("/teacher/quizzes/:quiz_id", get(get_own_quiz))
}

async fn list_quizzes(
    State(state): State<AppState>,
    Query(params): Query<QuizListQuery>,
) -> Result<Json<Vec<QuizSummary>>, ApiError> {
    let (skip, limit) = PageQuery { skip: params.skip, limit: params.limit }.checked()?;
    let quizzes = repositories::quizzes::list(
        state.db(),
        ListFilter {
            teacher_id: params.teacher_id.as_deref(),
            subject_id: params.subject_id.as_deref(),
            search: params.search.as_deref().filter(|value| !value.trim().is_empty()),
        },
        skip,
        limit,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to list quizzes"))?;

    Ok(Json(quizzes.iter().map(QuizSummary::from).collect()))
}

async fn get_quiz(
    State(state): State<AppState>,
    Path(quiz_id): Path<String>,
) -> Result<Json<PublicQuizResponse>, ApiError> {
    let quiz = repositories::quizzes::find_by_id(state.db(), &quiz_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load quiz"))?
        .ok_or_else(|| ApiError::NotFound("Quiz not found".to_string()))?;
    let question_count = repositories::quizzes::question_count(state.db(), &quiz.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count questions"))?;

    Ok(Json(PublicQuizResponse { quiz: QuizSummary::from(&quiz), question_count }))
}

async fn create_quiz(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    ValidJson(payload): ValidJson<QuizCreate>,
) -> Result<(StatusCode, Json<TeacherQuizResponse>), ApiError> {
    let teacher_id = authorize(&identity, Operation::AuthorQuizzes)?;
    check_window(payload.start_time, payload.end_time)?;
    for question in &payload.questions {
        question.check_single_correct().map_err(ApiError::Unprocessable)?;
    }
    ensure_subject_exists(state.db(), &payload.subject_id).await?;

    let password_hash = hash_quiz_password(payload.password.as_deref())?;
    let now = primitive_now_utc();

    let mut tx =
        state.db().begin().await.map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    let quiz = repositories::quizzes::create(
        &mut *tx,
        CreateQuiz {
            id: &Uuid::new_v4().to_string(),
            title: payload.title.trim(),
            description: payload.description.as_deref(),
            password_hash,
            teacher_id,
            subject_id: &payload.subject_id,
            time_limit_minutes: payload.time_limit_minutes,
            passing_score: payload.passing_score,
            start_time: payload.start_time,
            end_time: payload.end_time,
            created_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::write_failure(e, "Failed to create quiz", "Quiz conflicts"))?;

    let mut questions = Vec::with_capacity(payload.questions.len());
    for (position, question) in payload.questions.iter().enumerate() {
        questions.push(insert_question(&mut tx, &quiz.id, question, position as i32, now).await?);
    }

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit quiz"))?;

    tracing::info!(
        quiz_id = %quiz.id,
        teacher_id = %quiz.teacher_id,
        questions = questions.len(),
        "Quiz created"
    );

    Ok((
        StatusCode::CREATED,
        Json(TeacherQuizResponse {
            max_points: questions.iter().map(|question| question.points).sum(),
            quiz: QuizSummary::from(&quiz),
            questions,
        }),
    ))
}

async fn update_quiz(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    Path(quiz_id): Path<String>,
    ValidJson(payload): ValidJson<QuizUpdate>,
) -> Result<Json<TeacherQuizResponse>, ApiError> {
    authorize(&identity, Operation::AuthorQuizzes)?;
    let quiz = load_owned_quiz(state.db(), &identity, &quiz_id).await?;

    let start_time = payload.start_time.unwrap_or(quiz.start_time);
    let end_time = payload.end_time.unwrap_or(quiz.end_time);
    check_window(start_time, end_time)?;

    if let Some(subject_id) = payload.subject_id.as_deref() {
        if subject_id != quiz.subject_id {
            ensure_subject_exists(state.db(), subject_id).await?;
        }
    }

    let password_hash = match payload.password.as_deref() {
        Some(password) => hash_quiz_password(Some(password))?,
        None => quiz.password_hash,
    };

    let updated = repositories::quizzes::update(
        state.db(),
        &quiz.id,
        UpdateQuiz {
            title: payload.title.map(|title| title.trim().to_string()).unwrap_or(quiz.title),
            description: payload.description.or(quiz.description),
            password_hash,
            subject_id: payload.subject_id.unwrap_or(quiz.subject_id),
            time_limit_minutes: payload.time_limit_minutes.unwrap_or(quiz.time_limit_minutes),
            passing_score: payload.passing_score.unwrap_or(quiz.passing_score),
            start_time,
            end_time,
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::write_failure(e, "Failed to update quiz", "Quiz conflicts"))?;

    Ok(Json(teacher_view(&state, &updated).await?))
}

async fn delete_quiz(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    Path(quiz_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    authorize(&identity, Operation::AuthorQuizzes)?;
    let quiz = load_owned_quiz(state.db(), &identity, &quiz_id).await?;

    repositories::quizzes::delete(state.db(), &quiz.id)
        .await
        .map_err(|e| ApiError::write_failure(e, "Failed to delete quiz", "Quiz is still referenced"))?;

    tracing::info!(quiz_id = %quiz.id, "Quiz deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn list_own_quizzes(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<QuizSummary>>, ApiError> {
    let teacher_id = authorize(&identity, Operation::AuthorQuizzes)?;
    let (skip, limit) = page.checked()?;

    let quizzes = repositories::quizzes::list(
        state.db(),
        ListFilter { teacher_id: Some(teacher_id), subject_id: None, search: None },
        skip,
        limit,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to list quizzes"))?;

    Ok(Json(quizzes.iter().map(QuizSummary::from).collect()))
}

async fn get_own_quiz(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    Path(quiz_id): Path<String>,
) -> Result<Json<TeacherQuizResponse>, ApiError> {
    authorize(&identity, Operation::AuthorQuizzes)?;
    let quiz = load_owned_quiz(state.db(), &identity, &quiz_id).await?;
    Ok(Json(teacher_view(&state, &quiz).await?))
}

async fn list_quiz_attempts(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    Path(quiz_id): Path<String>,
) -> Result<Json<Vec<QuizAttemptResponse>>, ApiError> {
    authorize(&identity, Operation::ViewQuizAttempts)?;
    let quiz = load_owned_quiz(state.db(), &identity, &quiz_id).await?;

    let attempts = repositories::attempts::list_by_quiz(state.db(), &quiz.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list attempts"))?;

    Ok(Json(attempts.into_iter().map(QuizAttemptResponse::from).collect()))
}

/// An empty password means the quiz is open to every student.
fn hash_quiz_password(password: Option<&str>) -> Result<Option<String>, ApiError> {
    match password.filter(|value| !value.trim().is_empty()) {
        Some(password) => security::hash_password(password)
            .map(Some)
            .map_err(|e| ApiError::internal(e, "Failed to hash quiz password")),
        None => Ok(None),
    }
}
